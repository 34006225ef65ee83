//! Account service - registration, login, logout and keeping the signed-in
//! account current after merges

use loyalty_common::{validate_password_strength, AppError};
use loyalty_core::{generate_referral_code, normalize_email, Account, PhoneKey, Snapshot, SyncEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult, SyncError};
use super::session::Session;
use crate::dto::{LoginRequest, RegisterAccountRequest, MIN_PHONE_DIGITS};

/// Account service for handling sign-up and sign-in
pub struct AccountService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountService<'a> {
    /// Create a new AccountService instance
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a new account and sign it in.
    ///
    /// The account is cached before the `register_account` procedure runs, so
    /// an unreachable remote still leaves a usable local account that the
    /// next push uploads.
    #[instrument(skip(self, session, request), fields(email = %request.email))]
    pub async fn register(
        &self,
        session: &mut Session,
        request: RegisterAccountRequest,
    ) -> ServiceResult<Account> {
        request.validate()?;
        if request.phone_digits() < MIN_PHONE_DIGITS {
            return Err(ServiceError::validation(format!(
                "Phone must have at least {MIN_PHONE_DIGITS} digits"
            )));
        }
        validate_password_strength(&request.password)?;

        let email = request.email.trim().to_string();
        let phone = PhoneKey::new(&request.phone);
        let engine = self.ctx.sync_engine();

        let local = engine.load_local().await?;
        ensure_available(local.accounts.iter(), &email, &phone)?;

        match self.ctx.remote().fetch_accounts().await {
            Ok(records) => {
                ensure_available(records.iter().filter_map(|r| r.as_active()), &email, &phone)?;
            }
            Err(e) => warn!(error = %e, "Remote unavailable, checking duplicates locally only"),
        }

        let mut account = Account::new(email, request.phone.trim(), request.name.trim());
        account.last_name = request.last_name.trim().to_string();
        account.birth_date = request.birth_date;
        account.password_hash = self.ctx.passwords().hash(&request.password)?;
        account.referral_code = generate_referral_code();
        account.referred_by = request
            .referred_by
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty());

        let pending = account.clone();
        engine
            .update_local(move |snapshot| {
                snapshot.upsert_account(pending);
                Ok(())
            })
            .await?;

        let account = match self.ctx.procedures().register_account(&account).await {
            Ok(created) => {
                let adopted = created.clone();
                engine
                    .update_local(move |snapshot| {
                        snapshot.upsert_account(adopted);
                        Ok(())
                    })
                    .await?;
                created
            }
            Err(e) if e.is_conflict() => {
                let email = account.email.clone();
                engine
                    .update_local(move |snapshot| {
                        remove_account(snapshot, &email);
                        Ok(())
                    })
                    .await?;
                return Err(ServiceError::conflict(e.to_string()));
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Registration procedure unavailable, account kept locally");
                account
            }
            Err(e) => return Err(e.into()),
        };

        engine
            .push_records_best_effort(std::slice::from_ref(&account), &[])
            .await;

        session.sign_in(account.clone());
        session.save(self.ctx.cache()).await?;

        info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Sign in by email or phone number
    #[instrument(skip(self, session, request))]
    pub async fn login(&self, session: &mut Session, request: LoginRequest) -> ServiceResult<Account> {
        request.validate()?;
        let identifier = Identifier::parse(&request.identifier);

        let local = self.ctx.sync_engine().load_local().await?;
        let account = match local.accounts.iter().find(|a| identifier.matches(a)) {
            Some(account) => account.clone(),
            None => self.find_remote(&identifier).await?,
        };

        self.ctx
            .passwords()
            .verify_or_error(&request.password, &account.password_hash)?;

        session.sign_in(account.clone());
        session.save(self.ctx.cache()).await?;

        info!(account_id = %account.id, "Signed in");
        Ok(account)
    }

    /// Remote fallback; a hit is cached so the session can be restored
    async fn find_remote(&self, identifier: &Identifier) -> ServiceResult<Account> {
        let records = self
            .ctx
            .remote()
            .fetch_accounts()
            .await
            .map_err(SyncError::Remote)?;

        let account = records
            .into_iter()
            .filter_map(|r| r.into_active())
            .find(|a| identifier.matches(a))
            .ok_or(ServiceError::App(AppError::InvalidCredentials))?;

        let cached = account.clone();
        self.ctx
            .sync_engine()
            .update_local(move |snapshot| {
                snapshot.upsert_account(cached);
                Ok(())
            })
            .await?;

        Ok(account)
    }

    pub async fn logout(&self, session: &mut Session) -> ServiceResult<()> {
        if let Some(email) = session.email() {
            info!(email = %email, "Signed out");
        }
        session.sign_out();
        session.save(self.ctx.cache()).await?;
        Ok(())
    }

    /// Re-read the signed-in account from the cache.
    ///
    /// Returns whether the session is still signed in. An account that a
    /// merge removed signs the session out, and the sign-out is persisted.
    pub async fn refresh(&self, session: &mut Session) -> ServiceResult<bool> {
        if !session.is_signed_in() {
            return Ok(false);
        }

        let snapshot = self.ctx.sync_engine().load_local().await?;
        if session.refresh_from(&snapshot) {
            return Ok(true);
        }
        session.save(self.ctx.cache()).await?;
        Ok(false)
    }

    /// Refresh `session` after every merge announced on `events`, until the
    /// bus closes. A lagging receiver refreshes once and carries on.
    pub async fn track_merges(
        &self,
        session: &mut Session,
        mut events: broadcast::Receiver<SyncEvent>,
    ) {
        loop {
            match events.recv().await {
                Ok(SyncEvent::MergeCompleted(_)) => {}
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Sync bus lagged, refreshing session");
                }
                Err(RecvError::Closed) => break,
            }

            if let Err(e) = self.refresh(session).await {
                warn!(error = %e, "Session refresh after merge failed");
            }
        }
    }

    /// Sign out and drop everything this device has cached
    #[instrument(skip(self, session))]
    pub async fn wipe_device(&self, session: &mut Session) -> ServiceResult<()> {
        self.ctx.sync_engine().wipe_local().await?;
        session.sign_out();
        Ok(())
    }
}

/// Login identifier: an email when it contains `@`, otherwise a phone number
enum Identifier {
    Email(String),
    Phone(PhoneKey),
}

impl Identifier {
    fn parse(raw: &str) -> Self {
        if raw.contains('@') {
            Self::Email(normalize_email(raw))
        } else {
            Self::Phone(PhoneKey::new(raw))
        }
    }

    fn matches(&self, account: &Account) -> bool {
        match self {
            Self::Email(email) => account.email_key() == *email,
            Self::Phone(phone) => !phone.is_empty() && account.phone_key() == *phone,
        }
    }
}

fn ensure_available<'b>(
    mut accounts: impl Iterator<Item = &'b Account>,
    email: &str,
    phone: &PhoneKey,
) -> ServiceResult<()> {
    let email = normalize_email(email);
    accounts.try_for_each(|account| {
        if account.email_key() == email {
            return Err(ServiceError::conflict("Email already in use"));
        }
        if !phone.is_empty() && account.phone_key() == *phone {
            return Err(ServiceError::conflict("Phone number already in use"));
        }
        Ok(())
    })
}

fn remove_account(snapshot: &mut Snapshot, email: &str) {
    let key = normalize_email(email);
    snapshot.accounts.retain(|a| a.email_key() != key);
}
