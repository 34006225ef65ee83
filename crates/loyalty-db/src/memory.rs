//! In-process remote store
//!
//! Same contract as the PostgreSQL adapters: procedures settle under one lock
//! with the shared settlement rules, tombstones are never overwritten, and
//! every write is announced on the change feed. Outages and rejected writes
//! can be switched on to exercise failure paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::channel::mpsc::{self, UnboundedSender};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use loyalty_core::ledger::settlement;
use loyalty_core::{
    normalize_email, Account, AccountId, AccountRecord, ChangeEvent, ChangeFeed, ChangeKind,
    ChangeStream, Collection, DomainError, LedgerProcedures, Order, Prize, ProcessedOrder,
    RemoteSnapshot, RemoteStore, RepoResult, Settings, Tombstone,
};

use crate::mappers::{PRIZE_CATALOG_KEY, STORE_SETTINGS_KEY};
use crate::repositories::ProcedureConfig;

#[derive(Debug, Default)]
struct MemoryState {
    accounts: Vec<AccountRecord>,
    guest_orders: Vec<Order>,
    settings: Option<Settings>,
    prize_catalog: Option<Vec<Prize>>,
}

impl MemoryState {
    fn position(&self, matches: impl Fn(&Account) -> bool) -> Option<usize> {
        self.accounts
            .iter()
            .position(|record| record.as_active().is_some_and(&matches))
    }

    fn position_by_email(&self, email: &str) -> Option<usize> {
        let key = normalize_email(email);
        self.position(|a| a.email_key() == key)
    }

    fn active(&self, index: usize) -> Option<Account> {
        self.accounts.get(index).and_then(|r| r.as_active().cloned())
    }
}

/// Remote store held in memory
pub struct MemoryRemoteStore {
    state: Mutex<MemoryState>,
    config: ProcedureConfig,
    watchers: Mutex<Vec<(Collection, UnboundedSender<ChangeEvent>)>>,
    offline: AtomicBool,
    rejected_ids: Mutex<HashSet<AccountId>>,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new(ProcedureConfig::default())
    }
}

impl MemoryRemoteStore {
    pub fn new(config: ProcedureConfig) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            config,
            watchers: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
            rejected_ids: Mutex::new(HashSet::new()),
        }
    }

    /// Replace the whole contents
    pub fn seed(&self, snapshot: RemoteSnapshot) {
        *self.state.lock() = MemoryState {
            accounts: snapshot.accounts,
            guest_orders: snapshot.guest_orders,
            settings: snapshot.settings,
            prize_catalog: snapshot.prize_catalog,
        };
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> RemoteSnapshot {
        let state = self.state.lock();
        RemoteSnapshot {
            accounts: state.accounts.clone(),
            guest_orders: state.guest_orders.clone(),
            settings: state.settings.clone(),
            prize_catalog: state.prize_catalog.clone(),
        }
    }

    /// Live account by email
    pub fn account(&self, email: &str) -> Option<Account> {
        let state = self.state.lock();
        state.position_by_email(email).and_then(|i| state.active(i))
    }

    pub fn record(&self, id: AccountId) -> Option<AccountRecord> {
        self.state.lock().accounts.iter().find(|r| r.id() == id).cloned()
    }

    pub fn guest_order(&self, order_id: &str) -> Option<Order> {
        self.state
            .lock()
            .guest_orders
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
    }

    pub fn set_prize_catalog(&self, catalog: Vec<Prize>) {
        self.state.lock().prize_catalog = Some(catalog);
        self.emit(Collection::Settings, ChangeKind::Update);
    }

    /// Make every call fail as if the store were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reject any write touching this account id
    pub fn reject_writes_for(&self, id: AccountId) {
        self.rejected_ids.lock().insert(id);
    }

    /// Announce a change, as another client's write would
    pub fn emit(&self, collection: Collection, kind: ChangeKind) {
        let event = ChangeEvent { collection, kind };
        self.watchers.lock().retain(|(watched, tx)| {
            if *watched == collection {
                tx.unbounded_send(event).is_ok()
            } else {
                !tx.is_closed()
            }
        });
    }

    fn ensure_online(&self) -> RepoResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DomainError::RemoteError("remote store unreachable".to_string()));
        }
        Ok(())
    }

    fn ensure_writable(&self, id: AccountId) -> RepoResult<()> {
        if self.rejected_ids.lock().contains(&id) {
            return Err(DomainError::RemoteError(format!("write rejected for account {id}")));
        }
        Ok(())
    }

    /// Load, settle and store one account under the state lock
    fn settle_account<T>(
        &self,
        email: &str,
        settle: impl FnOnce(&mut Account) -> Result<T, DomainError>,
    ) -> RepoResult<(T, Account)> {
        self.ensure_online()?;
        let result = {
            let mut state = self.state.lock();
            let index = state
                .position_by_email(email)
                .ok_or_else(|| DomainError::AccountNotFound(email.to_string()))?;
            let mut account = state
                .active(index)
                .ok_or_else(|| DomainError::AccountNotFound(email.to_string()))?;
            self.ensure_writable(account.id)?;

            let value = settle(&mut account)?;
            state.accounts[index] = AccountRecord::Active(account.clone());
            (value, account)
        };
        self.emit(Collection::Accounts, ChangeKind::Update);
        Ok(result)
    }

    fn settle_order(&self, order_id: &str, approve: bool) -> RepoResult<Collection> {
        self.ensure_online()?;
        let mut state = self.state.lock();

        if let Some(owner_index) = state.position(|a| a.order(order_id).is_some()) {
            let mut owner = state
                .active(owner_index)
                .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))?;
            self.ensure_writable(owner.id)?;

            if !approve {
                settlement::reject_owned_order(&mut owner, order_id)?;
                state.accounts[owner_index] = AccountRecord::Active(owner);
                return Ok(Collection::Accounts);
            }

            let approved_subtotal = settlement::approve_owned_order(&mut owner, order_id)?;
            let referrer_index = match (approved_subtotal, owner.referred_by.as_deref()) {
                (Some(_), Some(code)) if !code.trim().is_empty() => {
                    let code = code.trim();
                    let owner_id = owner.id;
                    state.position(|a| a.id != owner_id && a.referral_code.trim().eq_ignore_ascii_case(code))
                }
                _ => None,
            };
            state.accounts[owner_index] = AccountRecord::Active(owner);

            if let (Some(subtotal), Some(index)) = (approved_subtotal, referrer_index) {
                if let AccountRecord::Active(referrer) = &mut state.accounts[index] {
                    settlement::pay_referrer(referrer, subtotal);
                }
            }
            return Ok(Collection::Accounts);
        }

        let order = state
            .guest_orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))?;
        let mut settled = order.clone();
        if approve {
            settlement::approve_order_record(&mut settled)?;
        } else {
            settlement::reject_order_record(&mut settled)?;
        }
        *order = settled;
        Ok(Collection::Orders)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_accounts(&self) -> RepoResult<Vec<AccountRecord>> {
        self.ensure_online()?;
        Ok(self.state.lock().accounts.clone())
    }

    async fn fetch_guest_orders(&self) -> RepoResult<Vec<Order>> {
        self.ensure_online()?;
        Ok(self.state.lock().guest_orders.clone())
    }

    async fn fetch_settings(&self) -> RepoResult<Option<Settings>> {
        self.ensure_online()?;
        Ok(self.state.lock().settings.clone())
    }

    async fn fetch_prize_catalog(&self) -> RepoResult<Option<Vec<Prize>>> {
        self.ensure_online()?;
        Ok(self.state.lock().prize_catalog.clone())
    }

    async fn upsert_accounts(&self, accounts: &[Account]) -> RepoResult<()> {
        self.ensure_online()?;
        for account in accounts {
            self.ensure_writable(account.id)?;
        }

        {
            let mut state = self.state.lock();
            for account in accounts {
                match state.accounts.iter_mut().find(|r| r.id() == account.id) {
                    Some(AccountRecord::Deleted(_)) => {}
                    Some(record) => *record = AccountRecord::Active(account.clone()),
                    None => state.accounts.push(AccountRecord::Active(account.clone())),
                }
            }
        }
        self.emit(Collection::Accounts, ChangeKind::Update);
        Ok(())
    }

    async fn upsert_tombstone(&self, tombstone: &Tombstone) -> RepoResult<()> {
        self.ensure_online()?;
        self.ensure_writable(tombstone.id)?;

        {
            let mut state = self.state.lock();
            let record = AccountRecord::Deleted(tombstone.clone());
            match state.accounts.iter_mut().find(|r| r.id() == tombstone.id) {
                Some(AccountRecord::Deleted(_)) => {}
                Some(existing) => *existing = record,
                None => state.accounts.push(record),
            }
        }
        self.emit(Collection::Accounts, ChangeKind::Update);
        Ok(())
    }

    async fn upsert_guest_orders(&self, orders: &[Order]) -> RepoResult<()> {
        self.ensure_online()?;
        {
            let mut state = self.state.lock();
            for order in orders {
                match state.guest_orders.iter_mut().find(|o| o.id == order.id) {
                    Some(existing) => *existing = order.clone(),
                    None => state.guest_orders.push(order.clone()),
                }
            }
        }
        self.emit(Collection::Orders, ChangeKind::Update);
        Ok(())
    }

    async fn upsert_settings(&self, settings: &Settings) -> RepoResult<()> {
        self.ensure_online()?;
        self.state.lock().settings = Some(settings.clone());
        self.emit(Collection::Settings, ChangeKind::Update);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> RepoResult<()> {
        self.ensure_online()?;
        {
            let mut state = self.state.lock();
            match collection {
                Collection::Accounts => state.accounts.retain(|r| r.id().to_string() != id),
                Collection::Orders => state.guest_orders.retain(|o| o.id != id),
                Collection::Settings if id == STORE_SETTINGS_KEY => state.settings = None,
                Collection::Settings if id == PRIZE_CATALOG_KEY => state.prize_catalog = None,
                Collection::Settings | Collection::Votes | Collection::Surveys => {}
            }
        }
        self.emit(collection, ChangeKind::Delete);
        Ok(())
    }
}

#[async_trait]
impl LedgerProcedures for MemoryRemoteStore {
    async fn register_account(&self, account: &Account) -> RepoResult<Account> {
        self.ensure_online()?;
        let created = {
            let mut state = self.state.lock();
            if state.position_by_email(&account.email).is_some() {
                return Err(DomainError::EmailAlreadyExists);
            }
            let phone_key = account.phone_key();
            if !phone_key.is_empty() && state.position(|a| a.phone_key() == phone_key).is_some() {
                return Err(DomainError::PhoneAlreadyExists);
            }

            let mut created = account.clone();
            settlement::open_account(&mut created, self.config.welcome_bonus_usd);
            state.accounts.push(AccountRecord::Active(created.clone()));
            created
        };
        self.emit(Collection::Accounts, ChangeKind::Insert);
        Ok(created)
    }

    async fn process_order(&self, email: &str, order: &Order) -> RepoResult<ProcessedOrder> {
        let policy = &self.config.reward_policy;
        let (processed, _) =
            self.settle_account(email, |account| settlement::record_order(account, order, policy, Utc::now()))?;
        Ok(processed)
    }

    async fn approve_order(&self, order_id: &str) -> RepoResult<()> {
        let collection = self.settle_order(order_id, true)?;
        self.emit(collection, ChangeKind::Update);
        Ok(())
    }

    async fn reject_order(&self, order_id: &str) -> RepoResult<()> {
        let collection = self.settle_order(order_id, false)?;
        self.emit(collection, ChangeKind::Update);
        Ok(())
    }

    async fn debit_wallet(&self, email: &str, amount: f64) -> RepoResult<f64> {
        let ((), account) = self.settle_account(email, |account| account.debit_wallet(amount))?;
        Ok(account.wallet_balance)
    }

    async fn award_prize(&self, email: &str, prize: &Prize, at: DateTime<Utc>) -> RepoResult<Account> {
        let cooldown_days = self.config.prize_cooldown_days;
        let ((), account) = self.settle_account(email, |account| {
            settlement::apply_prize(account, prize, at, cooldown_days)
        })?;
        Ok(account)
    }
}

#[async_trait]
impl ChangeFeed for MemoryRemoteStore {
    async fn subscribe(&self, collection: Collection) -> RepoResult<ChangeStream> {
        self.ensure_online()?;
        let (tx, rx) = mpsc::unbounded();
        self.watchers.lock().push((collection, tx));
        Ok(rx)
    }
}
