//! Prize service - the weighted prize draw

use chrono::Utc;
use loyalty_core::ledger::{check_draw_eligibility, draw_prize, next_draw_at, settlement};
use loyalty_core::default_prize_catalog;
use rand::Rng;
use tracing::{debug, info, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use crate::dto::DrawOutcome;

pub struct PrizeService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PrizeService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Draw a prize for the account
    pub async fn draw(&self, email: &str) -> ServiceResult<DrawOutcome> {
        let roll: f64 = rand::thread_rng().gen();
        self.draw_with_roll(email, roll).await
    }

    /// Draw with a given sample in `[0, 1)`.
    ///
    /// Eligibility is checked against the cached account first; `award_prize`
    /// checks it again against the stored one and its result is what counts.
    #[instrument(skip(self))]
    pub async fn draw_with_roll(&self, email: &str, roll: f64) -> ServiceResult<DrawOutcome> {
        let cooldown_days = self.ctx.loyalty().prize_cooldown_days;
        let engine = self.ctx.sync_engine();
        let snapshot = engine.load_local().await?;

        let account = snapshot
            .account(email)
            .ok_or_else(|| ServiceError::not_found("Account", email))?;
        let now = Utc::now();
        check_draw_eligibility(account, cooldown_days, now)?;

        let catalog = if snapshot.prize_catalog.is_empty() {
            default_prize_catalog()
        } else {
            snapshot.prize_catalog.clone()
        };
        let prize = draw_prize(&catalog, roll)?.clone();

        let awarded = self.ctx.procedures().award_prize(email, &prize, now).await?;

        let mirrored = prize.clone();
        let (local, _) = engine
            .update_local(move |snapshot| {
                let Some(account) = snapshot.account_mut(email) else {
                    return Ok(None);
                };
                // Already carries this draw when a pull got here first
                if let Err(e) = settlement::apply_prize(account, &mirrored, now, cooldown_days) {
                    debug!(error = %e, "Prize already mirrored");
                }
                Ok(Some(account.clone()))
            })
            .await?;
        if let Some(account) = local {
            engine.push_records_best_effort(&[account], &[]).await;
        }

        info!(prize = %prize.id, won = prize.is_win(), "Prize drawn");
        Ok(DrawOutcome {
            won: prize.is_win(),
            prize,
            points: awarded.points,
            wallet_balance: awarded.wallet_balance,
            next_eligible_at: next_draw_at(awarded.last_draw_at, cooldown_days),
        })
    }
}
