//! Ledger math - tiers, rewards, referral bonuses, settlement and the prize draw
//!
//! Reward functions are predictions for immediate display and are NOT
//! authoritative: money only moves through
//! [`LedgerProcedures`](crate::traits::LedgerProcedures), whose
//! implementations run the [`settlement`] functions against stored state.

mod draw;
mod reward;
pub mod settlement;

pub use draw::{can_draw, check_draw_eligibility, draw_prize, next_draw_at, DrawRejected};
pub use reward::{
    compute_referrer_bonus, compute_reward, predict_reward, referrer_bonus_for,
    reward_multiplier, tier_for_spending, tier_rate, RewardPolicy, FOUNDER_MULTIPLIER,
    REFERRAL_RATE,
};
