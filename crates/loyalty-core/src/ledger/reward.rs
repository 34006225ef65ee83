//! Reward prediction

use chrono::{DateTime, Duration, Utc};

use crate::entities::{Account, Tier};

/// Share of a referred customer's subtotal paid to the referrer
pub const REFERRAL_RATE: f64 = 0.05;

/// Multiplier granted inside the founder window
pub const FOUNDER_MULTIPLIER: f64 = 3.0;

/// Lifetime spending needed for Silver
const SILVER_THRESHOLD_USD: f64 = 150.0;

/// Lifetime spending needed for Gold
const GOLD_THRESHOLD_USD: f64 = 500.0;

/// Promotion parameters that feed the reward multiplier
#[derive(Debug, Clone, PartialEq)]
pub struct RewardPolicy {
    /// Referral code that unlocks the founder multiplier
    pub founder_code: String,
    /// Days after registration the founder multiplier stays active
    pub founder_window_days: i64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            founder_code: "FOUNDER".to_string(),
            founder_window_days: 30,
        }
    }
}

/// Reward fraction earned at each tier
pub fn tier_rate(tier: Tier) -> f64 {
    match tier {
        Tier::Bronze => 0.05,
        Tier::Silver => 0.07,
        Tier::Gold => 0.10,
    }
}

/// Tier earned by a lifetime spending total
pub fn tier_for_spending(lifetime_spent: f64) -> Tier {
    if lifetime_spent >= GOLD_THRESHOLD_USD {
        Tier::Gold
    } else if lifetime_spent >= SILVER_THRESHOLD_USD {
        Tier::Silver
    } else {
        Tier::Bronze
    }
}

/// `subtotal * tier_rate(tier) * multiplier`
pub fn compute_reward(subtotal_usd: f64, tier: Tier, multiplier: f64) -> f64 {
    subtotal_usd * tier_rate(tier) * multiplier
}

/// Multiplier for the account's next purchase.
///
/// Founder-referred accounts get [`FOUNDER_MULTIPLIER`] while inside the
/// window; otherwise a one-shot promotional multiplier applies if set;
/// otherwise 1.
pub fn reward_multiplier(account: &Account, policy: &RewardPolicy, now: DateTime<Utc>) -> f64 {
    let founder_referred = account
        .referred_by
        .as_deref()
        .is_some_and(|code| code.trim().eq_ignore_ascii_case(&policy.founder_code));

    if founder_referred && now - account.created_at < Duration::days(policy.founder_window_days) {
        return FOUNDER_MULTIPLIER;
    }

    account
        .next_purchase_multiplier
        .filter(|m| *m > 0.0)
        .unwrap_or(1.0)
}

/// Predicted reward for a purchase. Admins always earn zero.
pub fn predict_reward(
    account: &Account,
    subtotal_usd: f64,
    policy: &RewardPolicy,
    now: DateTime<Utc>,
) -> f64 {
    if account.is_admin() {
        return 0.0;
    }
    compute_reward(subtotal_usd, account.tier, reward_multiplier(account, policy, now))
}

/// Bonus paid to whoever referred the buyer
pub fn compute_referrer_bonus(subtotal_usd: f64) -> f64 {
    subtotal_usd * REFERRAL_RATE
}

/// Referrer bonus for a concrete referrer; admins are never paid
pub fn referrer_bonus_for(referrer: &Account, subtotal_usd: f64) -> f64 {
    if referrer.is_admin() {
        0.0
    } else {
        compute_referrer_bonus(subtotal_usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Role;

    fn customer(created_days_ago: i64, referred_by: Option<&str>) -> Account {
        let mut account = Account::new("c@example.com", "04121234567", "Carla");
        account.created_at = Utc::now() - Duration::days(created_days_ago);
        account.referred_by = referred_by.map(str::to_string);
        account
    }

    #[test]
    fn test_unit_multiplier_is_plain_rate() {
        for tier in [Tier::Bronze, Tier::Silver, Tier::Gold] {
            for subtotal in [0.0, 1.0, 12.5, 99.99, 1000.0] {
                assert_eq!(compute_reward(subtotal, tier, 1.0), subtotal * tier_rate(tier));
            }
        }
    }

    #[test]
    fn test_admin_never_earns() {
        let mut admin = customer(1, Some("FOUNDER"));
        admin.role = Role::Admin;
        admin.tier = Tier::Gold;
        admin.next_purchase_multiplier = Some(5.0);
        assert_eq!(predict_reward(&admin, 250.0, &RewardPolicy::default(), Utc::now()), 0.0);
    }

    #[test]
    fn test_founder_window_triples_reward() {
        let policy = RewardPolicy::default();
        let now = Utc::now();
        let day5 = customer(5, Some("FOUNDER"));
        let day31 = customer(31, Some("FOUNDER"));

        let early = predict_reward(&day5, 40.0, &policy, now);
        let late = predict_reward(&day31, 40.0, &policy, now);
        assert_eq!(early, 3.0 * late);
    }

    #[test]
    fn test_founder_code_is_case_insensitive() {
        let account = customer(2, Some(" founder "));
        assert_eq!(
            reward_multiplier(&account, &RewardPolicy::default(), Utc::now()),
            FOUNDER_MULTIPLIER
        );
    }

    #[test]
    fn test_one_shot_multiplier_outside_window() {
        let mut account = customer(60, Some("FOUNDER"));
        account.next_purchase_multiplier = Some(2.0);
        assert_eq!(reward_multiplier(&account, &RewardPolicy::default(), Utc::now()), 2.0);

        account.next_purchase_multiplier = Some(0.0);
        assert_eq!(reward_multiplier(&account, &RewardPolicy::default(), Utc::now()), 1.0);
    }

    #[test]
    fn test_other_referral_codes_get_no_bonus_multiplier() {
        let account = customer(1, Some("FRIEND42"));
        assert_eq!(reward_multiplier(&account, &RewardPolicy::default(), Utc::now()), 1.0);
    }

    #[test]
    fn test_tier_for_spending() {
        assert_eq!(tier_for_spending(0.0), Tier::Bronze);
        assert_eq!(tier_for_spending(149.99), Tier::Bronze);
        assert_eq!(tier_for_spending(150.0), Tier::Silver);
        assert_eq!(tier_for_spending(500.0), Tier::Gold);
    }

    #[test]
    fn test_referrer_bonus() {
        let referrer = customer(100, None);
        assert_eq!(referrer_bonus_for(&referrer, 20.0), 20.0 * REFERRAL_RATE);

        let mut admin = customer(100, None);
        admin.role = Role::Admin;
        assert_eq!(referrer_bonus_for(&admin, 20.0), 0.0);
    }
}
