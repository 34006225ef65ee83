//! Weighted prize draw and its eligibility rules

use chrono::{DateTime, Duration, Utc};

use crate::entities::{Account, Prize};
use crate::error::DomainError;

/// Why an account may not draw right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRejected {
    /// Admin accounts never take part
    Admin,
    /// The previous draw is too recent
    Cooldown { next_eligible_at: DateTime<Utc> },
}

impl From<DrawRejected> for DomainError {
    fn from(rejected: DrawRejected) -> Self {
        match rejected {
            DrawRejected::Admin => DomainError::AdminCannotDraw,
            DrawRejected::Cooldown { next_eligible_at } => {
                DomainError::DrawCooldown { next_eligible_at }
            }
        }
    }
}

/// Pick a prize for a uniform sample `r` in `[0, 1)`.
///
/// `r` is scaled to the 0-100 weight range and the first entry whose
/// cumulative weight reaches it wins. Weights that sum to less than 100 fall
/// through to the last entry.
pub fn draw_prize(catalog: &[Prize], r: f64) -> Result<&Prize, DomainError> {
    let last = catalog.last().ok_or(DomainError::EmptyPrizeCatalog)?;
    let scaled = r * 100.0;

    let mut cumulative = 0.0;
    for prize in catalog {
        cumulative += prize.weight;
        if cumulative >= scaled {
            return Ok(prize);
        }
    }

    Ok(last)
}

/// Earliest moment a new draw is allowed, if a cooldown applies
pub fn next_draw_at(last_draw_at: Option<DateTime<Utc>>, cooldown_days: i64) -> Option<DateTime<Utc>> {
    last_draw_at.map(|last| last + Duration::days(cooldown_days))
}

/// True when there was no previous draw or the cooldown has elapsed
pub fn can_draw(last_draw_at: Option<DateTime<Utc>>, cooldown_days: i64, now: DateTime<Utc>) -> bool {
    match next_draw_at(last_draw_at, cooldown_days) {
        None => true,
        Some(next) => now >= next,
    }
}

/// Admins are rejected before the cooldown is looked at
pub fn check_draw_eligibility(
    account: &Account,
    cooldown_days: i64,
    now: DateTime<Utc>,
) -> Result<(), DrawRejected> {
    if account.is_admin() {
        return Err(DrawRejected::Admin);
    }

    match next_draw_at(account.last_draw_at, cooldown_days) {
        Some(next_eligible_at) if now < next_eligible_at => {
            Err(DrawRejected::Cooldown { next_eligible_at })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{PrizeKind, Role};

    fn coin_flip() -> Vec<Prize> {
        vec![
            Prize::new("none", "Nothing", PrizeKind::Nothing, 0.0, 50.0),
            Prize::new("points-10", "10 points", PrizeKind::Points, 10.0, 50.0),
        ]
    }

    #[test]
    fn test_draw_walks_cumulative_weights() {
        let catalog = coin_flip();
        assert_eq!(draw_prize(&catalog, 0.49).unwrap().id, "none");
        assert_eq!(draw_prize(&catalog, 0.51).unwrap().id, "points-10");
        assert_eq!(draw_prize(&catalog, 0.0).unwrap().id, "none");
    }

    #[test]
    fn test_draw_falls_back_to_last_entry() {
        let catalog = vec![
            Prize::new("a", "A", PrizeKind::Nothing, 0.0, 30.0),
            Prize::new("b", "B", PrizeKind::Cashback, 1.0, 30.0),
        ];
        assert_eq!(draw_prize(&catalog, 0.99).unwrap().id, "b");
    }

    #[test]
    fn test_empty_catalog_is_an_error() {
        let err = draw_prize(&[], 0.3).unwrap_err();
        assert!(matches!(err, DomainError::EmptyPrizeCatalog));
    }

    #[test]
    fn test_can_draw() {
        let now = Utc::now();
        assert!(can_draw(None, 7, now));
        assert!(!can_draw(Some(now - Duration::days(6)), 7, now));
        assert!(can_draw(Some(now - Duration::days(7)), 7, now));
    }

    #[test]
    fn test_admin_rejected_before_cooldown() {
        let now = Utc::now();
        let mut account = Account::new("a@b.com", "", "Ana");
        account.role = Role::Admin;
        account.last_draw_at = Some(now);
        assert_eq!(check_draw_eligibility(&account, 7, now), Err(DrawRejected::Admin));
    }

    #[test]
    fn test_cooldown_reports_next_eligible_time() {
        let now = Utc::now();
        let last = now - Duration::days(2);
        let mut account = Account::new("a@b.com", "", "Ana");
        account.last_draw_at = Some(last);

        let rejected = check_draw_eligibility(&account, 7, now).unwrap_err();
        assert_eq!(
            rejected,
            DrawRejected::Cooldown {
                next_eligible_at: last + Duration::days(7)
            }
        );
        assert!(matches!(DomainError::from(rejected), DomainError::DrawCooldown { .. }));
    }
}
