//! Prize catalog entries for the prize-draw lottery

use serde::{Deserialize, Serialize};

/// What a prize gives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeKind {
    /// Legacy loyalty points
    Points,
    /// USD credited to the wallet
    Cashback,
    /// Nothing won
    Nothing,
}

/// Prize catalog entry
///
/// `weight` is a selection probability on a 0–100 scale. Catalog order is
/// significant: the draw walks entries in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prize {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: PrizeKind,
    pub value: f64,
    #[serde(rename = "probability")]
    pub weight: f64,
}

impl Prize {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: PrizeKind, value: f64, weight: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            value,
            weight,
        }
    }

    #[inline]
    pub fn is_win(&self) -> bool {
        self.kind != PrizeKind::Nothing && self.value > 0.0
    }
}

/// Catalog used until the remote store provides one
pub fn default_prize_catalog() -> Vec<Prize> {
    vec![
        Prize::new("none", "Better luck next time", PrizeKind::Nothing, 0.0, 40.0),
        Prize::new("points-10", "10 points", PrizeKind::Points, 10.0, 25.0),
        Prize::new("points-50", "50 points", PrizeKind::Points, 50.0, 15.0),
        Prize::new("cashback-1", "$1 cashback", PrizeKind::Cashback, 1.0, 15.0),
        Prize::new("cashback-5", "$5 cashback", PrizeKind::Cashback, 5.0, 5.0),
    ]
}
