//! Value objects - immutable domain primitives

mod account_id;
mod phone;
mod referral;

pub use account_id::AccountId;
pub use phone::{normalize_email, normalize_phone, PhoneKey};
pub use referral::generate_referral_code;
