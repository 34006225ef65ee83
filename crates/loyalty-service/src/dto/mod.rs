//! Data transfer objects for service requests and reports
//!
//! - Request DTOs with `validator` rules for caller input
//! - Report DTOs summarizing what an operation did

pub mod requests;
pub mod responses;

pub use requests::{
    CheckoutItem, CheckoutRequest, GuestCheckoutRequest, LoginRequest, RegisterAccountRequest,
    MIN_PHONE_DIGITS,
};
pub use responses::{CheckoutReceipt, DrawOutcome, PullReport, PushReport, UnifyReport};
