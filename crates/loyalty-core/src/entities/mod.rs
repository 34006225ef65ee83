//! Domain entities - core business objects

mod account;
mod order;
mod prize;
mod settings;
mod snapshot;
mod tombstone;

pub use account::{Account, Role, Tier};
pub use order::{
    Delivery, DeliveryMethod, GuestContact, LineItem, Order, OrderStatus, PaymentStatus,
};
pub use prize::{default_prize_catalog, Prize, PrizeKind};
pub use settings::Settings;
pub use snapshot::{RemoteSnapshot, Snapshot};
pub use tombstone::{AccountRecord, Tombstone};
