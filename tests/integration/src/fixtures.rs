//! Test fixtures and data generators
//!
//! Provides reusable accounts, orders, carts and catalogs.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, Utc};
use loyalty_core::{Account, Delivery, DeliveryMethod, LineItem, Order, OrderStatus, Prize, PrizeKind, Role};
use loyalty_service::dto::{CheckoutItem, CheckoutRequest, RegisterAccountRequest};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Password that passes the strength check
pub const PASSWORD: &str = "papelon2024";

/// Account builder
#[derive(Debug, Clone)]
pub struct AccountFixture {
    account: Account,
}

impl AccountFixture {
    pub fn customer(email: &str) -> Self {
        Self {
            account: Account::new(email, "", "Cliente"),
        }
    }

    /// Customer with a unique email and phone
    pub fn unique() -> Self {
        let suffix = unique_suffix();
        Self::customer(&format!("client{suffix}@example.com")).phone(&format!("0414{suffix:07}"))
    }

    pub fn phone(mut self, phone: &str) -> Self {
        self.account.phone = phone.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.account.name = name.to_string();
        self
    }

    pub fn wallet(mut self, balance: f64) -> Self {
        self.account.wallet_balance = balance;
        self
    }

    pub fn points(mut self, points: i64) -> Self {
        self.account.points = points;
        self
    }

    pub fn admin(mut self) -> Self {
        self.account.role = Role::Admin;
        self
    }

    pub fn referral_code(mut self, code: &str) -> Self {
        self.account.referral_code = code.to_string();
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.account.orders.push(order);
        self
    }

    pub fn build(self) -> Account {
        self.account
    }
}

/// Registration request with a unique email and phone
pub fn register_request() -> RegisterAccountRequest {
    let suffix = unique_suffix();
    RegisterAccountRequest {
        email: format!("new{suffix}@example.com"),
        phone: format!("0412{suffix:07}"),
        name: "María".to_string(),
        last_name: "Pérez".to_string(),
        birth_date: None,
        password: PASSWORD.to_string(),
        referred_by: None,
    }
}

/// Cart of four $5 items ($20 subtotal), paid partly from the wallet
pub fn cart(wallet_amount: f64) -> CheckoutRequest {
    CheckoutRequest {
        items: vec![CheckoutItem {
            name: "Pastelitos".to_string(),
            quantity: 4,
            unit_price_usd: 5.0,
            options: Vec::new(),
        }],
        delivery: DeliveryMethod::Pickup,
        payment_method: "pago movil".to_string(),
        wallet_amount_usd: wallet_amount,
    }
}

/// Order created `minutes` ago with the given status
pub fn order_aged(minutes: i64, status: OrderStatus) -> Order {
    let mut order = Order::new(vec![LineItem::new("Cachapa", 1, 6.0)], Delivery::pickup(), "cash");
    order.created_at = Utc::now() - Duration::minutes(minutes);
    order.status = status;
    order
}

/// Two equally weighted entries: nothing, then 10 points
pub fn half_and_half_catalog() -> Vec<Prize> {
    vec![
        Prize::new("nothing", "Nothing this time", PrizeKind::Nothing, 0.0, 50.0),
        Prize::new("points-10", "10 points", PrizeKind::Points, 10.0, 50.0),
    ]
}
