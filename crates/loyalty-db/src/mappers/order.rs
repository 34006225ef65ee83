//! Guest order <-> model mapper

use loyalty_core::Order;

use crate::models::OrderModel;

impl TryFrom<OrderModel> for Order {
    type Error = serde_json::Error;

    fn try_from(model: OrderModel) -> Result<Self, Self::Error> {
        serde_json::from_value(model.doc.0)
    }
}

/// Column values for an orders upsert
#[derive(Debug, Clone)]
pub struct OrderWrite {
    pub id: String,
    pub doc: serde_json::Value,
}

impl OrderWrite {
    pub fn new(order: &Order) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: order.id.clone(),
            doc: serde_json::to_value(order)?,
        })
    }
}
