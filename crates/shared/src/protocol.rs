use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{OrderId, OrderStatus, SortKey};

/// The nine free-text fields of an order, keyed by the backend's snake-case names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFields {
    #[serde(deserialize_with = "lenient_text")]
    pub customer_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub contact_number: String,
    #[serde(deserialize_with = "lenient_text")]
    pub address: String,
    #[serde(deserialize_with = "lenient_text")]
    pub pickup_place: String,
    #[serde(deserialize_with = "lenient_text")]
    pub pickup_date: String,
    #[serde(deserialize_with = "lenient_text")]
    pub delicacy: String,
    #[serde(deserialize_with = "lenient_text")]
    pub quantity: String,
    #[serde(deserialize_with = "lenient_text")]
    pub container: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub special_request: String,
}

impl OrderFields {
    /// Field values in table column order (columns 0 through 8).
    pub fn to_cells(&self) -> [&str; 9] {
        [
            &self.customer_name,
            &self.contact_number,
            &self.address,
            &self.pickup_place,
            &self.pickup_date,
            &self.delicacy,
            &self.quantity,
            &self.container,
            &self.special_request,
        ]
    }
}

/// Client-visible projection of a server-owned order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    #[serde(flatten)]
    pub fields: OrderFields,
    pub status: OrderStatus,
}

pub type CreateOrderRequest = OrderFields;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(flatten)]
    pub fields: OrderFields,
    pub status: OrderStatus,
}

/// `{success: bool}` acknowledgment shared by create, update and soft remove.
/// The update route also echoes the stored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<UpdateOrderRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            order: None,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            order: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    pub sort_by: SortKey,
}

/// Backends render quantities as numbers and optional fields as null; the
/// client treats every field as display text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    })
}
