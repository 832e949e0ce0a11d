use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{OrderId, OrderStatus, ProductCategory, ProductId, Role, Unit, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_type: Role,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub user_type: Role,
}

/// Seller identity as embedded in product and order payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerRef {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ProductCategory,
    pub price: f64,
    pub unit: Unit,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<ProducerRef>,
    pub created_at: DateTime<Utc>,
}

/// Fields a producer submits when listing a new product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: ProductCategory,
    pub quantity: u32,
    pub price: f64,
    pub unit: Unit,
}

/// Point-in-time copy of product data captured when the order is placed.
/// `quantity` is a display label such as "5 kg", never re-derived from the
/// live product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub product: ProductId,
    pub product_details: ProductSnapshot,
    pub consumer: UserId,
    pub producer: UserId,
    /// Buyer display name, populated on the producer-facing listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub product_id: ProductId,
    pub product_details: ProductSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceOrderRequest {
    pub status: OrderStatus,
}
