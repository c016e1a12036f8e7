use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, Debug, Clone)]
pub struct ShopResp {
    pub shop: Shop,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Shop {
    pub name: String,
    pub email: Option<String>,
    pub domain: Option<String>,
    pub currency: Option<String>,
    pub iana_timezone: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProductsResp {
    pub products: Vec<Product>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProductVariant {
    pub id: i64,
    pub title: String,
    pub sku: Option<String>,
    pub inventory_item_id: Option<i64>,
    pub inventory_quantity: Option<i64>,
    pub price: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LocationsResp {
    pub locations: Vec<Location>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct InventoryLevelsResp {
    pub inventory_levels: Vec<InventoryLevel>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct InventoryLevel {
    pub inventory_item_id: i64,
    pub location_id: i64,
    pub available: Option<i64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct OrdersResp {
    pub orders: Vec<Order>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Order {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub total_price: Option<String>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub customer: Option<Customer>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Customer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LineItem {
    pub title: String,
    pub quantity: i64,
    pub sku: Option<String>,
    pub price: Option<String>,
}

/// Top-level GraphQL response envelope. A non-empty `errors` array is a
/// failure even when the HTTP status is 200.
#[derive(Deserialize, Debug, Clone)]
pub struct GraphqlEnvelope {
    pub data: Option<Value>,
    pub errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GraphqlError {
    pub message: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AdjustData {
    #[serde(rename = "inventoryAdjustQuantity")]
    pub inventory_adjust_quantity: Option<AdjustResult>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdjustResult {
    pub inventory_level: Option<AdjustedLevel>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AdjustedLevel {
    pub available: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserError {
    pub field: Option<Value>,
    pub message: String,
}
