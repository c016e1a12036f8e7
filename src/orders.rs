//! Thin pass-through order listing and report aggregation.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SyncError;
use crate::model::{InventoryItem, LOW_STOCK_THRESHOLD};
use crate::platform::model::Order;
use crate::platform::StoreApi;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub total: f64,
    pub fulfillment_status: String,
    pub payment_status: String,
    pub item_count: i64,
    pub line_items: Vec<LineItemSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemSummary {
    pub title: String,
    pub quantity: i64,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub total_sales: f64,
    pub total_orders: usize,
    pub average_order_value: f64,
    pub top_selling_products: Vec<ProductSales>,
    pub items_needing_restock: Vec<RestockItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSales {
    pub title: String,
    pub sales: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestockItem {
    pub title: String,
    pub sku: String,
    pub current_stock: i64,
}

pub async fn fetch_orders(
    api: &dyn StoreApi,
    limit: u32,
) -> Result<Vec<OrderSummary>, SyncError> {
    let call = api.orders(limit).await;
    call.outcome.map(summarize_orders)
}

pub fn summarize_orders(orders: Vec<Order>) -> Vec<OrderSummary> {
    orders.into_iter().map(summarize_order).collect()
}

fn summarize_order(order: Order) -> OrderSummary {
    let customer_name = order
        .customer
        .as_ref()
        .map(|c| {
            format!(
                "{} {}",
                c.first_name.as_deref().unwrap_or(""),
                c.last_name.as_deref().unwrap_or("")
            )
            .trim()
            .to_string()
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Guest Customer".to_string());

    OrderSummary {
        id: order.id,
        order_number: order.name.clone(),
        customer_name,
        customer_email: order.email.clone().unwrap_or_else(|| "N/A".to_string()),
        created_at: order.created_at,
        total: order
            .total_price
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
            .unwrap_or(0.0),
        fulfillment_status: order
            .fulfillment_status
            .clone()
            .unwrap_or_else(|| "unfulfilled".to_string()),
        payment_status: order
            .financial_status
            .clone()
            .unwrap_or_else(|| "pending".to_string()),
        item_count: order.line_items.iter().map(|l| l.quantity).sum(),
        line_items: order
            .line_items
            .into_iter()
            .map(|l| LineItemSummary {
                title: l.title,
                quantity: l.quantity,
                sku: l.sku,
            })
            .collect(),
    }
}

/// Pure aggregation of order history plus the current unified inventory
/// into the dashboard's report figures.
pub fn performance_metrics(orders: &[OrderSummary], items: &[InventoryItem]) -> ReportMetrics {
    let total_orders = orders.len();
    let total_sales: f64 = orders.iter().map(|o| o.total).sum();
    let average_order_value = if total_orders == 0 {
        0.0
    } else {
        total_sales / total_orders as f64
    };

    let mut sales_by_title: HashMap<&str, i64> = HashMap::new();
    for order in orders {
        for line in &order.line_items {
            *sales_by_title.entry(line.title.as_str()).or_insert(0) += line.quantity;
        }
    }
    let mut top_selling_products: Vec<ProductSales> = sales_by_title
        .into_iter()
        .map(|(title, sales)| ProductSales {
            title: title.to_string(),
            sales,
        })
        .collect();
    top_selling_products.sort_by(|a, b| b.sales.cmp(&a.sales).then(a.title.cmp(&b.title)));
    top_selling_products.truncate(5);

    let items_needing_restock: Vec<RestockItem> = items
        .iter()
        .filter_map(|item| {
            let min = item.channels.iter().map(|c| c.quantity).min()?;
            (min < LOW_STOCK_THRESHOLD).then(|| RestockItem {
                title: item.product_title.clone(),
                sku: item.sku.clone(),
                current_stock: min,
            })
        })
        .collect();

    ReportMetrics {
        total_sales,
        total_orders,
        average_order_value,
        top_selling_products,
        items_needing_restock,
    }
}
