use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Channels with less stock than this trigger a low-stock warning alert.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Error,
    Pending,
}

/// One flattened product variant observed in a single store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantRecord {
    pub store: String,
    pub product_id: i64,
    pub product_title: String,
    pub variant_id: i64,
    pub variant_title: String,
    pub sku: String,
    pub inventory_item_id: i64,
    pub price: Option<String>,
    /// Aggregate quantity from the product listing, used when no
    /// per-location breakdown is available.
    pub total_quantity: i64,
    pub levels: Vec<LocationQuantity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationQuantity {
    pub location_id: i64,
    pub location_name: String,
    pub quantity: i64,
}

/// One (store, location) observation of stock for a SKU.
///
/// Carries the owning store's inventory item handle so corrective writes
/// can be routed back to the store the observation came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub store: String,
    pub inventory_item_id: i64,
    pub location_id: i64,
    pub location_name: String,
    pub quantity: i64,
    pub last_sync: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub sync_latency_ms: Option<u64>,
}

/// The unified, SKU-keyed view merging all channels.
///
/// Invariant: every channel in `channels` shares this SKU and must
/// eventually converge to the same quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub sku: String,
    pub product_title: String,
    pub variant_title: String,
    /// Inventory item handle of the canonical reference store.
    pub inventory_item_id: i64,
    pub channels: Vec<Channel>,
}

/// An ephemeral corrective instruction computed during reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncUpdate {
    pub sku: String,
    pub store: String,
    pub inventory_item_id: i64,
    pub location_id: i64,
    pub quantity_delta: i64,
    pub target_quantity: i64,
}

/// Derived per-cycle health figures; recomputed on every fetch, never
/// independently mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    pub total_syncs: usize,
    pub success_rate: f64,
    pub avg_latency_ms: u64,
    pub active_syncs: usize,
    pub error_count: usize,
    pub uptime_percent: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Error,
    Warning,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub level: AlertLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(level: AlertLevel, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Response of `get_all_inventory`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryReport {
    pub inventory: Vec<InventoryItem>,
    pub metrics: Metrics,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkuSyncStatus {
    Synced,
    Partial,
    Failed,
    NotFound,
}

/// Outcome of one corrective mutation against one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSyncResult {
    pub store: String,
    pub location_id: i64,
    pub target_quantity: i64,
    pub quantity_delta: i64,
    pub new_quantity: Option<i64>,
    pub success: bool,
    pub error: Option<String>,
    pub latency_ms: u64,
}

/// Response of `sync_sku`. Partial failure is explicit: `success` is
/// only true when every issued mutation succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkuSyncReport {
    pub sku: String,
    pub success: bool,
    pub status: SkuSyncStatus,
    pub message: String,
    pub updated_channels: usize,
    pub channels: Vec<ChannelSyncResult>,
}

/// Response of `bulk_sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSyncReport {
    pub success: bool,
    pub total_items: usize,
    pub out_of_sync_items: usize,
    pub updates_attempted: usize,
    pub updates_succeeded: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatus {
    pub name: String,
    pub domain: String,
    pub success: bool,
    pub shop_name: Option<String>,
    pub error: Option<String>,
}

/// Response of `get_store_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreInfoReport {
    pub stores: Vec<StoreStatus>,
    pub active_stores: usize,
    pub total_stores: usize,
}

/// A variant without a usable SKU cannot be matched across stores and is
/// excluded from reconciliation.
pub fn is_real_sku(sku: &str) -> bool {
    let trimmed = sku.trim();
    if trimmed.is_empty() {
        return false;
    }
    !matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "n/a" | "none" | "null" | "-"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_skus_are_rejected() {
        assert!(!is_real_sku(""));
        assert!(!is_real_sku("   "));
        assert!(!is_real_sku("N/A"));
        assert!(!is_real_sku("none"));
        assert!(!is_real_sku("NULL"));
        assert!(!is_real_sku("-"));
    }

    #[test]
    fn real_skus_are_accepted() {
        assert!(is_real_sku("WIDGET-1"));
        assert!(is_real_sku(" sku-7 "));
        assert!(is_real_sku("0"));
    }
}
