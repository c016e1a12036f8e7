use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::SyncError;
use crate::fetch::{fetch_store_snapshot, StoreSnapshot};
use crate::metrics::aggregate;
use crate::model::{
    BulkSyncReport, ChannelSyncResult, InventoryItem, InventoryReport, SkuSyncReport,
    SkuSyncStatus, StoreInfoReport, StoreStatus, SyncUpdate,
};
use crate::orders::{self, OrderSummary, ReportMetrics};
use crate::platform::{normalize_domain, StoreApi, StoreClient};
use crate::unify::build_unified;

/// Mutations per concurrent batch during a bulk pass.
pub const SYNC_BATCH_SIZE: usize = 5;
/// Fixed gap between batches; the only backpressure against the remote
/// API's request-rate ceiling.
pub const SYNC_BATCH_DELAY: Duration = Duration::from_millis(500);

/// One configured store: its display name, normalized domain and API
/// handle. Index 0 in the engine's list is the primary store.
pub struct StoreHandle {
    pub name: String,
    pub domain: String,
    pub api: Arc<dyn StoreApi>,
}

/// Cross-store reconciliation engine.
///
/// Owns the store handles, the recurring background task and the
/// in-flight guard that keeps bulk cycles from overlapping. Credentials
/// are read-only for the lifetime of an instance.
pub struct SyncEngine {
    stores: Vec<StoreHandle>,
    sync_interval: Duration,
    in_flight: AtomicBool,
    background: Mutex<Option<JoinHandle<()>>>,
}

/// Releases the in-flight flag on every exit path of a bulk cycle.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncEngine {
    pub fn new(stores: Vec<StoreHandle>, sync_interval: Duration) -> Self {
        Self {
            stores,
            sync_interval,
            in_flight: AtomicBool::new(false),
            background: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let stores = cfg
            .stores
            .iter()
            .map(|cred| StoreHandle {
                name: cred.name.clone(),
                domain: normalize_domain(&cred.domain),
                api: Arc::new(StoreClient::new(cred, &cfg.app.api_version)) as Arc<dyn StoreApi>,
            })
            .collect();
        Self::new(stores, Duration::from_secs(cfg.app.sync_interval_secs))
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    fn primary_name(&self) -> &str {
        self.stores.first().map(|s| s.name.as_str()).unwrap_or("")
    }

    fn store_api(&self, name: &str) -> Option<&Arc<dyn StoreApi>> {
        self.stores.iter().find(|s| s.name == name).map(|s| &s.api)
    }

    /// Fan out one fetch per store and join; wall-clock latency is
    /// bounded by the slowest store, not the sum.
    async fn snapshots(&self) -> Vec<StoreSnapshot> {
        join_all(
            self.stores
                .iter()
                .map(|store| fetch_store_snapshot(&store.name, store.api.as_ref())),
        )
        .await
    }

    /// Unified inventory, metrics and alerts in one pass. Fetch failures
    /// become alerts; this never fails as a whole.
    pub async fn get_all_inventory(&self) -> InventoryReport {
        let snapshots = self.snapshots().await;
        let inventory = build_unified(&snapshots, self.primary_name());
        let (metrics, alerts) = aggregate(&snapshots, &inventory);
        InventoryReport {
            inventory,
            metrics,
            alerts,
        }
    }

    /// Bring every channel of one SKU to quantity agreement.
    ///
    /// The authoritative quantity is the primary store's channel when
    /// present, otherwise the maximum across channels. Each corrective
    /// delta is routed to the store the diverging channel belongs to.
    pub async fn sync_sku(&self, sku: &str) -> SkuSyncReport {
        let snapshots = self.snapshots().await;
        let items = build_unified(&snapshots, self.primary_name());
        let Some(item) = items.iter().find(|i| i.sku == sku) else {
            return SkuSyncReport {
                sku: sku.to_string(),
                success: false,
                status: SkuSyncStatus::NotFound,
                message: SyncError::NotFound(sku.to_string()).to_string(),
                updated_channels: 0,
                channels: Vec::new(),
            };
        };

        let source = self.source_quantity(item);
        let updates: Vec<SyncUpdate> = item
            .channels
            .iter()
            .filter(|c| c.quantity != source)
            .map(|c| SyncUpdate {
                sku: item.sku.clone(),
                store: c.store.clone(),
                inventory_item_id: c.inventory_item_id,
                location_id: c.location_id,
                quantity_delta: source - c.quantity,
                target_quantity: source,
            })
            .collect();

        if updates.is_empty() {
            return SkuSyncReport {
                sku: sku.to_string(),
                success: true,
                status: SkuSyncStatus::Synced,
                message: format!("all channels of {sku} already agree at {source}"),
                updated_channels: 0,
                channels: Vec::new(),
            };
        }

        let results = join_all(updates.iter().map(|u| self.dispatch_update(u))).await;
        let updated = results.iter().filter(|r| r.success).count();
        let attempted = results.len();
        let (status, success, message) = if updated == attempted {
            (
                SkuSyncStatus::Synced,
                true,
                format!("synchronized {updated} channel(s) of {sku} to {source}"),
            )
        } else if updated > 0 {
            (
                SkuSyncStatus::Partial,
                false,
                SyncError::Partial {
                    succeeded: updated,
                    attempted,
                }
                .to_string(),
            )
        } else {
            (
                SkuSyncStatus::Failed,
                false,
                format!("all {attempted} update(s) for {sku} failed"),
            )
        };

        SkuSyncReport {
            sku: sku.to_string(),
            success,
            status,
            message,
            updated_channels: updated,
            channels: results,
        }
    }

    /// Reconcile every divergent SKU, throttled in fixed batches.
    ///
    /// Only one bulk cycle may be in flight at a time; a call that finds
    /// another cycle running returns immediately without touching the
    /// remote stores.
    pub async fn bulk_sync(&self) -> BulkSyncReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return BulkSyncReport {
                success: false,
                total_items: 0,
                out_of_sync_items: 0,
                updates_attempted: 0,
                updates_succeeded: 0,
                message: "a sync cycle is already in flight".to_string(),
            };
        }
        let _guard = CycleGuard(&self.in_flight);

        let snapshots = self.snapshots().await;
        let items = build_unified(&snapshots, self.primary_name());
        let updates = plan_bulk_updates(&items);
        let total_items = items.len();
        let out_of_sync_items = {
            let mut skus: Vec<&str> = updates.iter().map(|u| u.sku.as_str()).collect();
            skus.dedup();
            skus.len()
        };

        if updates.is_empty() {
            return BulkSyncReport {
                success: true,
                total_items,
                out_of_sync_items: 0,
                updates_attempted: 0,
                updates_succeeded: 0,
                message: format!("all {total_items} items already in sync"),
            };
        }

        let attempted = updates.len();
        let mut succeeded = 0usize;
        for (idx, batch) in updates.chunks(SYNC_BATCH_SIZE).enumerate() {
            let results = join_all(batch.iter().map(|u| self.dispatch_update(u))).await;
            for result in &results {
                if result.success {
                    succeeded += 1;
                } else {
                    warn!(
                        store = %result.store,
                        location_id = result.location_id,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "inventory update failed"
                    );
                }
            }
            if (idx + 1) * SYNC_BATCH_SIZE < attempted {
                tokio::time::sleep(SYNC_BATCH_DELAY).await;
            }
        }

        let success = succeeded == attempted;
        let message = if success {
            format!("applied {succeeded} update(s) across {out_of_sync_items} item(s)")
        } else {
            SyncError::Partial {
                succeeded,
                attempted,
            }
            .to_string()
        };
        BulkSyncReport {
            success,
            total_items,
            out_of_sync_items,
            updates_attempted: attempted,
            updates_succeeded: succeeded,
            message,
        }
    }

    /// Probe every configured store's identity endpoint concurrently.
    pub async fn get_store_info(&self) -> StoreInfoReport {
        let probes = join_all(
            self.stores
                .iter()
                .map(|store| async move { (store, store.api.shop().await) }),
        )
        .await;
        let stores: Vec<StoreStatus> = probes
            .into_iter()
            .map(|(handle, call)| match call.outcome {
                Ok(shop) => StoreStatus {
                    name: handle.name.clone(),
                    domain: handle.domain.clone(),
                    success: true,
                    shop_name: Some(shop.name),
                    error: None,
                },
                Err(err) => StoreStatus {
                    name: handle.name.clone(),
                    domain: handle.domain.clone(),
                    success: false,
                    shop_name: None,
                    error: Some(err.to_string()),
                },
            })
            .collect();
        let active_stores = stores.iter().filter(|s| s.success).count();
        StoreInfoReport {
            total_stores: stores.len(),
            active_stores,
            stores,
        }
    }

    /// Recent orders from the primary store (thin pass-through).
    pub async fn get_orders(&self, limit: u32) -> Result<Vec<OrderSummary>, SyncError> {
        let Some(primary) = self.stores.first() else {
            return Err(SyncError::Configuration("no stores configured".into()));
        };
        orders::fetch_orders(primary.api.as_ref(), limit).await
    }

    /// Sales and restock figures derived from primary-store orders and
    /// the current unified inventory.
    pub async fn performance_report(&self) -> Result<ReportMetrics, SyncError> {
        let orders = self.get_orders(50).await?;
        let snapshots = self.snapshots().await;
        let items = build_unified(&snapshots, self.primary_name());
        Ok(orders::performance_metrics(&orders, &items))
    }

    /// Start the recurring background reconciliation task. Returns false
    /// when no store is configured or the task is already running.
    /// Must be called from within a tokio runtime.
    pub fn start(self: Arc<Self>) -> bool {
        if self.stores.is_empty() {
            return false;
        }
        let mut slot = self.background.lock().expect("background task lock");
        if slot.is_some() {
            return false;
        }
        let engine = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.sync_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval fires immediately on creation; the first cycle
            // should wait one full period.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.run_background_cycle().await;
            }
        });
        *slot = Some(handle);
        info!(interval_secs = self.sync_interval.as_secs(), "background sync started");
        true
    }

    /// Cancel the background task. Idempotent; the handle is cleared
    /// exactly once.
    pub fn stop(&self) {
        if let Some(handle) = self.background.lock().expect("background task lock").take() {
            handle.abort();
            info!("background sync stopped");
        }
    }

    async fn run_background_cycle(&self) {
        if self.in_flight.load(Ordering::SeqCst) {
            debug!("previous sync cycle still in flight; skipping tick");
            return;
        }
        let report = self.bulk_sync().await;
        if report.success {
            debug!(
                items = report.total_items,
                updates = report.updates_succeeded,
                "background sync cycle complete"
            );
        } else {
            warn!(message = %report.message, "background sync cycle failed");
        }
    }

    fn source_quantity(&self, item: &InventoryItem) -> i64 {
        let primary = self.primary_name();
        item.channels
            .iter()
            .find(|c| c.store == primary)
            .map(|c| c.quantity)
            .unwrap_or_else(|| {
                item.channels
                    .iter()
                    .map(|c| c.quantity)
                    .max()
                    .unwrap_or(0)
            })
    }

    async fn dispatch_update(&self, update: &SyncUpdate) -> ChannelSyncResult {
        let Some(api) = self.store_api(&update.store) else {
            return ChannelSyncResult {
                store: update.store.clone(),
                location_id: update.location_id,
                target_quantity: update.target_quantity,
                quantity_delta: update.quantity_delta,
                new_quantity: None,
                success: false,
                error: Some(format!("store {} is not configured", update.store)),
                latency_ms: 0,
            };
        };
        let call = api
            .adjust_inventory(
                update.inventory_item_id,
                update.location_id,
                update.quantity_delta,
            )
            .await;
        match call.outcome {
            Ok(new_quantity) => ChannelSyncResult {
                store: update.store.clone(),
                location_id: update.location_id,
                target_quantity: update.target_quantity,
                quantity_delta: update.quantity_delta,
                new_quantity: Some(new_quantity),
                success: true,
                error: None,
                latency_ms: call.latency_ms,
            },
            Err(err) => ChannelSyncResult {
                store: update.store.clone(),
                location_id: update.location_id,
                target_quantity: update.target_quantity,
                quantity_delta: update.quantity_delta,
                new_quantity: None,
                success: false,
                error: Some(err.to_string()),
                latency_ms: call.latency_ms,
            },
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Divergence detection: every channel not already at its item's maximum
/// gets a corrective delta toward that maximum.
pub fn plan_bulk_updates(items: &[InventoryItem]) -> Vec<SyncUpdate> {
    let mut updates = Vec::new();
    for item in items {
        let Some(max) = item.channels.iter().map(|c| c.quantity).max() else {
            continue;
        };
        let min = item.channels.iter().map(|c| c.quantity).min().unwrap_or(max);
        if max == min {
            continue;
        }
        for channel in item.channels.iter().filter(|c| c.quantity != max) {
            updates.push(SyncUpdate {
                sku: item.sku.clone(),
                store: channel.store.clone(),
                inventory_item_id: channel.inventory_item_id,
                location_id: channel.location_id,
                quantity_delta: max - channel.quantity,
                target_quantity: max,
            });
        }
    }
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Channel, SyncStatus};

    fn item(sku: &str, channels: &[(&str, i64, i64)]) -> InventoryItem {
        InventoryItem {
            sku: sku.to_string(),
            product_title: "Widget".to_string(),
            variant_title: "Default".to_string(),
            inventory_item_id: channels.first().map(|c| c.1).unwrap_or(0),
            channels: channels
                .iter()
                .enumerate()
                .map(|(idx, (store, item_id, qty))| Channel {
                    store: store.to_string(),
                    inventory_item_id: *item_id,
                    location_id: idx as i64 + 1,
                    location_name: format!("Location {}", idx + 1),
                    quantity: *qty,
                    last_sync: None,
                    sync_status: SyncStatus::Pending,
                    sync_latency_ms: None,
                })
                .collect(),
        }
    }

    #[test]
    fn plan_targets_the_maximum_quantity() {
        let items = vec![item("WIDGET-1", &[("Primary", 100, 12), ("Outlet", 200, 5)])];
        let updates = plan_bulk_updates(&items);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].store, "Outlet");
        assert_eq!(updates[0].inventory_item_id, 200);
        assert_eq!(updates[0].quantity_delta, 7);
        assert_eq!(updates[0].target_quantity, 12);
    }

    #[test]
    fn plan_skips_items_already_in_agreement() {
        let items = vec![
            item("WIDGET-1", &[("Primary", 100, 9), ("Outlet", 200, 9)]),
            item("WIDGET-2", &[("Primary", 101, 3)]),
        ];
        assert!(plan_bulk_updates(&items).is_empty());
    }

    #[test]
    fn plan_emits_one_update_per_lagging_channel() {
        let items = vec![item(
            "WIDGET-1",
            &[("Primary", 100, 20), ("Outlet", 200, 5), ("Outlet", 201, 11)],
        )];
        let updates = plan_bulk_updates(&items);
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.target_quantity == 20));
        let deltas: Vec<i64> = updates.iter().map(|u| u.quantity_delta).collect();
        assert_eq!(deltas, vec![15, 9]);
    }
}
