use crate::fetch::StoreSnapshot;
use crate::model::{Alert, AlertLevel, InventoryItem, Metrics, SyncStatus, LOW_STOCK_THRESHOLD};

/// Derive the per-cycle metrics and alert list from fetch outcomes.
///
/// Alert ordering is part of the contract: errors first, then warnings,
/// then at most one success alert (only when nothing else fired).
pub fn aggregate(snapshots: &[StoreSnapshot], items: &[InventoryItem]) -> (Metrics, Vec<Alert>) {
    let attempted = snapshots.len();
    let failed: Vec<&StoreSnapshot> = snapshots.iter().filter(|s| s.outcome.is_err()).collect();
    let succeeded = attempted - failed.len();

    let success_rate = if attempted == 0 {
        100.0
    } else {
        succeeded as f64 / attempted as f64 * 100.0
    };
    let avg_latency_ms = if attempted == 0 {
        0
    } else {
        snapshots.iter().map(|s| s.latency_ms).sum::<u64>() / attempted as u64
    };

    let metrics = Metrics {
        total_syncs: items.iter().map(|i| i.channels.len()).sum(),
        success_rate,
        avg_latency_ms,
        active_syncs: items
            .iter()
            .flat_map(|i| &i.channels)
            .filter(|c| c.sync_status == SyncStatus::Pending)
            .count(),
        error_count: failed.len(),
        uptime_percent: success_rate,
    };

    let mut alerts = Vec::new();
    for snapshot in &failed {
        if let Err(err) = &snapshot.outcome {
            alerts.push(Alert::new(
                AlertLevel::Error,
                format!("Failed to fetch inventory from {}: {}", snapshot.store, err),
            ));
        }
    }
    for item in items {
        let low = item
            .channels
            .iter()
            .filter(|c| c.quantity < LOW_STOCK_THRESHOLD)
            .min_by_key(|c| c.quantity);
        if let Some(channel) = low {
            alerts.push(Alert::new(
                AlertLevel::Warning,
                format!(
                    "Low stock for {}: {} units at {} ({})",
                    item.sku, channel.quantity, channel.store, channel.location_name
                ),
            ));
        }
    }
    if alerts.is_empty() {
        alerts.push(Alert::new(
            AlertLevel::Success,
            "All stores reporting and stock levels healthy".to_string(),
        ));
    }

    (metrics, alerts)
}
