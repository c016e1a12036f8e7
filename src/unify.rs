use std::collections::BTreeMap;

use crate::fetch::StoreSnapshot;
use crate::model::{Channel, InventoryItem, SyncStatus};

/// Merge per-store snapshots into the SKU-keyed unified inventory.
///
/// The merge is independent of snapshot order: channels are a set union
/// keyed by (store, location), items come out sorted by SKU, and item
/// metadata is donated by the primary store when it carries the SKU,
/// otherwise by the lexicographically first store that does.
pub fn build_unified(snapshots: &[StoreSnapshot], primary_store: &str) -> Vec<InventoryItem> {
    struct Accum {
        donor: Option<Donor>,
        channels: BTreeMap<(String, i64), Channel>,
    }
    struct Donor {
        is_primary: bool,
        store: String,
        product_title: String,
        variant_title: String,
        inventory_item_id: i64,
    }

    let mut by_sku: BTreeMap<String, Accum> = BTreeMap::new();

    for snapshot in snapshots {
        let Ok(inventory) = &snapshot.outcome else {
            continue;
        };
        for record in &inventory.records {
            let accum = by_sku.entry(record.sku.clone()).or_insert_with(|| Accum {
                donor: None,
                channels: BTreeMap::new(),
            });

            let is_primary = record.store == primary_store;
            let replace = match &accum.donor {
                None => true,
                Some(donor) => {
                    (is_primary && !donor.is_primary)
                        || (!is_primary && !donor.is_primary && record.store < donor.store)
                }
            };
            if replace {
                accum.donor = Some(Donor {
                    is_primary,
                    store: record.store.clone(),
                    product_title: record.product_title.clone(),
                    variant_title: record.variant_title.clone(),
                    inventory_item_id: record.inventory_item_id,
                });
            }

            if record.levels.is_empty() {
                // No per-location breakdown: one synthetic default channel
                // carrying the aggregate quantity.
                accum.channels.insert(
                    (record.store.clone(), 0),
                    Channel {
                        store: record.store.clone(),
                        inventory_item_id: record.inventory_item_id,
                        location_id: 0,
                        location_name: "Default".to_string(),
                        quantity: record.total_quantity,
                        last_sync: None,
                        sync_status: SyncStatus::Pending,
                        sync_latency_ms: None,
                    },
                );
            } else {
                for level in &record.levels {
                    accum.channels.insert(
                        (record.store.clone(), level.location_id),
                        Channel {
                            store: record.store.clone(),
                            inventory_item_id: record.inventory_item_id,
                            location_id: level.location_id,
                            location_name: level.location_name.clone(),
                            quantity: level.quantity,
                            last_sync: None,
                            sync_status: SyncStatus::Pending,
                            sync_latency_ms: None,
                        },
                    );
                }
            }
        }
    }

    by_sku
        .into_iter()
        .filter_map(|(sku, accum)| {
            let donor = accum.donor?;
            Some(InventoryItem {
                sku,
                product_title: donor.product_title,
                variant_title: donor.variant_title,
                inventory_item_id: donor.inventory_item_id,
                channels: accum.channels.into_values().collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StoreInventory;
    use crate::model::{LocationQuantity, VariantRecord};

    fn record(
        store: &str,
        sku: &str,
        item_id: i64,
        levels: &[(i64, &str, i64)],
        total: i64,
    ) -> VariantRecord {
        VariantRecord {
            store: store.to_string(),
            product_id: 1,
            product_title: format!("{store} Product"),
            variant_id: 11,
            variant_title: "Default".to_string(),
            sku: sku.to_string(),
            inventory_item_id: item_id,
            price: Some("19.99".to_string()),
            total_quantity: total,
            levels: levels
                .iter()
                .map(|(id, name, qty)| LocationQuantity {
                    location_id: *id,
                    location_name: name.to_string(),
                    quantity: *qty,
                })
                .collect(),
        }
    }

    fn snapshot(store: &str, records: Vec<VariantRecord>) -> StoreSnapshot {
        StoreSnapshot {
            store: store.to_string(),
            latency_ms: 10,
            outcome: Ok(StoreInventory {
                records,
                locations: Vec::new(),
            }),
        }
    }

    #[test]
    fn merge_is_independent_of_snapshot_order() {
        let a = || {
            snapshot(
                "Primary",
                vec![record("Primary", "WIDGET-1", 100, &[(1, "Warehouse", 12)], 12)],
            )
        };
        let b = || {
            snapshot(
                "Outlet",
                vec![record("Outlet", "WIDGET-1", 200, &[(2, "Shopfloor", 5)], 5)],
            )
        };

        let forward = build_unified(&[a(), b()], "Primary");
        let backward = build_unified(&[b(), a()], "Primary");
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].channels.len(), 2);
        assert_eq!(forward[0].inventory_item_id, 100);
        assert_eq!(forward[0].product_title, "Primary Product");
    }

    #[test]
    fn duplicate_store_location_observations_collapse() {
        let snap = snapshot(
            "Primary",
            vec![record(
                "Primary",
                "WIDGET-1",
                100,
                &[(1, "Warehouse", 12), (1, "Warehouse", 9)],
                12,
            )],
        );
        let items = build_unified(&[snap], "Primary");
        assert_eq!(items[0].channels.len(), 1);
        assert_eq!(items[0].channels[0].quantity, 9);
    }

    #[test]
    fn missing_breakdown_yields_synthetic_default_channel() {
        let snap = snapshot("Outlet", vec![record("Outlet", "WIDGET-2", 300, &[], 7)]);
        let items = build_unified(&[snap], "Primary");
        assert_eq!(items[0].channels.len(), 1);
        let channel = &items[0].channels[0];
        assert_eq!(channel.location_id, 0);
        assert_eq!(channel.location_name, "Default");
        assert_eq!(channel.quantity, 7);
        assert_eq!(channel.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn metadata_prefers_primary_then_smallest_store_name() {
        let outlet = snapshot(
            "Outlet",
            vec![record("Outlet", "WIDGET-1", 200, &[(2, "Shopfloor", 5)], 5)],
        );
        let bazaar = snapshot(
            "Bazaar",
            vec![record("Bazaar", "WIDGET-1", 300, &[(3, "Back room", 6)], 6)],
        );
        let items = build_unified(&[outlet, bazaar], "Primary");
        assert_eq!(items[0].inventory_item_id, 300);
        assert_eq!(items[0].product_title, "Bazaar Product");
    }

    #[test]
    fn failed_snapshots_contribute_nothing() {
        let ok = snapshot(
            "Primary",
            vec![record("Primary", "WIDGET-1", 100, &[(1, "Warehouse", 12)], 12)],
        );
        let failed = StoreSnapshot {
            store: "Outlet".to_string(),
            latency_ms: 4,
            outcome: Err(crate::error::SyncError::Transport("refused".into())),
        };
        let items = build_unified(&[ok, failed], "Primary");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].channels.len(), 1);
    }

    #[test]
    fn items_come_out_sorted_by_sku() {
        let snap = snapshot(
            "Primary",
            vec![
                record("Primary", "ZED-9", 1, &[(1, "Warehouse", 1)], 1),
                record("Primary", "ALPHA-1", 2, &[(1, "Warehouse", 2)], 2),
            ],
        );
        let items = build_unified(&[snap], "Primary");
        let skus: Vec<&str> = items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["ALPHA-1", "ZED-9"]);
    }
}
