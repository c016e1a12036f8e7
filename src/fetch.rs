use futures::future::join_all;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::model::{is_real_sku, LocationQuantity, VariantRecord};
use crate::platform::model::Location;
use crate::platform::StoreApi;

/// What one store contributed to an inventory pass: either its full
/// variant list or the error that disqualified it.
#[derive(Debug)]
pub struct StoreSnapshot {
    pub store: String,
    pub latency_ms: u64,
    pub outcome: Result<StoreInventory, SyncError>,
}

#[derive(Debug)]
pub struct StoreInventory {
    pub records: Vec<VariantRecord>,
    pub locations: Vec<Location>,
}

/// Produce a complete, flattened inventory snapshot for one store.
///
/// The shop probe and the product listing are store-fatal: if either
/// fails the store contributes zero records. A failed location listing
/// or a failed per-variant level lookup only degrades the affected
/// variants to their aggregate quantity.
pub async fn fetch_store_snapshot(store: &str, api: &dyn StoreApi) -> StoreSnapshot {
    let mut latency_ms = 0u64;

    let probe = api.shop().await;
    latency_ms += probe.latency_ms;
    let shop = match probe.outcome {
        Ok(shop) => shop,
        Err(err) => {
            return StoreSnapshot {
                store: store.to_string(),
                latency_ms,
                outcome: Err(err),
            }
        }
    };
    debug!(store, shop = %shop.name, "store reachable");

    let products_call = api.products().await;
    latency_ms += products_call.latency_ms;
    let products = match products_call.outcome {
        Ok(products) => products,
        Err(err) => {
            return StoreSnapshot {
                store: store.to_string(),
                latency_ms,
                outcome: Err(err),
            }
        }
    };

    let locations_call = api.locations().await;
    latency_ms += locations_call.latency_ms;
    let locations = match locations_call.outcome {
        Ok(locations) => locations,
        Err(err) => {
            warn!(store, %err, "location listing failed; keeping aggregate quantities");
            Vec::new()
        }
    };
    let location_names: HashMap<i64, String> = locations
        .iter()
        .map(|l| (l.id, l.name.clone()))
        .collect();

    let mut records = Vec::new();
    for product in &products {
        for variant in &product.variants {
            let Some(inventory_item_id) = variant.inventory_item_id else {
                continue;
            };
            let sku = variant.sku.clone().unwrap_or_default();
            if !is_real_sku(&sku) {
                continue;
            }
            records.push(VariantRecord {
                store: store.to_string(),
                product_id: product.id,
                product_title: product.title.clone(),
                variant_id: variant.id,
                variant_title: variant.title.clone(),
                sku: sku.trim().to_string(),
                inventory_item_id,
                price: variant.price.clone(),
                total_quantity: variant.inventory_quantity.unwrap_or(0),
                levels: Vec::new(),
            });
        }
    }

    // Per-variant level lookups run concurrently within the store; a
    // single lookup failure degrades that variant, not the store.
    if !locations.is_empty() {
        let lookups = records.iter().map(|record| {
            let item = record.inventory_item_id;
            async move { api.inventory_levels(&[item]).await }
        });
        let results = join_all(lookups).await;
        for (record, call) in records.iter_mut().zip(results) {
            match call.outcome {
                Ok(levels) => {
                    record.levels = levels
                        .into_iter()
                        .map(|level| LocationQuantity {
                            location_id: level.location_id,
                            location_name: location_names
                                .get(&level.location_id)
                                .cloned()
                                .unwrap_or_else(|| format!("Location {}", level.location_id)),
                            quantity: level.available.unwrap_or(0),
                        })
                        .collect();
                }
                Err(err) => {
                    warn!(store, sku = %record.sku, %err, "inventory level lookup failed; keeping aggregate quantity");
                }
            }
        }
    }

    StoreSnapshot {
        store: store.to_string(),
        latency_ms,
        outcome: Ok(StoreInventory { records, locations }),
    }
}
