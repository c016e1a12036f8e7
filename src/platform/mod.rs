use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::StoreCredential;
use crate::error::SyncError;
use crate::platform::model::{
    AdjustData, GraphqlEnvelope, InventoryLevel, InventoryLevelsResp, Location, LocationsResp,
    Order, OrdersResp, Product, ProductsResp, Shop, ShopResp,
};

pub mod model;

/// Deadline for every remote call; expiry surfaces as a transport error.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ADJUST_QUANTITY_MUTATION: &str = "mutation inventoryAdjustQuantity($input: InventoryAdjustQuantityInput!) { inventoryAdjustQuantity(input: $input) { inventoryLevel { available } userErrors { field message } } }";

/// Result of one remote call: the outcome plus how long the round trip
/// took. Failures are values; the client itself never propagates.
#[derive(Debug)]
pub struct ApiCall<T> {
    pub latency_ms: u64,
    pub outcome: Result<T, SyncError>,
}

impl<T> ApiCall<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiCall<U> {
        ApiCall {
            latency_ms: self.latency_ms,
            outcome: self.outcome.map(f),
        }
    }

    fn decode<U: DeserializeOwned>(self) -> ApiCall<U>
    where
        T: Into<Value>,
    {
        ApiCall {
            latency_ms: self.latency_ms,
            outcome: self.outcome.and_then(|v| {
                serde_json::from_value(v.into()).map_err(|e| SyncError::Payload(e.to_string()))
            }),
        }
    }
}

/// Canonical form of a store domain: lowercase hostname, no scheme, no
/// path; a bare shop handle gets the platform suffix appended.
pub fn normalize_domain(raw: &str) -> String {
    let mut s = raw.trim().to_ascii_lowercase();
    if let Some(rest) = s.strip_prefix("https://") {
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix("http://") {
        s = rest.to_string();
    }
    if let Some(idx) = s.find('/') {
        s.truncate(idx);
    }
    if !s.is_empty() && !s.contains('.') {
        s.push_str(".myshopify.com");
    }
    s
}

/// Request body for the relative inventory adjustment mutation.
pub fn adjust_quantity_request(inventory_item_id: i64, location_id: i64, delta: i64) -> Value {
    json!({
        "query": ADJUST_QUANTITY_MUTATION,
        "variables": {
            "input": {
                "inventoryItemId": format!("gid://shopify/InventoryItem/{inventory_item_id}"),
                "locationId": format!("gid://shopify/Location/{location_id}"),
                "quantityDelta": delta,
            }
        }
    })
}

/// The seam between the engine and one store's admin API. The real
/// client implements it over HTTP; tests inject recording fakes.
#[async_trait]
pub trait StoreApi: Send + Sync {
    async fn shop(&self) -> ApiCall<Shop>;
    async fn products(&self) -> ApiCall<Vec<Product>>;
    async fn locations(&self) -> ApiCall<Vec<Location>>;
    async fn inventory_levels(&self, inventory_item_ids: &[i64]) -> ApiCall<Vec<InventoryLevel>>;
    /// Relative adjustment of one (inventory item, location) level.
    /// Returns the new available quantity.
    async fn adjust_inventory(
        &self,
        inventory_item_id: i64,
        location_id: i64,
        delta: i64,
    ) -> ApiCall<i64>;
    async fn orders(&self, limit: u32) -> ApiCall<Vec<Order>>;
}

/// Authenticated HTTP/GraphQL client for a single store's admin API.
#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    domain: String,
    token: String,
    api_version: String,
}

impl fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreClient")
            .field("domain", &self.domain)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl StoreClient {
    pub fn new(cred: &StoreCredential, api_version: &str) -> Self {
        let http = Client::builder()
            .user_agent("shopsync/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            http,
            domain: normalize_domain(&cred.domain),
            token: cred.access_token.clone(),
            api_version: api_version.to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn rest_url(&self, path: &str) -> String {
        format!(
            "https://{}/admin/api/{}/{}",
            self.domain, self.api_version, path
        )
    }

    async fn get_value(&self, path: &str) -> ApiCall<Value> {
        let started = Instant::now();
        let res = self
            .http
            .get(self.rest_url(path))
            .header("X-Shopify-Access-Token", &self.token)
            .header("Content-Type", "application/json")
            .send()
            .await;
        self.to_call(started, res).await
    }

    async fn post_value(&self, path: &str, body: &Value) -> ApiCall<Value> {
        let started = Instant::now();
        let res = self
            .http
            .post(self.rest_url(path))
            .header("X-Shopify-Access-Token", &self.token)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await;
        self.to_call(started, res).await
    }

    async fn to_call(
        &self,
        started: Instant,
        res: Result<reqwest::Response, reqwest::Error>,
    ) -> ApiCall<Value> {
        let res = match res {
            Ok(res) => res,
            Err(err) => {
                return ApiCall {
                    latency_ms: started.elapsed().as_millis() as u64,
                    outcome: Err(SyncError::Transport(err.to_string())),
                }
            }
        };
        let status = res.status();
        let outcome = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(SyncError::Authentication {
                status: status.as_u16(),
            })
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Err(SyncError::RateLimited)
        } else if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            Err(SyncError::Api {
                status: status.as_u16(),
                body,
            })
        } else {
            res.json::<Value>()
                .await
                .map_err(|err| SyncError::Payload(err.to_string()))
        };
        ApiCall {
            latency_ms: started.elapsed().as_millis() as u64,
            outcome,
        }
    }

    /// Execute a GraphQL document and unwrap the envelope: HTTP failures
    /// map like REST calls, and a non-empty `errors` array is a failure
    /// even on HTTP 200.
    async fn graphql(&self, body: &Value) -> ApiCall<Value> {
        let call = self.post_value("graphql.json", body).await;
        let latency_ms = call.latency_ms;
        let outcome = call.outcome.and_then(|raw| {
            let envelope: GraphqlEnvelope =
                serde_json::from_value(raw).map_err(|e| SyncError::Payload(e.to_string()))?;
            if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
                let joined = errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(SyncError::Graphql(joined));
            }
            envelope
                .data
                .ok_or_else(|| SyncError::Payload("GraphQL response without data".into()))
        });
        ApiCall {
            latency_ms,
            outcome,
        }
    }
}

#[async_trait]
impl StoreApi for StoreClient {
    async fn shop(&self) -> ApiCall<Shop> {
        self.get_value("shop.json")
            .await
            .decode::<ShopResp>()
            .map(|r| r.shop)
    }

    async fn products(&self) -> ApiCall<Vec<Product>> {
        // Single bounded page at the platform maximum; deep catalogs past
        // 250 products need cursor pagination (not implemented).
        self.get_value("products.json?limit=250&fields=id,title,variants")
            .await
            .decode::<ProductsResp>()
            .map(|r| r.products)
    }

    async fn locations(&self) -> ApiCall<Vec<Location>> {
        self.get_value("locations.json")
            .await
            .decode::<LocationsResp>()
            .map(|r| r.locations)
    }

    async fn inventory_levels(&self, inventory_item_ids: &[i64]) -> ApiCall<Vec<InventoryLevel>> {
        let ids = inventory_item_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.get_value(&format!("inventory_levels.json?inventory_item_ids={ids}"))
            .await
            .decode::<InventoryLevelsResp>()
            .map(|r| r.inventory_levels)
    }

    async fn adjust_inventory(
        &self,
        inventory_item_id: i64,
        location_id: i64,
        delta: i64,
    ) -> ApiCall<i64> {
        let body = adjust_quantity_request(inventory_item_id, location_id, delta);
        let call = self.graphql(&body).await;
        let latency_ms = call.latency_ms;
        let outcome = call.outcome.and_then(|data| {
            let parsed: AdjustData =
                serde_json::from_value(data).map_err(|e| SyncError::Payload(e.to_string()))?;
            let result = parsed
                .inventory_adjust_quantity
                .ok_or_else(|| SyncError::Payload("missing inventoryAdjustQuantity".into()))?;
            if !result.user_errors.is_empty() {
                let joined = result
                    .user_errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(SyncError::Validation(joined));
            }
            result
                .inventory_level
                .map(|level| level.available)
                .ok_or_else(|| SyncError::Payload("mutation returned no inventory level".into()))
        });
        ApiCall {
            latency_ms,
            outcome,
        }
    }

    async fn orders(&self, limit: u32) -> ApiCall<Vec<Order>> {
        self.get_value(&format!("orders.json?status=any&limit={limit}"))
            .await
            .decode::<OrdersResp>()
            .map(|r| r.orders)
    }
}
