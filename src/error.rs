use thiserror::Error;

/// Failure taxonomy shared by the platform client and the sync engine.
///
/// Remote calls never panic and never bubble transport exceptions: every
/// failure is converted into one of these values at the call site.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication rejected by store (HTTP {status})")]
    Authentication { status: u16 },
    #[error("rate limited by store")]
    RateLimited,
    #[error("store API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },
    #[error("GraphQL errors: {0}")]
    Graphql(String),
    #[error("mutation rejected: {0}")]
    Validation(String),
    #[error("malformed response payload: {0}")]
    Payload(String),
    #[error("SKU not found in any configured store: {0}")]
    NotFound(String),
    #[error("partial failure: {succeeded} of {attempted} updates applied")]
    Partial { succeeded: usize, attempted: usize },
}
