use crate::common::{DomainError, DomainResult};
use crate::domains::navigation::NavigationRequest;
use std::path::Path;

/// Reads a `NavigationRequest` from a JSON document.
pub async fn load_request<P: AsRef<Path>>(path: P) -> DomainResult<NavigationRequest> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        DomainError::InfrastructureError(format!("Failed to read request file {}: {}", path.display(), e))
    })?;
    parse_request(&content)
}

pub fn parse_request(json: &str) -> DomainResult<NavigationRequest> {
    Ok(serde_json::from_str(json)?)
}
