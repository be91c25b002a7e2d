//! Dataset fetch: one GET against the backend query endpoint, decoded and
//! shape-checked before it replaces the shared dataset.

use gloo_net::http::Request;

use crate::model::Dataset;

/// The backend's single query endpoint. No parameters, no auth.
pub const DATASET_URL: &str = "http://localhost:5000/restaurants";

#[derive(Clone, Debug, PartialEq)]
pub enum LoadError {
    /// The request never completed (DNS, refused connection, CORS).
    Network(String),
    /// The backend answered with a non-success status.
    Http(u16),
    /// The body did not decode into the expected columnar shape.
    Malformed(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Network(detail) => write!(f, "request failed: {detail}"),
            LoadError::Http(status) => write!(f, "backend answered HTTP {status}"),
            LoadError::Malformed(detail) => write!(f, "malformed dataset payload: {detail}"),
        }
    }
}

/// Fetches and validates the dataset. The only suspension point in the app;
/// the caller guarantees at most one call is in flight.
pub async fn fetch_dataset(url: &str) -> Result<Dataset, LoadError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| LoadError::Network(e.to_string()))?;
    if !resp.ok() {
        return Err(LoadError::Http(resp.status()));
    }
    let text = resp
        .text()
        .await
        .map_err(|e| LoadError::Network(e.to_string()))?;
    let dataset: Dataset =
        serde_json::from_str(&text).map_err(|e| LoadError::Malformed(e.to_string()))?;
    dataset
        .validate()
        .map_err(|e| LoadError::Malformed(e.to_string()))?;
    Ok(dataset)
}
