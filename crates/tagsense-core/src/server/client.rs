//! Thin client for calling a running service.

use super::proto::tag_suggestion_service_client::TagSuggestionServiceClient;
use super::proto::{SuggestRequest, SuggestResponse};
use crate::error::ServerError;

/// Default endpoint of a local server.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:50051";

/// Send one `Suggest` call to `endpoint`.
pub async fn suggest(endpoint: &str, image_urls: Vec<String>) -> Result<SuggestResponse, ServerError> {
    let mut client = TagSuggestionServiceClient::connect(endpoint.to_string()).await?;
    tracing::debug!("Connected to {endpoint}, sending {} references", image_urls.len());
    let response = client.suggest(SuggestRequest { image_urls }).await?;
    Ok(response.into_inner())
}
