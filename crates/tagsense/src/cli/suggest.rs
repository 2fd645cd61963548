//! The `tagsense suggest` command: call a running server.

use std::collections::BTreeMap;

use clap::Args;
use serde::Serialize;
use tagsense_core::server::client::{self, DEFAULT_ENDPOINT};
use tagsense_core::server::proto::{self, SuggestResponse};

/// Arguments for the `suggest` command.
#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Image references as the server should see them
    #[arg(required = true)]
    pub images: Vec<String>,

    /// Server endpoint
    #[arg(long, env = "TAGSENSE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

/// Response with maps sorted by id for stable output.
#[derive(Debug, Serialize)]
struct ResponseView {
    suggestions: Vec<proto::Suggestion>,
    all_tags: BTreeMap<i64, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<i64, proto::Tag>,
}

impl From<SuggestResponse> for ResponseView {
    fn from(response: SuggestResponse) -> Self {
        Self {
            suggestions: response.suggestions,
            all_tags: response.all_tags.into_iter().collect(),
            tags: response.tags.into_iter().collect(),
        }
    }
}

/// Execute the suggest command.
pub async fn execute(args: SuggestArgs) -> anyhow::Result<()> {
    let response = client::suggest(&args.endpoint, args.images).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&ResponseView::from(response))?
    );
    Ok(())
}
