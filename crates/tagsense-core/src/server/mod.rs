//! gRPC front end: `tag_suggestion.v1.TagSuggestionService`.
//!
//! - **proto**: wire messages and generated service plumbing
//! - **pool**: bounded worker pool with explicit backpressure
//! - **service**: the `Suggest` handler and status mapping
//! - **client**: one-shot client used by the CLI

pub mod client;
pub mod pool;
pub mod proto;
pub mod service;

pub use pool::WorkerPool;
pub use service::{build_response, to_status, SuggestService};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;

use crate::config::Config;
use crate::error::ServerError;
use crate::model::TagModel;
use crate::suggest::SuggestionPipeline;

use proto::tag_suggestion_service_server::TagSuggestionServiceServer;

/// Parse a listen address such as `[::]:50051`.
pub fn listen_addr(addr: &str) -> Result<SocketAddr, ServerError> {
    addr.parse().map_err(|e: std::net::AddrParseError| ServerError::InvalidAddress {
        addr: addr.to_string(),
        message: e.to_string(),
    })
}

/// Build the service for `model` with the configured pool.
pub fn build_service(model: TagModel, config: &Config) -> Result<SuggestService, ServerError> {
    let vocabulary = Arc::clone(model.vocabulary());
    let pipeline = Arc::new(SuggestionPipeline::new(
        model,
        &config.inference,
        &config.limits,
    )?);
    let pool = WorkerPool::spawn(
        pipeline,
        config.server.effective_workers(),
        config.server.queue_capacity,
    );
    Ok(SuggestService::new(pool, vocabulary))
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(model: TagModel, config: &Config, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    let addr = listen_addr(&config.server.listen_addr)?;
    let service = build_service(model, config)?;

    tracing::info!(
        "Serving tag_suggestion.v1.TagSuggestionService on {} ({} workers, queue {})",
        addr,
        config.server.effective_workers(),
        config.server.queue_capacity
    );

    Server::builder()
        .add_service(TagSuggestionServiceServer::new(service))
        .serve_with_shutdown(addr, shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
