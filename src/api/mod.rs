//! HTTP client for the ops endpoints
//!
//! Two calls make up the whole surface: a snapshot fetch and a streaming
//! subscription. The subscription owns its reconnect behavior; dropping the
//! returned stream is the only way to cancel it.

mod client;
mod error;
mod sse;

pub use client::{ClientConfig, OpsClient};
pub use error::ApiError;
pub use sse::TransportItem;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::proto::{Range, SnapshotDoc};

/// One logical subscription: transport items until the stream is dropped.
pub type EventStream = BoxStream<'static, TransportItem>;

/// Seam between the engine and the network. The engine only ever talks to
/// this trait, so tests can drive it with a scripted fake.
#[async_trait]
pub trait OpsApi: Send + Sync + 'static {
    /// Fetch the full authoritative state for `range`. No retries; the
    /// caller decides whether a failure warrants another attempt.
    async fn fetch_snapshot(&self, range: Range) -> Result<SnapshotDoc, ApiError>;

    /// Open a subscription scoped to `range`. Reconnects (with resumption
    /// via the highest event id seen) happen inside the stream; it never
    /// ends on its own.
    fn subscribe(&self, range: Range) -> EventStream;
}
