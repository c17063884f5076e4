use crate::types::{Alert, Signal, Snapshot};
use anyhow::Result;
use async_trait::async_trait;

/// Supplies one immutable snapshot per evaluation cycle.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn snapshot(&self) -> Result<Snapshot>;
}

/// Translates signals into deposit/withdraw actions. Ordering of two
/// emergency exits for the same position is this collaborator's problem,
/// not the core's.
#[async_trait]
pub trait ExecutionHandler: Send + Sync {
    async fn execute(&mut self, signal: &Signal) -> Result<()>;
}

/// Formats and delivers alerts out-of-band.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<()>;
}
