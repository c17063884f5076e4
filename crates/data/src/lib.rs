pub mod client;
pub mod provider;

pub use client::GmxClient;
pub use provider::GmxSnapshotProvider;
