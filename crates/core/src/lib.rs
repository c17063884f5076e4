pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{
    AppConfig, ExecutionConfig, NetworkConfig, NotificationsConfig, PoolsConfig, RiskConfig,
    StrategyConfig, TelegramConfig, WalletConfig, WeightProfile,
};
pub use config_loader::ConfigLoader;
pub use error::StrategyError;
pub use traits::{ExecutionHandler, Notifier, SnapshotProvider};
pub use types::{
    Alert, AlertCategory, AlertSeverity, Market, PoolScore, PoolStats, Position, Signal,
    SignalAction, Snapshot, SubScores,
};
