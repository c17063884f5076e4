pub mod monitor;

pub use monitor::{evaluate, risk_summary, RiskLevel, RiskReport, RiskSummary};
