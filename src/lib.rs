//! Wallet Sentry Library
//!
//! Probabilistic on-chain risk rating for EVM wallet addresses:
//! - Scam registry matching (local table + optional community feed)
//! - Behavioral signals over transaction, internal, and token history
//! - Weighted scoring with corroboration boost and tier mapping
//! - Byte-bounded report rendering for constrained surfaces

pub mod address;
pub mod aggregator;
pub mod analyzer;
pub mod cache;
pub mod config;
pub mod formatter;
pub mod limiter;
pub mod models;
pub mod providers;
pub mod registry;
pub mod scoring;
pub mod summary;

pub use aggregator::WalletAggregator;
pub use analyzer::WalletAnalyzer;
pub use cache::{CacheStats, TtlCache};
pub use config::Config;
pub use formatter::{ReportFormatter, DISCLAIMER};
pub use limiter::{CallRateLimiter, QueryRateLimiter};
pub use models::{
    AppError, AppResult, ErrorCode, RiskReport, RiskSignal, RiskTier, ScamCategory, ScamFlag,
    WalletSnapshot,
};
pub use providers::{ExplorerClient, ProviderEndpoint, ProviderRotator, RpcClient};
pub use registry::ScamRegistry;
pub use scoring::{RiskEngine, ScoreOutcome};
pub use summary::{Summarizer, TemplateSummarizer};
