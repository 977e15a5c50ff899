//! Data model and error types

pub mod errors;
pub mod types;

pub use errors::{AppError, AppResult, ErrorCode};
pub use types::{
    RegistryEntry, RiskReport, RiskSignal, RiskTier, ScamCategory, ScamFlag, TokenTransfer,
    TopInteraction, Transaction, WalletSnapshot, WhitelistEntry,
};
