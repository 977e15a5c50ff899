//! External data-source clients: JSON-RPC providers and the block explorer

pub mod explorer;
pub mod rotator;
pub mod rpc;

pub use explorer::ExplorerClient;
pub use rotator::ProviderRotator;
pub use rpc::{ProviderEndpoint, RpcClient};
