//! Wallet Sentry - probabilistic risk rating for EVM wallet addresses
//!
//! Fetches on-chain history from an explorer API with RPC fallback,
//! runs the weighted signal engine, and prints a byte-bounded report.

use eyre::{eyre, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use wallet_sentry::{Config, WalletAnalyzer};

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    println!(
        r#"
    ╔══════════════════════════════════════════╗
    ║        🛡️  W A L L E T   S E N T R Y      ║
    ║   On-chain wallet risk rating  v0.1.0    ║
    ╚══════════════════════════════════════════╝
    "#
    );

    let address = std::env::args()
        .nth(1)
        .ok_or_else(|| eyre!("usage: wallet-sentry <address>"))?;

    if std::env::var("ETHERSCAN_API_KEY").is_err() {
        eprintln!("⚠️  ETHERSCAN_API_KEY not set; explorer calls may be throttled.");
        eprintln!();
    }

    let config = Config::default();
    let analyzer = WalletAnalyzer::new(&config)?;

    let report = analyzer.analyze(&address).await?;
    println!("{}", analyzer.format_for_display(&report));

    println!("\nSignal breakdown:");
    for signal in &report.signals {
        println!(
            "  {:<20} {:>3}/100 (weight {:.2})  {}",
            signal.name, signal.score, signal.weight, signal.description
        );
    }
    println!("\nAnalysis took {}ms", report.elapsed_ms);

    Ok(())
}
