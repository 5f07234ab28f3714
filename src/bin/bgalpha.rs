//! bgalpha CLI tool
//!
//! Command-line interface for making flat image backgrounds transparent.

#[cfg(feature = "cli")]
use bgalpha::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
