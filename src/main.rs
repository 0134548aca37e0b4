mod eval;
mod search;
mod types;
mod uci;

use anyhow::Result;
use tracing::info;

fn main() -> Result<()> {
    // Protocol output owns stdout; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    info!(name = uci::ENGINE_NAME, "starting");
    uci::UciHandler::new().run();
    Ok(())
}
