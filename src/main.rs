use anyhow::{Context, Result};
use dotenv::dotenv;
use std::io;
use streetview_scraper::menu::Menu;
use streetview_scraper::scrape::TokioLauncher;
use streetview_scraper::{Paths, Settings};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("streetview_scraper=info")),
        )
        .with_writer(io::stderr)
        .init();

    let launcher = TokioLauncher::new(Paths::from_env()).context("failed to start async runtime")?;
    let stdin = io::stdin();
    let mut menu = Menu::new(stdin.lock(), io::stdout(), launcher, Settings::from_env());
    menu.run().context("console menu failed")?;

    Ok(())
}
