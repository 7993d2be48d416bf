// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse arguments, dispatch to `ui`.
// - Returns `anyhow::Result` so any fatal error exits with status 1.

use clap::Parser;
use site_assets::cli::{Cli, Commands};
use site_assets::ui;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        None => ui::main_menu(&cli.env_file),
        Some(Commands::UploadScreenshots { app_id, path }) => ui::upload_screenshots(&cli.env_file, app_id, path),
        Some(Commands::PrepareJson { source, dest }) => ui::prepare_json(&source, &dest),
        Some(Commands::Invalidate { folder }) => ui::invalidate(&cli.env_file, folder.as_deref()),
    }
}
