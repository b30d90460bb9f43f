//! justvibe - Browse a JustVibe catalog, keep favorites and history, download music

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod cli;
mod config;
mod download;
mod error;
mod events;
mod playback;
mod store;
mod utils;

#[cfg(test)]
mod testing;

use cli::{AppContext, Cli, Commands};
use config::Config;
use store::Collection;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "justvibe=debug,reqwest=debug"
    } else {
        "justvibe=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Commands::Completion { shell } = cli.command {
        cli::commands::completion(shell);
        return Ok(());
    }

    let output = match &cli.command {
        Commands::Download { output, .. } => output.clone(),
        _ => None,
    };
    let config = Config::load()?.with_overrides(cli.catalog_url, output);
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Login { username } => cli::commands::login(&ctx, username)?,
        Commands::Logout => cli::commands::logout(&ctx)?,
        Commands::Albums => cli::commands::albums(&ctx).await?,
        Commands::Search { query } => cli::commands::search(&ctx, &query).await?,
        Commands::Songs { album } => cli::commands::songs(&ctx, &album).await?,
        Commands::Play { album, track } => cli::commands::play(&ctx, &album, track).await?,
        Commands::Like { album, track } => {
            cli::commands::toggle(&ctx, Collection::Liked, &album, track).await?;
        }
        Commands::Add { album, track } => {
            cli::commands::toggle(&ctx, Collection::Library, &album, track).await?;
        }
        Commands::Favorites => cli::commands::collection(&ctx, Collection::Liked)?,
        Commands::Library => cli::commands::collection(&ctx, Collection::Library)?,
        Commands::History { limit } => cli::commands::history(&ctx, limit)?,
        Commands::Download {
            album,
            track,
            quality,
            ..
        } => {
            cli::commands::download(&ctx, &album, track, quality).await?;
        }
        Commands::Browse => cli::browse::run(&ctx).await?,
        Commands::Completion { .. } => {}
    }

    Ok(())
}
