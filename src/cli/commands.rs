//! CLI command handlers

use anyhow::{Context, Result};
use clap_complete::generate;
use colored::Colorize;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::time::Duration;

use super::AppContext;
use crate::catalog::{SearchHit, Track};
use crate::download::{
    DialogState, DownloadOutcome, DownloadTarget, QualityDialog, QualityOption, QualityTier,
    SizeEstimate,
};
use crate::error::PlaybackError;
use crate::store::{Collection, FavoriteEntry};

/// Handle the `login` command
pub fn login(ctx: &AppContext, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username")?,
    };

    if username.trim().is_empty() {
        anyhow::bail!("Username must not be empty");
    }

    let session = ctx.sessions().login(&username)?;
    println!("{} {}", "Logged in as".green(), session.username.bold());
    Ok(())
}

/// Handle the `logout` command
pub fn logout(ctx: &AppContext) -> Result<()> {
    match ctx.current_session()? {
        Some(session) => {
            ctx.sessions().logout()?;
            println!("Logged out {}.", session.username);
        }
        None => println!("{}", "Nobody is logged in.".yellow()),
    }
    Ok(())
}

/// Handle the `albums` command
pub async fn albums(ctx: &AppContext) -> Result<()> {
    let catalog = ctx.catalog().await;

    if let Some(error) = &catalog.error {
        println!("{} {}", "Could not load albums:".red().bold(), error);
        return Ok(());
    }
    if catalog.albums.is_empty() {
        println!("{}", "The catalog is empty.".yellow());
        return Ok(());
    }

    for album in &catalog.albums {
        println!(
            "  {:>4}  {} - {} ({} songs)",
            album.id.cyan(),
            album.title.bold(),
            album.artist,
            album.songs.len()
        );
    }
    Ok(())
}

/// Handle the `search` command
pub async fn search(ctx: &AppContext, query: &str) -> Result<()> {
    let catalog = ctx.catalog().await;
    if let Some(error) = &catalog.error {
        println!("{} {}", "Could not load albums:".red().bold(), error);
        return Ok(());
    }

    let hits = catalog.search(query);
    if hits.is_empty() {
        println!("{}", format!("No results for \"{}\".", query).yellow());
        return Ok(());
    }

    for hit in hits {
        match hit {
            SearchHit::Album(album) => {
                println!("  {} {} - {} [{}]", "Album".green(), album.title.bold(), album.artist, album.id)
            }
            SearchHit::Track { album, number, track } => println!(
                "  {}  {} - {} ({} #{})",
                "Song".cyan(),
                track.title.bold(),
                track.artist,
                album.id,
                number
            ),
        }
    }
    Ok(())
}

/// Handle the `songs` command
pub async fn songs(ctx: &AppContext, album_id: &str) -> Result<()> {
    let album = ctx.album(album_id).await?;
    let favorites = match ctx.current_session()? {
        Some(session) => ctx.favorites(session).load()?,
        None => Default::default(),
    };

    println!("{} - {}", album.title.bold(), album.artist);
    for (idx, track) in album.songs.iter().enumerate() {
        println!(
            "  {:>2}. {}{}{}",
            idx + 1,
            track.title,
            if favorites.is_liked(&track.title) { " ♥".red().to_string() } else { String::new() },
            if favorites.is_added(&track.title) { " +".green().to_string() } else { String::new() },
        );
    }
    Ok(())
}

/// Handle the `play` command
pub async fn play(ctx: &AppContext, album_id: &str, number: usize) -> Result<()> {
    let (_, track) = ctx.album_track(album_id, number).await?;
    let player = ctx.player()?;

    match player.play(&track) {
        Ok(state) => {
            println!("{}", now_playing_line(state.current.as_ref(), state.is_playing));
            Ok(())
        }
        Err(PlaybackError::LoginRequired) => {
            println!("{}", "Log in to play music: justvibe login <username>".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn now_playing_line(track: Option<&Track>, is_playing: bool) -> String {
    match track {
        Some(track) if is_playing => format!("▶ {} - {}", track.title.bold(), track.artist),
        Some(track) => format!("⏸ {} - {}", track.title, track.artist).dimmed().to_string(),
        None => "Nothing playing".dimmed().to_string(),
    }
}

/// Handle the `like` and `add` commands
pub async fn toggle(ctx: &AppContext, collection: Collection, album_id: &str, number: usize) -> Result<()> {
    let session = ctx.require_session()?;
    let (album, track) = ctx.album_track(album_id, number).await?;

    let now_in = ctx.favorites(session).toggle(collection, &album, &track)?;
    let message = match (collection, now_in) {
        (Collection::Liked, true) => format!("♥ Liked {}", track.title).red(),
        (Collection::Liked, false) => format!("Unliked {}", track.title).normal(),
        (Collection::Library, true) => format!("+ Added {} to your library", track.title).green(),
        (Collection::Library, false) => format!("Removed {} from your library", track.title).normal(),
    };
    println!("{}", message);
    Ok(())
}

/// Handle the `favorites` and `library` commands
pub fn collection(ctx: &AppContext, collection: Collection) -> Result<()> {
    let session = ctx.require_session()?;
    let state = ctx.favorites(session).load()?;
    let entries = state.entries(collection);

    if entries.is_empty() {
        let what = match collection {
            Collection::Liked => "No liked songs yet.",
            Collection::Library => "Your library is empty.",
        };
        println!("{}", what.yellow());
        return Ok(());
    }

    for entry in entries {
        print_favorite(entry);
    }
    Ok(())
}

fn print_favorite(entry: &FavoriteEntry) {
    println!(
        "  {} - {} {}",
        entry.track.title.bold(),
        entry.track.artist,
        format!("(album {}, added {})", entry.album_id, entry.added_at.format("%Y-%m-%d")).dimmed()
    );
}

/// Handle the `history` command
pub fn history(ctx: &AppContext, limit: usize) -> Result<()> {
    let session = ctx.require_session()?;
    let entries = ctx.history(session).entries()?;

    if entries.is_empty() {
        println!("{}", "Nothing played yet.".yellow());
        return Ok(());
    }

    for entry in entries.iter().take(limit) {
        println!(
            "  {}  {} - {}",
            entry.played_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            entry.track.title.bold(),
            entry.track.artist
        );
    }
    Ok(())
}

/// Handle the `download` command
pub async fn download(
    ctx: &AppContext,
    album_id: &str,
    track: Option<usize>,
    quality: Option<QualityTier>,
) -> Result<()> {
    let target = match track {
        Some(number) => DownloadTarget::Track(ctx.album_track(album_id, number).await?.1),
        None => DownloadTarget::Album(ctx.album(album_id).await?),
    };

    let dialog = ctx.dialog();
    run_download_dialog(&dialog, target, quality).await
}

/// Drive the quality dialog from the terminal: compute options, pick a tier
/// (or use the given one), download and report.
pub async fn run_download_dialog(
    dialog: &QualityDialog,
    target: DownloadTarget,
    quality: Option<QualityTier>,
) -> Result<()> {
    let heading = match &target {
        DownloadTarget::Track(track) => format!("Download Song: {} - {}", track.title, track.artist),
        DownloadTarget::Album(album) => format!(
            "Download Album: {} - {} ({} songs)",
            album.title,
            album.artist,
            album.songs.len()
        ),
    };
    println!("{}", heading.cyan().bold());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message("Calculating file sizes...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let options = dialog.open(target.clone()).await?;
    spinner.finish_and_clear();

    if let DialogState::Ready {
        estimate: SizeEstimate::Defaulted,
        ..
    } = dialog.state()
    {
        println!("{}", "Could not determine file sizes; showing typical values.".yellow());
    }

    let tier = match quality {
        Some(tier) => tier,
        None => match pick_quality(&options)? {
            Some(tier) => tier,
            None => {
                dialog.close();
                println!("Cancelled.");
                return Ok(());
            }
        },
    };
    dialog.select(tier)?;

    let is_album = matches!(target, DownloadTarget::Album(_));
    let bar = if is_album {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        bar.set_message("Downloading album...");
        bar
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        spinner.set_message("Downloading...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    };

    let mut states = dialog.subscribe();
    let render = async {
        while states.changed().await.is_ok() {
            match &*states.borrow_and_update() {
                DialogState::Downloading { progress } => bar.set_position(u64::from(*progress)),
                _ => break,
            }
        }
    };

    let (result, ()) = tokio::join!(dialog.confirm(), render);
    bar.finish_and_clear();

    match result {
        Ok(DownloadOutcome::Track(saved)) => {
            println!(
                "{} {} ({:.1} MB)",
                "Saved".green().bold(),
                saved.path.display(),
                saved.bytes as f64 / 1_048_576.0
            );
        }
        Ok(DownloadOutcome::Album(report)) => {
            println!("{} {}", "Saved".green().bold(), report.path.display());
            println!("  Songs added: {}", report.added().len());
            for skipped in report.skipped() {
                if let Err(e) = &skipped.result {
                    println!("  {} {}. {} ({})", "Skipped".yellow(), skipped.number, skipped.title, e);
                }
            }
        }
        Err(e) => {
            dialog.close();
            return Err(e).context("Download failed");
        }
    }
    Ok(())
}

/// Present the options; `None` if the user backs out
fn pick_quality(options: &[QualityOption]) -> Result<Option<QualityTier>> {
    let items: Vec<String> = options
        .iter()
        .map(|o| {
            let (r, g, b) = o.color;
            format!(
                "{} {:<28} {}",
                format!("{:<15}", o.label).truecolor(r, g, b),
                o.description,
                o.size
            )
        })
        .collect();
    let default = options
        .iter()
        .position(|o| o.tier == QualityTier::High)
        .unwrap_or(0);

    let choice = Select::new()
        .with_prompt("Select download quality")
        .items(&items)
        .default(default)
        .interact_opt()
        .context("Failed to read quality selection")?;

    Ok(choice.map(|idx| options[idx].tier))
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "justvibe", &mut io::stdout());
}

// Extension trait for Cli to get clap Command
impl super::Cli {
    fn command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::track;

    #[test]
    fn test_now_playing_line_mentions_track() {
        colored::control::set_override(false);
        let song = track("Song", "https://cdn/a.mp3");
        assert_eq!(now_playing_line(Some(&song), true), "▶ Song - Test Artist");
        assert_eq!(now_playing_line(Some(&song), false), "⏸ Song - Test Artist");
        assert_eq!(now_playing_line(None, false), "Nothing playing");
    }
}
