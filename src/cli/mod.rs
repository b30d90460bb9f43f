//! CLI module for justvibe

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::download::QualityTier;

pub mod browse;
pub mod commands;
pub mod context;

pub use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "justvibe", about = "Browse, collect and download music from a JustVibe catalog")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Album catalog endpoint
    #[arg(long, global = true, env = "JUSTVIBE_CATALOG_URL")]
    pub catalog_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in as a user (favorites, library and history are kept per user)
    Login {
        /// Username (prompted for if omitted)
        username: Option<String>,
    },

    /// Log out the current user
    Logout,

    /// List all albums in the catalog
    Albums,

    /// Search albums, artists and songs
    Search {
        /// Text to look for
        query: String,
    },

    /// List the songs of an album
    Songs {
        /// Album id (see `albums`)
        album: String,
    },

    /// Play a song, or toggle pause if it is already playing
    Play {
        /// Album id
        album: String,
        /// Track number within the album, starting at 1
        track: usize,
    },

    /// Like or unlike a song
    Like {
        /// Album id
        album: String,
        /// Track number within the album, starting at 1
        track: usize,
    },

    /// Add a song to, or remove it from, your library
    Add {
        /// Album id
        album: String,
        /// Track number within the album, starting at 1
        track: usize,
    },

    /// Show liked songs
    Favorites,

    /// Show your library
    Library,

    /// Show recently played songs
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Download a song or a whole album
    Download {
        /// Album id
        album: String,

        /// Track number; omit to download the whole album as a zip
        #[arg(short, long)]
        track: Option<usize>,

        /// Quality tier; prompts with size estimates when omitted
        #[arg(short, long, value_enum)]
        quality: Option<QualityTier>,

        /// Directory to save into
        #[arg(short, long, env = "JUSTVIBE_DOWNLOAD_DIR")]
        output: Option<PathBuf>,
    },

    /// Interactive browser: pick albums and songs, play, like and download
    Browse,

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
