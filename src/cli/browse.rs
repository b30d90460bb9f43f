//! Interactive browser
//!
//! Keeps one catalog, one playback coordinator and one event bus alive for the
//! whole session. Every screen renders from [`ViewState`], which only changes
//! by applying events from the bus, so the player line, song markers and
//! history always agree no matter which screen caused the change.

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Input, Select};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use super::commands::{now_playing_line, run_download_dialog};
use super::AppContext;
use crate::catalog::{Album, Catalog, SearchHit, Track};
use crate::download::DownloadTarget;
use crate::error::PlaybackError;
use crate::events::AppEvent;
use crate::playback::PlaybackCoordinator;
use crate::store::{Collection, FavoritesState, HistoryEntry, Session};

/// What the screens show, rebuilt from bus events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub track: Option<Track>,
    pub is_playing: bool,
    pub favorites: FavoritesState,
    pub history: Vec<HistoryEntry>,
}

impl ViewState {
    pub fn apply(&mut self, event: &AppEvent) {
        match event {
            AppEvent::TrackStateChanged { track, is_playing } => {
                self.track = track.clone();
                self.is_playing = *is_playing;
            }
            AppEvent::FavoritesChanged(state) => self.favorites = state.clone(),
            AppEvent::HistoryChanged(entries) => self.history = entries.clone(),
            AppEvent::LoggedOut => {
                self.favorites = FavoritesState::default();
                self.history.clear();
            }
        }
    }

    pub fn is_sounding(&self, track: &Track) -> bool {
        self.is_playing && self.track.as_ref().is_some_and(|t| t.same_source(track))
    }

    /// One line of a song list: play indicator, number, title and collection markers
    pub fn track_row(&self, number: usize, track: &Track) -> String {
        format!(
            "{} {:>2}. {}{}{}",
            if self.is_sounding(track) { "▶" } else { " " },
            number,
            track.title,
            if self.favorites.is_liked(&track.title) { " ♥" } else { "" },
            if self.favorites.is_added(&track.title) { " +" } else { "" },
        )
    }
}

enum MainChoice {
    Albums,
    Search,
    Collection(Collection),
    History,
    Login,
    Logout,
    Quit,
}

enum TrackAction {
    Play,
    Like,
    Library,
    Download,
    Back,
}

struct Browser<'a> {
    ctx: &'a AppContext,
    catalog: Catalog,
    player: PlaybackCoordinator,
    session: Option<Session>,
    events: broadcast::Receiver<AppEvent>,
    view: ViewState,
}

/// Run the interactive browser until the user quits
pub async fn run(ctx: &AppContext) -> Result<()> {
    let events = ctx.bus.subscribe();
    let catalog = ctx.catalog().await;
    if let Some(error) = &catalog.error {
        println!("{} {}", "Could not load albums:".red().bold(), error);
    }

    let mut browser = Browser {
        ctx,
        catalog,
        player: ctx.player()?,
        session: ctx.current_session()?,
        events,
        view: ViewState::default(),
    };
    browser.reload_user_state()?;
    browser.main_loop().await
}

impl Browser<'_> {
    async fn main_loop(&mut self) -> Result<()> {
        loop {
            self.drain_events();
            println!();
            println!("{}", now_playing_line(self.view.track.as_ref(), self.view.is_playing));

            match self.main_menu()? {
                MainChoice::Albums => {
                    if let Some(album) = self.pick_album()? {
                        self.album_screen(album).await?;
                    }
                }
                MainChoice::Search => self.search_screen().await?,
                MainChoice::Collection(collection) => self.collection_screen(collection).await?,
                MainChoice::History => self.history_screen().await?,
                MainChoice::Login => self.login()?,
                MainChoice::Logout => self.logout()?,
                MainChoice::Quit => return Ok(()),
            }
        }
    }

    fn main_menu(&self) -> Result<MainChoice> {
        let mut items = vec![
            ("Albums".to_string(), MainChoice::Albums),
            ("Search".to_string(), MainChoice::Search),
        ];
        match &self.session {
            Some(session) => {
                items.push((
                    format!("Liked songs ({})", self.view.favorites.liked.len()),
                    MainChoice::Collection(Collection::Liked),
                ));
                items.push((
                    format!("Library ({})", self.view.favorites.added.len()),
                    MainChoice::Collection(Collection::Library),
                ));
                items.push((
                    format!("Recently played ({})", self.view.history.len()),
                    MainChoice::History,
                ));
                items.push((format!("Log out {}", session.username), MainChoice::Logout));
            }
            None => items.push(("Log in".to_string(), MainChoice::Login)),
        }
        items.push(("Quit".to_string(), MainChoice::Quit));

        let labels: Vec<&str> = items.iter().map(|(label, _)| label.as_str()).collect();
        let choice = Select::new()
            .with_prompt("JustVibe")
            .items(&labels)
            .default(0)
            .interact_opt()
            .context("Failed to read menu choice")?;

        Ok(match choice {
            Some(idx) => items.swap_remove(idx).1,
            None => MainChoice::Quit,
        })
    }

    fn pick_album(&self) -> Result<Option<Album>> {
        if self.catalog.albums.is_empty() {
            println!("{}", "No albums available.".yellow());
            return Ok(None);
        }

        let labels: Vec<String> = self
            .catalog
            .albums
            .iter()
            .map(|a| format!("{} - {} ({} songs)", a.title, a.artist, a.songs.len()))
            .collect();
        let choice = Select::new()
            .with_prompt("Albums (Esc to go back)")
            .items(&labels)
            .default(0)
            .interact_opt()
            .context("Failed to read album choice")?;

        Ok(choice.map(|idx| self.catalog.albums[idx].clone()))
    }

    async fn album_screen(&mut self, album: Album) -> Result<()> {
        loop {
            self.drain_events();

            let mut labels: Vec<String> = album
                .songs
                .iter()
                .enumerate()
                .map(|(idx, track)| self.view.track_row(idx + 1, track))
                .collect();
            let download_idx = labels.len();
            labels.push("Download album".to_string());

            let choice = Select::new()
                .with_prompt(format!("{} - {}", album.title, album.artist))
                .items(&labels)
                .default(0)
                .interact_opt()
                .context("Failed to read song choice")?;

            match choice {
                None => return Ok(()),
                Some(idx) if idx == download_idx => {
                    self.download(DownloadTarget::Album(album.clone())).await;
                }
                Some(idx) => self.track_screen(&album, idx + 1).await?,
            }
        }
    }

    async fn track_screen(&mut self, album: &Album, number: usize) -> Result<()> {
        let Some(track) = album.track(number).cloned() else {
            return Ok(());
        };

        loop {
            self.drain_events();

            let play_label = if self.view.is_sounding(&track) {
                "Pause"
            } else if self.view.track.as_ref().is_some_and(|t| t.same_source(&track)) {
                "Resume"
            } else {
                "Play"
            };
            let like_label = if self.view.favorites.is_liked(&track.title) { "Unlike" } else { "Like" };
            let library_label = if self.view.favorites.is_added(&track.title) {
                "Remove from library"
            } else {
                "Add to library"
            };
            let actions = [
                (play_label, TrackAction::Play),
                (like_label, TrackAction::Like),
                (library_label, TrackAction::Library),
                ("Download", TrackAction::Download),
                ("Back", TrackAction::Back),
            ];
            let labels: Vec<&str> = actions.iter().map(|(label, _)| *label).collect();

            let choice = Select::new()
                .with_prompt(self.view.track_row(number, &track).trim().to_string())
                .items(&labels)
                .default(0)
                .interact_opt()
                .context("Failed to read action")?;

            match choice.map(|idx| &actions[idx].1) {
                None | Some(TrackAction::Back) => return Ok(()),
                Some(TrackAction::Play) => self.play(&track)?,
                Some(TrackAction::Like) => self.toggle(Collection::Liked, album, &track)?,
                Some(TrackAction::Library) => self.toggle(Collection::Library, album, &track)?,
                Some(TrackAction::Download) => {
                    self.download(DownloadTarget::Track(track.clone())).await;
                }
            }
        }
    }

    async fn search_screen(&mut self) -> Result<()> {
        let query: String = Input::new()
            .with_prompt("Search")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read search text")?;
        if query.trim().is_empty() {
            return Ok(());
        }

        let hits: Vec<(String, Album, Option<usize>)> = self
            .catalog
            .search(&query)
            .into_iter()
            .map(|hit| match hit {
                SearchHit::Album(album) => (
                    format!("Album  {} - {}", album.title, album.artist),
                    album.clone(),
                    None,
                ),
                SearchHit::Track { album, number, track } => (
                    format!("Song   {} - {} ({})", track.title, track.artist, album.title),
                    album.clone(),
                    Some(number),
                ),
            })
            .collect();

        if hits.is_empty() {
            println!("{}", format!("No results for \"{}\".", query.trim()).yellow());
            return Ok(());
        }

        let labels: Vec<&str> = hits.iter().map(|(label, _, _)| label.as_str()).collect();
        let choice = Select::new()
            .with_prompt(format!("Results for \"{}\"", query.trim()))
            .items(&labels)
            .default(0)
            .interact_opt()
            .context("Failed to read search result")?;

        match choice.map(|idx| hits[idx].clone()) {
            None => Ok(()),
            Some((_, album, None)) => self.album_screen(album).await,
            Some((_, album, Some(number))) => self.track_screen(&album, number).await,
        }
    }

    async fn collection_screen(&mut self, collection: Collection) -> Result<()> {
        let entries = self.view.favorites.entries(collection).to_vec();
        if entries.is_empty() {
            println!("{}", "Nothing here yet.".yellow());
            return Ok(());
        }

        let labels: Vec<String> = entries
            .iter()
            .map(|e| format!("{} - {}", e.track.title, e.track.artist))
            .collect();
        let choice = Select::new()
            .with_prompt(match collection {
                Collection::Liked => "Liked songs",
                Collection::Library => "Library",
            })
            .items(&labels)
            .default(0)
            .interact_opt()
            .context("Failed to read song choice")?;

        if let Some(entry) = choice.map(|idx| &entries[idx]) {
            let track = &entry.track;
            match self.catalog.album(&entry.album_id).cloned() {
                Some(album) => match album.songs.iter().position(|t| t.same_source(track)) {
                    Some(idx) => self.track_screen(&album, idx + 1).await?,
                    None => self.play(track)?,
                },
                None => self.play(track)?,
            }
        }
        Ok(())
    }

    async fn history_screen(&mut self) -> Result<()> {
        let entries = self.view.history.clone();
        if entries.is_empty() {
            println!("{}", "Nothing played yet.".yellow());
            return Ok(());
        }

        let labels: Vec<String> = entries
            .iter()
            .map(|e| {
                format!(
                    "{}  {} - {}",
                    e.played_at.format("%m-%d %H:%M"),
                    e.track.title,
                    e.track.artist
                )
            })
            .collect();
        let choice = Select::new()
            .with_prompt("Recently played")
            .items(&labels)
            .default(0)
            .interact_opt()
            .context("Failed to read song choice")?;

        if let Some(entry) = choice.map(|idx| &entries[idx]) {
            let found = self.catalog.albums.iter().find_map(|album| {
                album
                    .songs
                    .iter()
                    .position(|t| t.same_source(&entry.track))
                    .map(|idx| (album.clone(), idx + 1))
            });
            match found {
                Some((album, number)) => self.track_screen(&album, number).await?,
                None => self.play(&entry.track)?,
            }
        }
        Ok(())
    }

    fn play(&mut self, track: &Track) -> Result<()> {
        match self.player.play(track) {
            Ok(_) => Ok(()),
            Err(PlaybackError::LoginRequired) => {
                println!("{}", "Log in to play music.".yellow());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn toggle(&mut self, collection: Collection, album: &Album, track: &Track) -> Result<()> {
        let Some(session) = self.session.clone() else {
            println!("{}", "Log in to keep favorites and a library.".yellow());
            return Ok(());
        };
        self.ctx.favorites(session).toggle(collection, album, track)?;
        Ok(())
    }

    /// Failures are reported and the browser keeps going
    async fn download(&mut self, target: DownloadTarget) {
        let dialog = self.ctx.dialog();
        if let Err(e) = run_download_dialog(&dialog, target, None).await {
            println!("{} {:#}", "Download failed:".red().bold(), e);
        }
    }

    fn login(&mut self) -> Result<()> {
        let username: String = Input::new()
            .with_prompt("Username")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read username")?;
        if username.trim().is_empty() {
            return Ok(());
        }

        let session = self.ctx.sessions().login(&username)?;
        println!("{} {}", "Logged in as".green(), session.username.bold());
        self.session = Some(session);
        self.player = self.ctx.player()?;
        self.reload_user_state()
    }

    fn logout(&mut self) -> Result<()> {
        self.ctx.sessions().logout()?;
        self.drain_events();
        self.session = None;
        self.player = self.ctx.player()?;
        Ok(())
    }

    /// Seed the view with the stored collections of the current user
    fn reload_user_state(&mut self) -> Result<()> {
        match &self.session {
            Some(session) => {
                let favorites = self.ctx.favorites(session.clone()).load()?;
                let history = self.ctx.history(session.clone()).entries()?;
                self.view.apply(&AppEvent::FavoritesChanged(favorites));
                self.view.apply(&AppEvent::HistoryChanged(history));
            }
            None => self.view.apply(&AppEvent::LoggedOut),
        }
        Ok(())
    }

    /// Apply everything published since the last screen, letting the player react to logout
    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    debug!("Browser received {:?}", event);
                    self.player.on_event(&event);
                    self.view.apply(&event);
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Browser missed {} events, reloading", skipped);
                    if let Err(e) = self.reload_user_state() {
                        warn!("Failed to reload user state: {}", e);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::store::{FavoritesStore, HistoryStore, MemoryStore, SessionManager};
    use crate::testing::{album, track};
    use std::sync::Arc;

    fn drain(rx: &mut broadcast::Receiver<AppEvent>, view: &mut ViewState) {
        while let Ok(event) = rx.try_recv() {
            view.apply(&event);
        }
    }

    #[test]
    fn test_view_follows_playback_from_anywhere() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut view = ViewState::default();
        let storage = Arc::new(MemoryStore::new());
        let history = HistoryStore::new(storage, Session::new("alice"), bus.clone());
        let player = PlaybackCoordinator::new(bus.clone(), Some(history));

        let a = track("A", "https://cdn/a.mp3");
        let b = track("B", "https://cdn/b.mp3");

        player.play(&a).unwrap();
        drain(&mut rx, &mut view);
        assert!(view.is_sounding(&a));
        assert!(!view.is_sounding(&b));
        assert_eq!(view.history.len(), 1);
        assert!(view.track_row(1, &a).starts_with("▶"));

        player.play(&a).unwrap();
        drain(&mut rx, &mut view);
        assert!(!view.is_sounding(&a));
        assert_eq!(view.track.as_ref(), Some(&a));
    }

    #[test]
    fn test_view_marks_liked_and_library_tracks() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut view = ViewState::default();
        let storage = Arc::new(MemoryStore::new());
        let favorites = FavoritesStore::new(storage, Session::new("alice"), bus.clone());

        let song = track("Song", "https://cdn/s.mp3");
        let record = album("1", "Record", "Band", vec![song.clone()]);

        favorites.toggle_like(&record, &song).unwrap();
        drain(&mut rx, &mut view);
        assert_eq!(view.track_row(3, &song), "   3. Song ♥");

        favorites.toggle_library(&record, &song).unwrap();
        drain(&mut rx, &mut view);
        assert_eq!(view.track_row(3, &song), "   3. Song ♥ +");
    }

    #[test]
    fn test_logout_clears_user_collections_and_stops_player() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut view = ViewState::default();
        let storage = Arc::new(MemoryStore::new());
        let sessions = SessionManager::new(storage.clone(), bus.clone());
        let session = sessions.login("alice").unwrap();
        let player = PlaybackCoordinator::new(
            bus.clone(),
            Some(HistoryStore::new(storage, session, bus.clone())),
        );

        player.play(&track("A", "https://cdn/a.mp3")).unwrap();
        drain(&mut rx, &mut view);
        assert!(view.is_playing);

        sessions.logout().unwrap();
        while let Ok(event) = rx.try_recv() {
            player.on_event(&event);
            view.apply(&event);
        }

        assert!(view.history.is_empty());
        assert!(!view.is_playing);
        assert_eq!(view.track, None);
    }
}
