//! Persisted app state: language, watchlist, history and resume points.
//!
//! The whole state is one JSON document written through an injected
//! [`KeyValueStore`] after every mutation.

use crate::models::Anime;
use crate::storage::KeyValueStore;
use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key of the persisted state document
pub const STATE_KEY: &str = "flashynime-storage";

/// Maximum number of history entries kept
pub const HISTORY_LIMIT: usize = 50;

static EPISODE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)episode\s+").expect("valid episode prefix pattern"));

/// UI language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Id,
    En,
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(Language::Id),
            "en" => Ok(Language::En),
            _ => Err(anyhow::anyhow!("Invalid language: {}", s)),
        }
    }
}

/// Serialized form of the app state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub language: Language,
    pub watchlist: Vec<Anime>,
    /// Newest first
    pub history: Vec<Anime>,
    /// Content id to last watched episode id
    pub watch_history: HashMap<String, String>,
}

/// App state bound to its storage backend
pub struct AppStore {
    storage: Arc<dyn KeyValueStore>,
    state: AppState,
}

impl AppStore {
    /// Load the persisted state, falling back to defaults when it is
    /// missing or unreadable
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let state = match storage.get(STATE_KEY)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Persisted app state is corrupt, starting fresh");
                AppState::default()
            }),
            None => {
                debug!("No persisted app state");
                AppState::default()
            }
        };

        Ok(Self { storage, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn language(&self) -> Language {
        self.state.language
    }

    pub fn watchlist(&self) -> &[Anime] {
        &self.state.watchlist
    }

    pub fn history(&self) -> &[Anime] {
        &self.state.history
    }

    pub fn set_language(&mut self, language: Language) -> Result<()> {
        self.state.language = language;
        self.persist()
    }

    /// Add to the watchlist; an existing entry with the same id moves to the end
    pub fn add_to_watchlist(&mut self, anime: Anime) -> Result<()> {
        self.state.watchlist.retain(|a| a.id != anime.id);
        self.state.watchlist.push(anime);
        self.persist()
    }

    pub fn remove_from_watchlist(&mut self, id: &str) -> Result<()> {
        self.state.watchlist.retain(|a| a.id != id);
        self.persist()
    }

    pub fn is_in_watchlist(&self, id: &str) -> bool {
        self.state.watchlist.iter().any(|a| a.id == id)
    }

    /// Record a watch. The entry moves to the front, is stamped with the
    /// current time and shows `episode_title` (minus "Episode ") when given.
    pub fn add_to_history(&mut self, anime: Anime, episode_title: Option<&str>) -> Result<()> {
        let mut entry = anime;
        if let Some(title) = episode_title {
            entry.episode = EPISODE_PREFIX.replace(title, "").trim().to_string();
        }
        entry.last_update = Utc::now().to_rfc3339();

        self.state.history.retain(|a| a.id != entry.id);
        self.state.history.insert(0, entry);
        self.state.history.truncate(HISTORY_LIMIT);
        self.persist()
    }

    pub fn remove_from_history(&mut self, id: &str) -> Result<()> {
        self.state.history.retain(|a| a.id != id);
        self.persist()
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.state.history.clear();
        self.persist()
    }

    /// Remember the last watched episode of a content id
    pub fn update_watch_progress(&mut self, anime_id: &str, episode_id: &str) -> Result<()> {
        self.state
            .watch_history
            .insert(anime_id.to_string(), episode_id.to_string());
        self.persist()
    }

    pub fn last_watched(&self, anime_id: &str) -> Option<&str> {
        self.state.watch_history.get(anime_id).map(String::as_str)
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.state).context("Failed to serialize app state")?;
        self.storage
            .set(STATE_KEY, &raw)
            .context("Failed to persist app state")
    }
}
