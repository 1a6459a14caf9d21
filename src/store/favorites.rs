use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::files::{ensure_dir, write_atomic};
use crate::model::{Comic, FavoriteEntry};
use crate::settings;

#[derive(Error, Debug)]
enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// The set of favorite comics, saved to disk after every change.
///
/// Load and save failures never reach the caller. A store that cannot read
/// its file starts empty; one that cannot write keeps working in memory.
#[derive(Debug)]
pub struct FavoritesStore {
    favorites: HashSet<FavoriteEntry>,
    /// Mirrors the sidebar selection. Not persisted.
    selected_favorite: Option<FavoriteEntry>,
    /// `None` keeps everything in memory.
    path: Option<PathBuf>,
}

impl FavoritesStore {
    /// Open the favorites file in the settings directory.
    pub fn new() -> Self {
        match settings::favorites_path() {
            Some(path) => Self::open(path),
            None => {
                log::warn!("Could not determine the settings directory, favorites will not be saved.");
                Self::in_memory()
            }
        }
    }

    /// Open (or later create) the favorites file at `path`.
    pub fn open(path: PathBuf) -> Self {
        let favorites = match load(&path) {
            Ok(favorites) => {
                log::info!("Loaded {} favorites from {}", favorites.len(), path.display());
                favorites
            }
            Err(e) => {
                log::warn!("Failed to load favorites from {}: {}", path.display(), e);
                HashSet::new()
            }
        };
        Self {
            favorites,
            selected_favorite: None,
            path: Some(path),
        }
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            favorites: HashSet::new(),
            selected_favorite: None,
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.favorites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty()
    }

    /// False when `comic` is `None`.
    pub fn contains(&self, comic: Option<&Comic>) -> bool {
        comic.is_some_and(|c| self.favorites.contains(&FavoriteEntry::from(c)))
    }

    pub fn add(&mut self, comic: &Comic) {
        self.favorites.insert(FavoriteEntry::from(comic));
        self.save();
    }

    pub fn remove(&mut self, comic: &Comic) {
        self.favorites.remove(&FavoriteEntry::from(comic));
        self.save();
    }

    /// Add `comic` if absent, remove it otherwise. Returns whether it is a
    /// favorite afterwards.
    pub fn toggle(&mut self, comic: &Comic) -> bool {
        if self.contains(Some(comic)) {
            self.remove(comic);
            false
        } else {
            self.add(comic);
            true
        }
    }

    /// Favorites ordered by comic number.
    pub fn sorted(&self, order: SortOrder) -> Vec<&FavoriteEntry> {
        let mut entries: Vec<_> = self.favorites.iter().collect();
        match order {
            SortOrder::Ascending => entries.sort_by_key(|e| e.number),
            SortOrder::Descending => entries.sort_by_key(|e| std::cmp::Reverse(e.number)),
        }
        entries
    }

    pub fn selected_favorite(&self) -> Option<&FavoriteEntry> {
        self.selected_favorite.as_ref()
    }

    pub fn select_favorite(&mut self, entry: Option<FavoriteEntry>) {
        self.selected_favorite = entry;
    }

    /// Drop the favorite selection once a different comic is shown.
    ///
    /// `None` (a comic is still loading) leaves the selection alone.
    pub fn sync_with_selection(&mut self, selected_comic: Option<&Comic>) {
        if let Some(comic) = selected_comic {
            if self.selected_favorite.as_ref().map(|f| f.number) != Some(comic.number) {
                self.selected_favorite = None;
            }
        }
    }

    fn save(&self) {
        let Some(path) = &self.path else { return };
        if let Err(e) = persist(path, &self.favorites) {
            log::error!("Failed to save favorites to {}: {}", path.display(), e);
        }
    }
}

impl Default for FavoritesStore {
    fn default() -> Self {
        Self::new()
    }
}

fn load(path: &Path) -> Result<HashSet<FavoriteEntry>, PersistError> {
    let data = std::fs::read(path)?;
    let mut favorites: HashSet<FavoriteEntry> = serde_json::from_slice(&data)?;
    // Comic numbers start at 1.
    favorites.retain(|entry| {
        if entry.number == 0 {
            log::warn!("Dropping favorite {:?} with comic number 0", entry.title);
        }
        entry.number != 0
    });
    Ok(favorites)
}

fn persist(path: &Path, favorites: &HashSet<FavoriteEntry>) -> Result<(), PersistError> {
    if let Some(dir) = path.parent() {
        ensure_dir(dir)?;
    }
    // Stable file contents regardless of hash order.
    let mut entries: Vec<_> = favorites.iter().collect();
    entries.sort_by_key(|e| e.number);
    let data = serde_json::to_vec_pretty(&entries)?;
    write_atomic(path, &data)?;
    log::debug!("Saved {} favorites to {}", entries.len(), path.display());
    Ok(())
}
