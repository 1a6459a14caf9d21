use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::loader::{save_png, DecodedImage};
use crate::model::Comic;
use crate::repository::{ComicRepository, FixtureRepository, RepositoryError};
use crate::settings::InitialSelection;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const ZOOM_STEP: f64 = 0.2;
pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 5.0;

const SAVE_FAILED_MESSAGE: &str = "An error occurred while saving this file.";

// ---------------------------------------------------------------------------
// Navigation state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationState {
    /// A fetch for `number` is in flight.
    Loading { number: u32 },
    Loaded {
        comic: Comic,
        image: Arc<DecodedImage>,
        /// Manual zoom on top of the fit scale.
        zoom: f64,
    },
    Failed { number: u32, message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GoToError {
    #[error("Please enter a number between 1 and {last}")]
    NotANumber { input: String, last: u32 },
    #[error("Please enter a number between 1 and {last}")]
    OutOfRange { number: i64, last: u32 },
}

/// Selection, loading and zoom for the comic on screen.
///
/// Every state change is published on a watch channel (see
/// [`ComicStore::subscribe`]); the Loading state goes out before the fetch
/// starts. Mutations take `&mut self`, so loads never overlap.
pub struct ComicStore {
    repository: Arc<dyn ComicRepository>,
    /// Highest valid comic number. Fixed for the lifetime of the store.
    last_comic_number: u32,
    state: NavigationState,
    updates: watch::Sender<NavigationState>,
    error_message: Option<String>,
    showing_go_to_prompt: bool,
}

fn initial_number(initial: InitialSelection, last: u32) -> u32 {
    match initial {
        InitialSelection::Latest => last,
        InitialSelection::Random => rand::rng().random_range(1..=last),
    }
}

/// A uniformly random number in `1..=last` other than `current`, or `None`
/// when `current` is the only comic.
fn random_other_than(last: u32, current: Option<u32>) -> Option<u32> {
    let mut rng = rand::rng();
    match current {
        Some(_) if last <= 1 => None,
        Some(current) => {
            // Draw from a range one smaller and skip over `current`.
            let n = rng.random_range(1..last);
            Some(if n >= current { n + 1 } else { n })
        }
        None => Some(rng.random_range(1..=last)),
    }
}

impl ComicStore {
    fn with_state(
        repository: Arc<dyn ComicRepository>,
        last_comic_number: u32,
        state: NavigationState,
    ) -> Self {
        let (updates, _) = watch::channel(state.clone());
        Self {
            repository,
            last_comic_number,
            state,
            updates,
            error_message: None,
            showing_go_to_prompt: false,
        }
    }

    /// Fetch the latest comic number, then load the initial comic.
    ///
    /// Only a failure to fetch the latest number is returned. If the initial
    /// comic fails to load the store is still built, in the Failed state.
    pub async fn new(
        initial: InitialSelection,
        repository: Arc<dyn ComicRepository>,
    ) -> Result<Self, RepositoryError> {
        let last = repository.fetch_latest_comic_number().await?;
        if last == 0 {
            return Err(RepositoryError::NotFound(1));
        }
        let number = initial_number(initial, last);
        log::info!("Latest comic is {}, showing the {}", last, initial.description());

        let mut store = Self::with_state(repository, last, NavigationState::Loading { number });
        store.load_comic(number).await;
        Ok(store)
    }

    /// Build a store over the fixture set, fully loaded on return.
    pub fn from_fixtures(initial: InitialSelection, repository: FixtureRepository) -> Self {
        let last = repository.latest_comic_number();
        let number = initial_number(initial, last);
        let comic = repository.comic(number);
        let image = Arc::new(repository.image(&comic));
        let state = NavigationState::Loaded {
            comic,
            image,
            zoom: 1.0,
        };
        Self::with_state(Arc::new(repository), last, state)
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    pub fn subscribe(&self) -> watch::Receiver<NavigationState> {
        self.updates.subscribe()
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn last_comic_number(&self) -> u32 {
        self.last_comic_number
    }

    pub fn selected_comic(&self) -> Option<&Comic> {
        match &self.state {
            NavigationState::Loaded { comic, .. } => Some(comic),
            _ => None,
        }
    }

    pub fn selected_image(&self) -> Option<&Arc<DecodedImage>> {
        match &self.state {
            NavigationState::Loaded { image, .. } => Some(image),
            _ => None,
        }
    }

    /// 1.0 unless a comic is loaded and has been zoomed.
    pub fn zoom_level(&self) -> f64 {
        match &self.state {
            NavigationState::Loaded { zoom, .. } => *zoom,
            _ => 1.0,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, NavigationState::Loading { .. })
    }

    /// True if a comic was released before the selected one.
    pub fn has_previous(&self) -> bool {
        self.selected_comic().is_some_and(|c| c.number > 1)
    }

    /// True if a comic was released after the selected one.
    pub fn has_next(&self) -> bool {
        self.selected_comic()
            .is_some_and(|c| c.number < self.last_comic_number)
    }

    fn publish(&self) {
        self.updates.send_replace(self.state.clone());
    }

    fn set_state(&mut self, state: NavigationState) {
        self.state = state;
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Selection and navigation
    // -----------------------------------------------------------------------

    pub async fn select_first(&mut self) {
        self.load_comic(1).await;
    }

    pub async fn select_last(&mut self) {
        self.load_comic(self.last_comic_number).await;
    }

    pub async fn select_previous(&mut self) {
        let current = self.selected_comic().map(|c| c.number);
        match current {
            Some(number) if self.has_previous() => self.load_comic(number - 1).await,
            _ => log::warn!("Unable to select the previous comic (selected: {:?})", current),
        }
    }

    pub async fn select_next(&mut self) {
        let current = self.selected_comic().map(|c| c.number);
        match current {
            Some(number) if self.has_next() => self.load_comic(number + 1).await,
            _ => log::warn!("Unable to select the next comic (selected: {:?})", current),
        }
    }

    /// Select a random comic other than the current one.
    pub async fn select_random(&mut self) {
        let current = self.selected_comic().map(|c| c.number);
        match random_other_than(self.last_comic_number, current) {
            Some(number) => self.load_comic(number).await,
            None => log::warn!("Only one comic exists, nothing else to pick at random."),
        }
    }

    /// Select `number` verbatim.
    ///
    /// # Panics
    ///
    /// If `number` is outside `1..=last_comic_number()`; validate user input
    /// with [`ComicStore::validate_go_to`] first.
    pub async fn select_specific(&mut self, number: u32) {
        self.load_comic(number).await;
    }

    async fn load_comic(&mut self, number: u32) {
        assert!(
            (1..=self.last_comic_number).contains(&number),
            "comic {} is out of range 1..={}",
            number,
            self.last_comic_number
        );
        if self.selected_comic().map(|c| c.number) == Some(number) {
            return;
        }

        log::debug!("[nav] loading comic {}", number);
        self.set_state(NavigationState::Loading { number });

        match self.fetch(number).await {
            Ok((comic, image)) => {
                self.error_message = None;
                self.set_state(NavigationState::Loaded {
                    comic,
                    image: Arc::new(image),
                    zoom: 1.0,
                });
            }
            Err(e) => {
                log::error!("Failed to load comic {}: {}", number, e);
                let message = format!("Comic {} failed to load.", number);
                self.error_message = Some(message.clone());
                self.set_state(NavigationState::Failed { number, message });
            }
        }
    }

    async fn fetch(&self, number: u32) -> Result<(Comic, DecodedImage), RepositoryError> {
        let comic = self.repository.fetch_comic(number).await?;
        let image = self.repository.fetch_image(&comic).await?;
        Ok((comic, image))
    }

    // -----------------------------------------------------------------------
    // Zoom
    // -----------------------------------------------------------------------

    pub fn zoom_actual(&mut self) {
        self.update_zoom(|_| 1.0);
    }

    pub fn zoom_in(&mut self) {
        self.update_zoom(|zoom| zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.update_zoom(|zoom| zoom - ZOOM_STEP);
    }

    fn update_zoom(&mut self, f: impl FnOnce(f64) -> f64) {
        let NavigationState::Loaded { zoom, .. } = &mut self.state else {
            return;
        };
        // One decimal keeps repeated steps from drifting.
        let next = (f(*zoom) * 10.0).round() / 10.0;
        *zoom = next.clamp(MIN_ZOOM, MAX_ZOOM);
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Alerts and prompts
    // -----------------------------------------------------------------------

    pub fn is_showing_error(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn dismiss_error(&mut self) {
        self.error_message = None;
    }

    pub fn is_showing_go_to_prompt(&self) -> bool {
        self.showing_go_to_prompt
    }

    pub fn show_go_to_prompt(&mut self) {
        self.showing_go_to_prompt = true;
    }

    pub fn dismiss_go_to_prompt(&mut self) {
        self.showing_go_to_prompt = false;
    }

    pub fn validate_go_to(&self, input: &str) -> Result<u32, GoToError> {
        let last = self.last_comic_number;
        let number: i64 = input.trim().parse().map_err(|_| GoToError::NotANumber {
            input: input.to_string(),
            last,
        })?;
        u32::try_from(number)
            .ok()
            .filter(|n| (1..=last).contains(n))
            .ok_or(GoToError::OutOfRange { number, last })
    }

    /// Validate prompt input and select it. The prompt stays open on error.
    pub async fn go_to(&mut self, input: &str) -> Result<(), GoToError> {
        let number = self.validate_go_to(input)?;
        self.dismiss_go_to_prompt();
        self.select_specific(number).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Save the loaded image as PNG next to `path` (extension forced to
    /// `.png`). Failures raise the error alert. Returns the written path.
    pub fn export_selected(&mut self, path: &Path) -> Option<PathBuf> {
        let Some(image) = self.selected_image().cloned() else {
            log::warn!("Cancelling save, no comic is loaded.");
            return None;
        };
        let path = path.with_extension("png");
        match save_png(&image, &path) {
            Ok(()) => {
                log::info!("Saved comic image to {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::error!("Failed to save {}: {}", path.display(), e);
                self.show_error(SAVE_FAILED_MESSAGE);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{checkerboard, decode_image};
    use crate::model::sample_comic;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct ScriptedRepository {
        latest: u32,
        latest_fails: bool,
        failing_comics: Mutex<HashSet<u32>>,
        failing_images: Mutex<HashSet<u32>>,
        comic_calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedRepository {
        fn new(latest: u32) -> Self {
            Self {
                latest,
                ..Default::default()
            }
        }

        fn fail_comic(&self, number: u32) {
            self.failing_comics.lock().unwrap().insert(number);
        }

        fn fail_image(&self, number: u32) {
            self.failing_images.lock().unwrap().insert(number);
        }

        fn heal(&self) {
            self.failing_comics.lock().unwrap().clear();
            self.failing_images.lock().unwrap().clear();
        }

        fn calls(&self) -> usize {
            self.comic_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ComicRepository for ScriptedRepository {
        async fn fetch_latest_comic_number(&self) -> Result<u32, RepositoryError> {
            if self.latest_fails {
                return Err(RepositoryError::NotFound(0));
            }
            Ok(self.latest)
        }

        async fn fetch_comic(&self, number: u32) -> Result<Comic, RepositoryError> {
            self.comic_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.failing_comics.lock().unwrap().contains(&number) {
                return Err(RepositoryError::NotFound(number));
            }
            Ok(sample_comic(number))
        }

        async fn fetch_image(&self, comic: &Comic) -> Result<DecodedImage, RepositoryError> {
            if self.failing_images.lock().unwrap().contains(&comic.number) {
                let err = decode_image(b"junk").unwrap_err();
                return Err(RepositoryError::InvalidImage(err));
            }
            Ok(checkerboard(4, 3))
        }
    }

    async fn store_over(repo: &Arc<ScriptedRepository>) -> ComicStore {
        let dyn_repo: Arc<dyn ComicRepository> = repo.clone();
        ComicStore::new(InitialSelection::Latest, dyn_repo).await.unwrap()
    }

    fn selected_number(store: &ComicStore) -> Option<u32> {
        store.selected_comic().map(|c| c.number)
    }

    #[tokio::test]
    async fn starts_on_latest() {
        let repo = Arc::new(ScriptedRepository::new(10));
        let store = store_over(&repo).await;

        assert_eq!(store.last_comic_number(), 10);
        assert_eq!(selected_number(&store), Some(10));
        assert!(store.selected_image().is_some());
        assert!(store.has_previous());
        assert!(!store.has_next());
        assert!(!store.is_showing_error());
    }

    #[tokio::test]
    async fn random_start_is_in_range() {
        let repo: Arc<dyn ComicRepository> = Arc::new(ScriptedRepository::new(3));
        let store = ComicStore::new(InitialSelection::Random, repo).await.unwrap();
        let number = selected_number(&store).unwrap();
        assert!((1..=3).contains(&number));
    }

    #[tokio::test]
    async fn latest_number_failure_fails_construction() {
        let repo: Arc<dyn ComicRepository> = Arc::new(ScriptedRepository {
            latest_fails: true,
            ..ScriptedRepository::new(10)
        });
        assert!(ComicStore::new(InitialSelection::Latest, repo).await.is_err());
    }

    #[tokio::test]
    async fn initial_load_failure_still_builds_store() {
        let repo = Arc::new(ScriptedRepository::new(10));
        repo.fail_comic(10);
        let store = store_over(&repo).await;

        assert!(store.is_showing_error());
        assert_eq!(store.error_message(), Some("Comic 10 failed to load."));
        assert!(matches!(store.state(), NavigationState::Failed { number: 10, .. }));
    }

    #[tokio::test]
    async fn reselecting_current_comic_does_nothing() {
        let repo = Arc::new(ScriptedRepository::new(10));
        let mut store = store_over(&repo).await;
        store.zoom_in();
        let calls = repo.calls();

        store.select_specific(10).await;
        store.select_last().await;

        assert_eq!(repo.calls(), calls);
        assert_eq!(store.zoom_level(), 1.2);
        assert!(!store.is_showing_error());
    }

    #[tokio::test]
    async fn failed_image_clears_selection_and_recovers() {
        let repo = Arc::new(ScriptedRepository::new(10));
        let mut store = store_over(&repo).await;
        repo.fail_image(4);

        store.select_specific(4).await;
        assert!(store.selected_comic().is_none());
        assert!(store.selected_image().is_none());
        assert!(store.is_showing_error());
        assert!(!store.has_previous());
        assert!(!store.has_next());

        repo.heal();
        store.select_specific(4).await;
        assert_eq!(selected_number(&store), Some(4));
        assert!(!store.is_showing_error());
    }

    #[tokio::test]
    async fn failure_does_not_restore_previous_selection() {
        let repo = Arc::new(ScriptedRepository::new(10));
        let mut store = store_over(&repo).await;
        repo.fail_comic(9);

        store.select_previous().await;
        assert!(store.selected_comic().is_none());
        assert_eq!(store.error_message(), Some("Comic 9 failed to load."));
    }

    #[tokio::test]
    async fn sequential_navigation_respects_bounds() {
        let repo = Arc::new(ScriptedRepository::new(3));
        let mut store = store_over(&repo).await;

        store.select_next().await;
        assert_eq!(selected_number(&store), Some(3));

        store.select_first().await;
        assert_eq!(selected_number(&store), Some(1));
        assert!(!store.has_previous());
        assert!(store.has_next());

        let calls = repo.calls();
        store.select_previous().await;
        assert_eq!(selected_number(&store), Some(1));
        assert_eq!(repo.calls(), calls);

        store.select_next().await;
        store.select_next().await;
        assert_eq!(selected_number(&store), Some(3));
        assert!(!store.has_next());
    }

    #[tokio::test]
    async fn navigation_without_selection_is_ignored() {
        let repo = Arc::new(ScriptedRepository::new(5));
        repo.fail_comic(5);
        let mut store = store_over(&repo).await;
        let calls = repo.calls();

        store.select_next().await;
        store.select_previous().await;
        assert_eq!(repo.calls(), calls);
    }

    #[tokio::test]
    async fn random_never_repeats_current() {
        let mut store = ComicStore::from_fixtures(
            InitialSelection::Latest,
            FixtureRepository::bundled().unwrap(),
        );
        for _ in 0..50 {
            let before = selected_number(&store).unwrap();
            store.select_random().await;
            let after = selected_number(&store).unwrap();
            assert_ne!(before, after);
            assert!((1..=5).contains(&after));
        }
    }

    #[tokio::test]
    async fn random_with_single_comic_is_a_noop() {
        let repo = Arc::new(ScriptedRepository::new(1));
        let mut store = store_over(&repo).await;
        let calls = repo.calls();

        store.select_random().await;
        assert_eq!(selected_number(&store), Some(1));
        assert_eq!(repo.calls(), calls);
    }

    #[test]
    fn random_pick_skips_current() {
        for _ in 0..100 {
            let n = random_other_than(2, Some(1)).unwrap();
            assert_eq!(n, 2);
        }
        assert_eq!(random_other_than(1, Some(1)), None);
        assert_eq!(random_other_than(1, None), Some(1));
    }

    #[tokio::test]
    async fn zoom_is_clamped_and_reset_on_navigation() {
        let repo = Arc::new(ScriptedRepository::new(10));
        let mut store = store_over(&repo).await;

        for _ in 0..10 {
            store.zoom_out();
        }
        assert_eq!(store.zoom_level(), MIN_ZOOM);

        for _ in 0..40 {
            store.zoom_in();
        }
        assert_eq!(store.zoom_level(), MAX_ZOOM);

        store.zoom_actual();
        assert_eq!(store.zoom_level(), 1.0);

        store.zoom_in();
        store.zoom_in();
        assert_eq!(store.zoom_level(), 1.4);
        store.select_first().await;
        assert_eq!(store.zoom_level(), 1.0);
    }

    #[tokio::test]
    async fn loading_is_published_before_fetch() {
        let gate = Arc::new(Notify::new());
        let repo = Arc::new(ScriptedRepository {
            gate: Some(gate.clone()),
            ..ScriptedRepository::new(10)
        });
        // Let the initial load through.
        gate.notify_one();
        let mut store = store_over(&repo).await;

        let mut updates = store.subscribe();
        let observer = async {
            updates.changed().await.unwrap();
            let seen = updates.borrow_and_update().clone();
            gate.notify_one();
            seen
        };

        let ((), seen) = tokio::join!(store.select_specific(3), observer);
        assert_eq!(seen, NavigationState::Loading { number: 3 });
        assert_eq!(selected_number(&store), Some(3));
    }

    #[tokio::test]
    #[should_panic(expected = "out of range")]
    async fn out_of_range_selection_panics() {
        let repo = Arc::new(ScriptedRepository::new(10));
        let mut store = store_over(&repo).await;
        store.select_specific(11).await;
    }

    #[tokio::test]
    async fn go_to_validates_input() {
        let repo = Arc::new(ScriptedRepository::new(10));
        let mut store = store_over(&repo).await;

        assert_eq!(store.validate_go_to(" 7 "), Ok(7));
        assert!(matches!(store.validate_go_to("seven"), Err(GoToError::NotANumber { .. })));
        assert_eq!(
            store.validate_go_to("0"),
            Err(GoToError::OutOfRange { number: 0, last: 10 })
        );
        assert_eq!(
            store.validate_go_to("11").unwrap_err().to_string(),
            "Please enter a number between 1 and 10"
        );

        store.show_go_to_prompt();
        assert!(store.go_to("-3").await.is_err());
        assert!(store.is_showing_go_to_prompt());

        store.go_to("2").await.unwrap();
        assert!(!store.is_showing_go_to_prompt());
        assert_eq!(selected_number(&store), Some(2));
    }

    #[tokio::test]
    async fn export_writes_png_and_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(ScriptedRepository::new(10));
        let mut store = store_over(&repo).await;

        let written = store.export_selected(&dir.path().join("comic.jpg")).unwrap();
        assert_eq!(written, dir.path().join("comic.png"));
        let decoded = decode_image(&std::fs::read(&written).unwrap()).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 3));

        assert!(store.export_selected(&dir.path().join("missing/comic")).is_none());
        assert_eq!(store.error_message(), Some(SAVE_FAILED_MESSAGE));
        store.dismiss_error();
        assert!(!store.is_showing_error());
    }

    #[tokio::test]
    async fn fixture_store_is_loaded_immediately() {
        let store = ComicStore::from_fixtures(
            InitialSelection::Random,
            FixtureRepository::bundled().unwrap(),
        );
        assert_eq!(store.last_comic_number(), 5);
        assert!(store.selected_comic().is_some());
        assert!(store.selected_image().is_some());
        assert!(!store.is_loading());
    }
}
