use std::path::PathBuf;

use crate::cli::{parse_viewport, HELP_COMMANDS};
use crate::model::FavoriteEntry;
use crate::store::{ComicStore, FavoritesStore, NavigationState, SortOrder};
use crate::ui::render::{comic_subtitle, display_size, favorite_line, fit_scale, FitPolicy};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    First,
    Previous,
    Next,
    Last,
    Random,
    /// `g` alone opens the prompt, `g N` answers it right away.
    GoTo(Option<String>),
    ToggleFavorite,
    ListFavorites,
    FlipSortOrder,
    OpenFavorite(u32),
    ZoomIn,
    ZoomOut,
    ZoomActual,
    Fit(f64, f64),
    Save(PathBuf),
    Info,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, arg) = match line.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, Some(arg.trim())),
            None => (line, None),
        };
        let cmd = match (word, arg) {
            ("f" | "first", None) => Command::First,
            ("p" | "prev", None) => Command::Previous,
            ("n" | "next", None) => Command::Next,
            ("l" | "last", None) => Command::Last,
            ("r" | "random", None) => Command::Random,
            ("g" | "goto", arg) => Command::GoTo(arg.map(str::to_string)),
            ("s" | "fav", None) => Command::ToggleFavorite,
            ("favs", None) => Command::ListFavorites,
            ("sort", None) => Command::FlipSortOrder,
            ("open", Some(arg)) => Command::OpenFavorite(
                arg.trim_start_matches('#')
                    .parse()
                    .map_err(|_| format!("Not a comic number: {}", arg))?,
            ),
            ("+" | "=", None) => Command::ZoomIn,
            ("-", None) => Command::ZoomOut,
            ("0", None) => Command::ZoomActual,
            ("fit", Some(arg)) => {
                let (w, h) = parse_viewport(arg)?;
                Command::Fit(w, h)
            }
            ("save", Some(arg)) => Command::Save(PathBuf::from(arg)),
            ("i" | "info", None) => Command::Info,
            ("?" | "h" | "help", None) => Command::Help,
            ("q" | "quit" | "exit", None) => Command::Quit,
            _ => return Err(format!("Unknown command {:?}, type ? for help", line)),
        };
        Ok(cmd)
    }
}

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

pub struct ViewerState {
    pub comics: ComicStore,
    pub favorites: FavoritesStore,
    pub viewport: (f64, f64),
    pub policy: FitPolicy,
    pub sort_order: SortOrder,
    pub quit: bool,
}

impl ViewerState {
    pub fn new(comics: ComicStore, favorites: FavoritesStore, viewport: (f64, f64)) -> Self {
        Self {
            comics,
            favorites,
            viewport,
            policy: FitPolicy::default(),
            sort_order: SortOrder::default(),
            quit: false,
        }
    }

    /// Handle one line of input and return what to print.
    pub async fn handle_line(&mut self, line: &str) -> Vec<String> {
        if self.comics.is_showing_go_to_prompt() {
            return self.answer_go_to(line).await;
        }
        if line.trim().is_empty() {
            return Vec::new();
        }
        match Command::parse(line) {
            Ok(cmd) => self.update(cmd).await,
            Err(e) => vec![e],
        }
    }

    pub async fn update(&mut self, cmd: Command) -> Vec<String> {
        let mut out = Vec::new();
        match cmd {
            Command::First => self.comics.select_first().await,
            Command::Previous => self.comics.select_previous().await,
            Command::Next => self.comics.select_next().await,
            Command::Last => self.comics.select_last().await,
            Command::Random => self.comics.select_random().await,
            Command::GoTo(None) => {
                self.comics.show_go_to_prompt();
                out.push(self.go_to_prompt());
                return out;
            }
            Command::GoTo(Some(input)) => {
                self.comics.show_go_to_prompt();
                return self.answer_go_to(&input).await;
            }
            Command::ToggleFavorite => match self.comics.selected_comic() {
                Some(comic) => {
                    let comic = comic.clone();
                    let added = self.favorites.toggle(&comic);
                    out.push(format!(
                        "{} #{} {} favorites",
                        if added { "Added" } else { "Removed" },
                        comic.number,
                        if added { "to" } else { "from" }
                    ));
                    return out;
                }
                None if self.comics.is_loading() => {
                    out.push("Still loading, try again in a moment.".to_string());
                    return out;
                }
                None => {
                    out.push("No comic is shown.".to_string());
                    return out;
                }
            },
            Command::ListFavorites => {
                out.extend(self.favorites_lines());
                return out;
            }
            Command::FlipSortOrder => {
                self.sort_order = match self.sort_order {
                    SortOrder::Ascending => SortOrder::Descending,
                    SortOrder::Descending => SortOrder::Ascending,
                };
                out.extend(self.favorites_lines());
                return out;
            }
            Command::OpenFavorite(number) => {
                let entry = self
                    .favorites
                    .sorted(self.sort_order)
                    .into_iter()
                    .find(|e| e.number == number)
                    .cloned();
                match entry {
                    Some(entry) => self.open_favorite(entry).await,
                    None => {
                        out.push(format!("#{} is not a favorite.", number));
                        return out;
                    }
                }
            }
            Command::ZoomIn => self.comics.zoom_in(),
            Command::ZoomOut => self.comics.zoom_out(),
            Command::ZoomActual => self.comics.zoom_actual(),
            Command::Fit(w, h) => self.viewport = (w, h),
            Command::Save(path) => {
                if let Some(written) = self.comics.export_selected(&path) {
                    out.push(format!("Saved {}", written.display()));
                }
                out.extend(self.take_error());
                return out;
            }
            Command::Info => {}
            Command::Help => {
                out.push(HELP_COMMANDS.trim_end().to_string());
                return out;
            }
            Command::Quit => {
                self.quit = true;
                return out;
            }
        }
        self.favorites.sync_with_selection(self.comics.selected_comic());
        out.extend(self.take_error());
        out.extend(self.status_lines());
        out
    }

    async fn open_favorite(&mut self, entry: FavoriteEntry) {
        let number = entry.number;
        self.favorites.select_favorite(Some(entry));
        if !(1..=self.comics.last_comic_number()).contains(&number) {
            log::warn!("Favorite {} is not a valid comic number", number);
            return;
        }
        self.comics.select_specific(number).await;
    }

    async fn answer_go_to(&mut self, input: &str) -> Vec<String> {
        let input = input.trim();
        if input.is_empty() || input == "cancel" {
            self.comics.dismiss_go_to_prompt();
            return Vec::new();
        }
        match self.comics.go_to(input).await {
            Ok(()) => {
                self.favorites.sync_with_selection(self.comics.selected_comic());
                let mut out = self.take_error();
                out.extend(self.status_lines());
                out
            }
            Err(e) => vec![e.to_string(), self.go_to_prompt()],
        }
    }

    fn go_to_prompt(&self) -> String {
        format!(
            "Go to comic (1-{}), empty line to cancel:",
            self.comics.last_comic_number()
        )
    }

    /// The error alert is shown once and dismissed.
    fn take_error(&mut self) -> Vec<String> {
        if !self.comics.is_showing_error() {
            return Vec::new();
        }
        let message = self.comics.error_message().unwrap_or_default().to_string();
        self.comics.dismiss_error();
        vec![format!("Error: {}", message)]
    }

    pub fn status_lines(&self) -> Vec<String> {
        let last = self.comics.last_comic_number();
        match self.comics.state() {
            NavigationState::Loading { number } => {
                vec![format!("Loading comic {}...", number)]
            }
            NavigationState::Failed { number, message } => {
                vec![format!("[{}/{}] {}", number, last, message)]
            }
            NavigationState::Loaded { comic, image, .. } => {
                let star = if self.favorites.contains(Some(comic)) { " *" } else { "" };
                let (w, h) = image.size();
                let fit = fit_scale(w, h, self.viewport.0, self.viewport.1, &self.policy);
                let zoom = self.comics.zoom_level();
                let (dw, dh) = display_size(image, self.viewport, zoom, &self.policy);
                let mut nav = String::new();
                nav.push_str(if self.comics.has_previous() { "<" } else { " " });
                nav.push_str(if self.comics.has_next() { ">" } else { " " });
                vec![
                    format!("{} [{}/{}] {}{}", nav, comic.number, last, comic.title, star),
                    comic_subtitle(comic),
                    format!(
                        "{}x{} ({} KB) | fit {:.2} | zoom {:.0}% | shown {:.0}x{:.0}",
                        image.width,
                        image.height,
                        image.mem_size() / 1024,
                        fit,
                        zoom * 100.0,
                        dw,
                        dh
                    ),
                    comic.description.clone(),
                ]
            }
        }
    }

    pub fn favorites_lines(&self) -> Vec<String> {
        if self.favorites.is_empty() {
            return vec!["No favorites yet.".to_string()];
        }
        let selected = self.favorites.selected_favorite().map(|f| f.number);
        self.favorites
            .sorted(self.sort_order)
            .into_iter()
            .map(|entry| {
                let marker = if Some(entry.number) == selected { ">" } else { " " };
                format!("{} {}", marker, favorite_line(entry))
            })
            .collect()
    }
}
