//! State owned by the presentation layer: the comic on screen and the
//! favorites list.

pub mod comic;
pub mod favorites;

pub use comic::{ComicStore, NavigationState};
pub use favorites::{FavoritesStore, SortOrder};
