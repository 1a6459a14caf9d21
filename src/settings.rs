use std::path::PathBuf;

/// Which comic a freshly constructed store shows first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum InitialSelection {
    /// The most recent comic.
    #[default]
    Latest,
    /// A uniformly random comic.
    Random,
}

impl InitialSelection {
    pub fn description(&self) -> &'static str {
        match self {
            InitialSelection::Latest => "latest comic",
            InitialSelection::Random => "random comic",
        }
    }
}

/// Directory where the app keeps its settings (currently only favorites).
///
/// - Linux: ~/.config/comic-viewer
/// - macOS: ~/Library/Application Support/Comic Viewer
/// - Windows: %LOCALAPPDATA%\ComicViewer
pub fn directory() -> Option<PathBuf> {
    let base = dirs::config_local_dir().or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;

    let name = if cfg!(target_os = "macos") {
        "Comic Viewer"
    } else if cfg!(target_os = "windows") {
        "ComicViewer"
    } else {
        "comic-viewer"
    };
    Some(base.join(name))
}

pub fn favorites_path() -> Option<PathBuf> {
    directory().map(|dir| dir.join("favorites.json"))
}
