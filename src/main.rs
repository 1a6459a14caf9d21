mod cli;
mod files;
mod loader;
mod model;
mod repository;
mod settings;
mod store;
mod ui;

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use crate::cli::Cli;
use crate::repository::{FixtureRepository, OnlineRepository, RepositoryError};
use crate::store::{ComicStore, FavoritesStore};
use crate::ui::state::ViewerState;
use crate::ui::App;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let favorites = if cli.ephemeral {
        FavoritesStore::in_memory()
    } else if let Some(path) = &cli.favorites {
        FavoritesStore::open(path.clone())
    } else {
        FavoritesStore::new()
    };
    if let Some(path) = favorites.path() {
        log::info!("{} favorites in {}", favorites.len(), path.display());
    }

    let comics = match comic_store(&cli).await {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to create the comic store: {}", e);
            eprintln!("The application failed to load the latest comic. Please try again later.");
            return ExitCode::FAILURE;
        }
    };

    let mut app = App::new(ViewerState::new(comics, favorites, cli.viewport));
    if let Err(e) = app.run().await {
        log::error!("Terminal I/O failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn comic_store(cli: &Cli) -> Result<ComicStore, RepositoryError> {
    if cli.offline || cli.fixtures.is_some() {
        let repository = match &cli.fixtures {
            Some(dir) => FixtureRepository::load(dir)?,
            None => FixtureRepository::bundled()?,
        };
        return Ok(ComicStore::from_fixtures(cli.initial, repository));
    }

    let repository = OnlineRepository::new(&cli.endpoint, &cli.user_agent)?;
    println!("Please wait while we load a comic for you...");
    ComicStore::new(cli.initial, Arc::new(repository)).await
}
