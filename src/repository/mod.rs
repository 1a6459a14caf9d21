//! Data sources for comics.
//!
//! [`ComicStore`](crate::store::ComicStore) only talks to the
//! [`ComicRepository`] trait. Use [`OnlineRepository`] for the real endpoint,
//! or [`FixtureRepository`] for the bundled offline data set.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::loader::DecodedImage;
use crate::model::{Comic, ComicError};

pub mod fixture;
pub mod online;

pub use fixture::FixtureRepository;
pub use online::OnlineRepository;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("comic {0} does not exist")]
    NotFound(u32),
    #[error(transparent)]
    Decode(#[from] ComicError),
    #[error("the image URL did not return valid image data: {0}")]
    InvalidImage(#[source] image::ImageError),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decode task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("invalid fixture set: {0}")]
    Fixture(String),
}

/// A source of comics.
#[async_trait]
pub trait ComicRepository: Send + Sync {
    /// Serial number of the most recently released comic.
    async fn fetch_latest_comic_number(&self) -> Result<u32, RepositoryError>;

    /// The comic with the given number.
    async fn fetch_comic(&self, number: u32) -> Result<Comic, RepositoryError>;

    /// The decoded picture for `comic`.
    async fn fetch_image(&self, comic: &Comic) -> Result<DecodedImage, RepositoryError>;
}
