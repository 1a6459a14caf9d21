use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{ComicRepository, RepositoryError};
use crate::loader::{decode_image, DecodedImage};
use crate::model::Comic;

pub const DEFAULT_ENDPOINT: &str = "https://xkcd.com/";

/// Fetches comics from the remote JSON endpoint.
///
/// - `GET {endpoint}/info.0.json` for the latest comic
/// - `GET {endpoint}/{number}/info.0.json` for a specific one
/// - `GET {comic.image}` for the picture
pub struct OnlineRepository {
    client: Client,
    endpoint: String,
}

impl OnlineRepository {
    pub fn new(endpoint: &str, user_agent: &str) -> Result<Self, RepositoryError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: Client, endpoint: &str) -> Self {
        let endpoint = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{}/", endpoint)
        };
        Self { client, endpoint }
    }

    pub fn latest_url(&self) -> String {
        format!("{}info.0.json", self.endpoint)
    }

    pub fn comic_url(&self, number: u32) -> String {
        format!("{}{}/info.0.json", self.endpoint, number)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, RepositoryError> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Ok(response)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, RepositoryError> {
        let response = self.get(url).await?;
        if !response.status().is_success() {
            return Err(RepositoryError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ComicRepository for OnlineRepository {
    async fn fetch_latest_comic_number(&self) -> Result<u32, RepositoryError> {
        let bytes = self.get_bytes(&self.latest_url()).await?;
        let comic = Comic::from_json(&bytes)?;
        Ok(comic.number)
    }

    async fn fetch_comic(&self, number: u32) -> Result<Comic, RepositoryError> {
        let url = self.comic_url(number);
        let response = self.get(&url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(RepositoryError::NotFound(number)),
            status if !status.is_success() => Err(RepositoryError::Status { url, status }),
            _ => {
                let bytes = response.bytes().await?;
                Ok(Comic::from_json(&bytes)?)
            }
        }
    }

    async fn fetch_image(&self, comic: &Comic) -> Result<DecodedImage, RepositoryError> {
        let bytes = self.get_bytes(comic.image.as_str()).await?;
        // Decoding is CPU-bound, keep it off the async workers.
        tokio::task::spawn_blocking(move || decode_image(&bytes))
            .await?
            .map_err(RepositoryError::InvalidImage)
    }
}
