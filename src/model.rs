use chrono::NaiveDate;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Comic
// ---------------------------------------------------------------------------

/// One dated entry in the catalog.
///
/// Comics are only ever built by decoding the metadata format served by the
/// remote endpoint (and mirrored by the fixture set), see [`Comic::from_json`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comic {
    /// Serial number. Unique, and also the publication order.
    pub number: u32,
    pub title: String,
    pub date: NaiveDate,
    /// Where the comic's picture lives.
    pub image: Url,
    /// Alt text.
    pub description: String,
}

#[derive(Error, Debug)]
pub enum ComicError {
    #[error("malformed comic metadata: {0}")]
    Json(#[from] serde_json::Error),
    #[error("comic number must be at least 1, got {0}")]
    InvalidNumber(i64),
    #[error("field '{field}' must contain an integer, got {value:?}")]
    InvalidInteger { field: &'static str, value: String },
    #[error("{year}-{month}-{day} is not a valid date")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("field 'img' must contain a valid URL, got {value:?}: {reason}")]
    InvalidUrl { value: String, reason: String },
}

/// Wire shape of the metadata endpoint. Only the fields we consume.
#[derive(Debug, Deserialize)]
pub(crate) struct RawComic {
    num: i64,
    title: String,
    day: String,
    month: String,
    year: String,
    img: String,
    alt: String,
}

fn parse_int<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ComicError> {
    value.parse().map_err(|_| ComicError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

impl TryFrom<RawComic> for Comic {
    type Error = ComicError;

    fn try_from(raw: RawComic) -> Result<Self, Self::Error> {
        let number = u32::try_from(raw.num)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or(ComicError::InvalidNumber(raw.num))?;

        let day: u32 = parse_int("day", &raw.day)?;
        let month: u32 = parse_int("month", &raw.month)?;
        let year: i32 = parse_int("year", &raw.year)?;
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(ComicError::InvalidDate { year, month, day })?;

        let image = Url::parse(&raw.img).map_err(|e| ComicError::InvalidUrl {
            value: raw.img.clone(),
            reason: e.to_string(),
        })?;

        Ok(Comic {
            number,
            title: raw.title,
            date,
            image,
            description: raw.alt,
        })
    }
}

impl Comic {
    /// Decode a single comic from the metadata JSON format.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ComicError> {
        let raw: RawComic = serde_json::from_slice(bytes)?;
        Comic::try_from(raw)
    }

    /// Decode a JSON array of comics, in file order.
    pub fn list_from_json(bytes: &[u8]) -> Result<Vec<Self>, ComicError> {
        let raw: Vec<RawComic> = serde_json::from_slice(bytes)?;
        raw.into_iter().map(Comic::try_from).collect()
    }

    /// Last path segment of the image URL, e.g. `barrel.png`.
    pub fn image_file_name(&self) -> Option<&str> {
        self.image
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

/// The reduced, persisted shape of a favorite comic.
///
/// Kept separate from [`Comic`] because the comic's serialized form is tied to
/// the remote metadata format; this one is ours.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub number: u32,
    pub title: String,
    pub date: NaiveDate,
}

impl From<&Comic> for FavoriteEntry {
    fn from(comic: &Comic) -> Self {
        FavoriteEntry {
            number: comic.number,
            title: comic.title.clone(),
            date: comic.date,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_comic(number: u32) -> Comic {
    Comic {
        number,
        title: format!("Comic {}", number),
        date: NaiveDate::from_ymd_opt(2006, 1, 1).unwrap(),
        image: Url::parse(&format!("https://imgs.example.com/comics/{}.png", number)).unwrap(),
        description: "alt text".to_string(),
    }
}
