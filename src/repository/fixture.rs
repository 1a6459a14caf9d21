use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ComicRepository, RepositoryError};
use crate::loader::{decode_image, DecodedImage};
use crate::model::Comic;

/// The data set shipped with the crate.
pub const BUNDLED_FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

/// Serves comics from a local directory laid out as:
///
/// ```text
/// <dir>/comics.json        array of comics in the remote metadata format
/// <dir>/images/<name>      one picture per comic, named after its image URL
/// ```
///
/// Everything is read and decoded once in [`FixtureRepository::load`]. After
/// that the synchronous accessors cannot fail; asking for a number outside
/// `1..=latest` is a programming error and panics.
#[derive(Debug)]
pub struct FixtureRepository {
    comics: Vec<Comic>,
    images: Vec<DecodedImage>,
}

fn read(path: &Path) -> Result<Vec<u8>, RepositoryError> {
    fs::read(path).map_err(|source| RepositoryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl FixtureRepository {
    pub fn bundled() -> Result<Self, RepositoryError> {
        Self::load(Path::new(BUNDLED_FIXTURES))
    }

    pub fn load(dir: &Path) -> Result<Self, RepositoryError> {
        let mut comics = Comic::list_from_json(&read(&dir.join("comics.json"))?)?;
        comics.sort_by_key(|c| c.number);

        if comics.is_empty() {
            return Err(RepositoryError::Fixture("no comics".to_string()));
        }
        // Numbers double as indices, so they must run 1..=N without gaps.
        for (index, comic) in comics.iter().enumerate() {
            if comic.number as usize != index + 1 {
                return Err(RepositoryError::Fixture(format!(
                    "expected comic {} but found {}",
                    index + 1,
                    comic.number
                )));
            }
        }

        let mut images = Vec::with_capacity(comics.len());
        for comic in &comics {
            let name = comic.image_file_name().ok_or_else(|| {
                RepositoryError::Fixture(format!("comic {} has no image file name", comic.number))
            })?;
            let path: PathBuf = dir.join("images").join(name);
            let decoded = decode_image(&read(&path)?).map_err(RepositoryError::InvalidImage)?;
            images.push(decoded);
        }

        log::info!("Loaded {} fixture comics from {}", comics.len(), dir.display());
        Ok(Self { comics, images })
    }

    pub fn latest_comic_number(&self) -> u32 {
        self.comics.len() as u32
    }

    fn index(&self, number: u32) -> usize {
        assert!(
            (1..=self.latest_comic_number()).contains(&number),
            "fixture comic {} is out of range 1..={}",
            number,
            self.latest_comic_number()
        );
        number as usize - 1
    }

    /// Panics if `number` is outside `1..=latest_comic_number()`.
    pub fn comic(&self, number: u32) -> Comic {
        self.comics[self.index(number)].clone()
    }

    /// Panics if `comic` is not part of this fixture set.
    pub fn image(&self, comic: &Comic) -> DecodedImage {
        self.images[self.index(comic.number)].clone()
    }

    fn contains(&self, number: u32) -> bool {
        (1..=self.latest_comic_number()).contains(&number)
    }
}

#[async_trait]
impl ComicRepository for FixtureRepository {
    async fn fetch_latest_comic_number(&self) -> Result<u32, RepositoryError> {
        Ok(self.latest_comic_number())
    }

    async fn fetch_comic(&self, number: u32) -> Result<Comic, RepositoryError> {
        if !self.contains(number) {
            return Err(RepositoryError::NotFound(number));
        }
        Ok(self.comic(number))
    }

    async fn fetch_image(&self, comic: &Comic) -> Result<DecodedImage, RepositoryError> {
        if !self.contains(comic.number) {
            return Err(RepositoryError::NotFound(comic.number));
        }
        Ok(self.image(comic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_set_is_sorted_and_complete() {
        let repo = FixtureRepository::bundled().unwrap();
        assert_eq!(repo.latest_comic_number(), 5);
        for number in 1..=5 {
            assert_eq!(repo.comic(number).number, number);
        }
        assert_eq!(repo.comic(1).title, "Barrel - Part 1");

        let image = repo.image(&repo.comic(2));
        assert_eq!((image.width, image.height), (413, 360));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_is_a_precondition_failure() {
        let repo = FixtureRepository::bundled().unwrap();
        repo.comic(6);
    }

    #[tokio::test]
    async fn trait_access_reports_missing_numbers() {
        let repo = FixtureRepository::bundled().unwrap();
        assert_eq!(repo.fetch_latest_comic_number().await.unwrap(), 5);
        assert_eq!(repo.fetch_comic(4).await.unwrap().title, "Landscape (sketch)");
        assert!(matches!(
            repo.fetch_comic(0).await,
            Err(RepositoryError::NotFound(0))
        ));
    }

    #[test]
    fn gaps_in_numbering_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("comics.json"),
            r#"[{"num": 2, "title": "t", "day": "1", "month": "1", "year": "2006",
                 "img": "https://imgs.example.com/a.png", "alt": "a"}]"#,
        )
        .unwrap();
        let err = FixtureRepository::load(dir.path()).unwrap_err();
        assert!(matches!(err, RepositoryError::Fixture(_)));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FixtureRepository::load(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, RepositoryError::Io { .. }));
    }
}
