use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Create `dir` (and any missing parents) unless it already exists.
///
/// A plain file sitting where the directory should be is removed first.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => {
            log::warn!("Replacing non-directory at {}", dir.display());
            fs::remove_file(dir)?;
            fs::create_dir_all(dir)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    path.with_file_name(format!(".{}.tmp-{}", name, std::process::id()))
}

/// Write `contents` to `path` so readers see either the old file or the new
/// one, never a partial write.
///
/// The data goes to a sibling temp file which is synced and then renamed over
/// the destination. The parent directory must exist.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = temp_path_for(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
