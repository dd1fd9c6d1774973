use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{types::ScrapeError, utils::default_output_dir};

/// Picks the output directory.
///
/// A user supplied path must already exist; it is never created. When it is
/// missing (or not given) the default `<home>/Videos/TikTok` is used and
/// created on demand.
pub fn resolve_directory(
    requested: Option<&Path>,
    home: Option<PathBuf>,
) -> Result<PathBuf, ScrapeError> {
    if let Some(dir) = requested {
        if dir.is_dir() {
            return Ok(dir.to_path_buf());
        }
        warn!("provided path {} does not exist", dir.display());
    }

    let home = home.ok_or_else(|| {
        ScrapeError::Directory("could not determine the home directory".to_string())
    })?;
    let directory = default_output_dir(home);

    fs::create_dir_all(&directory).map_err(|e| {
        ScrapeError::Directory(format!("could not create {}: {}", directory.display(), e))
    })?;
    debug!("using output directory {}", directory.display());

    Ok(directory)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn existing_user_dir_is_used_as_is() {
        let home = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let d = resolve_directory(Some(target.path()), Some(home.path().to_path_buf())).unwrap();
        assert_eq!(d, target.path());
        assert!(!home.path().join("Videos").exists());
    }

    #[test]
    fn missing_user_dir_falls_back_to_default() {
        let home = tempfile::tempdir().unwrap();
        let missing = home.path().join("not-there");
        let d = resolve_directory(Some(&missing), Some(home.path().to_path_buf())).unwrap();
        assert_eq!(d, home.path().join("Videos").join("TikTok"));
        assert!(d.is_dir());
        assert!(!missing.exists());
    }

    #[test]
    fn default_is_created() {
        let home = tempfile::tempdir().unwrap();
        let d = resolve_directory(None, Some(home.path().to_path_buf())).unwrap();
        assert!(d.is_dir());
    }

    #[test]
    fn creation_failure_is_fatal() {
        let home = tempfile::tempdir().unwrap();
        // a regular file where the Videos directory should go
        fs::write(home.path().join("Videos"), b"x").unwrap();
        let err = resolve_directory(None, Some(home.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ScrapeError::Directory(_)));
    }

    #[test]
    fn unknown_home_is_fatal() {
        assert!(matches!(
            resolve_directory(None, None),
            Err(ScrapeError::Directory(_))
        ));
    }
}
