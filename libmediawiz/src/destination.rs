use crate::errors::{MwError, Result};
use crate::session::{Destination, DownloadKind};
use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const SINGLE_TEMPLATE: &str = "%(title)s.%(ext)s";
pub const COLLECTION_TEMPLATE: &str = "%(playlist_index)s - %(title)s.%(ext)s";
/// The download tool creates the collection folder itself through this template.
pub const COLLECTION_TITLE_TEMPLATE: &str = "%(playlist_title)s/%(playlist_index)s - %(title)s.%(ext)s";

/// Directories that never hold downloaded content.
const NON_CONTENT_DIRS: [&str; 2] = ["__pycache__", "node_modules"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDestination {
    pub dir: PathBuf,
    pub template: String,
    /// True when the real folder is only known after the download finished.
    pub deferred: bool,
}

/// Works out where files will go without touching the filesystem.
pub fn plan(kind: DownloadKind, destination: &Destination, base: &Path) -> ResolvedDestination {
    let template = match kind {
        DownloadKind::Single => SINGLE_TEMPLATE,
        DownloadKind::Collection => COLLECTION_TEMPLATE,
    };
    let dir = match destination {
        Destination::CurrentDir | Destination::CollectionTitle => base.to_path_buf(),
        Destination::NewSubdir(name) => base.join(name),
        Destination::ExistingSubdir(name) => base.join(name),
        Destination::Path(path) if path.is_absolute() => path.clone(),
        Destination::Path(path) => base.join(path),
    };
    if *destination == Destination::CollectionTitle {
        return ResolvedDestination {
            dir,
            template: COLLECTION_TITLE_TEMPLATE.to_string(),
            deferred: true,
        };
    }
    ResolvedDestination {
        dir,
        template: template.to_string(),
        deferred: false,
    }
}

/// Like [`plan`], but guarantees the directory exists on return.
#[tracing::instrument]
pub async fn resolve(
    kind: DownloadKind,
    destination: &Destination,
    base: &Path,
) -> Result<ResolvedDestination> {
    let resolved = plan(kind, destination, base);
    if let Err(e) = fs::create_dir_all(&resolved.dir).await {
        tracing::error!("Failed to create destination directory\nError : {}", e);
        return Err(MwError::ErrorCreatingDestinationDirectory {
            path: resolved.dir.to_string_lossy().to_string(),
            message: format!("{} | {}", e, e.kind()),
        });
    }
    Ok(resolved)
}

/// Checks a folder name typed by the user. It must name a direct child of the base directory.
pub fn validate_subdir_name(name: &str) -> std::result::Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("The folder name can't be empty.".to_string());
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(format!(
            "\"{name}\" is not a plain folder name. Use the custom path option for nested paths."
        ));
    }
    Ok(name.to_string())
}

fn is_content_dir(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    !name.starts_with('.') && !NON_CONTENT_DIRS.iter().any(|d| name == *d)
}

/// Visible subdirectories of `base` as bare folder names, sorted.
pub fn list_subdirectories(base: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(base).map_err(|e| MwError::file_op(base, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MwError::file_op(base, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        if is_content_dir(&name) {
            names.push(PathBuf::from(name));
        }
    }
    names.sort();
    Ok(names)
}

/// Entry names of every subdirectory of a folder, keyed by subdirectory path.
pub type DirSnapshot = HashMap<PathBuf, HashSet<OsString>>;

async fn entry_names(dir: &Path) -> Result<HashSet<OsString>> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| MwError::file_op(dir, e))?;
    let mut names = HashSet::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| MwError::file_op(dir, e))?
    {
        names.insert(entry.file_name());
    }
    Ok(names)
}

pub async fn snapshot_subdirectories(base: &Path) -> Result<DirSnapshot> {
    let mut entries = fs::read_dir(base)
        .await
        .map_err(|e| MwError::file_op(base, e))?;
    let mut dirs = HashMap::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| MwError::file_op(base, e))?
    {
        let path = entry.path();
        if path.is_dir() {
            let names = entry_names(&path).await?;
            dirs.insert(path, names);
        }
    }
    Ok(dirs)
}

/// Finds the folder the download tool named after the collection. A content folder
/// that did not exist before wins; otherwise an existing one that gained entries.
/// `None` when neither shows up.
#[tracing::instrument(skip(before))]
pub async fn discover_collection_dir(base: &Path, before: &DirSnapshot) -> Option<PathBuf> {
    let after = match snapshot_subdirectories(base).await {
        Ok(dirs) => dirs,
        Err(e) => {
            tracing::warn!("Could not list {} after download. {}", base.display(), e);
            return None;
        }
    };
    let mut created = Vec::new();
    let mut grown = Vec::new();
    for (dir, names) in after {
        if !dir.file_name().map(is_content_dir).unwrap_or(false) {
            continue;
        }
        match before.get(&dir) {
            None => created.push(dir),
            Some(old) if !names.is_subset(old) => grown.push(dir),
            Some(_) => {}
        }
    }
    created.sort();
    grown.sort();
    match created.into_iter().chain(grown).next() {
        Some(dir) => {
            tracing::info!("Collection folder found at {}", dir.display());
            Some(dir)
        }
        None => {
            tracing::warn!("No collection folder found under {}", base.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_dir_single_template() {
        let resolved = plan(DownloadKind::Single, &Destination::CurrentDir, Path::new("."));
        assert_eq!(resolved.dir, PathBuf::from("."));
        assert_eq!(resolved.template, "%(title)s.%(ext)s");
        assert!(!resolved.deferred);
    }

    #[test]
    fn test_collection_template_has_index() {
        let resolved = plan(
            DownloadKind::Collection,
            &Destination::NewSubdir("music".to_string()),
            Path::new("/base"),
        );
        assert_eq!(resolved.dir, PathBuf::from("/base/music"));
        assert!(resolved.template.contains("%(playlist_index)s"));
    }

    #[test]
    fn test_absolute_and_relative_paths() {
        let absolute = plan(
            DownloadKind::Single,
            &Destination::Path(PathBuf::from("/srv/media")),
            Path::new("/base"),
        );
        assert_eq!(absolute.dir, PathBuf::from("/srv/media"));
        let relative = plan(
            DownloadKind::Single,
            &Destination::Path(PathBuf::from("a/b")),
            Path::new("/base"),
        );
        assert_eq!(relative.dir, PathBuf::from("/base/a/b"));
    }

    #[test]
    fn test_collection_title_is_deferred() {
        let resolved = plan(
            DownloadKind::Collection,
            &Destination::CollectionTitle,
            Path::new("/base"),
        );
        assert!(resolved.deferred);
        assert_eq!(resolved.dir, PathBuf::from("/base"));
        assert!(resolved.template.starts_with("%(playlist_title)s/"));
    }

    #[test]
    fn test_subdir_name_validation() {
        assert_eq!(validate_subdir_name("  clips "), Ok("clips".to_string()));
        assert!(validate_subdir_name("").is_err());
        assert!(validate_subdir_name("..").is_err());
        assert!(validate_subdir_name("a/b").is_err());
    }

    #[tokio::test]
    async fn test_resolve_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve(
            DownloadKind::Single,
            &Destination::Path(PathBuf::from("nested/dir")),
            tmp.path(),
        )
        .await
        .unwrap();
        assert!(resolved.dir.is_dir());
    }

    #[tokio::test]
    async fn test_resolve_fails_on_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("taken"), b"x").unwrap();
        let res = resolve(
            DownloadKind::Single,
            &Destination::NewSubdir("taken".to_string()),
            tmp.path(),
        )
        .await;
        assert!(matches!(
            res,
            Err(MwError::ErrorCreatingDestinationDirectory { .. })
        ));
    }

    #[test]
    fn test_listing_skips_hidden_and_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("b")).unwrap();
        std::fs::create_dir(tmp.path().join("a")).unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        std::fs::write(tmp.path().join("file.txt"), b"x").unwrap();
        assert_eq!(
            list_subdirectories(tmp.path()).unwrap(),
            vec![PathBuf::from("a"), PathBuf::from("b")]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_listed_non_utf8_name_resolves_to_same_dir() {
        use std::os::unix::ffi::OsStrExt;
        let tmp = tempfile::tempdir().unwrap();
        let raw = OsStr::from_bytes(b"caf\xe9");
        std::fs::create_dir(tmp.path().join(raw)).unwrap();
        let listed = list_subdirectories(tmp.path()).unwrap();
        assert_eq!(listed, vec![PathBuf::from(raw)]);
        let destination = Destination::ExistingSubdir(listed[0].clone());
        let resolved = resolve(DownloadKind::Single, &destination, tmp.path())
            .await
            .unwrap();
        assert_eq!(resolved.dir, tmp.path().join(raw));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_discover_new_collection_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("old")).unwrap();
        let before = snapshot_subdirectories(tmp.path()).await.unwrap();
        std::fs::create_dir(tmp.path().join(".cache")).unwrap();
        std::fs::create_dir(tmp.path().join("My Playlist")).unwrap();
        let found = discover_collection_dir(tmp.path(), &before).await;
        assert_eq!(found, Some(tmp.path().join("My Playlist")));
    }

    #[tokio::test]
    async fn test_discover_existing_dir_that_gained_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("Archive")).unwrap();
        std::fs::create_dir(tmp.path().join("My List")).unwrap();
        std::fs::write(tmp.path().join("My List/0 - old.mkv"), b"x").unwrap();
        let before = snapshot_subdirectories(tmp.path()).await.unwrap();
        std::fs::write(tmp.path().join("My List/1 - clip.mkv"), b"x").unwrap();
        let found = discover_collection_dir(tmp.path(), &before).await;
        assert_eq!(found, Some(tmp.path().join("My List")));
    }

    #[tokio::test]
    async fn test_new_dir_wins_over_grown_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("a")).unwrap();
        let before = snapshot_subdirectories(tmp.path()).await.unwrap();
        std::fs::write(tmp.path().join("a/file"), b"x").unwrap();
        std::fs::create_dir(tmp.path().join("z")).unwrap();
        let found = discover_collection_dir(tmp.path(), &before).await;
        assert_eq!(found, Some(tmp.path().join("z")));
    }

    #[tokio::test]
    async fn test_discover_nothing_new() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("untouched")).unwrap();
        let before = snapshot_subdirectories(tmp.path()).await.unwrap();
        std::fs::create_dir(tmp.path().join("node_modules")).unwrap();
        std::fs::write(tmp.path().join("loose.mkv"), b"x").unwrap();
        let found = discover_collection_dir(tmp.path(), &before).await;
        assert_eq!(found, None);
    }
}
