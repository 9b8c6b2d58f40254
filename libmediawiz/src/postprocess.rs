use crate::command::{cleaner_args, remux_args, run_tool, Tool, SUBTITLE_LANGUAGE};
use crate::errors::{MwError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

const CLEANED_SUFFIX: &str = "clean.srt";
/// Marks the remux output while it is being written next to the original.
const TEMP_MARKER: &str = "embedding";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmbedReport {
    pub embedded: Vec<PathBuf>,
    pub missing_subtitles: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    /// Subtitle files deleted by the final sweep.
    pub removed_subtitles: Vec<PathBuf>,
}

pub fn subtitle_sidecar(media: &Path) -> PathBuf {
    media.with_extension(format!("{SUBTITLE_LANGUAGE}.srt"))
}

pub fn cleaned_sidecar(media: &Path) -> PathBuf {
    media.with_extension(CLEANED_SUFFIX)
}

fn temp_output(media: &Path, extension: &str) -> PathBuf {
    media.with_extension(format!("{TEMP_MARKER}.{extension}"))
}

fn is_temp_output(path: &Path) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy().ends_with(&format!(".{TEMP_MARKER}")))
        .unwrap_or(false)
}

async fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| MwError::file_op(dir, e))?;
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| MwError::file_op(dir, e))?
    {
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove {}\nError : {}", path.display(), e);
        }
    }
}

enum Outcome {
    Embedded,
    /// The path is a subtitle that must survive the final sweep.
    Failed(PathBuf),
}

async fn embed_one(
    media: &Path,
    subtitle: &Path,
    extension: &str,
    cleaner: &Tool,
    muxer: &Tool,
) -> Outcome {
    let cleaned = cleaned_sidecar(media);
    match run_tool(cleaner, &cleaner_args(subtitle, &cleaned)).await {
        Ok(status) if status.success() && cleaned.is_file() => {}
        Ok(status) => {
            tracing::error!("Cleaning {} failed with {}", subtitle.display(), status);
            return Outcome::Failed(subtitle.to_path_buf());
        }
        Err(e) => {
            tracing::error!("{}", e);
            return Outcome::Failed(subtitle.to_path_buf());
        }
    }

    let temp = temp_output(media, extension);
    let remuxed = match run_tool(muxer, &remux_args(media, &cleaned, &temp)).await {
        Ok(status) => status.success() && temp.is_file(),
        Err(e) => {
            tracing::error!("{}", e);
            false
        }
    };
    if !remuxed {
        remove_quietly(&temp).await;
        return Outcome::Failed(cleaned);
    }

    if let Err(e) = fs::rename(&temp, media).await {
        tracing::error!(
            "Error replacing {} with {}\nError : {}",
            media.display(),
            temp.display(),
            e
        );
        remove_quietly(&temp).await;
        return Outcome::Failed(cleaned);
    }
    remove_quietly(subtitle).await;
    remove_quietly(&cleaned).await;
    Outcome::Embedded
}

/// Embeds `<base>.en.srt` into every `<base>.<extension>` in `dir`, then deletes the
/// leftover subtitle files. Cleaned subtitles of failed items are kept for manual use.
#[tracing::instrument(skip(cleaner, muxer))]
pub async fn embed_subtitles(
    dir: &Path,
    extension: &str,
    cleaner: &Tool,
    muxer: &Tool,
) -> Result<EmbedReport> {
    let mut report = EmbedReport::default();
    let mut preserved: HashSet<PathBuf> = HashSet::new();

    let media_files: Vec<PathBuf> = files_in(dir)
        .await?
        .into_iter()
        .filter(|p| p.extension().map(|e| e == extension).unwrap_or(false))
        .filter(|p| !is_temp_output(p))
        .collect();
    tracing::debug!("Found {} media files in {}", media_files.len(), dir.display());

    for media in media_files {
        let subtitle = subtitle_sidecar(&media);
        if !subtitle.is_file() {
            tracing::info!("No subtitle for {}", media.display());
            report.missing_subtitles.push(media);
            continue;
        }
        match embed_one(&media, &subtitle, extension, cleaner, muxer).await {
            Outcome::Embedded => {
                tracing::info!("Embedded subtitles into {}", media.display());
                report.embedded.push(media);
            }
            Outcome::Failed(keep) => {
                tracing::warn!(
                    "Embedding failed for {}, keeping {}",
                    media.display(),
                    keep.display()
                );
                preserved.insert(keep);
                report.failed.push(media);
            }
        }
    }

    for file in files_in(dir).await? {
        let is_subtitle = file.extension().map(|e| e == "srt").unwrap_or(false);
        if is_subtitle && !preserved.contains(&file) {
            remove_quietly(&file).await;
            report.removed_subtitles.push(file);
        }
    }
    Ok(report)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn cleaner() -> Tool {
        Tool::new("cleaner", "sh").with_leading_args(["-c", r#"cp "$1" "$2""#, "cleaner"])
    }

    /// Writes a fake output file at the last argument, failing for media named `fail*`.
    fn muxer() -> Tool {
        Tool::new("ffmpeg", "sh").with_leading_args([
            "-c",
            r#"case "$*" in *fail*) exit 1;; esac; for a in "$@"; do last="$a"; done; echo remuxed > "$last""#,
            "ffmpeg",
        ])
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), name).unwrap();
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_sidecar_names() {
        let media = Path::new("/x/Some.Title.mkv");
        assert_eq!(subtitle_sidecar(media), PathBuf::from("/x/Some.Title.en.srt"));
        assert_eq!(cleaned_sidecar(media), PathBuf::from("/x/Some.Title.clean.srt"));
        assert!(is_temp_output(&temp_output(media, "mkv")));
        assert!(!is_temp_output(media));
    }

    #[tokio::test]
    async fn test_embeds_only_paired_media() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.mkv");
        touch(tmp.path(), "b.mkv");
        touch(tmp.path(), "a.en.srt");

        let report = embed_subtitles(tmp.path(), "mkv", &cleaner(), &muxer())
            .await
            .unwrap();

        assert_eq!(report.embedded, vec![tmp.path().join("a.mkv")]);
        assert_eq!(report.missing_subtitles, vec![tmp.path().join("b.mkv")]);
        assert!(report.failed.is_empty());
        assert_eq!(names(tmp.path()), vec!["a.mkv", "b.mkv"]);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("a.mkv")).unwrap(),
            "remuxed\n"
        );
        assert_eq!(std::fs::read_to_string(tmp.path().join("b.mkv")).unwrap(), "b.mkv");
    }

    #[tokio::test]
    async fn test_failed_remux_keeps_original_and_cleaned_subtitle() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "fail.mkv");
        touch(tmp.path(), "fail.en.srt");
        touch(tmp.path(), "ok.mkv");
        touch(tmp.path(), "ok.en.srt");
        touch(tmp.path(), "orphan.en.srt");

        let report = embed_subtitles(tmp.path(), "mkv", &cleaner(), &muxer())
            .await
            .unwrap();

        assert_eq!(report.failed, vec![tmp.path().join("fail.mkv")]);
        assert_eq!(report.embedded, vec![tmp.path().join("ok.mkv")]);
        assert_eq!(names(tmp.path()), vec!["fail.clean.srt", "fail.mkv", "ok.mkv"]);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("fail.mkv")).unwrap(),
            "fail.mkv"
        );
        assert!(report
            .removed_subtitles
            .contains(&tmp.path().join("orphan.en.srt")));
    }

    #[tokio::test]
    async fn test_failed_cleaning_keeps_raw_subtitle() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.mkv");
        touch(tmp.path(), "a.en.srt");
        let broken = Tool::new("cleaner", "sh").with_leading_args(["-c", "exit 1", "cleaner"]);

        let report = embed_subtitles(tmp.path(), "mkv", &broken, &muxer())
            .await
            .unwrap();

        assert_eq!(report.failed, vec![tmp.path().join("a.mkv")]);
        assert_eq!(names(tmp.path()), vec!["a.en.srt", "a.mkv"]);
    }

    #[tokio::test]
    async fn test_other_extensions_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.mp4");
        touch(tmp.path(), "a.en.srt");

        let report = embed_subtitles(tmp.path(), "mkv", &cleaner(), &muxer())
            .await
            .unwrap();

        assert!(report.embedded.is_empty());
        assert!(report.missing_subtitles.is_empty());
        assert_eq!(names(tmp.path()), vec!["a.mp4"]);
    }
}
