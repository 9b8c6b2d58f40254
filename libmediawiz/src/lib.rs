use crate::command::{retrieval_args, run_tool, subtitle_args, Tool};
use crate::destination::{discover_collection_dir, resolve, snapshot_subdirectories, DirSnapshot};
use crate::postprocess::{embed_subtitles, EmbedReport};
use crate::session::{Destination, DownloadRequest};
use crate::toolchain::Toolchain;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::instrument;

pub mod command;
pub mod destination;
pub mod errors;
pub mod mapping;
pub mod postprocess;
pub mod session;
pub mod subtitle;
pub mod toolchain;
pub mod wizard;

pub use errors::{MwError, Result};

/// What happened after the wizard handed over a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Folder the files ended up in. Only a best guess for playlist-titled folders.
    pub destination: PathBuf,
    pub retrieval_succeeded: bool,
    /// `None` when no subtitles were requested.
    pub subtitles_succeeded: Option<bool>,
    /// `None` when nothing had to be embedded.
    pub embedding: Option<EmbedReport>,
    /// The playlist folder could not be identified and `destination` is the base folder.
    pub used_fallback_dir: bool,
    /// Subtitles were requested but left as separate files because the folder holding
    /// them is unknown.
    pub embedding_skipped: bool,
}

async fn run_step(tool: &Tool, args: &[OsString]) -> bool {
    match run_tool(tool, args).await {
        Ok(status) => status.success(),
        Err(e) => {
            tracing::error!("{}", e);
            false
        }
    }
}

/// Runs the download, the optional subtitle download and the subtitle embedding, one
/// process at a time. Failed tools are reported, not retried.
#[instrument(skip(toolchain))]
pub async fn execute(
    request: &DownloadRequest,
    toolchain: &Toolchain,
    base_dir: &Path,
) -> Result<Report> {
    let before: DirSnapshot = if request.destination == Destination::CollectionTitle {
        snapshot_subdirectories(base_dir).await?
    } else {
        DirSnapshot::new()
    };

    let resolved = resolve(request.kind, &request.destination, base_dir).await?;
    tracing::info!(
        "Downloading {} into {} as {}",
        request.url,
        resolved.dir.display(),
        resolved.template
    );

    let retrieval_succeeded = run_step(
        &toolchain.downloader,
        &retrieval_args(request, &resolved),
    )
    .await;

    let subtitles_succeeded = if request.subtitles {
        Some(run_step(&toolchain.downloader, &subtitle_args(request, &resolved)).await)
    } else {
        None
    };

    let (destination, used_fallback_dir) = if resolved.deferred {
        match discover_collection_dir(&resolved.dir, &before).await {
            Some(found) => (found, false),
            None => (resolved.dir.clone(), true),
        }
    } else {
        (resolved.dir.clone(), false)
    };

    // The subtitle sweep must never run on a folder that was only guessed.
    let embedding_skipped = request.embeds_subtitles() && used_fallback_dir;
    let embedding = if embedding_skipped {
        tracing::warn!("Playlist folder unknown, subtitles are left as separate files");
        None
    } else if request.embeds_subtitles() {
        let ext = mapping::extension(request.format);
        Some(embed_subtitles(&destination, ext, &toolchain.cleaner, &toolchain.muxer).await?)
    } else {
        None
    };

    Ok(Report {
        destination,
        retrieval_succeeded,
        subtitles_succeeded,
        embedding,
        used_fallback_dir,
        embedding_skipped,
    })
}
