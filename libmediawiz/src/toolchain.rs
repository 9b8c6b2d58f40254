use crate::command::Tool;
use crate::errors::{MwError, Result};
use phf::phf_map;
use std::path::{Path, PathBuf};
use which::which;

pub const DOWNLOADER: &str = "yt-dlp";
pub const MUXER: &str = "ffmpeg";
pub const CLEANER: &str = "srtclean";

#[derive(Debug, Clone, Default)]
pub struct ToolOverrides {
    pub downloader: Option<PathBuf>,
    pub muxer: Option<PathBuf>,
    pub cleaner: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Toolchain {
    pub downloader: Tool,
    pub muxer: Tool,
    pub cleaner: Tool,
}

impl Toolchain {
    /// Locates every external program. All missing tools are reported together.
    #[tracing::instrument]
    pub fn discover(overrides: &ToolOverrides) -> Result<Toolchain> {
        let downloader = locate(DOWNLOADER, overrides.downloader.as_deref(), None);
        let muxer = locate(MUXER, overrides.muxer.as_deref(), None);
        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let cleaner = locate(CLEANER, overrides.cleaner.as_deref(), beside_exe.as_deref());

        match (downloader, muxer, cleaner) {
            (Some(downloader), Some(muxer), Some(cleaner)) => Ok(Toolchain {
                downloader: Tool::new(DOWNLOADER, downloader),
                muxer: Tool::new(MUXER, muxer),
                cleaner: Tool::new(CLEANER, cleaner),
            }),
            (downloader, muxer, cleaner) => {
                let missing: Vec<String> = [
                    (DOWNLOADER, downloader.is_none()),
                    (MUXER, muxer.is_none()),
                    (CLEANER, cleaner.is_none()),
                ]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(name, _)| name.to_string())
                .collect();
                tracing::error!("Missing tools : {:?}", missing);
                Err(MwError::MissingDependencies(missing))
            }
        }
    }
}

/// An override wins when it points at a file; otherwise `dir` is searched, then `PATH`.
fn locate(name: &str, override_path: Option<&Path>, dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        tracing::warn!("Configured path for {} is not a file : {}", name, path.display());
        return None;
    }
    if let Some(dir) = dir {
        let candidate = dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    match which(name) {
        Ok(path) => {
            tracing::debug!("Found {} at {}", name, path.display());
            Some(path)
        }
        Err(e) => {
            tracing::debug!("{} not found on PATH. {}", name, e);
            None
        }
    }
}

#[cfg(target_os = "linux")]
static INSTALL_HINTS: phf::Map<&'static str, &'static str> = phf_map! {
    "yt-dlp" => "sudo apt install yt-dlp  (or: python3 -m pip install -U yt-dlp)",
    "ffmpeg" => "sudo apt install ffmpeg  (dnf/pacman: install the ffmpeg package)",
    "srtclean" => "cargo install --path srtclean  (or build the workspace and keep it next to mediawiz)",
};

#[cfg(target_os = "macos")]
static INSTALL_HINTS: phf::Map<&'static str, &'static str> = phf_map! {
    "yt-dlp" => "brew install yt-dlp",
    "ffmpeg" => "brew install ffmpeg",
    "srtclean" => "cargo install --path srtclean  (or build the workspace and keep it next to mediawiz)",
};

#[cfg(target_os = "windows")]
static INSTALL_HINTS: phf::Map<&'static str, &'static str> = phf_map! {
    "yt-dlp" => "winget install yt-dlp.yt-dlp",
    "ffmpeg" => "winget install Gyan.FFmpeg",
    "srtclean" => "cargo install --path srtclean  (or build the workspace and keep srtclean.exe next to mediawiz.exe)",
};

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
static INSTALL_HINTS: phf::Map<&'static str, &'static str> = phf_map! {
    "yt-dlp" => "python3 -m pip install -U yt-dlp",
    "ffmpeg" => "install ffmpeg with your system package manager",
    "srtclean" => "cargo install --path srtclean",
};

pub fn install_hint(tool: &str) -> &'static str {
    INSTALL_HINTS
        .get(tool)
        .copied()
        .unwrap_or("install it and make sure it is on your PATH")
}
