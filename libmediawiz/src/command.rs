use crate::destination::ResolvedDestination;
use crate::errors::{MwError, Result};
use crate::mapping;
use crate::session::{DownloadKind, DownloadRequest};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;

/// Language requested from the subtitle retrieval.
pub const SUBTITLE_LANGUAGE: &str = "en";

/// An external program plus any arguments that always precede the per-call ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub name: String,
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
}

impl Tool {
    pub fn new(name: &str, program: impl Into<PathBuf>) -> Tool {
        Tool {
            name: name.to_string(),
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Tool
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.leading_args);
        command
    }
}

fn playlist_args(request: &DownloadRequest) -> Vec<OsString> {
    match request.kind {
        DownloadKind::Single => vec!["--no-playlist".into()],
        DownloadKind::Collection => {
            let mut args: Vec<OsString> = vec!["--yes-playlist".into()];
            if let Some(range) = request.range {
                args.push("--playlist-start".into());
                args.push(range.start.to_string().into());
                args.push("--playlist-end".into());
                args.push(range.end.to_string().into());
            }
            args
        }
    }
}

fn output_args(destination: &ResolvedDestination) -> Vec<OsString> {
    vec![
        "-P".into(),
        destination.dir.clone().into_os_string(),
        "-o".into(),
        destination.template.clone().into(),
    ]
}

/// Arguments for the content retrieval. The locator always comes last, after `--`,
/// so it can never be read as an option.
pub fn retrieval_args(request: &DownloadRequest, destination: &ResolvedDestination) -> Vec<OsString> {
    let mut args: Vec<OsString> = mapping::format_args(request)
        .into_iter()
        .map(OsString::from)
        .collect();
    args.extend(playlist_args(request));
    args.extend(output_args(destination));
    args.push("--".into());
    args.push(request.url.as_str().into());
    args
}

pub fn subtitle_args(request: &DownloadRequest, destination: &ResolvedDestination) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--skip-download",
        "--write-subs",
        "--write-auto-subs",
        "--sub-langs",
        SUBTITLE_LANGUAGE,
        "--convert-subs",
        "srt",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.extend(playlist_args(request));
    args.extend(output_args(destination));
    args.push("--".into());
    args.push(request.url.as_str().into());
    args
}

pub fn cleaner_args(subtitle: &Path, cleaned: &Path) -> Vec<OsString> {
    vec![subtitle.into(), cleaned.into()]
}

/// Copies every existing stream unchanged and adds the subtitle as a new stream.
pub fn remux_args(media: &Path, subtitle: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        media.into(),
        "-i".into(),
        subtitle.into(),
    ];
    args.extend(
        [
            "-map",
            "0",
            "-map",
            "1",
            "-c",
            "copy",
            "-c:s",
            "srt",
            "-metadata:s:s:0",
            "language=eng",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

/// Renders an invocation for display only. Never passed to a shell.
pub fn display_command(tool: &Tool, args: &[OsString]) -> String {
    let mut parts = vec![tool.program.to_string_lossy().to_string()];
    parts.extend(
        tool.leading_args
            .iter()
            .map(|a| a.to_string_lossy().to_string()),
    );
    parts.extend(args.iter().map(|a| {
        let a = a.to_string_lossy();
        if a.is_empty() || a.contains(char::is_whitespace) {
            format!("\"{a}\"")
        } else {
            a.to_string()
        }
    }));
    parts.join(" ")
}

/// Spawns the tool with inherited stdio and waits for it to exit.
#[tracing::instrument(skip(tool), fields(tool = %tool.name))]
pub async fn run_tool(tool: &Tool, args: &[OsString]) -> Result<ExitStatus> {
    tracing::debug!("Running {}", display_command(tool, args));
    let mut command = tool.command();
    command.args(args);
    let status = match command.status().await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start {}\nError : {}", tool.name, e);
            return Err(MwError::ToolLaunchError {
                tool: tool.name.clone(),
                message: format!("{} | {}", e, e.kind()),
            });
        }
    };
    if status.success() {
        tracing::debug!("{} finished successfully", tool.name);
    } else {
        tracing::warn!("{} exited with {}", tool.name, status);
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        AudioQuality, ContentKind, Destination, MediaFormat, PlaylistRange, VideoQuality,
    };
    use url::Url;

    fn request(kind: DownloadKind) -> DownloadRequest {
        DownloadRequest {
            kind,
            url: Url::parse("https://www.youtube.com/watch?v=abc").unwrap(),
            range: None,
            content: ContentKind::Combined,
            video_quality: Some(VideoQuality::Best),
            audio_quality: Some(AudioQuality::Best),
            subtitles: false,
            format: MediaFormat::Mp4,
            destination: Destination::CurrentDir,
        }
    }

    fn current_dir() -> ResolvedDestination {
        ResolvedDestination {
            dir: PathBuf::from("."),
            template: "%(title)s.%(ext)s".to_string(),
            deferred: false,
        }
    }

    #[test]
    fn test_single_best_combined_command() {
        let args = retrieval_args(&request(DownloadKind::Single), &current_dir());
        assert_eq!(
            args,
            vec![
                "-f",
                "bestvideo+bestaudio/best",
                "--merge-output-format",
                "mp4",
                "--no-playlist",
                "-P",
                ".",
                "-o",
                "%(title)s.%(ext)s",
                "--",
                "https://www.youtube.com/watch?v=abc",
            ]
        );
    }

    #[test]
    fn test_same_request_same_command() {
        let first = retrieval_args(&request(DownloadKind::Collection), &current_dir());
        let second = retrieval_args(&request(DownloadKind::Collection), &current_dir());
        assert_eq!(first, second);
    }

    #[test]
    fn test_collection_range_is_forwarded() {
        let mut req = request(DownloadKind::Collection);
        req.url = Url::parse("https://www.youtube.com/playlist?list=PL123").unwrap();
        req.range = PlaylistRange::new(3, 7);
        let args = retrieval_args(&req, &current_dir());
        let start = args.iter().position(|a| a == "--playlist-start").unwrap();
        assert_eq!(args[start + 1], "3");
        assert_eq!(args[start + 2], "--playlist-end");
        assert_eq!(args[start + 3], "7");
        assert!(args.iter().any(|a| a == "--yes-playlist"));
    }

    #[test]
    fn test_locator_is_never_an_option() {
        let mut req = request(DownloadKind::Single);
        req.url = Url::parse("https://example.com/watch?v=a;rm -rf ~").unwrap();
        let args = retrieval_args(&req, &current_dir());
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args.last().unwrap(), req.url.as_str());
    }

    #[test]
    fn test_subtitle_args_skip_media() {
        let args = subtitle_args(&request(DownloadKind::Single), &current_dir());
        assert!(args.iter().any(|a| a == "--skip-download"));
        let langs = args.iter().position(|a| a == "--sub-langs").unwrap();
        assert_eq!(args[langs + 1], "en");
        assert!(!args.iter().any(|a| a == "-f"));
    }

    #[test]
    fn test_remux_copies_streams() {
        let args = remux_args(
            Path::new("a.mkv"),
            Path::new("a.clean.srt"),
            Path::new("a.embedding.mkv"),
        );
        assert_eq!(args.last().unwrap(), "a.embedding.mkv");
        let copy = args.iter().position(|a| a == "-c").unwrap();
        assert_eq!(args[copy + 1], "copy");
        assert!(args.iter().any(|a| a == "-c:s"));
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let tool = Tool::new("yt-dlp", "yt-dlp");
        let shown = display_command(&tool, &[OsString::from("-P"), OsString::from("My Videos")]);
        assert_eq!(shown, "yt-dlp -P \"My Videos\"");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_reports_exit_status() {
        let ok = Tool::new("sh", "sh").with_leading_args(["-c", "exit 0"]);
        assert!(run_tool(&ok, &[]).await.unwrap().success());
        let failing = Tool::new("sh", "sh").with_leading_args(["-c", "exit 3"]);
        assert_eq!(run_tool(&failing, &[]).await.unwrap().code(), Some(3));
    }

    #[tokio::test]
    async fn test_run_tool_missing_program() {
        let tool = Tool::new("nope", "/definitely/not/a/real/program");
        assert!(matches!(
            run_tool(&tool, &[]).await,
            Err(MwError::ToolLaunchError { .. })
        ));
    }
}
