use crate::prompt::{run_wizard, Console, Outcome};
use chrono::Utc;
use clap::Parser;
use libmediawiz::postprocess::EmbedReport;
use libmediawiz::toolchain::{install_hint, ToolOverrides, Toolchain};
use libmediawiz::{execute, MwError, Report};
use owo_colors::{OwoColorize, Stream::Stderr, Stream::Stdout};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "A step by step media download wizard",
    long_about = "A step by step media download wizard. Asks what to download, how and where, \
    then runs yt-dlp, downloads subtitles and embeds them with ffmpeg."
)]
pub struct Cli {
    #[arg(long = "yt-dlp", env = "MEDIAWIZ_YTDLP", help = "Path to the yt-dlp executable.")]
    ytdlp: Option<PathBuf>,
    #[arg(long, env = "MEDIAWIZ_FFMPEG", help = "Path to the ffmpeg executable.")]
    ffmpeg: Option<PathBuf>,
    #[arg(
        long,
        env = "MEDIAWIZ_CLEANER",
        help = "Path to the srtclean subtitle cleaner. Defaults to the one next to this program."
    )]
    cleaner: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ToolOverrides {
        ToolOverrides {
            downloader: self.ytdlp.clone(),
            muxer: self.ffmpeg.clone(),
            cleaner: self.cleaner.clone(),
        }
    }
}

/// Error text with install guidance for missing tools. Meant for stderr, so colour
/// support is decided on stderr.
fn write_fatal<W: Write>(out: &mut W, err: &MwError) -> io::Result<()> {
    writeln!(out, "{} {}", "Error:".if_supports_color(Stderr, |t| t.red()), err)?;
    if let MwError::MissingDependencies(tools) = err {
        writeln!(out)?;
        for tool in tools {
            writeln!(out, "  {:<10} {}", tool, install_hint(tool))?;
        }
    }
    Ok(())
}

/// Prints the error and returns the failure exit code.
fn fatal(err: &MwError) -> ExitCode {
    let _ = write_fatal(&mut io::stderr().lock(), err);
    ExitCode::from(1)
}

fn banner() {
    println!();
    println!(
        "{}",
        "mediawiz · media download wizard".if_supports_color(Stdout, |t| t.cyan())
    );
    println!("Type the number of an option and press enter. b goes back, r restarts, q quits.");
}

fn print_paths(title: &str, paths: &[PathBuf]) {
    if paths.is_empty() {
        return;
    }
    println!("  {title}:");
    for path in paths {
        let name = path.file_name().unwrap_or(path.as_os_str());
        println!("    {}", name.to_string_lossy());
    }
}

fn print_embedding(report: &EmbedReport) {
    println!(
        "  Subtitles embedded into {} file(s), {} without subtitles, {} failed.",
        report.embedded.len(),
        report.missing_subtitles.len(),
        report.failed.len()
    );
    print_paths("Missing subtitles", &report.missing_subtitles);
    print_paths("Failed (original kept, cleaned subtitle left next to it)", &report.failed);
}

fn print_report(report: &Report) {
    println!();
    println!("{}", "Summary".if_supports_color(Stdout, |t| t.bold()));
    println!("  Files are in {}", report.destination.display());
    if report.used_fallback_dir {
        println!(
            "  {}",
            "Could not tell which folder the playlist went to, showing the current folder."
                .if_supports_color(Stdout, |t| t.yellow())
        );
    }
    if report.retrieval_succeeded {
        println!("  Download {}", "finished".if_supports_color(Stdout, |t| t.green()));
    } else {
        println!(
            "  Download {}, see the yt-dlp output above.",
            "failed".if_supports_color(Stdout, |t| t.red())
        );
    }
    match report.subtitles_succeeded {
        Some(true) => println!("  Subtitle download finished"),
        Some(false) => println!("  Subtitle download failed, see the yt-dlp output above."),
        None => {}
    }
    if report.embedding_skipped {
        println!(
            "  {}",
            "Subtitles were not embedded, the .srt files were left untouched."
                .if_supports_color(Stdout, |t| t.yellow())
        );
    }
    if let Some(embedding) = &report.embedding {
        print_embedding(embedding);
    }
}

async fn run_session(toolchain: Toolchain) -> ExitCode {
    let base = PathBuf::from(".");
    let outcome = {
        let stdin = io::stdin();
        let mut console = Console::new(stdin.lock(), io::stdout());
        run_wizard(&mut console, &base, &toolchain.downloader)
    };
    let request = match outcome {
        Ok(Outcome::Completed(request)) => request,
        Ok(Outcome::Quit) => {
            println!();
            println!("Bye.");
            return ExitCode::SUCCESS;
        }
        Err(e) => return fatal(&e),
    };

    println!();
    println!("Starting download...");
    match execute(&request, &toolchain, &base).await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => fatal(&e),
    }
}

pub async fn run(cli: Cli) -> ExitCode {
    let toolchain = match Toolchain::discover(&cli.overrides()) {
        Ok(t) => t,
        Err(e) => return fatal(&e),
    };
    tracing::debug!("Using {:?}", toolchain);
    banner();
    let session_id = format!("Session-{}", Utc::now().timestamp());
    run_session(toolchain)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_required() {
        assert!(Cli::try_parse_from(["mediawiz"]).is_ok());
    }

    #[test]
    fn test_tool_overrides() {
        let cli = Cli::try_parse_from([
            "mediawiz",
            "--yt-dlp",
            "/opt/yt-dlp",
            "--ffmpeg",
            "/opt/ffmpeg",
            "--cleaner",
            "/opt/srtclean",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.downloader, Some(PathBuf::from("/opt/yt-dlp")));
        assert_eq!(overrides.muxer, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(overrides.cleaner, Some(PathBuf::from("/opt/srtclean")));
    }

    #[test]
    fn test_positional_arguments_rejected() {
        assert!(Cli::try_parse_from(["mediawiz", "https://example.com"]).is_err());
    }

    #[test]
    fn test_fatal_lists_install_hints() {
        let mut out = Vec::new();
        let err = MwError::MissingDependencies(vec!["ffmpeg".to_string(), "srtclean".to_string()]);
        write_fatal(&mut out, &err).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("required tools not found : ffmpeg, srtclean"));
        assert!(text.contains(install_hint("ffmpeg")));
        assert!(text.contains(install_hint("srtclean")));
    }

    #[test]
    fn test_fatal_exit_code() {
        let code = fatal(&MwError::MissingDependencies(vec!["ffmpeg".to_string()]));
        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::from(1)));
    }
}
