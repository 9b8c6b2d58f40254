use clap::error::ErrorKind;
use clap::Parser;
use libmediawiz::subtitle::clean_file;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Removes the repeated lines that auto-generated subtitles carry over from one cue to the next.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Subtitle file to clean
    input: PathBuf,
    /// Where the cleaned subtitles are written
    output: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    run(&cli).await
}

#[tracing::instrument]
async fn run(cli: &Cli) -> ExitCode {
    match clean_file(&cli.input, &cli.output).await {
        Ok(stats) => {
            tracing::debug!(
                "Kept {} of {} entries",
                stats.cleaned_entries,
                stats.original_entries
            );
            println!(
                "Successfully cleaned subtitles from {} to {}",
                cli.input.display(),
                cli.output.display()
            );
            println!(
                "Original entries: {}, Cleaned entries: {}",
                stats.original_entries, stats.cleaned_entries
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Cleaning failed. {}", e);
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}
