use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod prompt;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs stay out of the folder the user downloads into.
    let log_dir = std::env::temp_dir().join("mediawiz");
    let f_appender = tracing_appender::rolling::hourly(&log_dir, "mediawiz.log");
    let (non_blk, _guard) = tracing_appender::non_blocking(f_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("libmediawiz=debug,mediawiz=debug")),
        )
        .event_format(tracing_subscriber::fmt::format().pretty().with_ansi(false))
        .with_writer(non_blk)
        .init();
    let cli = cli::Cli::parse();
    cli::run(cli).await
}
