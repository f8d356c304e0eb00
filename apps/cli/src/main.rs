//! Transync CLI — incremental transcript-to-memory synchronization.
//!
//! Scans a transcripts directory, summarizes new transcripts through the
//! Anthropic API, publishes observations to a memory store, and tracks
//! outcomes in a local database.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;
use transync_shared::TransyncError;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);

    match commands::run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        // A broken tracker database gets its own exit code; item-level
        // failures never reach here.
        Err(report) => {
            let tracker_fault = report
                .downcast_ref::<TransyncError>()
                .is_some_and(TransyncError::is_tracker_fault);
            if tracker_fault {
                eprintln!("fatal: {report}");
                Ok(ExitCode::from(2))
            } else {
                Err(report)
            }
        }
    }
}
