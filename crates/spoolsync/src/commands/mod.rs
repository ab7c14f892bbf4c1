//! Command dispatch: bridges CLI args -> `SpoolSync` calls -> output formatting.

pub mod config_cmd;
pub mod resolve;
pub mod spools;
pub mod status;
pub mod trays;
pub mod util;

use spoolsync_core::SpoolSync;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a bridge-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, sync: &SpoolSync, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Trays(args) => trays::handle(sync, args, global).await,
        Command::Spools(args) => spools::handle(sync, args, global).await,
        Command::Status => status::handle(sync, global).await,
        // Offline commands are handled before dispatch
        Command::Config(_) | Command::Resolve(_) | Command::Completions(_) => Err(
            CliError::Internal("offline command reached the bridge dispatcher".into()),
        ),
    }
}
