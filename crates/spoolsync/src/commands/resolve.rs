//! `resolve`: offline scan-text parsing.

use serde::Serialize;

use spoolsync_core::{SpoolId, resolve};

use crate::cli::{GlobalOpts, ResolveArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Resolved<'a> {
    input: &'a str,
    spool_id: SpoolId,
}

pub fn handle(args: &ResolveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let spool_id = resolve(&args.text)?;
    let resolved = Resolved {
        input: &args.text,
        spool_id,
    };
    let out = output::render_single(
        &global.output,
        &resolved,
        |r| format!("Spool {}", r.spool_id),
        |r| r.spool_id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
