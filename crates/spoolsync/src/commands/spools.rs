//! Spool inventory command handlers.

use tabled::Tabled;

use spoolsync_core::{SpoolRecord, SpoolSync};

use crate::cli::{GlobalOpts, SpoolsArgs, SpoolsCommand};
use crate::error::CliError;
use crate::output;

use super::util::{self, or_dash};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SpoolRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Filament")]
    filament: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
    #[tabled(rename = "Weight")]
    weight: String,
}

impl From<&SpoolRecord> for SpoolRow {
    fn from(s: &SpoolRecord) -> Self {
        let mut filament = util::spool_label(s);
        if s.archived {
            filament.push_str(" (archived)");
        }
        Self {
            id: s.id,
            filament,
            color: or_dash(s.color_swatch()),
            remaining: util::remaining_label(s),
            weight: or_dash(s.remaining_weight.map(|g| format!("{g:.0} g"))),
        }
    }
}

fn detail(s: &SpoolRecord) -> String {
    let f = &s.filament;
    let mut lines = vec![
        format!("ID:         {}", s.id),
        format!("Filament:   {}", util::spool_label(s)),
        format!("Color:      {}", or_dash(s.color_swatch())),
        format!("Remaining:  {}", util::remaining_label(s)),
        format!(
            "Weight:     {}",
            or_dash(s.remaining_weight.map(|g| format!("{g:.0} g")))
        ),
        format!(
            "Diameter:   {}",
            or_dash(f.diameter.map(|d| format!("{d:.2} mm")))
        ),
        format!("Archived:   {}", if s.archived { "yes" } else { "no" }),
    ];
    if let Some(ref registered) = s.registered {
        lines.push(format!("Registered: {registered}"));
    }
    let mut extra: Vec<_> = s.extra.iter().collect();
    extra.sort();
    for (key, value) in extra {
        lines.push(format!("{key}: {value}"));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(sync: &SpoolSync, args: SpoolsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SpoolsCommand::List { all } => {
            let spools: Vec<SpoolRecord> = sync
                .spools()
                .await?
                .into_values()
                .filter(|s| all || !s.archived)
                .collect();
            let out = output::render_list(&global.output, &spools, |s| SpoolRow::from(s), |s| {
                s.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SpoolsCommand::Get { id } => {
            let record = sync
                .spool(id)
                .await
                .ok_or_else(|| util::spool_not_found(id))?;
            let out = output::render_single(&global.output, &*record, detail, |s| s.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
