//! Tray command handlers.

use serde::Serialize;
use tabled::Tabled;

use spoolsync_core::{SpoolId, SpoolRecord, SpoolSelection, SpoolSync, TrayOverview};

use crate::cli::{GlobalOpts, TraysArgs, TraysCommand};
use crate::error::CliError;
use crate::output;

use super::util::{self, or_dash, with_session};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TrayRow {
    #[tabled(rename = "Tray")]
    tray: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Spool")]
    spool: String,
    #[tabled(rename = "Filament")]
    filament: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
    #[tabled(rename = "RFID")]
    tag: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

fn flags(row: &TrayOverview) -> String {
    let mut flags = Vec::new();
    if row.active {
        flags.push("active");
    }
    if row.locked {
        flags.push("locked");
    }
    flags.join(", ")
}

impl From<&TrayOverview> for TrayRow {
    fn from(row: &TrayOverview) -> Self {
        let record = row.record.as_ref();
        Self {
            tray: row.tray.to_string(),
            position: row
                .position
                .map_or_else(|| "external".into(), |p| p.to_string()),
            spool: or_dash(row.spool.map(|id| id.to_string())),
            filament: match (row.spool, record) {
                (_, Some(record)) => util::spool_label(record),
                (Some(_), None) => "(not in inventory)".into(),
                (None, None) => "-".into(),
            },
            color: or_dash(record.and_then(SpoolRecord::color_swatch)),
            remaining: or_dash(record.map(util::remaining_label)),
            tag: or_dash(row.tag.as_ref().map(ToString::to_string)),
            flags: flags(row),
        }
    }
}

/// `trays show` payload: the overview row plus the spool the tag is
/// bound to in the inventory.
#[derive(Serialize)]
struct TrayDetail {
    #[serde(flatten)]
    overview: TrayOverview,
    tag_spool: Option<SpoolRecord>,
}

fn detail(d: &TrayDetail) -> String {
    let o = &d.overview;
    let mut lines = vec![
        format!("Tray:       {}", o.tray),
        format!(
            "Position:   {}",
            o.position.map_or_else(|| "external holder".into(), |p| p.to_string())
        ),
    ];
    match (o.spool, o.record.as_ref()) {
        (Some(id), Some(record)) => {
            lines.push(format!("Spool:      {id} ({})", util::spool_label(record)));
            lines.push(format!("Color:      {}", or_dash(record.color_swatch())));
            lines.push(format!("Remaining:  {}", util::remaining_label(record)));
            if record.archived {
                lines.push("            archived".into());
            }
        }
        (Some(id), None) => lines.push(format!("Spool:      {id} (not in inventory)")),
        (None, _) => lines.push("Spool:      -".into()),
    }
    lines.push(format!("Locked:     {}", if o.locked { "yes" } else { "no" }));
    lines.push(format!("Active:     {}", if o.active { "yes" } else { "no" }));
    lines.push(format!(
        "RFID tag:   {}",
        or_dash(o.tag.as_ref().map(ToString::to_string))
    ));
    if o.tag.is_some() {
        lines.push(format!(
            "Tag spool:  {}",
            or_dash(
                d.tag_spool
                    .as_ref()
                    .map(|s| format!("{} ({})", s.id, util::spool_label(s)))
            )
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(sync: &SpoolSync, args: TraysArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        TraysCommand::List => {
            let rows = sync.tray_overview().await?;
            let out = output::render_list(&global.output, &rows, |r| TrayRow::from(r), |r| {
                r.tray.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TraysCommand::Show { tray } => {
            let settings = sync.settings().await?;
            let tray = tray.validate(settings.tray_count)?;
            let overview = sync
                .tray_overview()
                .await?
                .into_iter()
                .find(|row| row.tray == tray)
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "tray".into(),
                    identifier: tray.to_string(),
                    list_command: "trays list".into(),
                })?;
            let tag_spool = match overview.tag.as_ref() {
                Some(tag) => sync.spool_for_tag(tag).await?,
                None => None,
            };
            let out = output::render_single(
                &global.output,
                &TrayDetail {
                    overview,
                    tag_spool,
                },
                detail,
                |d| d.overview.tray.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TraysCommand::Assign { tray, spool, scan } => {
            let record = with_session(sync, tray, |session| async move {
                match (spool, scan) {
                    (Some(id), _) => session.edit(SpoolSelection::Spool(id))?,
                    (None, Some(text)) => {
                        session.toggle_scan()?;
                        session.scan(&[text])?;
                    }
                    (None, None) => {
                        return Err(CliError::Validation {
                            field: "spool".into(),
                            reason: "pass a spool id or --scan".into(),
                        });
                    }
                }
                let state = util::settled_spool(&session).await?;
                session.commit().await?;
                Ok::<_, CliError>(state.lookup.record().cloned())
            })
            .await?;

            let label = record.as_deref().map_or_else(String::new, |r| {
                format!(" ({})", util::spool_label(r))
            });
            let id = record.map_or(0, |r| r.id);
            output::notice(&format!("✓ Tray {tray} now holds spool {id}{label}"), global.quiet);
            Ok(())
        }

        TraysCommand::Clear { tray } => {
            with_session(sync, tray, |session| async move {
                session.edit(SpoolSelection::NoSpool)?;
                session.settled().await;
                session.clear_spool().await?;
                Ok::<_, CliError>(())
            })
            .await?;
            output::notice(&format!("✓ Tray {tray} cleared"), global.quiet);
            Ok(())
        }

        TraysCommand::Bind { tray, spool } => {
            let (spool_id, tag) = with_session(sync, tray, |session| async move {
                if let Some(id) = spool {
                    session.edit(SpoolSelection::Spool(id))?;
                }
                let state = util::settled_spool(&session).await.map_err(|e| match e {
                    CliError::Precondition { .. } => CliError::Validation {
                        field: "spool".into(),
                        reason: format!("tray {tray} has no assigned spool; pass a spool id"),
                    },
                    other => other,
                })?;
                let Some(tag) = state.tag.clone() else {
                    return Err(CliError::Precondition {
                        action: "bind".into(),
                        reason: format!("tray {tray} has no RFID tag"),
                    });
                };
                session.bind_tag().await?;
                let id: Option<SpoolId> = state.settled.spool_id();
                Ok::<_, CliError>((id, tag))
            })
            .await?;

            let spool = or_dash(spool_id.map(|id| id.to_string()));
            output::notice(&format!("✓ Tag {tag} bound to spool {spool}"), global.quiet);
            Ok(())
        }
    }
}
