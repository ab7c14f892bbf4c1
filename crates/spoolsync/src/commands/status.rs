//! `status`: bridge health and printer telemetry summary.

use serde::Serialize;

use spoolsync_core::{BridgeHealth, PrinterInfo, SpoolSync};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusReport {
    bridge: BridgeHealth,
    printer: PrinterInfo,
}

fn detail(report: &StatusReport, color: bool) -> String {
    let bridge = &report.bridge;
    let printer = &report.printer;
    let mut lines = vec![
        format!(
            "Bridge:     {}",
            output::status_word(&bridge.status, bridge.status == "ok", color)
        ),
        format!(
            "Spoolman:   {} ({})",
            bridge.spoolman_url.as_deref().unwrap_or("-"),
            output::status_word(
                if bridge.spoolman_valid { "valid" } else { "unreachable" },
                bridge.spoolman_valid,
                color
            )
        ),
        format!(
            "Printer:    {}",
            output::status_word(
                if printer.connected { "connected" } else { "disconnected" },
                printer.connected,
                color
            )
        ),
    ];

    if let Some(print) = printer.telemetry.as_ref().and_then(|t| t.print.as_ref()) {
        lines.push(format!("State:      {}", printer.gcode_state().unwrap_or("-")));
        if let Some(ref file) = print.gcode_file {
            lines.push(format!("File:       {file}"));
        }
        if let (Some(layer), Some(total)) = (print.layer_num, print.total_layer_num) {
            lines.push(format!("Layer:      {layer} / {total}"));
        }
        if let Some(percent) = print.mc_percent {
            lines.push(format!("Progress:   {percent}%"));
        }
        let units = print.ams.as_ref().map_or(0, |a| a.ams.len());
        lines.push(format!("AMS units:  {units}"));
    }

    lines.push(format!(
        "Updated:    {}",
        printer.last_update.map_or_else(
            || output::muted("never", color),
            |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
        )
    ));
    lines.join("\n")
}

pub async fn handle(sync: &SpoolSync, global: &GlobalOpts) -> Result<(), CliError> {
    let (bridge, printer) = tokio::try_join!(sync.health(), sync.printer_info())?;
    let report = StatusReport { bridge, printer };
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, color),
        |r| if r.printer.connected { "connected".into() } else { "disconnected".into() },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
