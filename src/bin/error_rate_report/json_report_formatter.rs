use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use ctc_error_rate::Report;

/// Pretty JSON to `path`, or to stdout when `path` is `-`.
pub fn write_report(path: &Path, report: &Report) -> Result<(), String> {
    if path == Path::new("-") {
        let stdout = io::stdout();
        return write_pretty(stdout.lock(), report).map_err(|err| format!("stdout: {err}"));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create report output directory '{}': {err}",
                parent.display()
            )
        })?;
    }
    let file = File::create(path)
        .map_err(|err| format!("Failed to create report file '{}': {err}", path.display()))?;
    write_pretty(file, report).map_err(|err| format!("'{}': {err}", path.display()))
}

fn write_pretty(mut writer: impl Write, report: &Report) -> Result<(), String> {
    serde_json::to_writer_pretty(&mut writer, report)
        .map_err(|err| format!("Failed to serialize report JSON: {err}"))?;
    writer
        .write_all(b"\n")
        .map_err(|err| format!("Failed to finalize report: {err}"))
}

/// One-line summary for the terminal.
pub fn summary_line(report: &Report) -> String {
    let global = &report.aggregates.global;
    let label = match report.meta.unit {
        ctc_error_rate::ErrorUnit::Word => "WER",
        ctc_error_rate::ErrorUnit::Character => "CER",
    };
    format!(
        "{label} {:.4} ({} edits / {} reference units, {} utterances, {} exact)",
        global.rate,
        global.distance_sum,
        global.reference_unit_count,
        report.aggregates.counts.total,
        report.aggregates.counts.exact_match,
    )
}
