use crate::InspectOutput;
use std::fmt::Write;
use tcode_search::{MatchTier, Resolution, SearchOutcome};

const PLACEHOLDER: &str = "—";
const HEADERS: [&str; 4] = ["Description", "Code", "Module", "System"];

pub fn outcome_table(outcome: &SearchOutcome) -> String {
    let mut out = String::new();
    match outcome.mode {
        Resolution::NoData => {
            out.push_str("No transaction data loaded.\n");
            return out;
        }
        Resolution::NoMatch => {
            out.push_str("No transaction found for this query.\n");
            return out;
        }
        mode => {
            let _ = writeln!(out, "Search mode: {mode}");
        }
    }

    let rows: Vec<[String; 4]> = outcome
        .results
        .iter()
        .map(|r| {
            let description = if r.tier == MatchTier::Semantic {
                r.highlighted.clone()
            } else {
                r.description.clone()
            };
            [
                description,
                r.code.clone(),
                r.module.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                r.target_system
                    .clone()
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    push_row(&mut out, &HEADERS.map(String::from), &widths);
    let rule = widths.map(|w| "-".repeat(w));
    push_row(&mut out, &rule, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

pub fn inspect_summary(output: &InspectOutput<'_>) -> String {
    let report = output.report;
    let mut out = String::new();
    let _ = writeln!(out, "Table:        {}", output.table.display());
    let _ = writeln!(out, "Profile:      {}", output.profile);
    let _ = writeln!(out, "Model:        {}", output.model);
    let _ = writeln!(out, "Fingerprint:  {}", output.fingerprint);
    let _ = writeln!(
        out,
        "Rows:         {} read, {} kept, {} dropped",
        report.rows_read, report.rows_kept, report.rows_dropped
    );
    if report.duplicate_codes > 0 {
        let _ = writeln!(out, "Duplicates:   {} repeated code(s)", report.duplicate_codes);
    }
    let _ = writeln!(out, "Phrases:      {}", output.phrases);
    if report.schema_incomplete() {
        let missing: Vec<&str> = report.missing_columns.iter().map(|f| f.as_str()).collect();
        let _ = writeln!(out, "Missing:      {} (required)", missing.join(", "));
    }
    if !report.missing_optional_columns.is_empty() {
        let missing: Vec<&str> = report
            .missing_optional_columns
            .iter()
            .map(|f| f.as_str())
            .collect();
        let _ = writeln!(out, "Not present:  {}", missing.join(", "));
    }
    out
}
