//! Plain-text rendering of a report for terminal display.

use std::fmt::Write as _;

use crate::body::ReportBody;

const LABEL_WIDTH: usize = 28;
const VALUE_WIDTH: usize = 18;

/// Renders the report body as plain text.
///
/// One line per table row, with the out-of-range marker appended to the
/// value column and observations in their own block under the table.
pub fn render_text(body: &ReportBody) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "LABORATORY REPORT");
    let _ = writeln!(out, "Patient: {}", body.header.patient_name);
    let _ = writeln!(out, "DNI: {}", body.header.dni);
    let _ = writeln!(out, "Date: {}", body.header.date);
    let _ = writeln!(out, "Insurer: {}", body.header.insurer);

    for section in &body.sections {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", section.title);
        let _ = writeln!(
            out,
            "{:<label$} {:<value$} {}",
            "Parameter",
            "Value",
            "Reference",
            label = LABEL_WIDTH,
            value = VALUE_WIDTH
        );
        for row in &section.rows {
            let value = match row.flag {
                Some(flag) => format!("{} {}", row.value, flag.marker()),
                None => row.value.clone(),
            };
            let _ = writeln!(
                out,
                "{:<label$} {:<value$} {}",
                row.label,
                value,
                row.reference,
                label = LABEL_WIDTH,
                value = VALUE_WIDTH
            );
        }
        if let Some(observations) = &section.observations {
            let _ = writeln!(out, "Observations: {}", observations);
        }
    }

    out
}
