//! Municipality capacity report as a one-page PDF.

use chrono::NaiveDateTime;
use preschool_kindergarten_models::MunicipalityAggregate;

/// First line of every report.
pub const REPORT_TITLE: &str = "Municipality capacity report";

/// Body line used when there are no aggregates.
pub const NO_DATA_LINE: &str = "No data for report.";

/// Formats one aggregate as a report row.
#[must_use]
pub fn report_row(aggregate: &MunicipalityAggregate) -> String {
    format!(
        "{} | count:{} | capacity:{} | enrolled:{} | occupancy:{:.2}%",
        aggregate.municipality,
        aggregate.kindergarten_count,
        aggregate.total_capacity,
        aggregate.total_enrolled,
        aggregate.occupancy * 100.0,
    )
}

/// Builds the report text: title, timestamp, a blank spacer, then one row
/// per aggregate in the given order.
#[must_use]
pub fn report_lines(
    aggregates: &[MunicipalityAggregate],
    generated_at: NaiveDateTime,
) -> Vec<String> {
    let mut lines = vec![
        REPORT_TITLE.to_string(),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M")),
        String::new(),
    ];

    if aggregates.is_empty() {
        lines.push(NO_DATA_LINE.to_string());
    } else {
        lines.extend(aggregates.iter().map(report_row));
    }

    lines
}

/// Renders the aggregates as a PDF document.
#[must_use]
pub fn render_report(aggregates: &[MunicipalityAggregate], generated_at: NaiveDateTime) -> Vec<u8> {
    let lines = report_lines(aggregates, generated_at);
    log::debug!("Rendering report with {} municipalities", aggregates.len());
    preschool_pdf::render_document(&lines)
}
