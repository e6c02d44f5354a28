//! CSV rendering of the summary report (RFC 4180, CRLF line endings)

use crate::models::money::format_cents;

use super::summary::{SummaryReport, VisitCell};

const FIXED_HEADER: [&str; 6] = ["#", "Tourist", "Phone", "Status", "Amount", "Paid"];

/// Quote a field when it contains a delimiter, quote or line break.
pub fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

fn push_record(out: &mut String, fields: &[String]) {
    let line: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// Merged cells (`span == 0`) are left blank, as in a spreadsheet.
fn cell_fields(cell: &VisitCell) -> [String; 3] {
    if cell.span == 0 {
        return Default::default();
    }
    [
        cell.arrival.as_ref().map(|m| m.display()).unwrap_or_default(),
        cell.departure.as_ref().map(|m| m.display()).unwrap_or_default(),
        cell.hotel.clone().unwrap_or_default(),
    ]
}

/// Render the report.
///
/// Group number and group money totals appear on the group's first row only.
pub fn to_csv(report: &SummaryReport) -> String {
    let mut out = String::new();

    let mut header: Vec<String> = FIXED_HEADER.iter().map(|h| h.to_string()).collect();
    for city in &report.cities {
        header.push(format!("{} arrival", city));
        header.push(format!("{} departure", city));
        header.push(format!("{} hotel", city));
    }
    push_record(&mut out, &header);

    for group in &report.groups {
        for (i, row) in group.rows.iter().enumerate() {
            let first = i == 0;
            let mut fields = vec![
                if first { group.number.to_string() } else { String::new() },
                row.tourist.clone(),
                row.phone.clone().unwrap_or_default(),
                row.status.clone(),
                if first { format_cents(group.amount_cents) } else { String::new() },
                if first { format_cents(group.paid_cents) } else { String::new() },
            ];
            for cell in &row.cells {
                fields.extend(cell_fields(cell));
            }
            push_record(&mut out, &fields);
        }
    }

    let mut totals = vec![
        String::new(),
        format!("Total: {} tourists in {} groups", report.totals.tourists, report.totals.groups),
        String::new(),
        String::new(),
        format_cents(report.totals.amount_cents),
        format_cents(report.totals.paid_cents),
    ];
    totals.resize(header.len(), String::new());
    push_record(&mut out, &totals);

    out
}
