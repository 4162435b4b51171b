use crate::models::sleep_log::SleepLog;

/// Column order is fixed so older exports keep lining up.
pub const CSV_HEADER: [&str; 5] = ["date", "sleep_hours", "mood", "tips_applied", "sleep_score"];

/// Render logs as CSV, one row per record in the order given.
pub fn to_csv(records: &[SleepLog]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));

    for record in records {
        push_row(
            &mut out,
            [
                record.date.format("%Y-%m-%d").to_string(),
                format_float(record.sleep_hours),
                record.mood.to_string(),
                record.tips_applied.joined(),
                format_float(record.sleep_score),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote(&field));
    }
    out.push('\n');
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// Whole numbers keep a trailing ".0" (8.0, not 8).
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
