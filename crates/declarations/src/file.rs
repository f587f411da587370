//! Generated file content and the field formatting shared by NRA text files.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use paybook_core::EmployeeId;

/// Lines in NRA text files end with CR LF.
pub const LINE_END: &str = "\r\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclarationFile {
    pub file_name: String,
    pub content: String,
    pub record_count: usize,
    pub employee_ids: Vec<EmployeeId>,
}

/// Double-quoted text field; embedded quotes are dropped.
pub(crate) fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', ""))
}

pub(crate) fn date_compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub(crate) fn date_dotted(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Percent rendered with two decimals, e.g. `6.58`.
pub(crate) fn percent(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

pub(crate) fn first_chars(value: Option<&str>, n: usize) -> String {
    value.unwrap_or_default().trim().chars().take(n).collect()
}

/// Comma-joined record terminated by CR LF.
pub(crate) fn record_line(fields: &[String]) -> String {
    let mut line = fields.join(",");
    line.push_str(LINE_END);
    line
}
