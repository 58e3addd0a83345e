//! Content tests shared by the detectors and the structure builder

use lazy_regex::regex;
use sheetsense_core::{Cell, Region};

/// Coarse type of a cell, for column-majority comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKind {
    Empty,
    Formula,
    Numeric,
    Text,
}

impl CellKind {
    pub fn of(cell: Option<&Cell>) -> Self {
        match cell {
            None => CellKind::Empty,
            Some(c) if c.has_formula() => CellKind::Formula,
            Some(c) if !c.has_value() => CellKind::Empty,
            Some(c) if looks_numeric(c.text()) => CellKind::Numeric,
            Some(_) => CellKind::Text,
        }
    }
}

/// Whether a display value reads as a number
///
/// Leading currency symbols, thousands separators and percent signs are
/// ignored, so `$1,200`, `45%` and `-3.5` all count.
pub fn looks_numeric(text: &str) -> bool {
    let trimmed = text.trim().trim_start_matches(['$', '€', '£']);
    let cleaned: String = trimmed.chars().filter(|c| *c != ',' && *c != '%').collect();
    let cleaned = cleaned.trim();
    !cleaned.is_empty() && cleaned.parse::<f64>().map(|v| v.is_finite()).unwrap_or(false)
}

/// Whether a label reads like a total line
pub fn is_total_label(text: &str) -> bool {
    regex!(r"(?i)\b(grand\s+total|sub-?totals?|totals?)\b").is_match(text)
}

/// Share of `values` that look numeric (0 for an empty list)
pub fn numeric_ratio<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total = 0usize;
    let mut numeric = 0usize;
    for value in values {
        total += 1;
        if looks_numeric(value) {
            numeric += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        numeric as f64 / total as f64
    }
}

/// Median of a list of counts (lower median for even lengths)
pub fn median(values: &mut [usize]) -> usize {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    values[(values.len() - 1) / 2]
}

/// Whether every non-empty cell of a row is bold, or every one is filled
///
/// Rows with no values never qualify.
pub fn row_is_emphasised(region: &Region<'_>, row: u32) -> bool {
    let values = region.row_values(row);
    !values.is_empty()
        && (values.iter().all(|c| c.is_bold()) || values.iter().all(|c| c.has_fill()))
}
