//! Text renderings of cells for oracle requests
//!
//! Small regions are rendered in full, one cell per line. Larger regions
//! are sampled: the first rows, the all-bold "structural" rows, an evenly
//! spaced selection of body rows and the last rows, with wide regions
//! thinned to a fixed number of columns.

use std::collections::BTreeMap;
use std::fmt::Write;

use sheetsense_core::Cell;

/// Sampling limits for [`render_cells`]
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLimits {
    /// Regions with at most this many cells are rendered in full
    pub full_detail_cells: usize,
    /// Leading rows always shown
    pub header_rows: usize,
    /// Trailing rows always shown
    pub footer_rows: usize,
    /// Evenly spaced body rows shown
    pub body_rows: usize,
    /// All-bold rows shown
    pub structural_rows: usize,
    /// Column count above which columns are thinned
    pub full_detail_cols: u32,
    /// Upper bound on the rendered text, in characters
    pub max_chars: usize,
    /// Values longer than this are truncated
    pub max_value_len: usize,
}

impl Default for SampleLimits {
    fn default() -> Self {
        Self {
            full_detail_cells: 200,
            header_rows: 5,
            footer_rows: 3,
            body_rows: 8,
            structural_rows: 20,
            full_detail_cols: 20,
            max_chars: 20_000,
            max_value_len: 40,
        }
    }
}

/// Full single-line description of a cell
///
/// `[A1] | val="..." | formula=... | bg=... | bold | ...`, listing only the
/// properties the cell actually has.
pub fn describe_cell(cell: &Cell) -> String {
    let mut parts = vec![format!("[{}]", cell.address)];
    if let Some(value) = cell.value.as_deref() {
        parts.push(format!("val={:?}", value));
    }
    if let Some(formula) = cell.formula.as_deref() {
        parts.push(format!("formula={}", formula));
    }
    let format = &cell.format;
    if let Some(bg) = format.background_color.as_deref() {
        parts.push(format!("bg={}", bg));
    }
    for (flag, name) in [
        (format.bold, "bold"),
        (format.italic, "italic"),
        (format.underline, "underline"),
    ] {
        if flag {
            parts.push(name.to_string());
        }
    }
    if let Some(size) = format.font_size {
        parts.push(format!("size={}", size));
    }
    if let Some(color) = format.font_color.as_deref() {
        parts.push(format!("color={}", color));
    }
    if let Some(font) = format.font_name.as_deref() {
        parts.push(format!("font={}", font));
    }
    for (flag, name) in [
        (format.strikethrough, "strikethrough"),
        (format.subscript, "sub"),
        (format.superscript, "sup"),
    ] {
        if flag {
            parts.push(name.to_string());
        }
    }
    if let Some(anchor) = cell.merged_with {
        parts.push(format!("merged_with={}", anchor));
    }
    if let Some(choices) = cell.validation.as_deref() {
        parts.push(format!("validation=[{}]", choices.join(", ")));
    }
    parts.join(" | ")
}

/// Compact description with a truncated value
pub fn compact_cell(cell: &Cell, max_value_len: usize) -> String {
    let mut parts = vec![format!("[{}]", cell.address)];
    if let Some(value) = cell.value.as_deref() {
        let value: String = value.chars().take(max_value_len).collect();
        parts.push(format!("val={:?}", value));
    }
    if cell.is_bold() {
        parts.push("bold".to_string());
    }
    if let Some(anchor) = cell.merged_with {
        parts.push(format!("merged_with={}", anchor));
    }
    if cell.has_formula() {
        parts.push("formula".to_string());
    }
    if let Some(bg) = cell.format.background_color.as_deref() {
        parts.push(format!("bg={}", bg));
    }
    parts.join(" | ")
}

/// Render the non-empty cells of a region, sampling when it is large
///
/// `cells` should be in row-major order. Empty cells are skipped.
pub fn render_cells<'a, I>(cells: I, limits: &SampleLimits) -> String
where
    I: IntoIterator<Item = &'a Cell>,
{
    let cells: Vec<&Cell> = cells.into_iter().filter(|c| c.has_value()).collect();
    if cells.is_empty() {
        return "(empty region)".to_string();
    }

    if cells.len() <= limits.full_detail_cells {
        let text = cells
            .iter()
            .map(|c| compact_cell(c, limits.max_value_len))
            .collect::<Vec<_>>()
            .join("\n");
        if text.chars().count() <= limits.max_chars {
            return text;
        }
    }

    truncate(sample(&cells, limits), limits.max_chars)
}

fn sample(cells: &[&Cell], limits: &SampleLimits) -> String {
    let mut rows: BTreeMap<u32, Vec<&Cell>> = BTreeMap::new();
    for cell in cells {
        rows.entry(cell.row()).or_default().push(cell);
    }
    let min_col = cells.iter().map(|c| c.col()).min().unwrap_or(1);
    let max_col = cells.iter().map(|c| c.col()).max().unwrap_or(min_col);
    let col_step = ((max_col - min_col + 1) / limits.full_detail_cols.max(1)).max(1);

    let visible = |cell: &&Cell| (cell.col() - min_col) % col_step == 0;
    let row_numbers: Vec<u32> = rows.keys().copied().collect();
    let total_rows = row_numbers.len();

    let header: Vec<u32> = row_numbers.iter().take(limits.header_rows).copied().collect();
    let footer: Vec<u32> = row_numbers
        .iter()
        .skip(total_rows.saturating_sub(limits.footer_rows))
        .copied()
        .collect();

    let mut structural = Vec::new();
    let mut body = Vec::new();
    for row in &row_numbers {
        if header.contains(row) || footer.contains(row) {
            continue;
        }
        let shown: Vec<&&Cell> = rows[row].iter().filter(|c| visible(c)).collect();
        if !shown.is_empty() && shown.iter().all(|c| c.is_bold()) {
            structural.push(*row);
        } else {
            body.push(*row);
        }
    }

    let step = (body.len() / limits.body_rows.max(1)).max(1);
    let sampled_body: Vec<u32> = body
        .iter()
        .step_by(step)
        .take(limits.body_rows)
        .copied()
        .collect();
    structural.truncate(limits.structural_rows);

    let mut out = String::new();
    let mut section = |label: String, section_rows: &[u32]| {
        if section_rows.is_empty() {
            return;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "--- {} ---", label);
        for row in section_rows {
            for cell in rows[row].iter().filter(|c| visible(c)) {
                out.push('\n');
                out.push_str(&compact_cell(cell, limits.max_value_len));
            }
        }
    };

    section(
        format!("HEADER ROWS ({} of {} total rows)", header.len(), total_rows),
        &header,
    );
    section("STRUCTURAL / BOLD ROWS".to_string(), &structural);
    section(
        format!(
            "SAMPLED BODY ROWS ({} of {} body rows)",
            sampled_body.len(),
            body.len()
        ),
        &sampled_body,
    );
    section("FOOTER / LAST ROWS".to_string(), &footer);
    out
}

fn truncate(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n... (truncated)", &text[..idx]),
        None => text,
    }
}
