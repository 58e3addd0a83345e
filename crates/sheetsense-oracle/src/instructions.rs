//! Built-in instruction text for each [`OracleTask`]
//!
//! Each instruction states the question and the exact JSON shape the
//! analyzer will accept. Cells follow in the request excerpt.

use crate::OracleTask;

const REFINE_REGION: &str = r#"You are analysing one rectangular region of a spreadsheet that was found by splitting the sheet at fully empty rows and columns. Decide whether it holds several independent blocks (tables, headings, key/value forms, notes) stacked together without a gap.

Split only when the content clearly belongs to different blocks: a header-like row in the middle, a change in the columns used, or a heading followed by unrelated content. Bold group rows inside one table are not a reason to split.

Reply with JSON only:
{"split": false}
or
{"split": true, "regions": [{"top_left": "A1", "bottom_right": "D10"}, {"top_left": "A11", "bottom_right": "D20"}]}

Sub-regions must lie inside the region, must not overlap, and together must cover every non-empty cell."#;

const DETECT_HEADING: &str = r#"Decide whether this small spreadsheet region is a heading or section title: one to three rows of short label text, usually bold, larger or merged, introducing the content below.

Reply with JSON only:
{"is_heading": true, "text": "<heading text>"}
or
{"is_heading": false}"#;

const DETECT_KEY_VALUE: &str = r#"Decide whether this spreadsheet region is a key/value form: short field labels on the left with their values to the right, one independent pair per row, rather than a columnar table.

Reply with JSON only:
{"is_key_value": true, "pairs": [{"key_coordinate": "A1", "value_coordinate": "B1"}]}
or
{"is_key_value": false}"#;

const DETECT_TEXT: &str = r#"Decide whether this spreadsheet region is free text: sentences or paragraphs such as notes, disclaimers or instructions, with no repeating columnar pattern.

Reply with JSON only:
{"is_text": true, "text": "<full text>"}
or
{"is_text": false}"#;

const DETECT_TABLE: &str = r#"Identify every table in this spreadsheet region. For each table give its bounding box and which rows and columns are header, body and footer. Header rows are usually bold, filled or hold column labels; footer rows sit at the bottom and hold totals. Header, body and footer rows of one table must not overlap, and the bounding box must enclose all of them.

Reply with JSON only:
{"is_table": true, "tables": [{"top_left": "A1", "bottom_right": "D10", "header_rows": [1], "header_columns": ["A", "B", "C", "D"], "footer_rows": [10], "footer_columns": ["A", "B", "C", "D"], "body_rows": [2, 3, 4, 5, 6, 7, 8, 9], "body_columns": ["A", "B", "C", "D"]}]}
or
{"is_table": false}"#;

const TABLE_STRUCTURE: &str = r#"Describe the structure of this spreadsheet table. Only a sample of its cells is shown: the first rows, the all-bold rows, a few body rows and the last rows.

Report:
- header_rows: row numbers of the column header
- header_structure: "single" or "multi_level" (merged parent headers over child columns)
- column_groups: for multi-level headers, each parent merge range, its label and its child column letters
- footer_rows: bottom rows holding totals or summaries
- row_group_label_column: column letter holding bold group labels in the body, or null
- row_groups: each group label row with the data rows it covers
- merged_group_columns: columns whose vertical merges group body rows
- merged_groups: each such merge with its column, rows and label

Reply with JSON only:
{"header_rows": [1], "header_structure": "single", "column_groups": [{"parent_range": "B1:D1", "parent_label": "Revenue", "children": ["B", "C", "D"]}], "footer_rows": [20], "row_group_label_column": "A", "row_groups": [{"label_row": 3, "label": "North", "start_row": 4, "end_row": 9}], "merged_group_columns": ["E"], "merged_groups": [{"column": "E", "start_row": 4, "end_row": 9, "label": "Q1"}]}"#;

/// Instruction text for a task
pub fn instruction_for(task: OracleTask) -> &'static str {
    match task {
        OracleTask::RefineRegion => REFINE_REGION,
        OracleTask::DetectHeading => DETECT_HEADING,
        OracleTask::DetectKeyValue => DETECT_KEY_VALUE,
        OracleTask::DetectText => DETECT_TEXT,
        OracleTask::DetectTable => DETECT_TABLE,
        OracleTask::TableStructure => TABLE_STRUCTURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::extract_json;

    #[test]
    fn test_every_instruction_shows_valid_json() {
        for task in [
            OracleTask::RefineRegion,
            OracleTask::DetectHeading,
            OracleTask::DetectKeyValue,
            OracleTask::DetectText,
            OracleTask::DetectTable,
            OracleTask::TableStructure,
        ] {
            let text = instruction_for(task);
            let example = text.lines().rev().find(|l| l.starts_with('{')).unwrap();
            assert!(extract_json(example).is_some(), "{task}: {example}");
        }
    }
}
