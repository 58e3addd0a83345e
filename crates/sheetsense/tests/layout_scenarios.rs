//! End-to-end layout scenarios (snapshot -> chunks)

use pretty_assertions::assert_eq;
use sheetsense::prelude::*;
use sheetsense::{classify, split_regions};

fn cell(addr: &str, value: &str) -> Cell {
    Cell::new(CellAddress::parse(addr).unwrap(), value)
}

fn kinds(chunks: &[Chunk]) -> Vec<Vec<BlockKind>> {
    chunks
        .iter()
        .map(|c| c.blocks().iter().map(Block::kind).collect())
        .collect()
}

fn analyze(snapshot: &SheetSnapshot) -> Vec<Chunk> {
    SheetAnalyzer::new(AnalyzerOptions::default())
        .analyze_snapshot(snapshot)
        .unwrap()
}

/// Title merged over A1:D1, blank row, then a two-column table
#[test]
fn test_title_over_table() {
    let snapshot = SheetSnapshot::from_json(
        r#"{
            "name": "Scores",
            "cells": [
                {"address": "A1", "value": "TITLE", "bold": true},
                {"address": "A3", "value": "Name", "bold": true},
                {"address": "B3", "value": "Score", "bold": true},
                {"address": "A4", "value": "Ann"}, {"address": "B4", "value": "7"},
                {"address": "A5", "value": "Bob"}, {"address": "B5", "value": "9"},
                {"address": "A6", "value": "Cy"},  {"address": "B6", "value": "4"}
            ],
            "merges": ["A1:D1"]
        }"#,
    )
    .unwrap();

    let chunks = analyze(&snapshot);
    assert_eq!(kinds(&chunks), vec![vec![BlockKind::Heading, BlockKind::Table]]);

    assert_eq!(chunks[0].heading().map(|h| h.text.as_str()), Some("TITLE"));
    let table = chunks[0].content().and_then(Block::as_table).unwrap();
    assert_eq!(table.header_rows, vec![3]);
    assert_eq!(table.body_rows().collect::<Vec<_>>(), vec![4, 5, 6]);
    assert_eq!(table.data_cells.len(), 6);
    assert_eq!(table.title(), Some("TITLE"));
}

#[test]
fn test_month_keys_fall_through_to_table() {
    let grid = Grid::from_cells(vec![
        cell("A1", "January"),
        cell("B1", "10"),
        cell("A2", "February"),
        cell("B2", "12"),
        cell("A3", "March"),
        cell("B3", "9"),
        cell("A4", "April"),
        cell("B4", "14"),
    ])
    .unwrap();
    let region = grid.region(grid.bounds().unwrap());

    let block = classify(&region, DetectionMode::Heuristic, None, &AnalyzerOptions::default());
    assert_eq!(block.map(|b| b.kind()), Some(BlockKind::Table));
}

#[test]
fn test_key_value_form() {
    let grid = Grid::from_cells(vec![
        cell("A1", "Customer"),
        cell("B1", "Acme Corp"),
        cell("A2", "Invoice number"),
        cell("B2", "INV-0042"),
        cell("A3", "Due"),
        cell("B3", "2024-03-01"),
    ])
    .unwrap();
    let chunks = SheetAnalyzer::new(AnalyzerOptions::default()).analyze(&grid, &[]);

    let form = chunks[0].content().and_then(Block::as_key_value).unwrap();
    let keys: Vec<&str> = form.pairs.iter().map(|p| p.key_text()).collect();
    assert_eq!(keys, vec!["Customer", "Invoice number", "Due"]);
    assert_eq!(form.pairs[1].value_text(), "INV-0042");
}

#[test]
fn test_bold_self_merged_heading() {
    let a1 = CellAddress::new(1, 1);
    let grid = Grid::from_cells(vec![Cell::new(a1, "Q3 Report").bold().with_merge(a1)]).unwrap();
    let region = grid.region(CellRange::single(a1));

    let block = classify(&region, DetectionMode::Heuristic, None, &AnalyzerOptions::default()).unwrap();
    assert_eq!(block.as_heading().map(|h| h.text.as_str()), Some("Q3 Report"));
}

#[test]
fn test_header_detected_by_content() {
    let grid = Grid::from_cells(vec![
        cell("A1", "Product"),
        cell("B1", "Total Sales"),
        cell("A2", "Alpha"),
        cell("B2", "88300"),
        cell("A3", "Beta"),
        cell("B3", "1200"),
        cell("A4", "Gamma"),
        cell("B4", "5400"),
        cell("A5", "Delta"),
        cell("B5", "300"),
    ])
    .unwrap();
    let region = grid.region(grid.bounds().unwrap());

    let block = classify(&region, DetectionMode::Heuristic, None, &AnalyzerOptions::default()).unwrap();
    let table = block.as_table().unwrap();
    assert_eq!(table.header_rows, vec![1]);
    assert_eq!(table.heading_cells.len(), 2);
}

fn heading_and_table(table_top: u32) -> Grid {
    let mut cells = vec![Cell::new(CellAddress::new(5, 1), "Regional sales").bold()];
    let rows = [("Region", "Total"), ("North", "10"), ("South", "12"), ("East", "8")];
    for (i, (a, b)) in rows.into_iter().enumerate() {
        let row = table_top + i as u32;
        let (a, b) = (Cell::new(CellAddress::new(row, 1), a), Cell::new(CellAddress::new(row, 2), b));
        if i == 0 {
            cells.extend([a.bold(), b.bold()]);
        } else {
            cells.extend([a, b]);
        }
    }
    Grid::from_cells(cells).unwrap()
}

#[test]
fn test_heading_gap_boundary() {
    let analyzer = SheetAnalyzer::new(AnalyzerOptions::default());

    let close = analyzer.analyze(&heading_and_table(9), &[]);
    assert_eq!(kinds(&close), vec![vec![BlockKind::Heading, BlockKind::Table]]);

    let far = analyzer.analyze(&heading_and_table(10), &[]);
    assert_eq!(kinds(&far), vec![vec![BlockKind::Heading], vec![BlockKind::Table]]);
}

#[test]
fn test_wider_gap_allowed_by_options() {
    let mut options = AnalyzerOptions::default();
    options.grouping.max_row_gap = 4;
    let chunks = SheetAnalyzer::new(options).analyze(&heading_and_table(10), &[]);
    assert_eq!(chunks.len(), 1);
}

#[test]
fn test_grouped_table_with_notes_and_chart() {
    let snapshot = SheetSnapshot::from_json(
        r#"{
            "cells": [
                {"address": "A1", "value": "Inventory", "bold": true, "font_size": 16},
                {"address": "A3", "value": "Item", "bold": true},
                {"address": "B3", "value": "Count", "bold": true},
                {"address": "C3", "value": "Value", "bold": true},
                {"address": "A4", "value": "Fasteners", "bold": true},
                {"address": "A5", "value": "Bolts"}, {"address": "B5", "value": "40"}, {"address": "C5", "value": "12.5"},
                {"address": "A6", "value": "Nuts"},  {"address": "B6", "value": "55"}, {"address": "C6", "value": "8"},
                {"address": "A7", "value": "Tools", "bold": true},
                {"address": "A8", "value": "Hammer"}, {"address": "B8", "value": "3"}, {"address": "C8", "value": "45"},
                {"address": "A9", "value": "Total"}, {"address": "B9", "value": "98"}, {"address": "C9", "value": "65.5"},
                {"address": "A12", "value": "Counts were taken on the last working day of the month."}
            ],
            "drawings": [
                {"kind": "chart", "anchor": "F3:K12", "chart": {"chart_type": "bar", "title": "Value by item"}}
            ]
        }"#,
    )
    .unwrap();

    let chunks = analyze(&snapshot);
    assert_eq!(
        kinds(&chunks),
        vec![
            vec![BlockKind::Heading, BlockKind::Table],
            vec![BlockKind::Chart],
            vec![BlockKind::Text],
        ]
    );

    let table = chunks[0].content().and_then(Block::as_table).unwrap();
    assert_eq!(table.footer_rows, vec![9]);
    let labels: Vec<&str> = table
        .row_groups
        .roots()
        .iter()
        .map(|i| table.row_groups.get(*i).unwrap().label.as_str())
        .collect();
    assert_eq!(labels, vec!["Fasteners", "Tools"]);

    let grid = snapshot.to_grid().unwrap();
    assert_eq!(split_regions(&grid, grid.bounds().unwrap()).len(), 3);
}
