//! Per-sheet analysis pipeline

use std::panic::{catch_unwind, AssertUnwindSafe};

use sheetsense_core::{CellRange, Drawing, DrawingKind, Grid, SheetSnapshot};
use sheetsense_oracle::Oracle;

use crate::block::{Block, ChartBlock, Chunk, ImageBlock};
use crate::detect::classify;
use crate::group::group_blocks;
use crate::options::AnalyzerOptions;
use crate::refine::refine_region;
use crate::split::split_regions;
use crate::structure::build_table;

/// Runs the layout pipeline over one sheet at a time
///
/// Splitting, optional refinement, classification and table structuring
/// run sequentially; the oracle, when present, is called from this thread
/// only.
///
/// # Example
///
/// ```rust
/// use sheetsense_core::{Cell, CellAddress, Grid};
/// use sheetsense_layout::{AnalyzerOptions, SheetAnalyzer};
///
/// let grid = Grid::from_cells(vec![
///     Cell::new(CellAddress::new(1, 1), "Name").bold(),
///     Cell::new(CellAddress::new(1, 2), "Score").bold(),
///     Cell::new(CellAddress::new(2, 1), "Ann"),
///     Cell::new(CellAddress::new(2, 2), "7"),
///     Cell::new(CellAddress::new(3, 1), "Bob"),
///     Cell::new(CellAddress::new(3, 2), "9"),
/// ])
/// .unwrap();
///
/// let chunks = SheetAnalyzer::new(AnalyzerOptions::default()).analyze(&grid, &[]);
/// assert_eq!(chunks.len(), 1);
/// ```
pub struct SheetAnalyzer<'o> {
    options: AnalyzerOptions,
    oracle: Option<&'o dyn Oracle>,
}

impl<'o> SheetAnalyzer<'o> {
    /// Analyzer without an oracle
    pub fn new(options: AnalyzerOptions) -> Self {
        Self {
            options,
            oracle: None,
        }
    }

    /// Analyzer that may consult `oracle`
    pub fn with_oracle(options: AnalyzerOptions, oracle: &'o dyn Oracle) -> Self {
        Self {
            options,
            oracle: Some(oracle),
        }
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Candidate regions after splitting and, when enabled, refinement
    pub fn regions(&self, grid: &Grid) -> Vec<CellRange> {
        let Some(bounds) = grid.bounds() else {
            return Vec::new();
        };
        let regions = split_regions(grid, bounds);

        match self.oracle {
            Some(oracle) if self.options.refine.enabled => {
                let refined: Vec<CellRange> = regions
                    .into_iter()
                    .flat_map(|range| refine_region(&grid.region(range), oracle).into_regions(range))
                    .collect();
                tracing::debug!(regions = refined.len(), "refined regions");
                refined
            }
            _ => regions,
        }
    }

    /// Classified blocks in reading order
    ///
    /// Regions no detector accepts are left out. A region whose analysis
    /// panics is logged and skipped; the rest of the sheet is unaffected.
    pub fn analyze_blocks(&self, grid: &Grid, drawings: &[Drawing]) -> Vec<Block> {
        let mut blocks = Vec::new();
        for range in self.regions(grid) {
            match catch_unwind(AssertUnwindSafe(|| self.analyze_region(grid, range))) {
                Ok(Some(block)) => blocks.push(block),
                Ok(None) => {}
                Err(_) => tracing::warn!(region = %range, "region analysis panicked; skipping region"),
            }
        }
        blocks.extend(drawings.iter().map(|d| drawing_block(grid, d)));
        blocks.sort_by_key(Block::reading_position);
        blocks
    }

    /// Blocks grouped into chunks
    pub fn analyze(&self, grid: &Grid, drawings: &[Drawing]) -> Vec<Chunk> {
        let blocks = self.analyze_blocks(grid, drawings);
        let block_count = blocks.len();
        let chunks = group_blocks(blocks, &self.options.grouping);
        tracing::info!(blocks = block_count, chunks = chunks.len(), "analyzed sheet");
        chunks
    }

    /// Build the snapshot's grid and analyze it
    pub fn analyze_snapshot(&self, snapshot: &SheetSnapshot) -> sheetsense_core::Result<Vec<Chunk>> {
        let grid = snapshot.to_grid()?;
        tracing::info!(
            sheet = snapshot.name.as_deref().unwrap_or("(unnamed)"),
            cells = grid.len(),
            "analyzing sheet"
        );
        Ok(self.analyze(&grid, &snapshot.drawings))
    }

    fn analyze_region(&self, grid: &Grid, range: CellRange) -> Option<Block> {
        let region = grid.region(range);
        match classify(&region, self.options.mode, self.oracle, &self.options)? {
            Block::Table(detected) => {
                let table_region = grid.region(detected.bounds);
                Some(Block::Table(build_table(
                    &table_region,
                    &detected,
                    self.oracle,
                    &self.options,
                )))
            }
            block => Some(block),
        }
    }
}

fn drawing_block(grid: &Grid, drawing: &Drawing) -> Block {
    let cells = grid
        .region(drawing.anchor)
        .cells()
        .into_iter()
        .cloned()
        .collect();
    match drawing.kind {
        DrawingKind::Chart => Block::Chart(ChartBlock {
            bounds: drawing.anchor,
            chart: drawing.chart.clone().unwrap_or_default(),
            cells,
        }),
        DrawingKind::Image => Block::Image(ImageBlock {
            bounds: drawing.anchor,
            description: drawing.description.clone(),
            cells,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;
    use crate::options::DetectionMode;
    use pretty_assertions::assert_eq;
    use sheetsense_core::{Cell, CellAddress, ChartData};
    use sheetsense_oracle::{OracleRequest, OracleResult, OracleTask};

    fn kinds(chunks: &[Chunk]) -> Vec<Vec<BlockKind>> {
        chunks
            .iter()
            .map(|c| c.blocks().iter().map(Block::kind).collect())
            .collect()
    }

    fn report() -> Grid {
        let a1 = CellAddress::new(1, 1);
        let mut cells = vec![Cell::new(a1, "TITLE").bold().with_merge(a1)];
        cells.extend((2..=4).map(|col| Cell::empty(CellAddress::new(1, col)).with_merge(a1)));
        cells.push(Cell::new(CellAddress::new(3, 1), "Name").bold());
        cells.push(Cell::new(CellAddress::new(3, 2), "Score").bold());
        for (row, (name, score)) in [("Ann", "7"), ("Bob", "9"), ("Cy", "4")].into_iter().enumerate() {
            cells.push(Cell::new(CellAddress::new(row as u32 + 4, 1), name));
            cells.push(Cell::new(CellAddress::new(row as u32 + 4, 2), score));
        }
        Grid::from_cells(cells).unwrap()
    }

    #[test]
    fn test_title_and_table() {
        let grid = report();
        let chunks = SheetAnalyzer::new(AnalyzerOptions::default()).analyze(&grid, &[]);

        assert_eq!(kinds(&chunks), vec![vec![BlockKind::Heading, BlockKind::Table]]);
        let table = chunks[0].content().and_then(Block::as_table).unwrap();
        assert_eq!(table.header_rows, vec![3]);
        assert_eq!(table.body_rows().collect::<Vec<_>>(), vec![4, 5, 6]);
        assert_eq!(table.title(), Some("TITLE"));
    }

    #[test]
    fn test_drawings_join_reading_order() {
        let grid = report();
        let drawings = vec![
            Drawing::chart(
                CellRange::parse("F3:J12").unwrap(),
                ChartData {
                    chart_type: "bar".into(),
                    ..ChartData::default()
                },
            ),
            Drawing::image(CellRange::parse("A20:C25").unwrap(), Some("logo".into())),
        ];
        let blocks = SheetAnalyzer::new(AnalyzerOptions::default()).analyze_blocks(&grid, &drawings);

        assert_eq!(
            blocks.iter().map(Block::kind).collect::<Vec<_>>(),
            vec![BlockKind::Heading, BlockKind::Table, BlockKind::Chart, BlockKind::Image]
        );
    }

    #[test]
    fn test_panicking_region_is_isolated() {
        let grid = report();
        let oracle = |request: &OracleRequest| -> OracleResult<String> {
            if request.excerpt.contains("TITLE") {
                panic!("oracle blew up");
            }
            Ok(match request.task {
                OracleTask::DetectTable => r#"{"is_table": true, "tables": [
                    {"top_left": "A3", "bottom_right": "B6", "header_rows": [3]}]}"#
                    .to_string(),
                _ => "{}".to_string(),
            })
        };
        let options = AnalyzerOptions::default().with_mode(DetectionMode::Oracle);
        let blocks = SheetAnalyzer::with_oracle(options, &oracle).analyze_blocks(&grid, &[]);

        assert_eq!(blocks.iter().map(Block::kind).collect::<Vec<_>>(), vec![BlockKind::Table]);
    }

    #[test]
    fn test_refinement_replaces_regions() {
        let grid = Grid::from_cells(vec![
            Cell::new(CellAddress::new(1, 1), "Scores").bold(),
            Cell::new(CellAddress::new(2, 1), "Name").bold(),
            Cell::new(CellAddress::new(2, 2), "Score").bold(),
            Cell::new(CellAddress::new(3, 1), "Ann"),
            Cell::new(CellAddress::new(3, 2), "7"),
            Cell::new(CellAddress::new(4, 1), "Bob"),
            Cell::new(CellAddress::new(4, 2), "9"),
        ])
        .unwrap();
        let oracle = |request: &OracleRequest| -> OracleResult<String> {
            assert_eq!(request.task, OracleTask::RefineRegion);
            Ok(r#"{"split": true, "regions": [
                {"top_left": "A1", "bottom_right": "B1"},
                {"top_left": "A2", "bottom_right": "B4"}]}"#
                .to_string())
        };

        let plain = SheetAnalyzer::new(AnalyzerOptions::default());
        assert_eq!(plain.regions(&grid), vec![CellRange::parse("A1:B4").unwrap()]);

        let refining = SheetAnalyzer::with_oracle(AnalyzerOptions::default().with_refinement(true), &oracle);
        let chunks = refining.analyze(&grid, &[]);
        assert_eq!(kinds(&chunks), vec![vec![BlockKind::Heading, BlockKind::Table]]);
    }

    #[test]
    fn test_empty_grid() {
        let chunks = SheetAnalyzer::new(AnalyzerOptions::default()).analyze(&Grid::empty(), &[]);
        assert!(chunks.is_empty());
    }
}
