//! Oracle-backed region refinement
//!
//! Whitespace splitting cannot separate blocks that touch, such as a
//! heading sitting directly on a table. The refiner asks the oracle whether
//! a region holds several stacked blocks and, if the proposed sub-regions
//! check out, replaces the region with them.

use ahash::AHashSet;
use serde::Deserialize;
use sheetsense_core::{CellAddress, CellRange, Region};
use sheetsense_oracle::{ask, render_cells, Oracle, OracleReply, OracleRequest, OracleTask, SampleLimits};

/// What to do with a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineOutcome {
    /// Use the region as it is
    Keep,
    /// Replace the region with these sub-regions
    Split(Vec<CellRange>),
}

impl RefineOutcome {
    /// The regions to classify in place of `original`
    pub fn into_regions(self, original: CellRange) -> Vec<CellRange> {
        match self {
            RefineOutcome::Keep => vec![original],
            RefineOutcome::Split(regions) => regions,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RefineReply {
    Decision {
        #[serde(default)]
        split: bool,
        #[serde(default)]
        regions: Vec<ProposedRegion>,
    },
    Regions(Vec<ProposedRegion>),
}

#[derive(Debug, Deserialize)]
struct ProposedRegion {
    top_left: String,
    bottom_right: String,
}

/// Ask the oracle whether `region` should be split
///
/// Any failure, a negative answer, or a proposal that does not fit the
/// region yields [`RefineOutcome::Keep`].
pub fn refine_region(region: &Region<'_>, oracle: &dyn Oracle) -> RefineOutcome {
    let cells = region.non_empty_cells();
    let excerpt = format!(
        "Region {} ({} rows x {} columns)\n{}",
        region.range(),
        region.num_rows(),
        region.num_cols(),
        render_cells(cells.iter().map(|c| c.as_ref()), &SampleLimits::default())
    );
    let request = OracleRequest::new(OracleTask::RefineRegion, excerpt);

    let proposed = match ask::<RefineReply>(oracle, &request) {
        OracleReply::Answer(RefineReply::Decision { split: true, regions }) => regions,
        OracleReply::Answer(RefineReply::Regions(regions)) => regions,
        OracleReply::Answer(_) => return RefineOutcome::Keep,
        OracleReply::Malformed(reason) => {
            tracing::debug!(region = %region.range(), %reason, "keeping region after malformed refinement reply");
            return RefineOutcome::Keep;
        }
        OracleReply::Failed(_) => return RefineOutcome::Keep,
    };

    match validate(region, &proposed) {
        Some(regions) if regions.len() > 1 => {
            tracing::debug!(region = %region.range(), parts = regions.len(), "refined region");
            RefineOutcome::Split(regions)
        }
        Some(_) => RefineOutcome::Keep,
        None => {
            tracing::debug!(region = %region.range(), "discarding refinement that does not fit the region");
            RefineOutcome::Keep
        }
    }
}

/// Sub-regions must lie inside the region, not overlap, and cover every value
fn validate(region: &Region<'_>, proposed: &[ProposedRegion]) -> Option<Vec<CellRange>> {
    let bounds = region.range();
    let mut ranges: Vec<CellRange> = Vec::with_capacity(proposed.len());
    for p in proposed {
        let top_left = CellAddress::parse(p.top_left.trim()).ok()?;
        let bottom_right = CellAddress::parse(p.bottom_right.trim()).ok()?;
        if top_left.row > bottom_right.row || top_left.col > bottom_right.col {
            return None;
        }
        let range = CellRange::new(top_left, bottom_right);
        if !bounds.encloses(&range) || ranges.iter().any(|r| r.overlaps(&range)) {
            return None;
        }
        ranges.push(range);
    }

    let covered: AHashSet<CellAddress> = region
        .non_empty_cells()
        .into_iter()
        .map(|c| c.address)
        .filter(|a| ranges.iter().any(|r| r.contains(a)))
        .collect();
    if covered.len() != region.non_empty_cells().len() {
        return None;
    }

    ranges.sort_by_key(|r| (r.min_row(), r.min_col()));
    Some(ranges)
}
