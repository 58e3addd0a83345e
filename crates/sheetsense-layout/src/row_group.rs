//! Row group forest
//!
//! Row groups nest: a bold label row governs the rows beneath it, and
//! merged cells inside those rows may declare finer groups. The forest is
//! stored as an arena of [`RowGroup`] records linked by index, built
//! strictly top-down.

use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use sheetsense_core::SharedCell;

/// Inclusive span of row numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowSpan {
    pub start: u32,
    pub end: u32,
}

impl RowSpan {
    /// Create a span, normalising the bounds
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Number of rows covered
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always false; a span covers at least one row
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, row: u32) -> bool {
        row >= self.start && row <= self.end
    }

    /// Whether `other` lies inside this span
    pub fn encloses(&self, other: &RowSpan) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Whether `other` lies inside this span and is smaller
    pub fn strictly_encloses(&self, other: &RowSpan) -> bool {
        self.encloses(other) && self != other
    }

    pub fn overlaps(&self, other: &RowSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Row numbers in order
    pub fn rows(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// One node of the row group forest
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    /// Label text
    pub label: String,
    /// Cell holding the label, when it exists in the grid
    pub label_cell: Option<SharedCell>,
    /// Row holding the label, for groups introduced by a label row
    ///
    /// A label row belongs to its group but is never one of its data rows.
    /// Groups declared by a merged cell have no label row: the merge
    /// anchor sits in a data row.
    pub label_row: Option<u32>,
    /// Every row the group covers, label row included
    pub rows: RowSpan,
    /// Non-empty cells of the rows this group governs directly
    pub data_rows: Vec<SharedCell>,
    /// Index of the parent group
    pub parent: Option<usize>,
    /// Indices of the child groups, in row order
    pub children: Vec<usize>,
}

impl RowGroup {
    /// Create a group with no cells assigned yet
    pub fn new<S: Into<String>>(label: S, rows: RowSpan) -> Self {
        Self {
            label: label.into(),
            label_cell: None,
            label_row: None,
            rows,
            data_rows: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Set the label cell
    pub fn with_label_cell(mut self, cell: Option<SharedCell>) -> Self {
        self.label_cell = cell;
        self
    }

    /// Set the label row
    pub fn with_label_row(mut self, row: u32) -> Self {
        self.label_row = Some(row);
        self
    }
}

/// Arena of [`RowGroup`]s
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowGroupForest {
    groups: Vec<RowGroup>,
    roots: Vec<usize>,
}

impl RowGroupForest {
    /// Create an empty forest
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups at every depth
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All groups, in insertion order
    pub fn groups(&self) -> &[RowGroup] {
        &self.groups
    }

    /// Top-level group indices, in row order
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn get(&self, index: usize) -> Option<&RowGroup> {
        self.groups.get(index)
    }

    /// Child groups of a group
    pub fn children(&self, index: usize) -> impl Iterator<Item = &RowGroup> + '_ {
        self.groups
            .get(index)
            .into_iter()
            .flat_map(move |g| g.children.iter().map(move |c| &self.groups[*c]))
    }

    /// Insert a top-level group
    ///
    /// Returns `None` if it overlaps an existing top-level group.
    pub fn add_root(&mut self, group: RowGroup) -> Option<usize> {
        if self
            .roots
            .iter()
            .any(|r| self.groups[*r].rows.overlaps(&group.rows))
        {
            return None;
        }
        let index = self.push(group, None);
        let rows = &self.groups;
        self.roots.push(index);
        self.roots.sort_by_key(|r| rows[*r].rows.start);
        Some(index)
    }

    /// Insert a child group under `parent`
    ///
    /// Returns `None` if the parent does not exist, the child's rows are not
    /// a strict subset of the parent's, or the child overlaps a sibling.
    pub fn add_child(&mut self, parent: usize, group: RowGroup) -> Option<usize> {
        let parent_group = self.groups.get(parent)?;
        if !parent_group.rows.strictly_encloses(&group.rows) {
            return None;
        }
        if parent_group
            .children
            .iter()
            .any(|c| self.groups[*c].rows.overlaps(&group.rows))
        {
            return None;
        }
        let index = self.push(group, Some(parent));
        let groups = &mut self.groups;
        let mut children = std::mem::take(&mut groups[parent].children);
        children.push(index);
        children.sort_by_key(|c| groups[*c].rows.start);
        groups[parent].children = children;
        Some(index)
    }

    /// Innermost group whose rows contain `row`
    pub fn innermost_containing(&self, row: u32) -> Option<usize> {
        let mut level: &[usize] = &self.roots;
        let mut found = None;
        while let Some(index) = level.iter().copied().find(|i| self.groups[*i].rows.contains(row)) {
            found = Some(index);
            level = self.groups[index].children.as_slice();
        }
        found
    }

    /// Smallest group whose rows strictly enclose `rows`
    pub fn tightest_enclosing(&self, rows: &RowSpan) -> Option<usize> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.rows.strictly_encloses(rows))
            .min_by_key(|(_, g)| g.rows.len())
            .map(|(i, _)| i)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut RowGroup> {
        self.groups.get_mut(index)
    }

    fn push(&mut self, mut group: RowGroup, parent: Option<usize>) -> usize {
        group.parent = parent;
        group.children.clear();
        self.groups.push(group);
        self.groups.len() - 1
    }
}

struct GroupNode<'a> {
    forest: &'a RowGroupForest,
    index: usize,
}

struct GroupList<'a> {
    forest: &'a RowGroupForest,
    indices: &'a [usize],
}

impl Serialize for GroupNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let group = &self.forest.groups[self.index];
        let mut s = serializer.serialize_struct("RowGroup", 6)?;
        s.serialize_field("label", &group.label)?;
        s.serialize_field("label_cell", &group.label_cell)?;
        s.serialize_field("start_row", &group.rows.start)?;
        s.serialize_field("end_row", &group.rows.end)?;
        s.serialize_field("data_rows", &group.data_rows)?;
        s.serialize_field(
            "children",
            &GroupList {
                forest: self.forest,
                indices: &group.children,
            },
        )?;
        s.end()
    }
}

impl Serialize for GroupList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.indices.len()))?;
        for index in self.indices {
            seq.serialize_element(&GroupNode {
                forest: self.forest,
                index: *index,
            })?;
        }
        seq.end()
    }
}

/// Serialized as the nested list of top-level groups
impl Serialize for RowGroupForest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GroupList {
            forest: self,
            indices: &self.roots,
        }
        .serialize(serializer)
    }
}
