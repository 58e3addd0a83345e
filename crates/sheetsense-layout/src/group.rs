//! Heading/content grouping

use crate::block::{Block, Chunk};
use crate::options::GroupingOptions;

/// Pair each heading with the block right below it
///
/// `blocks` must be in reading order. A heading absorbs the next block when
/// that block starts below it, is not itself a heading, is separated by at
/// most `max_row_gap` blank rows, and shares at least `min_col_overlap` of
/// the heading's columns. An untitled table takes the heading's text as its
/// title. Everything else becomes a chunk of its own.
pub fn group_blocks(blocks: Vec<Block>, options: &GroupingOptions) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(blocks.len());
    let mut blocks = blocks.into_iter().peekable();

    while let Some(block) = blocks.next() {
        let Block::Heading(heading) = &block else {
            chunks.push(Chunk::single(block));
            continue;
        };
        let belongs = blocks.peek().is_some_and(|next| {
            let top = next.bounds().min_row();
            let bottom = heading.bounds.max_row();
            !next.is_heading()
                && top > bottom
                && top - bottom - 1 <= options.max_row_gap
                && heading.bounds.col_overlap_fraction(&next.bounds()) >= options.min_col_overlap
        });
        if !belongs {
            chunks.push(Chunk::single(block));
            continue;
        }

        let Some(mut content) = blocks.next() else {
            chunks.push(Chunk::single(block));
            continue;
        };
        if let Block::Table(table) = &mut content {
            table.set_title_once(heading.text.clone());
        }
        chunks.push(Chunk::pair(block, content));
    }

    tracing::debug!(chunks = chunks.len(), "grouped blocks");
    chunks
}
