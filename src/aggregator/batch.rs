//! Fixed-size batches of the hop stream.

use crate::parser::Hop;
use crate::utils::error::GroupError;

/// A contiguous slice of the input, grouped as one unit of work
#[derive(Debug, Clone)]
pub struct Batch {
    /// Position in input order
    pub index: usize,
    pub hops: Vec<Hop>,
}

/// Split hops into batches of `batch_size`
///
/// **Public** - first step of grouping
///
/// The last batch may be shorter. An empty input yields no batches.
///
/// # Errors
/// * `GroupError::InvalidBatchSize` - `batch_size` is zero
pub fn into_batches(hops: Vec<Hop>, batch_size: usize) -> Result<Vec<Batch>, GroupError> {
    if batch_size == 0 {
        return Err(GroupError::InvalidBatchSize);
    }

    let mut batches = Vec::with_capacity(hops.len().div_ceil(batch_size));
    let mut remaining = hops.into_iter().peekable();

    while remaining.peek().is_some() {
        let chunk: Vec<Hop> = remaining.by_ref().take(batch_size).collect();
        batches.push(Batch {
            index: batches.len(),
            hops: chunk,
        });
    }

    Ok(batches)
}
