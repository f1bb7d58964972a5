//! Split `[1, total]` into contiguous page ranges, one per worker.
//!
//! Ranges are `ceil(total / workers)` pages long; the last one is clamped to
//! `total`. When there are fewer pages than workers the loop simply stops
//! early, so some workers get nothing to do rather than an empty range.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive, 1-indexed span of pages assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRange {
    pub first: u32,
    pub last: u32,
}

impl PageRange {
    pub fn new(first: u32, last: u32) -> Self {
        debug_assert!(first >= 1 && last >= first, "invalid range {first}-{last}");
        Self { first, last }
    }

    /// Number of pages in the range.
    pub fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    /// Always false; ranges hold at least one page.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Page numbers in increasing order.
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.first..=self.last
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

/// Plan the ranges covering `[1, total]` for `workers` workers.
///
/// Returns an empty plan when `total == 0`. `workers` must be at least 1;
/// worker counts are validated by [`crate::config::ConversionConfigBuilder::build`].
pub fn plan(total: u32, workers: usize) -> Vec<PageRange> {
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.max(1) as u32;
    let per_worker = total.div_ceil(workers);

    let mut ranges = Vec::with_capacity(workers as usize);
    let mut first = 1u32;
    loop {
        let last = first.saturating_add(per_worker - 1).min(total);
        ranges.push(PageRange::new(first, last));
        if last == total {
            return ranges;
        }
        first = last + 1;
    }
}
