use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Largest offset a page may carry. Stores bind offsets as signed 64-bit
/// integers.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Offset-based page selection.
///
/// Rows inserted or removed between two requests may shift page boundaries;
/// callers must tolerate duplicated or skipped rows across pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    /// Build a page from a 1-based page number and a page size.
    pub fn numbered(page: u64, limit: u64) -> Self {
        let limit = Self::clamp_limit(limit);
        Self {
            limit,
            offset: page
                .max(1)
                .saturating_sub(1)
                .saturating_mul(limit)
                .min(MAX_OFFSET),
        }
    }

    pub fn at_offset(limit: u64, offset: u64) -> Self {
        Self {
            limit: Self::clamp_limit(limit),
            offset: offset.min(MAX_OFFSET),
        }
    }

    /// Whether a page that returned `len` rows may have a successor.
    pub fn has_more(&self, len: usize) -> bool {
        len as u64 == self.limit
    }

    fn clamp_limit(limit: u64) -> u64 {
        limit.clamp(1, MAX_PAGE_SIZE)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}
