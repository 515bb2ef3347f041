//! Trip history filter and pagination.

use rank_core::{Timestamp, TripStatus};
use rank_store::TripQuery;

use crate::{TripError, TripResult};

/// Largest accepted `page_size`.
pub const MAX_PAGE_SIZE: u32 = 100;

/// History query.  `page` is 1-based; `created_to` is exclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TripFilter {
    pub status:       Option<TripStatus>,
    pub created_from: Option<Timestamp>,
    pub created_to:   Option<Timestamp>,
    pub page:         u32,
    pub page_size:    u32,
}

impl Default for TripFilter {
    fn default() -> Self {
        Self { status: None, created_from: None, created_to: None, page: 1, page_size: 20 }
    }
}

impl TripFilter {
    pub fn with_status(mut self, status: TripStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_between(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.created_from = Some(from);
        self.created_to = Some(to);
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Check the filter and turn it into a storage query.
    pub(crate) fn to_query(&self) -> TripResult<TripQuery> {
        if self.page == 0 {
            return Err(TripError::InvalidFilter("page starts at 1"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(TripError::InvalidFilter("page_size must be between 1 and 100"));
        }
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(TripError::InvalidFilter("created_from is after created_to"));
            }
        }
        Ok(TripQuery {
            status:       self.status,
            created_from: self.created_from,
            created_to:   self.created_to,
            limit:        self.page_size,
            offset:       u64::from(self.page - 1) * u64::from(self.page_size),
        })
    }
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page<T> {
    pub items:      Vec<T>,
    /// Matches across all pages.
    pub total:      u64,
    pub page:       u32,
    pub page_size:  u32,
    pub page_count: u64,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        let page_count = total.div_ceil(u64::from(page_size.max(1)));
        Self { items, total, page, page_size, page_count }
    }
}
