use std::fmt;
use std::num::NonZeroU64;

use futures::stream::FuturesUnordered;
use futures::TryStreamExt;
use thiserror::Error;

use crate::catalog::{Catalog, EntityRecord, LookupError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid range [{start}, {end}]: expected 1 <= start <= end")]
    InvalidRange { start: u64, end: u64 },

    #[error("batch [{start}, {end}] failed at entity {id}: {source}")]
    Batch {
        start: u64,
        end: u64,
        id: u64,
        #[source]
        source: LookupError,
    },
}

// a closed interval of identifiers, start <= end, both >= 1
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageRange {
    start: u64,
    end: u64,
}

impl PageRange {
    pub fn new(start: u64, end: u64) -> Result<Self, FetchError> {
        if start == 0 || end < start {
            return Err(FetchError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    // `start` is at least 1 for every cursor position
    pub(crate) fn spanning(start: u64, len: NonZeroU64) -> Self {
        Self {
            start,
            end: start + (len.get() - 1),
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    // never empty, so there is no `is_empty`
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> {
        self.start..=self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Fetches a page of records concurrently and hands them back in ascending id order.
///
/// Every lookup of a batch is polled on the calling task; nothing is spawned.
/// The first failing lookup fails the whole batch and the still pending lookups
/// are dropped with it, so no partial page is ever returned.
pub struct PageFetcher<C> {
    catalog: C,
}

impl<C: Catalog> PageFetcher<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub async fn fetch_ids(&self, start: u64, end: u64) -> Result<Vec<EntityRecord>, FetchError> {
        let range = PageRange::new(start, end)?;
        self.fetch_range(range).await
    }

    pub async fn fetch_range(&self, range: PageRange) -> Result<Vec<EntityRecord>, FetchError> {
        log::debug!("fetching batch {range} ({} lookups)", range.len());

        let lookups: FuturesUnordered<_> = range
            .ids()
            .map(|id| self.catalog.lookup(id))
            .collect();

        let mut records = match lookups.try_collect::<Vec<_>>().await {
            Ok(records) => records,
            Err(source) => {
                return Err(FetchError::Batch {
                    start: range.start(),
                    end: range.end(),
                    id: source.id(),
                    source,
                })
            }
        };

        // completion order is arbitrary
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}
