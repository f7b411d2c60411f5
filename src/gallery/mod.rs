use std::collections::BTreeMap;
use std::num::NonZeroU64;

use thiserror::Error;

use crate::card::{Card, SpriteUrls};
use crate::catalog::{Catalog, EntityRecord};
use crate::fetcher::{FetchError, PageFetcher, PageRange};
use crate::output::RenderSink;
use crate::style::{StyleError, StyleTable};

pub const DEFAULT_PAGE_SIZE: u64 = 28;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("invalid page size {value}, expected positive integer")]
    InvalidPageSize { value: u64 },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("page {range}: {source}")]
    Style {
        range: PageRange,
        #[source]
        source: StyleError,
    },

    #[error("page #{seq} was already committed")]
    AlreadyCommitted { seq: u64 },
}

/// A reserved page: its position in reservation order and the ids it covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub seq: u64,
    pub range: PageRange,
}

// cursor over the catalog; only ever moves forward
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationState {
    page_size: NonZeroU64,
    next_start: u64,
    pages_issued: u64,
}

impl PaginationState {
    pub fn new(page_size: u64) -> Result<Self, GalleryError> {
        let page_size =
            NonZeroU64::new(page_size).ok_or(GalleryError::InvalidPageSize { value: page_size })?;
        Ok(Self {
            page_size,
            next_start: 1,
            pages_issued: 0,
        })
    }

    pub fn page_size(&self) -> u64 {
        self.page_size.get()
    }

    pub fn next_start(&self) -> u64 {
        self.next_start
    }

    /// Last id covered by an issued page, 0 before the first advance.
    pub fn current_end(&self) -> u64 {
        self.next_start - 1
    }

    pub fn pages_issued(&self) -> u64 {
        self.pages_issued
    }

    pub fn advance(&mut self) -> Page {
        let range = PageRange::spanning(self.next_start, self.page_size);
        let page = Page {
            seq: self.pages_issued,
            range,
        };
        self.next_start = range.end() + 1;
        self.pages_issued += 1;
        page
    }
}

#[derive(Debug)]
pub struct LoadedPage {
    pub page: Page,
    pub outcome: Result<Vec<EntityRecord>, FetchError>,
}

#[derive(Debug)]
pub struct PageOutcome {
    pub page: Page,
    pub result: Result<usize, GalleryError>,
}

/// Pagination controller: reserves pages, fetches them and hands cards to the
/// sink strictly in reservation order.
///
/// Reserving is synchronous and moves the cursor immediately, so several
/// pages may be in flight at once (see [`Gallery::load`]). A page that
/// resolves before an earlier one is buffered until the earlier one has been
/// committed. A page whose batch fails appends nothing and releases its slot;
/// it is neither retried nor re-issued.
pub struct Gallery<C, S> {
    fetcher: PageFetcher<C>,
    styles: StyleTable,
    sprites: SpriteUrls,
    sink: S,
    state: PaginationState,
    buffered: BTreeMap<u64, LoadedPage>,
    next_commit: u64,
    cards_appended: usize,
    pages_failed: usize,
}

impl<C: Catalog, S: RenderSink> Gallery<C, S> {
    pub fn new(
        fetcher: PageFetcher<C>,
        styles: StyleTable,
        sprites: SpriteUrls,
        sink: S,
        page_size: u64,
    ) -> Result<Self, GalleryError> {
        Ok(Self {
            fetcher,
            styles,
            sprites,
            sink,
            state: PaginationState::new(page_size)?,
            buffered: BTreeMap::new(),
            next_commit: 0,
            cards_appended: 0,
            pages_failed: 0,
        })
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn fetcher(&self) -> &PageFetcher<C> {
        &self.fetcher
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn cards_appended(&self) -> usize {
        self.cards_appended
    }

    pub fn pages_failed(&self) -> usize {
        self.pages_failed
    }

    /// Pages reserved but not yet handed to the sink.
    pub fn pending_pages(&self) -> u64 {
        self.state.pages_issued() - self.next_commit
    }

    pub fn reserve(&mut self) -> Page {
        let page = self.state.advance();
        log::debug!("reserved page #{} {}", page.seq, page.range);
        page
    }

    pub async fn load(&self, page: Page) -> LoadedPage {
        let outcome = self.fetcher.fetch_range(page.range).await;
        LoadedPage { page, outcome }
    }

    /// Accepts a loaded page and flushes every page that is now next in line.
    /// Returns one outcome per flushed page, in page order.
    pub fn commit(&mut self, loaded: LoadedPage) -> Result<Vec<PageOutcome>, GalleryError> {
        let seq = loaded.page.seq;
        if seq < self.next_commit || self.buffered.contains_key(&seq) {
            return Err(GalleryError::AlreadyCommitted { seq });
        }
        self.buffered.insert(seq, loaded);

        let mut flushed = Vec::new();
        while let Some(loaded) = self.buffered.remove(&self.next_commit) {
            self.next_commit += 1;
            let page = loaded.page;
            let result = match loaded.outcome {
                Ok(records) => self.append_page(page, &records),
                Err(e) => Err(GalleryError::Fetch(e)),
            };
            match &result {
                Ok(count) => {
                    log::info!("page #{} {}: appended {} cards", page.seq, page.range, count)
                }
                Err(e) => {
                    self.pages_failed += 1;
                    log::error!("page #{} {} not appended: {}", page.seq, page.range, e);
                }
            }
            flushed.push(PageOutcome { page, result });
        }
        Ok(flushed)
    }

    /// Reserves, loads and commits the next page.
    ///
    /// Returns the number of cards appended by this call; that is 0 when an
    /// earlier reservation is still outstanding and the page stays buffered.
    pub async fn advance(&mut self) -> Result<usize, GalleryError> {
        let page = self.reserve();
        let loaded = self.load(page).await;
        let mut appended = 0;
        for outcome in self.commit(loaded)? {
            match outcome.result {
                Ok(count) => appended += count,
                Err(e) if outcome.page == page => return Err(e),
                Err(_) => {}
            }
        }
        Ok(appended)
    }

    // all cards of a page are rendered before any is appended
    fn append_page(&mut self, page: Page, records: &[EntityRecord]) -> Result<usize, GalleryError> {
        let cards = records
            .iter()
            .map(|r| Card::render(r, &self.styles, &self.sprites))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| GalleryError::Style {
                range: page.range,
                source,
            })?;
        let count = cards.len();
        for card in cards {
            self.sink.append(card);
        }
        self.cards_appended += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::LookupError;
    use crate::output::CardCollector;
    use crate::style::AttributeColor;

    // records every requested id; ids up to `slow_until` answer after a delay
    #[derive(Default)]
    struct ScriptedCatalog {
        slow_until: u64,
        missing_from: Option<u64>,
        failing_id: Option<u64>,
        unknown_attribute: Option<u64>,
        requests: Mutex<HashMap<u64, usize>>,
    }

    #[async_trait]
    impl Catalog for ScriptedCatalog {
        async fn lookup(&self, id: u64) -> Result<EntityRecord, LookupError> {
            *self.requests.lock().unwrap().entry(id).or_default() += 1;
            if id <= self.slow_until {
                tokio::time::sleep(Duration::from_millis(60)).await;
            }
            if self.missing_from.is_some_and(|m| id >= m) || self.failing_id == Some(id) {
                return Err(LookupError::NotFound { id });
            }
            let attributes = if self.unknown_attribute == Some(id) {
                vec!["shadow".to_string()]
            } else if id % 2 == 0 {
                vec!["water".to_string(), "fire".to_string()]
            } else {
                vec!["fire".to_string()]
            };
            Ok(EntityRecord {
                id,
                name: format!("ENTITY{id}"),
                attributes,
            })
        }
    }

    fn gallery(catalog: ScriptedCatalog, page_size: u64) -> Gallery<ScriptedCatalog, CardCollector> {
        let styles = StyleTable::build(&[
            AttributeColor::new("fire", "#aaa"),
            AttributeColor::new("water", "#bbb"),
        ])
        .unwrap();
        Gallery::new(
            PageFetcher::new(catalog),
            styles,
            SpriteUrls::default(),
            CardCollector::default(),
            page_size,
        )
        .unwrap()
    }

    fn ids(g: &Gallery<ScriptedCatalog, CardCollector>) -> Vec<u64> {
        g.sink().cards().iter().map(|c| c.id).collect()
    }

    #[test]
    fn pagination_state_walks_forward_by_page_size() {
        let mut state = PaginationState::new(DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(state.current_end(), 0);

        let first = state.advance();
        assert_eq!((first.range.start(), first.range.end()), (1, 28));
        let second = state.advance();
        assert_eq!((second.range.start(), second.range.end()), (29, 56));
        assert_eq!((first.seq, second.seq), (0, 1));
        assert_eq!(state.next_start(), 57);
        assert_eq!(state.current_end(), 56);
        assert_eq!(state.pages_issued(), 2);
    }

    #[test]
    fn pagination_state_rejects_zero_page_size() {
        assert!(matches!(
            PaginationState::new(0),
            Err(GalleryError::InvalidPageSize { value: 0 })
        ));
    }

    #[tokio::test]
    async fn sequential_advances_fetch_only_new_pages() {
        let mut g = gallery(ScriptedCatalog::default(), 28);
        assert_eq!(g.advance().await.unwrap(), 28);
        assert_eq!(g.advance().await.unwrap(), 28);

        assert_eq!(ids(&g), (1..=56).collect::<Vec<_>>());
        let requests = g.fetcher().catalog().requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 56);
        assert!(requests.values().all(|&n| n == 1));
        assert_eq!(g.cards_appended(), 56);
    }

    #[tokio::test]
    async fn cards_carry_resolved_styles() {
        let mut g = gallery(ScriptedCatalog::default(), 2);
        g.advance().await.unwrap();
        let cards = g.sink().cards();
        assert_eq!(cards[0].style_class, "type-fire-monotype");
        assert_eq!(cards[0].name, "Entity1");
        assert_eq!(cards[1].style_class, "type-water-fire");
    }

    #[tokio::test]
    async fn overlapping_advances_reserve_distinct_pages_and_commit_in_order() {
        // the first page is slow, so the second resolves first
        let mut g = gallery(
            ScriptedCatalog {
                slow_until: 28,
                ..Default::default()
            },
            28,
        );

        let first = g.reserve();
        let second = g.reserve();
        assert_eq!((first.range.start(), first.range.end()), (1, 28));
        assert_eq!((second.range.start(), second.range.end()), (29, 56));
        assert_eq!(g.state().next_start(), 57);
        assert_eq!(g.pending_pages(), 2);

        let (loaded_first, loaded_second) = tokio::join!(g.load(first), g.load(second));

        // the early page waits for the earlier one
        let flushed = g.commit(loaded_second).unwrap();
        assert!(flushed.is_empty());
        assert!(g.sink().cards().is_empty());

        let flushed = g.commit(loaded_first).unwrap();
        let seqs: Vec<u64> = flushed.iter().map(|o| o.page.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(ids(&g), (1..=56).collect::<Vec<_>>());
        assert_eq!(g.pending_pages(), 0);

        let requests = g.fetcher().catalog().requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 56);
        assert!(requests.values().all(|&n| n == 1));
    }

    #[tokio::test]
    async fn overlapping_loads_complete_concurrently() {
        let mut g = gallery(
            ScriptedCatalog {
                slow_until: 100,
                ..Default::default()
            },
            10,
        );
        let a = g.reserve();
        let b = g.reserve();
        let (la, lb) = tokio::join!(g.load(a), g.load(b));
        g.commit(lb).unwrap();
        g.commit(la).unwrap();
        assert_eq!(ids(&g), (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failed_page_appends_nothing_and_releases_its_slot() {
        let mut g = gallery(
            ScriptedCatalog {
                missing_from: Some(5),
                ..Default::default()
            },
            4,
        );
        assert_eq!(g.advance().await.unwrap(), 4);

        let err = g.advance().await.unwrap_err();
        assert!(matches!(err, GalleryError::Fetch(FetchError::Batch { .. })));
        assert_eq!(ids(&g), vec![1, 2, 3, 4]);
        assert_eq!(g.pages_failed(), 1);
        assert_eq!(g.pending_pages(), 0);
        // no rewind: the failed page is not offered again
        assert_eq!(g.state().next_start(), 9);
    }

    #[tokio::test]
    async fn failed_earlier_page_does_not_block_later_ones() {
        let mut g = gallery(
            ScriptedCatalog {
                failing_id: Some(4),
                ..Default::default()
            },
            2,
        );
        assert_eq!(g.advance().await.unwrap(), 2);
        let failing = g.reserve();
        let later = g.reserve();
        let loaded_later = g.load(later).await;
        let loaded_failing = g.load(failing).await;

        assert!(g.commit(loaded_later).unwrap().is_empty());
        let flushed = g.commit(loaded_failing).unwrap();
        assert_eq!(flushed.len(), 2);
        assert_eq!((flushed[0].page.seq, flushed[1].page.seq), (1, 2));
        assert!(matches!(
            flushed[0].result,
            Err(GalleryError::Fetch(FetchError::Batch { id: 4, .. }))
        ));
        assert!(matches!(flushed[1].result, Ok(2)));
        assert_eq!(g.pages_failed(), 1);
        assert_eq!(g.cards_appended(), 4);
        assert_eq!(ids(&g), vec![1, 2, 5, 6]);
        assert_eq!(g.pending_pages(), 0);
    }

    #[tokio::test]
    async fn unknown_attribute_fails_the_page_loudly() {
        let mut g = gallery(
            ScriptedCatalog {
                unknown_attribute: Some(3),
                ..Default::default()
            },
            4,
        );
        let err = g.advance().await.unwrap_err();
        match err {
            GalleryError::Style { source, .. } => assert_eq!(
                source,
                StyleError::LookupMiss {
                    attribute: "shadow".to_string()
                }
            ),
            other => panic!("unexpected error: {other}"),
        }
        assert!(g.sink().cards().is_empty());
    }

    #[tokio::test]
    async fn committing_the_same_page_twice_is_rejected() {
        let mut g = gallery(ScriptedCatalog::default(), 3);
        let page = g.reserve();
        let loaded = g.load(page).await;
        g.commit(loaded).unwrap();
        let again = g.load(page).await;
        assert!(matches!(
            g.commit(again),
            Err(GalleryError::AlreadyCommitted { seq: 0 })
        ));
    }
}
