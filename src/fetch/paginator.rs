//! Cursor-following pagination.

use crate::error::FetchError;
use crate::fetch::PageSource;
use crate::models::{Cursor, Page};
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use tracing::{debug, info};

/// Walks a [`PageSource`] one page at a time.
///
/// The walk ends only when a page carries no next pointer. A next pointer
/// that leads back to a page already read in this walk is an error.
pub struct Paginator<'a, S: PageSource> {
    source: &'a S,
    next: Option<Cursor>,
    visited: HashSet<Cursor>,
    page: usize,
}

impl<'a, S: PageSource> Paginator<'a, S> {
    /// Start a walk at `start`.
    pub fn new(source: &'a S, start: Cursor) -> Self {
        Self {
            source,
            next: Some(start),
            visited: HashSet::new(),
            page: 0,
        }
    }

    /// Number of pages read so far.
    pub fn pages_read(&self) -> usize {
        self.page
    }

    /// Fetch the next page, or `None` once the stream is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Page<S::Record>>, FetchError> {
        let Some(cursor) = self.next.take() else {
            return Ok(None);
        };

        self.page += 1;
        info!("Reading {} (page {})", self.source.label(), self.page);

        let page = self.source.fetch(&cursor, self.page).await?;
        debug!(
            "{} page {}: {} records",
            self.source.label(),
            self.page,
            page.records.len()
        );
        self.visited.insert(cursor);

        if let Some(ref next) = page.next {
            if self.visited.contains(next) {
                return Err(FetchError::CursorCycle {
                    source_id: self.source.label().to_string(),
                    page: self.page,
                    cursor: next.to_string(),
                });
            }
        }

        self.next = page.next.clone();
        Ok(Some(page))
    }

    /// Turn the walk into a lazy stream of records, in page order.
    pub fn into_records(self) -> impl Stream<Item = Result<S::Record, FetchError>> + 'a
    where
        S::Record: 'a,
    {
        stream::try_unfold(self, |mut paginator| async move {
            let page = paginator.next_page().await?;
            Ok(page.map(|page| {
                let records = stream::iter(page.records.into_iter().map(Ok::<_, FetchError>));
                (records, paginator)
            }))
        })
        .try_flatten()
    }
}

/// Walk `source` from `start` and collect every record.
pub async fn fetch_all<'a, S>(source: &'a S, start: Cursor) -> Result<Vec<S::Record>, FetchError>
where
    S: PageSource,
    S::Record: 'a,
{
    Paginator::new(source, start).into_records().try_collect().await
}
