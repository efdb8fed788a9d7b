//! Offset-keyed paging.
//!
//! [`PagingAdapter`] turns an offset/limit remote list into key-based pages
//! for list consumers; [`Pager`] walks an adapter forward lazily, one page
//! per call.

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, Stream};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Parameters handed to a remote fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// 1-based page number for APIs that paginate by page instead of offset
    pub fn page_number(&self) -> u32 {
        self.offset / self.page_size.max(1) + 1
    }
}

/// What a remote fetch returns: one page of raw items plus neighbour hints
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePage<R> {
    pub items: Vec<R>,
    pub has_previous: bool,
    pub has_next: bool,
}

/// A loaded page with the keys of its neighbours
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub previous_key: Option<u32>,
    pub next_key: Option<u32>,
}

type FetchFn<R, E> =
    dyn Fn(PageRequest) -> BoxFuture<'static, Result<RemotePage<R>, E>> + Send + Sync;
type TransformFn<R, T> = dyn Fn(R) -> T + Send + Sync;

/// Maps offset keys to remote fetches and remote items to domain items.
///
/// Holds nothing but its two closures, so clones are cheap and any number
/// of loads may run at once.
pub struct PagingAdapter<R, T, E> {
    fetch: Arc<FetchFn<R, E>>,
    transform: Arc<TransformFn<R, T>>,
}

impl<R, T, E> Clone for PagingAdapter<R, T, E> {
    fn clone(&self) -> Self {
        Self {
            fetch: Arc::clone(&self.fetch),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<R, T, E> fmt::Debug for PagingAdapter<R, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagingAdapter").finish_non_exhaustive()
    }
}

impl<R, T, E> PagingAdapter<R, T, E>
where
    R: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F, Fut, M>(fetch: F, transform: M) -> Self
    where
        F: Fn(PageRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RemotePage<R>, E>> + Send + 'static,
        M: Fn(R) -> T + Send + Sync + 'static,
    {
        Self {
            fetch: Arc::new(move |request| fetch(request).boxed()),
            transform: Arc::new(transform),
        }
    }

    /// Load the page starting at `key` (the first page when `None`).
    ///
    /// Remote errors are returned untouched; nothing is retried here.
    pub async fn load(&self, key: Option<u32>, page_size: u32) -> Result<PageResult<T>, E> {
        let offset = key.unwrap_or(0);
        let page = (self.fetch)(PageRequest { offset, page_size }).await?;

        let previous_key =
            (page.has_previous && offset > 0).then(|| offset.saturating_sub(page_size));
        // An offset past u32::MAX ends the list
        let next_key = page
            .has_next
            .then(|| offset.checked_add(page_size))
            .flatten();
        let items = page.items.into_iter().map(|item| (self.transform)(item)).collect();

        Ok(PageResult {
            items,
            previous_key,
            next_key,
        })
    }

    /// A lazy forward sequence over this adapter
    pub fn pager(&self, page_size: u32) -> Pager<T, E> {
        let adapter = self.clone();
        Pager::new(
            move |key, size| {
                let adapter = adapter.clone();
                async move { adapter.load(key, size).await }
            },
            page_size,
        )
    }
}

type LoadFn<T, E> =
    dyn Fn(Option<u32>, u32) -> BoxFuture<'static, Result<PageResult<T>, E>> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Key(Option<u32>),
    Exhausted,
}

/// Lazy paginated sequence.
///
/// Each [`next_page`](Self::next_page) performs exactly one load. A failed
/// load keeps the cursor where it was, so calling again retries that page.
pub struct Pager<T, E> {
    load: Arc<LoadFn<T, E>>,
    page_size: u32,
    cursor: Cursor,
    pages_loaded: usize,
}

impl<T, E> fmt::Debug for Pager<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("page_size", &self.page_size)
            .field("cursor", &self.cursor)
            .field("pages_loaded", &self.pages_loaded)
            .finish()
    }
}

impl<T, E> Pager<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F, Fut>(load: F, page_size: u32) -> Self
    where
        F: Fn(Option<u32>, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PageResult<T>, E>> + Send + 'static,
    {
        Self {
            load: Arc::new(move |key, size| load(key, size).boxed()),
            page_size: page_size.max(1),
            cursor: Cursor::Key(None),
            pages_loaded: 0,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Start over from the first page
    pub fn refresh(&mut self) {
        self.cursor = Cursor::Key(None);
    }

    /// Load the next page, `None` once the last page has been delivered
    pub async fn next_page(&mut self) -> Option<Result<PageResult<T>, E>> {
        let key = match self.cursor {
            Cursor::Key(key) => key,
            Cursor::Exhausted => return None,
        };

        let result = (self.load)(key, self.page_size).await;
        if let Ok(page) = &result {
            self.pages_loaded += 1;
            self.cursor = match page.next_key {
                Some(next) => Cursor::Key(Some(next)),
                None => Cursor::Exhausted,
            };
        }
        Some(result)
    }

    /// Collect items across pages until `limit` is reached or pages run out
    pub async fn take_items(mut self, limit: usize) -> Result<Vec<T>, E> {
        let mut items = Vec::with_capacity(limit);
        while items.len() < limit {
            match self.next_page().await {
                Some(page) => items.extend(page?.items),
                None => break,
            }
        }
        items.truncate(limit);
        Ok(items)
    }

    /// Pages as a stream; the stream ends after the first error
    pub fn into_stream(self) -> impl Stream<Item = Result<PageResult<T>, E>> {
        stream::unfold(Some(self), |state| async move {
            let Some(mut pager) = state else {
                return None;
            };
            match pager.next_page().await {
                Some(Ok(page)) => Some((Ok(page), Some(pager))),
                Some(Err(e)) => Some((Err(e), None)),
                None => None,
            }
        })
    }
}
