//! Page sources.
//!
//! A page source answers "give me page N of size S". It signals the end of
//! the data with an empty page, never with an error.

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::{FetchError, Page, PageToken};

/// Anything that can serve pages of catalog records.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Source name, for logs.
    fn name(&self) -> &str;

    /// Fetch page `page` holding up to `page_size` records.
    ///
    /// Repeated calls with the same arguments must return consistent data.
    async fn fetch_page(&self, page: PageToken, page_size: usize) -> Result<Page<T>, FetchError>;
}

/// Slice `items` into the requested page.
pub(crate) fn slice_page<T: Clone>(items: &[T], page: PageToken, page_size: usize) -> Vec<T> {
    let start = (page.index() as usize).saturating_mul(page_size);
    if start >= items.len() {
        return Vec::new();
    }
    let end = start.saturating_add(page_size).min(items.len());
    items[start..end].to_vec()
}

/// A finite, fully available sequence paginated locally.
#[derive(Debug, Clone)]
pub struct VecPageSource<T> {
    items: Vec<T>,
}

impl<T> VecPageSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

#[async_trait]
impl<T> PageSource<T> for VecPageSource<T>
where
    T: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn fetch_page(&self, page: PageToken, page_size: usize) -> Result<Page<T>, FetchError> {
        Ok(Page::new(slice_page(&self.items, page, page_size)))
    }
}

/// Adapts a closure returning a boxed future into a page source.
///
/// ```rust,ignore
/// let source = FnPageSource::new("api", |page, size| {
///     Box::pin(async move { client.rooms(page.index(), size).await })
/// });
/// ```
pub struct FnPageSource<T, F> {
    name: String,
    fetch: F,
    _items: PhantomData<fn() -> T>,
}

impl<T, F> fmt::Debug for FnPageSource<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPageSource")
            .field("name", &self.name)
            .finish()
    }
}

impl<T, F> FnPageSource<T, F>
where
    F: Fn(PageToken, usize) -> BoxFuture<'static, Result<Page<T>, FetchError>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, fetch: F) -> Self {
        Self {
            name: name.into(),
            fetch,
            _items: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> PageSource<T> for FnPageSource<T, F>
where
    T: Send + 'static,
    F: Fn(PageToken, usize) -> BoxFuture<'static, Result<Page<T>, FetchError>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_page(&self, page: PageToken, page_size: usize) -> Result<Page<T>, FetchError> {
        (self.fetch)(page, page_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_page_bounds() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(slice_page(&items, PageToken::new(0), 10), (1..=10).collect::<Vec<_>>());
        assert_eq!(slice_page(&items, PageToken::new(2), 10), (21..=25).collect::<Vec<_>>());
        assert!(slice_page(&items, PageToken::new(3), 10).is_empty());
        assert!(slice_page(&items, PageToken::new(u32::MAX), usize::MAX).is_empty());
    }

    #[tokio::test]
    async fn test_vec_source_pages() {
        let source = VecPageSource::new((1..=25).collect::<Vec<u32>>());
        let page = source.fetch_page(PageToken::new(1), 10).await.unwrap();
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());

        let past_end = source.fetch_page(PageToken::new(5), 10).await.unwrap();
        assert!(past_end.is_empty());
    }

    fn squares(page: PageToken, size: usize) -> BoxFuture<'static, Result<Page<usize>, FetchError>> {
        Box::pin(async move {
            if page.index() >= 2 {
                return Ok::<_, FetchError>(Page::empty());
            }
            let start = page.index() as usize * size;
            Ok(Page::new((start..start + size).map(|n| n * n).collect()))
        })
    }

    #[tokio::test]
    async fn test_fn_source_delegates() {
        let source = FnPageSource::new("squares", squares);

        assert_eq!(source.name(), "squares");
        let page = source.fetch_page(PageToken::new(1), 3).await.unwrap();
        assert_eq!(page.items, vec![9, 16, 25]);
        assert!(source.fetch_page(PageToken::new(2), 3).await.unwrap().is_empty());
    }
}
