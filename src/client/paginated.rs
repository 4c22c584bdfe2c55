//! Paginated stream for lazy iteration over cursor-paged collections.
//!
//! This module provides a [`PageStream`] that implements the `Stream`
//! trait, following the server-supplied continuation cursor
//! (`@odata.nextLink`) page by page and yielding decoded items lazily.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::http::{ClientInner, RequestOptions};
use crate::{Error, Result};

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// One raw page of a cursor-paged collection.
#[derive(Debug, Default)]
pub(crate) struct RawPage {
    /// Raw records of this page.
    pub items: Vec<Value>,
    /// Continuation cursor; absent on the final page.
    pub next_link: Option<String>,
}

impl RawPage {
    /// Split a response body into records and cursor. A missing or
    /// non-object body reads as an empty final page.
    pub(crate) fn from_body(body: Option<Value>) -> Self {
        let Some(Value::Object(body)) = body else {
            return Self::default();
        };
        let items = match body.get("value") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let next_link = body
            .get("@odata.nextLink")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { items, next_link }
    }
}

/// Type alias for a boxed future used internally.
type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

type PageFetcher = Box<dyn Fn(Option<String>) -> BoxFuture<'static, Result<RawPage>> + Send + Sync>;

/// A stream that lazily fetches cursor-linked pages and yields individual
/// decoded items.
///
/// Items that fail to decode are yielded as `Err` without ending the
/// stream, so a malformed record never invalidates its page; a failed page
/// fetch yields its error and then ends the stream.
///
/// # Example
///
/// ```no_run
/// use futures_util::StreamExt;
/// use graphmail_rs::{Mailbox, models::Folder};
///
/// # async fn example(client: graphmail_rs::GraphClient) -> graphmail_rs::Result<()> {
/// let folders = client.folders().list(&Mailbox::Me, false).await?;
/// for folder in folders {
///     println!("{}", folder.display_name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PageStream<T> {
    fetch_page: PageFetcher,
    current_items: VecDeque<Value>,
    cursor: Option<String>,
    started: bool,
    pending_fetch: Option<BoxFuture<'static, Result<RawPage>>>,
    done: bool,
    _marker: PhantomData<T>,
}

impl<T> PageStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Create a stream over a page-fetching function. The function receives
    /// `None` for the first page and the continuation cursor afterwards.
    pub(crate) fn new<F>(fetch_page: F) -> Self
    where
        F: Fn(Option<String>) -> BoxFuture<'static, Result<RawPage>> + Send + Sync + 'static,
    {
        Self {
            fetch_page: Box::new(fetch_page),
            current_items: VecDeque::new(),
            cursor: None,
            started: false,
            pending_fetch: None,
            done: false,
            _marker: PhantomData,
        }
    }
}

impl<T> Stream for PageStream<T>
where
    T: DeserializeOwned + Unpin,
{
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            // Yield from the current page first.
            if let Some(item) = this.current_items.pop_front() {
                return Poll::Ready(Some(serde_json::from_value(item).map_err(Error::Json)));
            }

            if this.done {
                return Poll::Ready(None);
            }

            if let Some(fut) = this.pending_fetch.as_mut() {
                match fut.as_mut().poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.pending_fetch = None;
                        this.current_items = page.items.into();
                        this.cursor = page.next_link;
                        if this.cursor.is_none() {
                            this.done = true;
                        }
                        if this.current_items.is_empty() {
                            // Empty page terminates the traversal.
                            this.done = true;
                            return Poll::Ready(None);
                        }
                        continue;
                    }
                    Poll::Ready(Err(err)) => {
                        this.pending_fetch = None;
                        this.done = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            // Start the next fetch: first page, or follow the cursor.
            if !this.started {
                this.started = true;
                this.pending_fetch = Some((this.fetch_page)(None));
            } else if let Some(cursor) = this.cursor.take() {
                this.pending_fetch = Some((this.fetch_page)(Some(cursor)));
            } else {
                this.done = true;
                return Poll::Ready(None);
            }
        }
    }
}

impl<T> Unpin for PageStream<T> {}

/// Builder for page streams over a client path.
pub(crate) struct PageStreamBuilder<T> {
    inner: Arc<ClientInner>,
    path: String,
    params: Vec<(String, String)>,
    per_page: usize,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned + Unpin + Send + 'static> PageStreamBuilder<T> {
    pub(crate) fn new(inner: Arc<ClientInner>, path: impl Into<String>) -> Self {
        Self {
            inner,
            path: path.into(),
            params: Vec::new(),
            per_page: DEFAULT_PAGE_SIZE,
            _marker: PhantomData,
        }
    }

    /// Set the number of items requested per page.
    pub(crate) fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    /// Add extra query parameters for the first-page request.
    #[allow(dead_code)]
    pub(crate) fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// Build the stream. Continuation requests use the cursor URL verbatim,
    /// without the first-page parameters.
    pub(crate) fn build(self) -> PageStream<T> {
        let inner = self.inner;
        let path = self.path;
        let per_page = self.per_page;
        let params = self.params;

        PageStream::new(move |cursor: Option<String>| {
            let inner = inner.clone();
            let path = path.clone();
            let params = params.clone();

            Box::pin(async move {
                let body = match cursor {
                    Some(link) => {
                        inner
                            .request(Method::GET, &link, RequestOptions::default())
                            .await?
                    }
                    None => {
                        let mut page_params = params;
                        page_params.push(("$top".to_string(), per_page.to_string()));
                        inner
                            .request(Method::GET, &path, RequestOptions::with_params(page_params))
                            .await?
                    }
                };
                Ok(RawPage::from_body(body))
            })
        })
    }
}
