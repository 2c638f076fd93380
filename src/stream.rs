//! Lazy, resumable iteration over paginated streams.
//!
//! A [`Stream`] pulls one page at a time through the client, buffers it and
//! hands items out in server order. It stops at the `max_count` hard cap or
//! when the server stops sending a continuation token and the buffer is
//! drained.

use crate::{feedly::FeedlyClient, metadata::RequestDescriptor, Error, Response, Result};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Who owns a stream or collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// A personal (`user/...`) resource.
    #[default]
    User,
    /// An organization (`enterprise/...`) resource.
    Enterprise,
}

impl Scope {
    /// The id prefix of this scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Enterprise => "enterprise",
        }
    }

    /// Returns `true` for enterprise resources.
    pub fn is_enterprise(&self) -> bool {
        matches!(self, Scope::Enterprise)
    }
}

/// A parsed stream id: `{scope}/{owner id}/{source type}/{source id}`.
///
/// # Examples
///
/// ```
/// use feedly_client::{Scope, StreamId};
///
/// let id: StreamId = "user/af190c49/category/global.all".parse().unwrap();
/// assert_eq!(id.scope(), Scope::User);
/// assert_eq!(id.owner_id(), "af190c49");
/// assert!(id.is_category());
/// assert_eq!(id.to_string(), "user/af190c49/category/global.all");
///
/// assert!("feed/http://example.com/rss".parse::<StreamId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId {
    id: String,
    scope: Scope,
    owner_id: String,
    source_type: String,
    source_id: String,
}

impl StreamId {
    /// The full id.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// The scope segment.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The user id or enterprise name.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// The source type, e.g. `category` or `tag`.
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    /// The user-assigned label or uuid.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Returns `true` for category streams.
    pub fn is_category(&self) -> bool {
        self.source_type == "category"
    }

    /// Returns `true` for tag streams.
    pub fn is_tag(&self) -> bool {
        self.source_type == "tag"
    }
}

impl FromStr for StreamId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let pieces: Vec<&str> = id.split('/').collect();
        let [scope, owner_id, source_type, source_id] = pieces[..] else {
            return Err(Error::InvalidStreamId(id.to_string()));
        };
        let scope = match scope {
            "user" => Scope::User,
            "enterprise" => Scope::Enterprise,
            _ => return Err(Error::InvalidStreamId(id.to_string())),
        };

        Ok(Self {
            id: id.to_string(),
            scope,
            owner_id: owner_id.to_string(),
            source_type: source_type.to_string(),
            source_id: source_id.to_string(),
        })
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Ordering of stream items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ranking {
    /// Newest first.
    #[default]
    Newest,
    /// Oldest first.
    Oldest,
}

impl Ranking {
    /// The query value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ranking::Newest => "newest",
            Ranking::Oldest => "oldest",
        }
    }
}

/// Pagination options of a stream.
///
/// Every query option is optional; `None` leaves the parameter out of the
/// request. `max_count` is enforced client-side and never sent.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    /// Page size (`count`).
    pub count: Option<u32>,
    /// Ordering (`ranked`).
    pub ranked: Option<Ranking>,
    /// Only unread items (`unreadOnly`).
    pub unread_only: Option<bool>,
    /// Only items newer than this millisecond timestamp (`newerThan`).
    pub newer_than: Option<i64>,
    /// Hard cap on the number of items yielded.
    pub max_count: usize,
    /// Continuation token; `Some("")` is the start, `None` means no more pages.
    pub continuation: Option<String>,
    /// Include muted items (`showMuted`).
    pub show_muted: Option<bool>,
    /// Only important items (`importantOnly`).
    pub important_only: Option<bool>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            count: Some(20),
            ranked: Some(Ranking::Newest),
            unread_only: Some(false),
            newer_than: None,
            max_count: 100,
            continuation: Some(String::new()),
            show_muted: Some(false),
            important_only: Some(false),
        }
    }
}

impl StreamOptions {
    /// Sets the page size.
    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the ordering.
    pub fn ranked(mut self, ranked: Ranking) -> Self {
        self.ranked = Some(ranked);
        self
    }

    /// Only returns unread items.
    pub fn unread_only(mut self, unread_only: bool) -> Self {
        self.unread_only = Some(unread_only);
        self
    }

    /// Only returns items newer than a millisecond timestamp.
    pub fn newer_than(mut self, newer_than: i64) -> Self {
        self.newer_than = Some(newer_than);
        self
    }

    /// Sets the hard cap on yielded items.
    pub fn max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Resumes from a continuation token.
    pub fn continuation(mut self, continuation: impl Into<String>) -> Self {
        self.continuation = Some(continuation.into());
        self
    }

    /// Includes muted items.
    pub fn show_muted(mut self, show_muted: bool) -> Self {
        self.show_muted = Some(show_muted);
        self
    }

    /// Only returns important items.
    pub fn important_only(mut self, important_only: bool) -> Self {
        self.important_only = Some(important_only);
        self
    }

    /// Query parameters for the next page request.
    ///
    /// # Examples
    ///
    /// ```
    /// use feedly_client::StreamOptions;
    ///
    /// let unset = StreamOptions {
    ///     count: None,
    ///     ranked: None,
    ///     unread_only: None,
    ///     newer_than: None,
    ///     continuation: None,
    ///     show_muted: None,
    ///     important_only: None,
    ///     ..StreamOptions::default()
    /// };
    /// assert!(unset.query_params().is_empty());
    /// ```
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(count) = self.count {
            params.push(("count", count.to_string()));
        }
        if let Some(ranked) = self.ranked {
            params.push(("ranked", ranked.as_str().to_string()));
        }
        if let Some(unread_only) = self.unread_only {
            params.push(("unreadOnly", unread_only.to_string()));
        }
        if let Some(newer_than) = self.newer_than {
            params.push(("newerThan", newer_than.to_string()));
        }
        if let Some(continuation) = self.continuation.as_deref().filter(|c| !c.is_empty()) {
            params.push(("continuation", continuation.to_string()));
        }
        if let Some(show_muted) = self.show_muted {
            params.push(("showMuted", show_muted.to_string()));
        }
        if let Some(important_only) = self.important_only {
            params.push(("importantOnly", important_only.to_string()));
        }
        params
    }
}

/// What a stream yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Full entries (`/contents`, `items`).
    Contents,
    /// Entry ids only (`/ids`, `ids`).
    Ids,
}

impl StreamKind {
    /// The last path segment of the page request.
    pub fn path_segment(&self) -> &'static str {
        match self {
            StreamKind::Contents => "contents",
            StreamKind::Ids => "ids",
        }
    }

    /// The key of the item array in a page.
    pub fn item_key(&self) -> &'static str {
        match self {
            StreamKind::Contents => "items",
            StreamKind::Ids => "ids",
        }
    }
}

type ItemFactory<T> = Box<dyn Fn(Value) -> T + Send + Sync>;

/// A paginated stream being consumed.
///
/// Pull items with [`next_item`](Stream::next_item), or turn the stream into
/// a [`futures::Stream`] with [`into_stream`](Stream::into_stream).
///
/// # Examples
///
/// ```no_run
/// use feedly_client::{FeedlyClient, StreamOptions, Credentials};
///
/// # async fn example() -> Result<(), feedly_client::Error> {
/// let client = FeedlyClient::new(Credentials::default().with_access_token("A1"))?;
/// let mut stream = client.stream_contents(
///     "user/af190c49/category/global.all",
///     StreamOptions::default().count(50).max_count(200),
/// )?;
///
/// while let Some(item) = stream.next_item().await? {
///     println!("{}", item["title"]);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Stream<T = Value> {
    client: FeedlyClient,
    id: StreamId,
    options: StreamOptions,
    kind: StreamKind,
    factory: ItemFactory<T>,
    buffer: VecDeque<Value>,
    emitted: usize,
}

impl Stream<Value> {
    /// Creates a stream yielding raw JSON items.
    pub fn new(client: FeedlyClient, id: StreamId, options: StreamOptions, kind: StreamKind) -> Self {
        Self {
            client,
            id,
            options,
            kind,
            factory: Box::new(|item| item),
            buffer: VecDeque::new(),
            emitted: 0,
        }
    }

    /// Builds every yielded item with `factory`.
    pub fn with_factory<U, F>(self, factory: F) -> Stream<U>
    where
        F: Fn(Value) -> U + Send + Sync + 'static,
    {
        Stream {
            client: self.client,
            id: self.id,
            options: self.options,
            kind: self.kind,
            factory: Box::new(factory),
            buffer: self.buffer,
            emitted: self.emitted,
        }
    }
}

impl<T> Stream<T> {
    /// The stream id.
    pub fn id(&self) -> &StreamId {
        &self.id
    }

    /// The current options, including the continuation token.
    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// The kind of items yielded.
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Number of items yielded since creation or the last reset.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Number of fetched items not yet yielded.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `false` once the server has no more pages.
    pub fn has_more_pages(&self) -> bool {
        self.options.continuation.is_some()
    }

    /// Restarts from the first page.
    ///
    /// Buffered items and the emitted count are dropped; the next pull
    /// fetches the first page again.
    pub fn reset(&mut self) {
        self.options.continuation = Some(String::new());
        self.buffer.clear();
        self.emitted = 0;
    }

    /// Yields the next item, fetching pages as needed.
    ///
    /// Returns `Ok(None)` once `max_count` items were yielded, or when no
    /// continuation is left and the buffer is empty. A page that is empty
    /// but carries a continuation is followed by another fetch right away.
    ///
    /// # Errors
    ///
    /// Returns the error of a failed page fetch. The stream keeps its state,
    /// so pulling again retries the same page.
    pub async fn next_item(&mut self) -> Result<Option<T>> {
        loop {
            if self.emitted >= self.options.max_count {
                return Ok(None);
            }

            if let Some(item) = self.buffer.pop_front() {
                self.emitted += 1;
                return Ok(Some((self.factory)(item)));
            }

            if self.options.continuation.is_none() {
                return Ok(None);
            }

            self.fetch_page().await?;
        }
    }

    /// Drains the stream into a vector.
    pub async fn collect_all(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Turns the stream into a [`futures::Stream`].
    ///
    /// The returned stream ends after the first error.
    pub fn into_stream(self) -> impl futures::Stream<Item = Result<T>> {
        futures::stream::try_unfold(self, |mut stream| async move {
            Ok(stream.next_item().await?.map(|item| (item, stream)))
        })
    }

    async fn fetch_page(&mut self) -> Result<()> {
        if self.emitted == 0 && self.buffer.is_empty() {
            tracing::debug!(
                stream_id = %self.id,
                max_count = self.options.max_count,
                count = ?self.options.count,
                "Downloading stream"
            );
        }

        let mut page = self
            .client
            .stream_page(&self.id, self.kind, &self.options)
            .await?
            .data;

        self.options.continuation = match page.remove("continuation") {
            None | Some(Value::Null) => None,
            Some(Value::String(token)) => Some(token),
            Some(other) => Some(other.to_string()),
        };
        if let Some(Value::Array(items)) = page.remove(self.kind.item_key()) {
            self.buffer = items.into();
        }

        tracing::debug!(
            stream_id = %self.id,
            items = self.buffer.len(),
            continuation = ?self.options.continuation,
            "Fetched stream page"
        );
        Ok(())
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("buffered", &self.buffer.len())
            .field("emitted", &self.emitted)
            .finish()
    }
}

impl FeedlyClient {
    /// Fetches one page of a stream.
    pub async fn stream_page(
        &self,
        id: &StreamId,
        kind: StreamKind,
        options: &StreamOptions,
    ) -> Result<Response<Map<String, Value>>> {
        let path = format!(
            "/v3/streams/{}/{}",
            urlencoding::encode(id.as_str()),
            kind.path_segment()
        );
        let descriptor = RequestDescriptor::get(path).with_query_params(options.query_params());
        self.request_json(descriptor).await
    }

    /// Opens a stream of full entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStreamId`] if `id` is malformed.
    pub fn stream_contents(&self, id: &str, options: StreamOptions) -> Result<Stream<Value>> {
        Ok(Stream::new(self.clone(), id.parse()?, options, StreamKind::Contents))
    }

    /// Opens a stream of entry ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStreamId`] if `id` is malformed.
    pub fn stream_ids(&self, id: &str, options: StreamOptions) -> Result<Stream<Value>> {
        Ok(Stream::new(self.clone(), id.parse()?, options, StreamKind::Ids))
    }
}
