//! Entries (articles) and their endpoints.

use crate::{feedly::FeedlyClient, metadata::RequestDescriptor, record::Record, Response, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// An entry returned by the API.
///
/// # Examples
///
/// ```
/// use feedly_client::Entry;
/// use serde_json::json;
///
/// let entry = Entry::from(json!({
///     "id": "gRtwnDeqCDpZ42bXE9Sp7dNhm4R6NsipqFVbXn2XpDA=_13fb9d6f274:2ac9c5:f5718180",
///     "title": "Release notes",
///     "origin": {"title": "Rust Blog", "htmlUrl": "https://blog.rust-lang.org"},
///     "tags": [{"id": "user/af190c49/tag/global.saved"}]
/// }));
///
/// assert_eq!(entry.title(), Some("Release notes"));
/// assert_eq!(entry.origin_title(), Some("Rust Blog"));
/// assert_eq!(entry.tags().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Entry(Record);

impl Entry {
    /// The underlying record.
    pub fn record(&self) -> &Record {
        &self.0
    }

    /// The entry id.
    pub fn id(&self) -> Option<&str> {
        self.0.str_field("id")
    }

    /// The entry title.
    pub fn title(&self) -> Option<&str> {
        self.0.str_field("title")
    }

    /// The author name.
    pub fn author(&self) -> Option<&str> {
        self.0.str_field("author")
    }

    /// Publication time.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.0.timestamp_field("published")
    }

    /// When the entry was first crawled.
    pub fn crawled(&self) -> Option<DateTime<Utc>> {
        self.0.timestamp_field("crawled")
    }

    /// Whether the entry is still unread.
    pub fn unread(&self) -> Option<bool> {
        self.0.bool_field("unread")
    }

    /// The feed the entry came from (`streamId`, `title`, `htmlUrl`).
    pub fn origin(&self) -> Option<&Value> {
        self.0.get("origin")
    }

    /// Title of the originating feed.
    pub fn origin_title(&self) -> Option<&str> {
        self.origin()?.get("title")?.as_str()
    }

    /// Tags applied to the entry.
    pub fn tags(&self) -> &[Value] {
        self.0.array_field("tags")
    }

    /// Link to the original article.
    pub fn canonical_url(&self) -> Option<&str> {
        self.0
            .get("canonicalUrl")
            .and_then(Value::as_str)
            .or_else(|| self.0.array_field("alternate").first()?.get("href")?.as_str())
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        Self(Record::from_value(value))
    }
}

impl From<Record> for Entry {
    fn from(record: Record) -> Self {
        Self(record)
    }
}

/// A link attached to a new entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    /// The link target.
    pub href: String,
    /// MIME type of the target, e.g. `text/html`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Body of a create-entry request.
///
/// The entry is created and tagged in one call; unset fields are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewEntry {
    /// Tags to apply, e.g. `{"id": "user/.../tag/global.saved"}`.
    pub tags: Vec<Value>,
    /// The entry title.
    pub title: String,
    /// HTML content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    /// Source feed description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Value>,
    /// Links to the original article.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternate: Vec<Link>,
    /// Publication time, in milliseconds; `crawled` and `updated` likewise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<i64>,
    /// When the entry was crawled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawled: Option<i64>,
    /// When the entry was last updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl FeedlyClient {
    /// Fetches one entry, or `None` when the server returns nothing for it.
    pub async fn entry(&self, entry_id: &str) -> Result<Option<Entry>> {
        let path = format!("/v3/entries/{}", urlencoding::encode(entry_id));
        let value = self.request_json::<Value>(RequestDescriptor::get(path)).await?.data;
        Ok(match value {
            Value::Array(items) => items.into_iter().next().map(Entry::from),
            Value::Null => None,
            other => Some(Entry::from(other)),
        })
    }

    /// Fetches several entries in one request.
    pub async fn entries(&self, entry_ids: &[&str]) -> Result<Vec<Entry>> {
        let descriptor = RequestDescriptor::post("/v3/entries/.mget").with_body(entry_ids)?;
        let values = self.request_json::<Vec<Value>>(descriptor).await?.data;
        Ok(values.into_iter().map(Entry::from).collect())
    }

    /// Creates and tags an entry.
    pub async fn create_entry(&self, entry: &NewEntry) -> Result<Response<()>> {
        let descriptor = RequestDescriptor::post("/v3/entries").with_body(entry)?;
        self.request(descriptor).await
    }
}
