//! Collections (folders of feeds) and their endpoints.

use crate::{
    feedly::FeedlyClient,
    metadata::RequestDescriptor,
    record::Record,
    stream::{Scope, Stream, StreamOptions},
    Error, Response, Result,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A collection returned by the API.
///
/// The scope is carried explicitly so that follow-up calls target the same
/// endpoint family the collection came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    record: Record,
    scope: Scope,
}

impl Collection {
    /// Wraps a JSON record fetched with `scope`.
    pub fn new(record: Record, scope: Scope) -> Self {
        Self { record, scope }
    }

    /// Where the collection lives.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The underlying record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// The collection id, which doubles as its stream id.
    pub fn id(&self) -> Option<&str> {
        self.record.str_field("id")
    }

    /// The collection name.
    pub fn label(&self) -> Option<&str> {
        self.record.str_field("label")
    }

    /// Free-form description.
    pub fn description(&self) -> Option<&str> {
        self.record.str_field("description")
    }

    /// URL of the cover image.
    pub fn cover(&self) -> Option<&str> {
        self.record.str_field("cover")
    }

    /// Creation time.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.record.timestamp_field("created")
    }

    /// The feeds in the collection, as returned by the server.
    pub fn feeds(&self) -> &[Value] {
        self.record.array_field("feeds")
    }

    /// Opens a stream over the collection's entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStreamId`] if the collection has no valid id.
    pub fn stream_contents(&self, client: &FeedlyClient, options: StreamOptions) -> Result<Stream> {
        client.stream_contents(self.stream_id()?, options)
    }

    /// Opens a stream over the collection's entry ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStreamId`] if the collection has no valid id.
    pub fn stream_ids(&self, client: &FeedlyClient, options: StreamOptions) -> Result<Stream> {
        client.stream_ids(self.stream_id()?, options)
    }

    /// Adds a feed to this collection.
    pub async fn add_feed(
        &self,
        client: &FeedlyClient,
        feed_id: &str,
        title: Option<&str>,
    ) -> Result<Response<()>> {
        client
            .add_feed_to_collection(self.require_id()?, feed_id, title, self.scope)
            .await
    }

    /// Updates this collection.
    ///
    /// The id of `update` is replaced with this collection's id.
    pub async fn update(
        &self,
        client: &FeedlyClient,
        update: CollectionUpdate,
    ) -> Result<Response<()>> {
        let update = CollectionUpdate {
            id: Some(self.require_id()?.to_string()),
            ..update
        };
        client.create_or_update_collection(&update, self.scope).await
    }

    /// Adds several feeds to this collection.
    pub async fn add_feeds(&self, client: &FeedlyClient, feeds: &[FeedRef]) -> Result<Response<()>> {
        client
            .add_feeds_to_collection(self.require_id()?, feeds, self.scope)
            .await
    }

    /// Removes a feed from this collection.
    pub async fn remove_feed(
        &self,
        client: &FeedlyClient,
        feed_id: &str,
        keep_orphans: Option<bool>,
    ) -> Result<Response<()>> {
        client
            .remove_feed_from_collection(self.require_id()?, feed_id, keep_orphans, self.scope)
            .await
    }

    /// Removes several feeds from this collection.
    pub async fn remove_feeds(
        &self,
        client: &FeedlyClient,
        feed_ids: &[&str],
        keep_orphans: Option<bool>,
    ) -> Result<Response<()>> {
        client
            .remove_feeds_from_collection(self.require_id()?, feed_ids, keep_orphans, self.scope)
            .await
    }

    fn stream_id(&self) -> Result<&str> {
        self.id()
            .ok_or_else(|| Error::InvalidStreamId(String::new()))
    }

    fn require_id(&self) -> Result<&str> {
        self.id()
            .ok_or_else(|| Error::Configuration("Collection has no id".to_string()))
    }
}

/// Body of a create-or-update collection request.
///
/// A new collection needs a `label`; updating an existing one needs its
/// `id`. Unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionUpdate {
    /// The collection name; required to create one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The collection to update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Feeds to place in the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feeds: Option<Vec<Value>>,
    /// Drops the cover image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_cover: Option<bool>,
}

impl CollectionUpdate {
    /// Creates a new collection with `label`.
    pub fn create(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Updates the existing collection `id`.
    pub fn update(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Sets the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the feeds.
    pub fn feeds(mut self, feeds: Vec<Value>) -> Self {
        self.feeds = Some(feeds);
        self
    }

    /// Requests deletion of the cover image.
    pub fn delete_cover(mut self, delete_cover: bool) -> Self {
        self.delete_cover = Some(delete_cover);
        self
    }
}

/// A feed to add to a collection in bulk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedRef {
    /// The feed id, e.g. `feed/https://blog.rust-lang.org/feed.xml`.
    pub id: String,
    /// Title of the feed inside the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl FeedRef {
    /// A feed reference without a title override.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }

    /// Overrides the feed title inside the collection.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

fn collection_path(collection_id: &str) -> String {
    format!("/v3/collections/{}", urlencoding::encode(collection_id))
}

impl FeedlyClient {
    /// Lists the collections of `scope`.
    pub async fn collections(&self, scope: Scope) -> Result<Vec<Collection>> {
        let descriptor = RequestDescriptor::get("/v3/collections").enterprise(scope.is_enterprise());
        let records = self.request_json::<Vec<Value>>(descriptor).await?.data;
        Ok(records
            .into_iter()
            .map(|value| Collection::new(Record::from_value(value), scope))
            .collect())
    }

    /// Fetches one collection.
    ///
    /// The API answers with a one-element array; an object is accepted too.
    pub async fn collection(&self, collection_id: &str, scope: Scope) -> Result<Collection> {
        let descriptor =
            RequestDescriptor::get(collection_path(collection_id)).enterprise(scope.is_enterprise());
        let value = self.request_json::<Value>(descriptor).await?.data;
        let record = match value {
            Value::Array(items) => items.into_iter().next().map(Record::from_value),
            other => Some(Record::from_value(other)),
        }
        .unwrap_or_default();
        Ok(Collection::new(record, scope))
    }

    /// Creates a collection, or updates it when `update.id` is set.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when neither a label nor an id is set.
    pub async fn create_or_update_collection(
        &self,
        update: &CollectionUpdate,
        scope: Scope,
    ) -> Result<Response<()>> {
        if update.label.is_none() && update.id.is_none() {
            return Err(Error::Configuration(
                "Must supply a label or a collection id".to_string(),
            ));
        }
        let descriptor = RequestDescriptor::post("/v3/collections")
            .with_body(update)?
            .enterprise(scope.is_enterprise());
        self.request(descriptor).await
    }

    /// Adds one feed to a collection.
    pub async fn add_feed_to_collection(
        &self,
        collection_id: &str,
        feed_id: &str,
        title: Option<&str>,
        scope: Scope,
    ) -> Result<Response<()>> {
        let feed = FeedRef {
            id: feed_id.to_string(),
            title: title.map(str::to_string),
        };
        let descriptor = RequestDescriptor::put(format!("{}/feeds", collection_path(collection_id)))
            .with_body(&feed)?
            .enterprise(scope.is_enterprise());
        self.request(descriptor).await
    }

    /// Adds several feeds to a collection at once.
    pub async fn add_feeds_to_collection(
        &self,
        collection_id: &str,
        feeds: &[FeedRef],
        scope: Scope,
    ) -> Result<Response<()>> {
        let descriptor =
            RequestDescriptor::put(format!("{}/feeds/.mput", collection_path(collection_id)))
                .with_body(feeds)?
                .enterprise(scope.is_enterprise());
        self.request(descriptor).await
    }

    /// Removes one feed from a collection.
    ///
    /// With `keep_orphans` set to `true`, a feed that no longer belongs to any
    /// collection stays subscribed.
    pub async fn remove_feed_from_collection(
        &self,
        collection_id: &str,
        feed_id: &str,
        keep_orphans: Option<bool>,
        scope: Scope,
    ) -> Result<Response<()>> {
        let path = format!(
            "{}/feeds/{}",
            collection_path(collection_id),
            urlencoding::encode(feed_id)
        );
        let descriptor = RequestDescriptor::delete(path)
            .with_optional_query_param("keepOrphanFeeds", keep_orphans)
            .enterprise(scope.is_enterprise());
        self.request(descriptor).await
    }

    /// Removes several feeds from a collection at once.
    pub async fn remove_feeds_from_collection(
        &self,
        collection_id: &str,
        feed_ids: &[&str],
        keep_orphans: Option<bool>,
        scope: Scope,
    ) -> Result<Response<()>> {
        let feeds: Vec<FeedRef> = feed_ids.iter().map(|id| FeedRef::new(*id)).collect();
        let descriptor =
            RequestDescriptor::delete(format!("{}/feeds/.mdelete", collection_path(collection_id)))
                .with_body(&feeds)?
                .with_optional_query_param("keepOrphanFeeds", keep_orphans)
                .enterprise(scope.is_enterprise());
        self.request(descriptor).await
    }
}
