//! Collection endpoint tests against a mocked API.

use feedly_client::{Collection, CollectionUpdate, Credentials, Error, FeedRef, FeedlyClient, Record, Scope};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COLLECTION_ID: &str = "enterprise/acme/category/1234";
const COLLECTION_PATH: &str = "/v3/enterprise/collections/enterprise%2Facme%2Fcategory%2F1234";

fn client_for(server: &MockServer) -> FeedlyClient {
    FeedlyClient::builder()
        .base_url(server.uri())
        .credentials(Credentials::default().with_access_token("A1"))
        .retries(0)
        .build()
        .unwrap()
}

fn enterprise_collection() -> Collection {
    Collection::new(
        Record::from_value(json!({"id": COLLECTION_ID, "label": "Threat Intel"})),
        Scope::Enterprise,
    )
}

#[tokio::test]
async fn test_update_uses_own_id_and_scope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/enterprise/collections"))
        .and(body_json(json!({
            "label": "Renamed",
            "id": COLLECTION_ID,
            "description": "Feeds we watch"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    enterprise_collection()
        .update(
            &client,
            CollectionUpdate::update("ignored")
                .label("Renamed")
                .description("Feeds we watch"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_feeds_puts_to_mput() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/feeds/.mput", COLLECTION_PATH)))
        .and(body_json(json!([
            {"id": "feed/https://blog.rust-lang.org/feed.xml"},
            {"id": "feed/https://this-week-in-rust.org/rss.xml", "title": "TWiR"}
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let feeds = [
        FeedRef::new("feed/https://blog.rust-lang.org/feed.xml"),
        FeedRef::new("feed/https://this-week-in-rust.org/rss.xml").with_title("TWiR"),
    ];
    enterprise_collection().add_feeds(&client, &feeds).await.unwrap();
}

#[tokio::test]
async fn test_remove_feeds_deletes_from_mdelete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/feeds/.mdelete", COLLECTION_PATH)))
        .and(query_param("keepOrphanFeeds", "true"))
        .and(body_json(json!([{"id": "feed/a"}, {"id": "feed/b"}])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    enterprise_collection()
        .remove_feeds(&client, &["feed/a", "feed/b"], Some(true))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remove_feed_encodes_feed_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!(
            "{}/feeds/feed%2Fhttps%3A%2F%2Fexample.com%2Frss",
            COLLECTION_PATH
        )))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    enterprise_collection()
        .remove_feed(&client, "feed/https://example.com/rss", None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn test_wrappers_need_an_id() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let collection = Collection::new(Record::from_value(json!({"label": "No id"})), Scope::User);

    let error = collection.add_feeds(&client, &[FeedRef::new("feed/a")]).await.unwrap_err();
    assert!(matches!(error, Error::Configuration(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_requires_label_or_id() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let error = client
        .create_or_update_collection(&CollectionUpdate::default(), Scope::User)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Configuration(_)));
}
