//! Example walking the newest unread entries of a stream.
//!
//! This example shows how to:
//! - Build a client from an access token in the environment
//! - Open a capped stream over a category
//! - Resume from a continuation token
//!
//! Run with: `FEEDLY_ACCESS_TOKEN=... FEEDLY_USER_ID=... cargo run --example stream_contents`

use feedly_client::{Credentials, Entry, FeedlyClient, StreamOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("feedly_client=debug,stream_contents=info")
        .init();

    let token = std::env::var("FEEDLY_ACCESS_TOKEN")?;
    let user_id = std::env::var("FEEDLY_USER_ID")?;

    let client = FeedlyClient::builder()
        .credentials(Credentials::default().with_access_token(token))
        .user_id(user_id.clone())
        .build()?;

    let stream_id = format!("user/{}/category/global.all", user_id);

    println!("=== Newest unread entries ===");
    let mut stream = client
        .stream_contents(
            &stream_id,
            StreamOptions::default().unread_only(true).count(10).max_count(25),
        )?
        .with_factory(Entry::from);

    while let Some(entry) = stream.next_item().await? {
        println!(
            "- [{}] {}",
            entry.origin_title().unwrap_or("?"),
            entry.title().unwrap_or("(untitled)")
        );
    }
    println!("Fetched {} entries", stream.emitted());
    println!();

    if let Some(token) = stream.options().continuation.clone() {
        println!("=== Resuming from continuation {} ===", token);
        let ids = client
            .stream_ids(&stream_id, StreamOptions::default().continuation(token).max_count(5))?
            .collect_all()
            .await?;
        for id in ids {
            println!("- {}", id);
        }
    }

    Ok(())
}
