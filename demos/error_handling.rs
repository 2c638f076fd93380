//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Match on error kinds
//! - Read the server's diagnostic and the raw response
//! - Recognise connection failures after the retry budget is spent
//!
//! Run with: `cargo run --example error_handling`

use feedly_client::metadata::RequestDescriptor;
use feedly_client::{Credentials, Error, ErrorKind, FeedlyClient};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("feedly_client=info")
        .init();

    let client = FeedlyClient::builder()
        .credentials(Credentials::default().with_access_token("not-a-real-token"))
        .build()?;

    println!("=== Example 1: Handling HTTP Errors ===");
    match client.request(RequestDescriptor::get("/v3/profile")).await {
        Ok(response) => println!("Success: {}", response.raw_body),
        Err(Error::Api(api)) => {
            println!("HTTP Error!");
            println!("  Reason: {}", api.reason);
            println!("  Kind: {:?}", api.kind);
            println!("  Request: {} {}", api.method, api.url);
            if let Some(diagnostic) = &api.diagnostic {
                println!("  Error id: {}", diagnostic.error_id);
            }
            println!("  Raw response: {}", api.raw_response);
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Invalid Requests ===");
    match client.request(RequestDescriptor::get("/v2/profile")).await {
        Err(Error::Configuration(message)) => println!("Rejected before sending: {}", message),
        other => println!("Unexpected: {:?}", other.map(|r| r.status)),
    }
    match client.stream_contents("feed/https://example.com/rss", Default::default()) {
        Err(e @ Error::InvalidStreamId(_)) => println!("Rejected stream id: {}", e),
        _ => println!("Unexpected success"),
    }
    println!();

    println!("=== Example 3: Connection Failures ===");
    let unreachable = FeedlyClient::builder()
        .base_url("http://127.0.0.1:9")
        .timeout(Duration::from_millis(200))
        .retries(2)
        .build()?;

    match unreachable.request(RequestDescriptor::get("/v3/profile")).await {
        Err(e) if e.kind() == ErrorKind::Connection => {
            println!("Gave up after the retry budget: {}", e);
        }
        other => println!("Unexpected: {:?}", other.map(|r| r.status)),
    }

    Ok(())
}
