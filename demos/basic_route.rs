//! Basic example: log in, then read and write a route with the returned token.
//!
//! Run with: `cargo run --example basic_route -- https://your-backend.example.com`

use serde_json::json;
use std::time::Duration;
use vapor_client::{Client, Error, RouteMethod, RouteRequest};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Outcome records from the default logger go through tracing
    tracing_subscriber::fmt()
        .with_env_filter("vapor_client=debug,basic_route=info")
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = Client::builder()
        .base_url(&base_url)?
        .timeout(Duration::from_secs(10))
        .max_retries(3)
        .default_header("User-Agent", "vapor-client-demo/0.1")?
        .build()?;

    println!("=== Login ===");
    let session = client.login("/auth", "alice", "s3cret").await?;
    println!("Status: {}", session.status);
    println!("Token: {}", session.body);
    println!();

    println!("=== Fetch ===");
    let items = client.fetch_data("/items", Some(&session.body), None).await?;
    println!("Items: {}", items.body);
    println!("Latency: {:?} over {} attempt(s)", items.latency, items.attempts);
    println!();

    println!("=== Create ===");
    let created = client
        .route(
            RouteRequest::new(RouteMethod::Post, "/items")
                .body(json!({ "name": "lamp" }))
                .auth_token(session.body.clone()),
        )
        .await?;
    println!("Created: {} ({})", created.body, created.status);

    Ok(())
}
