//! Interactive search client.
//!
//! Reads one query per line from stdin, posts it to the search endpoint and
//! prints the response body. End of input exits.
//!
//! Usage:
//!   ASIDE_SEARCH_URL=http://localhost:8778/search cargo run -p aside-api --bin aside-search

use std::io::Write;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_SEARCH_URL: &str = "http://localhost:8778/search";
const PROMPT: &str = "Content to search$ ";

fn prompt() {
    print!("{}", PROMPT);
    if let Err(e) = std::io::stdout().flush() {
        eprintln!("Failed to flush stdout: {}", e);
    }
}

#[tokio::main]
async fn main() {
    let url = std::env::var("ASIDE_SEARCH_URL").unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string());

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                std::process::exit(1);
            }
        };

        let response = client
            .post(&url)
            .json(&json!({ "keywords": line }))
            .send()
            .await;

        match response {
            Ok(response) => match response.text().await {
                Ok(body) => println!("{}", body),
                Err(e) => eprintln!("Failed to read response: {}", e),
            },
            Err(e) => eprintln!("Request failed: {}", e),
        }

        prompt();
    }

    println!();
}
