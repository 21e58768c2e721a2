//! `gateway-cli` — local ops/debugging companion to `gateway-server`. Talks
//! to a running gateway over HTTP, or exercises the TOON codec directly,
//! without standing up the full pipeline.

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "gateway-cli",
    about = "Local ops/debugging CLI for the LLM safety gateway",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Base URL of a running gateway-server
    #[arg(long, env = "GATEWAY_URL", default_value = "http://127.0.0.1:8080", global = true)]
    gateway_url: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hit the gateway's health endpoint
    Health,
    /// Send a single chat request through the pipeline
    Chat {
        /// The query text
        query: String,
        /// Bearer token to authenticate with
        #[arg(long, env = "GATEWAY_API_KEY")]
        api_key: Option<String>,
        /// Model to request
        #[arg(long)]
        model: Option<String>,
    },
    /// Encode a JSON value (from a file, or stdin if omitted) to TOON
    ToonEncode {
        /// Path to a JSON file; reads stdin if omitted
        file: Option<String>,
    },
    /// Decode a TOON payload (from a file, or stdin if omitted) to JSON
    ToonDecode {
        /// Path to a TOON file; reads stdin if omitted
        file: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    match args.command {
        Command::Health => health(&args.gateway_url).await,
        Command::Chat { query, api_key, model } => chat(&args.gateway_url, query, api_key, model).await,
        Command::ToonEncode { file } => {
            let input = read_input(file)?;
            let value: serde_json::Value =
                serde_json::from_str(&input).context("input is not valid JSON")?;
            println!("{}", gateway_core::toon::encode(&value));
            Ok(())
        }
        Command::ToonDecode { file } => {
            let input = read_input(file)?;
            let value = gateway_core::toon::decode(&input)
                .context("input does not parse as TOON")?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
    }
}

fn read_input(file: Option<String>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {path}")),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

async fn health(base_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .context("health request failed")?;
    info!(status = %resp.status(), "health check");
    let body: serde_json::Value = resp.json().await.unwrap_or_else(|_| json!({}));
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn chat(base_url: &str, query: String, api_key: Option<String>, model: Option<String>) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;
    let mut req = client.post(format!("{base_url}/chat")).json(&json!({
        "query": query,
        "model": model,
    }));
    if let Some(key) = api_key {
        req = req.bearer_auth(key);
    }
    let resp = req.send().await.context("chat request failed")?;
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap_or_else(|_| json!({}));
    info!(%status, "chat response");
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }
}
