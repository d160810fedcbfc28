//! `fetch`: issue one HTTP request through the middleware pipeline.
//!
//! Loads an optional TOML client config, installs logging, registers the
//! tracing middleware on top of whatever the config enables, and prints the
//! response.

use std::path::PathBuf;

use clap::Parser;
use serde_json::{Map, Value};

use fetch_middleware::config::{load_config, ClientConfig};
use fetch_middleware::observability::logging::init_logging;
use fetch_middleware::{FetchClient, FetchInit, TraceMiddleware};

#[derive(Parser)]
#[command(name = "fetch")]
#[command(about = "Send an HTTP request through the fetch middleware pipeline", long_about = None)]
struct Cli {
    /// Target URL (relative URLs need `base_url` in the config)
    url: String,

    /// Request method (defaults to GET, or POST when a body is given)
    #[arg(short = 'X', long)]
    method: Option<String>,

    /// Request header, as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Raw request body
    #[arg(short = 'd', long, conflicts_with = "json")]
    data: Option<String>,

    /// JSON request body
    #[arg(long)]
    json: Option<String>,

    /// Query parameter, as `key=value` (repeatable)
    #[arg(short = 'q', long = "query")]
    query: Vec<String>,

    /// Client configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print status line and response headers
    #[arg(short = 'i', long)]
    include: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    init_logging(&config.observability)?;

    let client = FetchClient::from_config(&config)?.with(TraceMiddleware::new());
    let init = build_init(&cli)?;

    let res = client.fetch(cli.url.as_str(), init).await?;

    if cli.include {
        println!("{} {}", res.status, res.status_text);
        for (name, value) in res.headers.iter() {
            println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
        println!();
    }
    println!("{}", res.text());

    if !res.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn build_init(cli: &Cli) -> Result<FetchInit, Box<dyn std::error::Error>> {
    let mut init = FetchInit::new();

    if let Some(method) = &cli.method {
        init = init.method(method.as_str());
    }

    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("invalid header {header:?}, expected `Name: value`"))?;
        init = init.header(name.trim(), value.trim());
    }

    if let Some(data) = &cli.data {
        init = init.body(data.as_str());
    }
    if let Some(json) = &cli.json {
        let value: Value = serde_json::from_str(json)?;
        init = init.json(value);
    }

    if !cli.query.is_empty() {
        let mut query = Map::new();
        for pair in &cli.query {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("invalid query parameter {pair:?}, expected `key=value`"))?;
            query.insert(key.to_string(), Value::String(value.to_string()));
        }
        init = init.query(Value::Object(query));
    }

    Ok(init)
}
