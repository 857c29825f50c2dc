//! MCP server for the Mackerel monitoring API.
//!
//! Speaks line-delimited JSON-RPC on stdin/stdout; logs go to stderr.
//! Reads the API key from the `MACKEREL_API_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! MACKEREL_API_KEY=... mackerel-mcp
//!
//! # Shorter cache, tighter response budget, debug logging
//! MACKEREL_API_KEY=... mackerel-mcp --cache-ttl-secs 60 --max-tokens 10000 -vv
//! ```

use std::time::Duration;

use clap::Parser;
use mackerel_mcp::prelude::*;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// MCP server for the Mackerel monitoring API.
#[derive(Parser)]
#[command(name = "mackerel-mcp", version)]
struct Cli {
    /// Mackerel API root.
    #[arg(long, default_value = mackerel_mcp::api::DEFAULT_BASE_URL)]
    base_url: String,

    /// Lifetime of cached GET responses, in seconds. 0 disables caching.
    #[arg(long, default_value_t = 300)]
    cache_ttl_secs: u64,

    /// Largest tool result, in estimated tokens.
    #[arg(long, default_value_t = 25_000)]
    max_tokens: usize,

    /// Characters per token used for size estimation.
    #[arg(long, default_value_t = 4.0, value_parser = parse_chars_per_token)]
    chars_per_token: f64,

    /// Treat span events named "error" as failures, not only "exception".
    #[arg(long)]
    error_events_match_error: bool,

    /// Skip JSON Schema validation of tool arguments.
    #[arg(long)]
    no_validate: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_chars_per_token(raw: &str) -> Result<f64, String> {
    let ratio: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if ratio.is_finite() && ratio > 0.0 {
        Ok(ratio)
    } else {
        Err("must be a finite number greater than 0".to_string())
    }
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    fn into_config(self, api_key: String) -> ServerConfig {
        let rule = if self.error_events_match_error {
            ErrorEventRule::ExceptionOrError
        } else {
            ErrorEventRule::ExceptionOnly
        };
        let mut config = ServerConfig::new(api_key)
            .with_base_url(self.base_url)
            .with_cache_ttl(Duration::from_secs(self.cache_ttl_secs))
            .with_budget(
                ResponseBudget::new(self.max_tokens).with_chars_per_token(self.chars_per_token),
            )
            .with_error_event_rule(rule);
        if self.no_validate {
            config = config.with_arg_validation(false);
        }
        config
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout carries the protocol; logs must stay on stderr.
    tracing_subscriber::registry()
        .with(cli.log_level())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let api_key = match ServerConfig::api_key_from_env() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let config = cli.into_config(api_key);
    let tools = match build_tool_set(&config) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = McpServer::new(tools).serve_stdio().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
