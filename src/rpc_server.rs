//! tabplay RPC Server: JSON-RPC over stdin/stdout driving a headless host.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"tab.open", "params":{"url":"...","media":[...]}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use tabplay::app::App;
use tabplay::host::headless::HeadlessBrowser;
use tabplay::platform;
use tabplay::rpc_handler::{handle_method, Session};
use tabplay::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Requests allowed per one-second window.
const MAX_REQUESTS_PER_SECOND: u32 = 200;

/// Fixed-window rate limiter.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_second,
        }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

async fn write_line(stdout: &mut io::Stdout, value: &Value) -> io::Result<()> {
    stdout.write_all(value.to_string().as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let mut settings = SettingsEngine::new(None);
    let extension_settings = settings.load().unwrap_or_else(|e| {
        log::warn!("settings unavailable, using defaults: {}", e);
        Default::default()
    });

    let browser = Arc::new(HeadlessBrowser::with_restricted_schemes(
        extension_settings.monitor.restricted_schemes.clone(),
    ));
    let data_dir = platform::resolve_data_dir();
    let app = App::open(&data_dir, browser.clone(), browser.clone(), extension_settings)?;
    let session = Mutex::new(Session::new(app, browser, settings));

    let mut stdout = io::stdout();
    write_line(
        &mut stdout,
        &json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}),
    )
    .await?;

    let mut rate_limiter = RateLimiter::new(MAX_REQUESTS_PER_SECOND);
    let mut lines = BufReader::new(io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                write_line(&mut stdout, &json!({"id": null, "error": format!("parse error: {}", e)}))
                    .await?;
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            write_line(&mut stdout, &json!({"id": id, "error": "rate limit exceeded"})).await?;
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));
        log::debug!("rpc {}", method);

        let response = match handle_method(&session, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        write_line(&mut stdout, &response).await?;
    }

    Ok(())
}
