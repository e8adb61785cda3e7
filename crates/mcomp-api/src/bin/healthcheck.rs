//! Post-deploy health poll.
//!
//! Usage: `mcomp-healthcheck [URL]`. Exits 0 once `/health` answers 200 with
//! `status == "healthy"`, non-zero after the retries are exhausted.

use std::time::Duration;

use anyhow::{anyhow, bail, Context};

use mcomp_api::handlers::health::HealthResponse;

const DEFAULT_RETRIES: u32 = 10;
const DEFAULT_INTERVAL_SECS: u64 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let url = std::env::args().nth(1).unwrap_or_else(default_url);
    let retries = env_or("HEALTHCHECK_RETRIES", DEFAULT_RETRIES).max(1);
    let interval = Duration::from_secs(env_or("HEALTHCHECK_INTERVAL_SECS", DEFAULT_INTERVAL_SECS));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    println!("healthcheck: polling {} (up to {} attempts)", url, retries);

    let mut last_error = anyhow!("no attempts made");
    for attempt in 1..=retries {
        match check_once(&client, &url).await {
            Ok(health) => {
                if !health.ffmpeg_available {
                    eprintln!("healthcheck: warning: ffmpeg is not available on the server");
                }
                println!(
                    "healthcheck: ok (version {}, heic_support={})",
                    health.version, health.heic_support
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!(
                    "healthcheck: attempt {}/{} failed: {:#}",
                    attempt, retries, e
                );
                last_error = e;
            }
        }

        if attempt < retries {
            tokio::time::sleep(interval).await;
        }
    }

    Err(last_error.context(format!("{} did not become healthy", url)))
}

async fn check_once(client: &reqwest::Client, url: &str) -> anyhow::Result<HealthResponse> {
    let response = client.get(url).send().await.context("Request failed")?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        bail!("unexpected status {}", status);
    }

    let health: HealthResponse = response
        .json()
        .await
        .context("Response is not valid health JSON")?;
    if health.status != "healthy" {
        bail!("service reports status {:?}", health.status);
    }
    Ok(health)
}

fn default_url() -> String {
    std::env::var("HEALTHCHECK_URL").unwrap_or_else(|_| {
        let port = std::env::var("API_PORT")
            .or_else(|_| std::env::var("PORT"))
            .unwrap_or_else(|_| "8000".to_string());
        format!("http://127.0.0.1:{}/health", port)
    })
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
