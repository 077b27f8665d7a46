//! `scrapedeck` -- terminal front end for a remote scraping service.
//!
//! Submits crawl jobs, tracks them to a terminal state, and tails the
//! operational dashboard (log stream + health gauges).
//!
//! # Usage
//!
//! ```text
//! scrapedeck crawl <url> [depth]
//! scrapedeck download <job-id> <file>
//! scrapedeck dashboard
//! ```
//!
//! # Environment variables
//!
//! | Variable                | Required | Default                 | Description           |
//! |-------------------------|----------|-------------------------|-----------------------|
//! | `SCRAPEDECK_API_URL`    | no       | `http://localhost:8000` | Service HTTP base URL |
//! | `SCRAPEDECK_WS_URL`     | no       | `ws://localhost:8000`   | Push channel base URL |
//! | `SCRAPEDECK_AUTH_TOKEN` | no       | --                      | Bearer token          |
//!
//! Poll and health intervals are also overridable; see
//! [`ClientConfig::from_env`].

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrapedeck_client::api::{ScrapeApi, SubmitRequest};
use scrapedeck_client::config::ClientConfig;
use scrapedeck_client::events::FeedEvent;
use scrapedeck_client::feed::LiveFeed;
use scrapedeck_client::messages::FeedMessage;
use scrapedeck_client::poller::{self, PollConfig, TrackerEvent};
use scrapedeck_client::reconnect::ReconnectConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrapedeck=info,scrapedeck_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("crawl") => {
            let url = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("usage: scrapedeck crawl <url> [depth]"))?;
            let depth = args.get(2).map(|raw| raw.parse::<u32>()).transpose()?;
            crawl(&config, url, depth).await
        }
        Some("download") => {
            let usage = || anyhow::anyhow!("usage: scrapedeck download <job-id> <file>");
            let job_id = args.get(1).ok_or_else(usage)?;
            let path = args.get(2).ok_or_else(usage)?;
            download(&config, job_id, path).await
        }
        Some("dashboard") => dashboard(&config).await,
        _ => {
            eprintln!(
                "usage: scrapedeck crawl <url> [depth] | scrapedeck download <job-id> <file> | scrapedeck dashboard"
            );
            std::process::exit(2);
        }
    }
}

/// Download the full result file for a job.
async fn download(config: &ClientConfig, job_id: &str, path: &str) -> anyhow::Result<()> {
    let api = ScrapeApi::new(config);
    let bytes = api.download(job_id).await?;
    tokio::fs::write(path, &bytes).await?;
    println!("wrote {} bytes to {path}", bytes.len());
    Ok(())
}

/// Accept only absolute http(s) URLs with a host, mirroring what the
/// original submission form allowed.
fn is_valid_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    match rest {
        Some(host) => {
            !host.is_empty() && !host.starts_with('/') && !host.starts_with(':')
        }
        None => false,
    }
}

/// Submit a crawl job and track it to a terminal state.
async fn crawl(config: &ClientConfig, url: &str, depth: Option<u32>) -> anyhow::Result<()> {
    if !is_valid_url(url) {
        anyhow::bail!("please enter a valid URL (e.g. https://example.com)");
    }

    let api = Arc::new(ScrapeApi::new(config));

    let submitted = api
        .submit(&SubmitRequest {
            url: url.to_string(),
            depth,
            spider: None,
        })
        .await?;
    println!("job {} submitted", submitted.job_id);

    let cancel = CancellationToken::new();
    let handle = poller::start(
        Arc::clone(&api),
        submitted.job_id,
        PollConfig::from(config),
        cancel.clone(),
    )?;
    let mut events = handle.events();

    // Ctrl-C cancels tracking; the poller discards any in-flight
    // response.
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    while let Ok(event) = events.recv().await {
        match event {
            TrackerEvent::StatusChanged { status, message } => {
                println!("status: {status:?} {message}");
            }
            TrackerEvent::Completed { records } => {
                let job = handle.job();
                println!("finished with {records} records; first 3:");
                for record in job.result_preview(3) {
                    println!("{}", serde_json::to_string_pretty(record)?);
                }
                println!("full result: {}/api/download/{}", config.api_url, job.id);
                break;
            }
            TrackerEvent::ResultFetchFailed { error } => {
                println!("job finished, but the result is unavailable: {error}");
                break;
            }
            TrackerEvent::Failed { message } => {
                println!("job failed: {message}");
                break;
            }
            TrackerEvent::Cancelled => {
                println!("tracking cancelled");
                break;
            }
        }
    }

    handle.join().await;
    Ok(())
}

/// Tail the live feed until Ctrl-C, then print the error report.
async fn dashboard(config: &ClientConfig) -> anyhow::Result<()> {
    let api = Arc::new(ScrapeApi::new(config));
    let cancel = CancellationToken::new();
    let feed = LiveFeed::start(config, api, ReconnectConfig::default(), cancel.clone());
    let mut events = feed.subscribe();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(FeedEvent::Open) => println!("-- connected --"),
                Ok(FeedEvent::Close) => println!("-- disconnected --"),
                Ok(FeedEvent::Message(FeedMessage::Log(log))) => {
                    let marker = if log.level.is_error() { "!" } else { " " };
                    let user = log
                        .user_id
                        .as_deref()
                        .map(|user| format!(" (user {user})"))
                        .unwrap_or_default();
                    println!("{marker} [{}] {}: {}{user}", log.timestamp, log.level, log.message);
                }
                Ok(FeedEvent::Message(FeedMessage::Health(health))) => {
                    println!("  health: cpu {:.1}% mem {:.1}%", health.cpu, health.memory);
                }
                Ok(FeedEvent::Message(FeedMessage::Other { .. })) => {}
                Ok(FeedEvent::Error(error)) => eprintln!("feed error: {error}"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    eprintln!("dashboard lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    let errors = feed.error_logs().await;
    println!("error report ({} entries):", errors.len());
    for log in errors {
        println!("  [{}] {}", log.timestamp, log.message);
    }

    feed.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::is_valid_url;

    #[test]
    fn accepts_http_and_https_urls() {
        assert!(is_valid_url("http://example.com"));
        assert!(is_valid_url("https://example.com/path?q=1"));
    }

    #[test]
    fn rejects_other_schemes_and_hostless_urls() {
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("http:///path"));
        assert!(!is_valid_url("http://:8000"));
    }
}
