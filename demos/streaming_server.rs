//! A streaming HTTP service demonstrating deferred and streamed response bodies.
//!
//! Try it with:
//!
//! ```text
//! curl -N http://127.0.0.1:8081/ticks
//! curl http://127.0.0.1:8081/health
//! ```

use std::time::Duration;
use log::info;
use serde::Serialize;
use tokio::sync::mpsc;

use microhttp_service::{ResponseDataFunc, Service, ServiceConfig, StatusCode};

#[derive(Serialize)]
struct Status {
    service: &'static str,
    uptime_hint: &'static str,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    env_logger::init();

    let config = ServiceConfig::default()
        .with_hostname("127.0.0.1")
        .with_port(8081)
        .with_request_timeout(Duration::from_secs(60));

    let service = Service::new(config)?.with_handler(|ctx| {
        Box::pin(async move {
            let path = ctx.request().path_only().to_string();
            match path.as_str() {
                "/ticks" => {
                    let (tx, rx) = mpsc::channel(4);
                    tokio::spawn(async move {
                        let mut interval = tokio::time::interval(Duration::from_millis(500));
                        for tick in 0u64.. {
                            interval.tick().await;
                            // The receiver closes once the request is cancelled
                            if tx.send(format!("tick {tick}\n").into_bytes()).await.is_err() {
                                break;
                            }
                        }
                    });

                    let cancel = ctx.cancellation().clone();
                    ctx.response_builder()
                        .with_header("Content-Type", "text/plain")
                        .with_status(StatusCode::Ok)
                        .with_body_func(ResponseDataFunc::stream(cancel, rx))
                        .send()
                        .await
                }
                "/status" => {
                    ctx.response_builder()
                        .with_header("Content-Type", "application/json")
                        .with_status(StatusCode::Ok)
                        .with_body_func(ResponseDataFunc::json(Status {
                            service: "streaming_server",
                            uptime_hint: "try /ticks",
                        }))
                        .send()
                        .await
                }
                _ => ctx.not_found().await,
            }
        })
    });

    info!("Routes:");
    info!("  GET  /ticks   (streams a line every 500ms)");
    info!("  GET  /status");

    // Runs until Ctrl+C
    service.start().await?;

    Ok(())
}
