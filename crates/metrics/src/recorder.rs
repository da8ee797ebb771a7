//! Metrics recorder installation.

use std::net::SocketAddr;

use {anyhow::Result, tracing::info};

/// Buckets for the `*_duration_seconds` histograms. Backend calls dominate,
/// so the tail reaches a minute.
#[cfg(feature = "prometheus")]
const DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Configuration for the metrics system.
#[derive(Debug, Clone)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Address of the Prometheus scrape listener
    pub listen: SocketAddr,
}

/// Install the global recorder and start the scrape listener.
///
/// Call once from inside the Tokio runtime; the listener runs as a task on
/// it. Returns whether a recorder was installed. Without the `prometheus`
/// feature nothing is installed and the facade calls stay no-ops.
///
/// # Errors
///
/// Fails when the listener cannot bind or a recorder is already installed.
pub fn init_metrics(config: &MetricsRecorderConfig) -> Result<bool> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(false);
    }

    #[cfg(feature = "prometheus")]
    {
        install_prometheus(config)?;
        info!(listen = %config.listen, "prometheus metrics exporter listening");
        Ok(true)
    }

    #[cfg(not(feature = "prometheus"))]
    {
        info!("metrics feature not enabled at compile time");
        Ok(false)
    }
}

#[cfg(feature = "prometheus")]
fn install_prometheus(config: &MetricsRecorderConfig) -> Result<()> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .set_buckets_for_metric(
            Matcher::Suffix("_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .install()?;
    Ok(())
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_installs_nothing() {
        let config = MetricsRecorderConfig {
            enabled: false,
            listen: "127.0.0.1:0".parse().unwrap(),
        };
        assert!(!init_metrics(&config).unwrap());
    }

    #[cfg(feature = "prometheus")]
    #[tokio::test]
    async fn enabled_serves_scrape_endpoint() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Reserve a free port for the exporter.
        let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let listen = reserved.local_addr().unwrap();
        drop(reserved);

        let config = MetricsRecorderConfig {
            enabled: true,
            listen,
        };
        assert!(init_metrics(&config).unwrap());
        crate::counter!(crate::auto_reply::MESSAGES_RECEIVED_TOTAL).increment(3);

        let mut body = String::new();
        for _ in 0..50 {
            if let Ok(mut stream) = tokio::net::TcpStream::connect(listen).await {
                stream
                    .write_all(b"GET /metrics HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
                    .await
                    .unwrap();
                stream.read_to_string(&mut body).await.unwrap();
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(body.contains("chatrelay_auto_reply_messages_received_total 3"));
    }
}
