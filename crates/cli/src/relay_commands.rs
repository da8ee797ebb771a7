use std::sync::Arc;

use {
    anyhow::{Result, bail},
    chatrelay_auto_reply::{Router, run_workers},
    chatrelay_channels::{InboundEvent, MemorySource, MessageSource, ReplyKind},
    chatrelay_config::RelayConfig,
    chatrelay_reply_client::HttpReplyClient,
    chatrelay_sessions::SessionStore,
    chatrelay_wechat::WechatSource,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

fn build_router(config: &RelayConfig) -> Result<Arc<Router>> {
    let backend = HttpReplyClient::new(&config.backend)?;
    if !backend.is_configured() {
        warn!("backend.url is not set; queries will be answered with an error");
    }
    Ok(Arc::new(Router::new(
        Arc::new(backend),
        Arc::new(SessionStore::new()),
        config,
    )))
}

/// Relay messages from the sidecar until ctrl-c.
pub async fn run(config: RelayConfig) -> Result<()> {
    #[cfg(feature = "metrics")]
    chatrelay_metrics::init_metrics(&chatrelay_metrics::MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        listen: config.metrics.listen,
    })?;
    #[cfg(not(feature = "metrics"))]
    if config.metrics.enabled {
        warn!("metrics.enabled is set but this build has no metrics support");
    }

    let router = build_router(&config)?;
    let source: Arc<dyn MessageSource> = Arc::new(WechatSource::spawn(config.source.clone()));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("shutdown requested");
        shutdown.cancel();
    });

    run_workers(
        router,
        source,
        config.router.workers,
        config.router.poll_interval(),
        cancel,
    )
    .await;
    Ok(())
}

/// Push one message through the router and print whatever comes back.
pub async fn ask(config: RelayConfig, message: String, key: String) -> Result<()> {
    let router = build_router(&config)?;
    let (source, mut handle) = MemorySource::new();

    handle.push(InboundEvent::text(
        uuid::Uuid::new_v4().to_string(),
        key,
        message,
    ));
    handle.close();

    run_workers(
        router,
        Arc::new(source),
        1,
        config.router.poll_interval(),
        CancellationToken::new(),
    )
    .await;

    let Some(reply) = handle.drain_replies().into_iter().next() else {
        bail!("no reply produced");
    };
    match reply.kind {
        ReplyKind::Error => bail!("{}", reply.content),
        ReplyKind::Text | ReplyKind::Info => {
            println!("{}", reply.content);
            Ok(())
        },
    }
}
