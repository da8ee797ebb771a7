use std::{sync::Arc, time::Duration};

use {
    chatrelay_channels::{Error as SourceError, InboundEvent, MessageSource},
    tokio::task::JoinSet,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{auto_reply as auto_reply_metrics, counter};

use crate::router::Router;

/// Run `workers` loops pulling from `source` until `cancel` fires or the
/// source closes. Each loop handles one event at a time; an event already
/// being processed is finished before the loop exits.
pub async fn run_workers(
    router: Arc<Router>,
    source: Arc<dyn MessageSource>,
    workers: usize,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let workers = workers.max(1);
    info!(source = source.id(), workers, "starting message workers");

    let mut set = JoinSet::new();
    for worker in 0..workers {
        set.spawn(worker_loop(
            worker,
            Arc::clone(&router),
            Arc::clone(&source),
            poll_interval,
            cancel.clone(),
        ));
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "message worker panicked");
        }
    }
    info!(source = source.id(), "message workers stopped");
}

async fn worker_loop(
    worker: usize,
    router: Arc<Router>,
    source: Arc<dyn MessageSource>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    debug!(worker, "worker started");
    loop {
        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = source.receive(poll_interval) => received,
        };

        match received {
            Ok(Some(event)) => dispatch(&router, source.as_ref(), &event).await,
            Ok(None) => {},
            Err(SourceError::Closed) => {
                info!(worker, "message source closed");
                break;
            },
            Err(e) => {
                warn!(worker, error = %e, "failed to receive message");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(poll_interval) => {},
                }
            },
        }
    }
    debug!(worker, "worker stopped");
}

async fn dispatch(router: &Router, source: &dyn MessageSource, event: &InboundEvent) {
    let Some(reply) = router.handle(event).await else {
        return;
    };

    if let Err(e) = source.send(&reply).await {
        warn!(
            message_id = %event.id,
            conversation_key = %reply.conversation_key,
            kind = reply.kind.as_str(),
            error = %e,
            "failed to deliver reply"
        );
        #[cfg(feature = "metrics")]
        counter!(auto_reply_metrics::DELIVERY_FAILURES_TOTAL).increment(1);
    }
}
