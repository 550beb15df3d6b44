use std::{sync::Arc, time::Duration};

use anyhow::{Context, anyhow};
use aws_config::SdkConfig;
use ferry_common::{ShutdownCoordinator, ShutdownSignal, internal, tracing};
use ferry_delivery::{
    DeliveryConfig, DrainSummary, LmtpTransport, NotificationHandler, ObjectStore, Pipeline,
    PostmapLookup, RecipientResolver, RetryConfig, RetryWorker, S3ObjectStore, SqsQueue,
};
use ferry_endpoint::{Credentials, Endpoint, EndpointConfig, EndpointServer, HttpConfirmer};

use crate::{FerryConfig, aws};

const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the delivery pipeline over `store`.
///
/// # Errors
///
/// Returns an error naming the missing setting when the LMTP address or the
/// lookup table is not configured.
pub fn pipeline(config: &DeliveryConfig, store: Arc<dyn ObjectStore>) -> anyhow::Result<Pipeline> {
    let transport = LmtpTransport::from_config(config)
        .ok_or_else(|| anyhow!("LMTP_ADDRESS is not set"))?;
    let lookup = PostmapLookup::from_config(&config.lookup)
        .ok_or_else(|| anyhow!("POSTFIX_LOOKUP_TABLE is not set"))?;

    Ok(Pipeline::new(
        store,
        RecipientResolver::new(Arc::new(lookup)),
        Arc::new(transport),
    ))
}

/// Build the notification endpoint, with `handler` bound if there is one.
///
/// # Errors
///
/// Returns an error if no credentials are configured or they are malformed.
pub fn endpoint(
    config: &EndpointConfig,
    handler: Option<Arc<dyn NotificationHandler>>,
) -> anyhow::Result<Endpoint> {
    let pair = config
        .basic_auth
        .as_deref()
        .ok_or_else(|| anyhow!("BASIC_AUTH_CREDENTIALS is not set"))?;

    let endpoint = Endpoint::new(
        Credentials::new(pair)?,
        Arc::new(HttpConfirmer::new(CONFIRMATION_TIMEOUT)?),
    );

    Ok(match handler {
        Some(handler) => endpoint.with_handler(handler),
        None => endpoint,
    })
}

/// Wait for CTRL+C or SIGTERM.
async fn shutdown_requested() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        tokio::select! {
            r = tokio::signal::ctrl_c() => {
                r?;
                internal!(level = INFO, "CTRL+C entered, shutting down");
            }
            _ = terminate.recv() => {
                internal!(level = INFO, "Terminate Signal received, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        internal!(level = INFO, "CTRL+C entered, shutting down");
    }

    Ok(())
}

async fn run_endpoint(
    config: &EndpointConfig,
    handler: Option<Arc<dyn NotificationHandler>>,
    shutdown: ShutdownSignal,
) -> anyhow::Result<()> {
    let endpoint = endpoint(config, handler)?;
    let server = EndpointServer::bind(config, endpoint).await?;
    server.serve(shutdown).await;
    Ok(())
}

/// Owns the configuration and wires the components together.
pub struct Ferry {
    config: FerryConfig,
}

impl Ferry {
    #[must_use]
    pub const fn new(config: FerryConfig) -> Self {
        Self { config }
    }

    async fn sdk_config(&self) -> anyhow::Result<SdkConfig> {
        let sdk = aws::sdk_config(&self.config.aws).await?;
        if self.config.aws.verify_credentials {
            aws::verify_credentials(&sdk).await?;
        }
        Ok(sdk)
    }

    fn s3_pipeline(&self, sdk: &SdkConfig) -> anyhow::Result<Arc<Pipeline>> {
        let store = S3ObjectStore::new(aws_sdk_s3::Client::new(sdk));
        pipeline(&self.config.delivery, Arc::new(store)).map(Arc::new)
    }

    fn retry_worker(
        &self,
        sdk: &SdkConfig,
        handler: Arc<dyn NotificationHandler>,
    ) -> anyhow::Result<RetryWorker> {
        let retry: &RetryConfig = &self.config.retry;
        let url = retry
            .queue_url
            .clone()
            .ok_or_else(|| anyhow!("DEAD_LETTER_QUEUE_URL is not set"))?;
        let queue = SqsQueue::new(aws_sdk_sqs::Client::new(sdk), url);

        Ok(RetryWorker::new(Arc::new(queue), handler, retry))
    }

    /// Run the endpoint and the retry worker until shutdown.
    ///
    /// Missing delivery or queue settings degrade the service instead of
    /// stopping it: without a pipeline the endpoint still answers
    /// subscription messages, and without a queue no retries happen. Failing
    /// to start the endpoint shuts everything down.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint could not be started or signal
    /// handlers could not be installed.
    pub async fn run(self) -> anyhow::Result<()> {
        internal!(level = INFO, "Controller running");

        let coordinator = ShutdownCoordinator::new();

        let sdk = self
            .sdk_config()
            .await
            .inspect_err(|e| tracing::error!(error = %format_args!("{e:#}"), "AWS is unavailable, delivery disabled"))
            .ok();

        let handler: Option<Arc<dyn NotificationHandler>> = sdk
            .as_ref()
            .map(|sdk| self.s3_pipeline(sdk))
            .transpose()
            .inspect_err(|e| tracing::warn!(error = %e, "Delivery pipeline not configured, notifications will be refused"))
            .ok()
            .flatten()
            .map(|pipeline| pipeline as Arc<dyn NotificationHandler>);

        let worker = match (&sdk, &handler) {
            (Some(sdk), Some(handler)) => self
                .retry_worker(sdk, Arc::clone(handler))
                .inspect_err(|e| tracing::warn!(error = %e, "Dead letter queue not configured, failed notifications will not be retried"))
                .ok(),
            _ => None,
        };

        let worker = worker.map(|worker| {
            let signal = coordinator.signal();
            tokio::spawn(async move { worker.serve(signal).await })
        });

        let result = tokio::select! {
            r = run_endpoint(&self.config.endpoint, handler, coordinator.signal()) => {
                r.context("Notification endpoint failed")
            }
            r = shutdown_requested() => r,
        };

        coordinator.trigger();

        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            tracing::error!(error = %e, "Dead letter queue worker panicked");
        }

        internal!(level = INFO, "Shutting down...");

        result
    }

    /// Deliver one stored object, as the push path would.
    ///
    /// With no `recipients` they are taken from the message headers.
    ///
    /// # Errors
    ///
    /// Returns an error if AWS or the pipeline is not configured, or the
    /// delivery fails.
    pub async fn deliver(&self, bucket: &str, key: &str, recipients: &[String]) -> anyhow::Result<()> {
        let sdk = self.sdk_config().await?;
        let pipeline = self.s3_pipeline(&sdk)?;

        pipeline
            .deliver_object(bucket, key, Some(recipients))
            .await
            .with_context(|| format!("Delivery of '{key}' from '{bucket}' failed"))
    }

    /// One pass over the dead-letter queue.
    ///
    /// # Errors
    ///
    /// Returns an error if AWS, the pipeline or the queue is not configured,
    /// or any message had to be left on the queue.
    pub async fn drain(&self) -> anyhow::Result<DrainSummary> {
        let sdk = self.sdk_config().await?;
        let handler = self.s3_pipeline(&sdk)?;
        let worker = self.retry_worker(&sdk, handler)?;

        let coordinator = ShutdownCoordinator::new();
        let signal = coordinator.signal();
        let summary = tokio::select! {
            summary = worker.drain_once(&signal) => summary,
            r = shutdown_requested() => {
                r?;
                anyhow::bail!("Interrupted");
            }
        };

        tracing::info!(
            successes = summary.successes,
            consumed = summary.consumed,
            failures = summary.failures,
            "Dead letter queue processing complete"
        );

        if summary.failures > 0 {
            anyhow::bail!("{} message(s) left on the dead letter queue", summary.failures);
        }
        Ok(summary)
    }
}
