//! Kafka producer/consumer wrappers implementing the producer and consumer
//! loop contracts of spec §4.7 and the ordering/backpressure model of §5.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use common::error::PipelineError;
use common::retry::ExponentialBackoff;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{Message, OwnedMessage};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Default number of times a poison message may fail to parse before it is
/// dropped with an ERROR log (spec §4.7).
pub const DEFAULT_POISON_RETRY_LIMIT: u32 = 8;

/// Default per-RPC/publish deadline (spec §5 cancellation/timeouts).
pub const DEFAULT_CALL_DEADLINE: Duration = Duration::from_secs(5);

/// An idempotent Kafka producer used by every pipeline stage to publish its
/// output event(s) (spec §4.7 producer contract: `acks=all`, in-flight=1,
/// idempotent, exponential backoff retry, `device_id` partition key).
pub struct EventProducer {
    inner: FutureProducer,
    backoff: ExponentialBackoff,
}

impl EventProducer {
    /// Build a producer against the given broker list with the spec-mandated
    /// idempotent/acks-all settings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Broker`] if the underlying client cannot be
    /// constructed (e.g. malformed broker list).
    pub fn new(bootstrap_servers: &str, client_id: &str) -> Result<Self, PipelineError> {
        let inner: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("client.id", client_id)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "1")
            .set("message.timeout.ms", "30000")
            .create()
            .map_err(|e| PipelineError::Broker(format!("failed to create producer: {e}")))?;

        Ok(Self {
            inner,
            backoff: ExponentialBackoff::producer_default(),
        })
    }

    /// Serialize `payload` to JSON and publish it to `topic`, keyed by
    /// `partition_key` (the device id, preserving per-device ordering per
    /// spec §4.7). Retries transient broker errors with exponential backoff
    /// up to the policy's attempt cap before surfacing
    /// [`PipelineError::Broker`] to the caller.
    #[instrument(skip(self, payload), fields(topic = topic, partition_key = partition_key))]
    pub async fn publish<T: Serialize>(
        &self,
        topic: &str,
        partition_key: &str,
        payload: &T,
    ) -> Result<(), PipelineError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| PipelineError::Serialization(e.to_string()))?;

        let mut last_err: Option<KafkaError> = None;

        for attempt in 1..=self.backoff.max_attempts() {
            let record: FutureRecord<'_, str, [u8]> =
                FutureRecord::to(topic).key(partition_key).payload(&body);

            match self.inner.send(record, Timeout::After(DEFAULT_CALL_DEADLINE)).await {
                Ok(rdkafka::producer::future_producer::Delivery { partition, offset, .. }) => {
                    debug!(partition, offset, "published event");
                    return Ok(());
                }
                Err((err, _owned)) => {
                    warn!(
                        attempt,
                        max_attempts = self.backoff.max_attempts(),
                        error = %err,
                        "publish attempt failed"
                    );
                    last_err = Some(err);
                    if attempt < self.backoff.max_attempts() {
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                    }
                }
            }
        }

        Err(PipelineError::Broker(format!(
            "publish to {topic} failed after {} attempts: {}",
            self.backoff.max_attempts(),
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

/// Build a consumer against the given broker list, group, and topic with the
/// spec-mandated `maxInFlightRequests=1` / manual-commit settings (spec
/// §4.7 consumer loop contract).
///
/// # Errors
///
/// Returns [`PipelineError::Broker`] if the client cannot be constructed or
/// subscription fails.
pub fn build_consumer(
    bootstrap_servers: &str,
    consumer_group: &str,
    topic: &str,
) -> Result<StreamConsumer, PipelineError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", bootstrap_servers)
        .set("group.id", consumer_group)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()
        .map_err(|e| PipelineError::Broker(format!("failed to create consumer: {e}")))?;

    consumer
        .subscribe(&[topic])
        .map_err(|e| PipelineError::Broker(format!("failed to subscribe to {topic}: {e}")))?;

    Ok(consumer)
}

/// Outcome of handling a single message, used to decide whether to commit
/// the offset or count the message toward the poison-message limit.
pub enum HandleOutcome {
    /// All downstream publishes succeeded; commit the input offset.
    Acked,
    /// A transient failure occurred; do not commit, allow redelivery.
    Retry(PipelineError),
    /// The message itself is malformed and will never succeed; count it
    /// toward the poison-message limit instead of retrying forever.
    Poison(PipelineError),
}

/// Run a consumer loop per the contract in spec §4.7 / §5: poll, process
/// each message strictly sequentially (bounded concurrency = 1 in-flight per
/// partition assignment), commit only after the handler reports success,
/// and stop cleanly when `shutdown` is cancelled.
///
/// `handler` is invoked once per message with its raw payload bytes and
/// decides whether the message was handled, should be retried, or is
/// poison. Poison messages are counted per-partition and dropped with an
/// ERROR log after `poison_limit` occurrences (default
/// [`DEFAULT_POISON_RETRY_LIMIT`]) to avoid head-of-line blocking.
pub async fn run_consumer_loop<F, Fut>(
    consumer: StreamConsumer,
    shutdown: CancellationToken,
    poison_limit: u32,
    mut handler: F,
) where
    F: FnMut(OwnedMessage) -> Fut,
    Fut: Future<Output = HandleOutcome>,
{
    let mut poison_counts: HashMap<(String, i32, i64), u32> = HashMap::new();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("consumer loop received shutdown signal, exiting");
                break;
            }
            result = consumer.recv() => {
                let msg = match result {
                    Ok(m) => m.detach(),
                    Err(e) => {
                        error!(error = %e, "consumer poll failed");
                        continue;
                    }
                };

                let key = (msg.topic().to_string(), msg.partition(), msg.offset());

                match handler(msg).await {
                    HandleOutcome::Acked => {
                        poison_counts.remove(&key);
                        commit_offset(&consumer, &key.0, key.1, key.2);
                    }
                    HandleOutcome::Retry(err) => {
                        warn!(error = %err, "handler failed transiently, leaving offset uncommitted for redelivery");
                    }
                    HandleOutcome::Poison(err) => {
                        let count = poison_counts.entry(key.clone()).or_insert(0);
                        *count += 1;
                        if *count >= poison_limit {
                            error!(
                                error = %err,
                                topic = %key.0,
                                partition = key.1,
                                offset = key.2,
                                retries = *count,
                                "dropping poison message after exceeding retry limit"
                            );
                            poison_counts.remove(&key);
                            commit_offset(&consumer, &key.0, key.1, key.2);
                        } else {
                            warn!(
                                error = %err,
                                retries = *count,
                                limit = poison_limit,
                                "message failed to parse, will retry"
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Commit a single `(topic, partition, offset)` asynchronously. Kafka commit
/// semantics store the *next* offset to read, hence `offset + 1`.
fn commit_offset(consumer: &StreamConsumer, topic: &str, partition: i32, offset: i64) {
    let mut tpl = rdkafka::TopicPartitionList::new();
    if let Err(e) = tpl.add_partition_offset(
        topic,
        partition,
        rdkafka::Offset::Offset(offset + 1),
    ) {
        error!(error = %e, topic, partition, offset, "failed to build offset commit list");
        return;
    }

    if let Err(e) = consumer.commit(&tpl, CommitMode::Async) {
        error!(error = %e, topic, partition, offset, "failed to commit offset");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_poison_retry_limit_matches_spec() {
        assert_eq!(DEFAULT_POISON_RETRY_LIMIT, 8);
    }

    #[test]
    fn default_call_deadline_matches_spec() {
        assert_eq!(DEFAULT_CALL_DEADLINE, Duration::from_secs(5));
    }
}
