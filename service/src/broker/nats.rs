// basket_service/src/broker/nats.rs

use async_nats::jetstream::{self, consumer::pull, consumer::AckPolicy, AckKind};
use async_nats::HeaderMap;
use async_trait::async_trait;
use basket::{
  CartError, CartIntent, CartResult, DeadLetterSink, Delivery, IntentPublisher, IntentSource, CART_DEAD_LETTER_QUEUE,
  CART_QUEUE,
};
use bytes::Bytes;
use futures_util::StreamExt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Stream capturing `cart_queue`.
pub const CART_STREAM: &str = "CART_QUEUE";

/// Stream capturing `cart_queue.dead`.
pub const DEAD_LETTER_STREAM: &str = "CART_QUEUE_DEAD";

/// Durable pull consumer shared by every consumer process.
pub const CONSUMER_NAME: &str = "basket-consumer";

pub const DEAD_LETTER_REASON_HEADER: &str = "Basket-Dead-Letter-Reason";
pub const DEAD_LETTER_ATTEMPTS_HEADER: &str = "Basket-Dead-Letter-Attempts";
pub const DEAD_LETTER_AT_HEADER: &str = "Basket-Dead-Lettered-At";

/// JetStream handle used both to publish intents and to build the consumer's source.
#[derive(Clone)]
pub struct NatsQueue {
  jetstream: jetstream::Context,
}

impl NatsQueue {
  pub async fn connect(url: &str) -> CartResult<Self> {
    info!("Connecting to NATS");
    let client = async_nats::connect(url)
      .await
      .map_err(|e| CartError::Queue(format!("connecting to NATS failed: {}", e)))?;
    Ok(Self {
      jetstream: jetstream::new(client),
    })
  }

  /// Declares the intent and dead-letter streams. Safe to call from every process.
  pub async fn ensure_streams(&self) -> CartResult<()> {
    for (name, subject) in [(CART_STREAM, CART_QUEUE), (DEAD_LETTER_STREAM, CART_DEAD_LETTER_QUEUE)] {
      self
        .jetstream
        .get_or_create_stream(jetstream::stream::Config {
          name: name.to_string(),
          subjects: vec![subject.to_string()],
          retention: jetstream::stream::RetentionPolicy::Limits,
          storage: jetstream::stream::StorageType::File,
          ..Default::default()
        })
        .await
        .map_err(|e| CartError::Queue(format!("declaring stream {} failed: {}", name, e)))?;
      info!(stream = name, subject, "Stream ready");
    }
    Ok(())
  }

  /// Attaches to the durable consumer and starts pulling messages.
  ///
  /// Broker-side redelivery is unlimited; the consumption loop decides when a
  /// message has had enough attempts and dead-letters it.
  pub async fn intent_source(&self) -> CartResult<NatsSource> {
    let stream = self
      .jetstream
      .get_stream(CART_STREAM)
      .await
      .map_err(|e| CartError::Queue(format!("opening stream {} failed: {}", CART_STREAM, e)))?;
    let consumer = stream
      .get_or_create_consumer(
        CONSUMER_NAME,
        pull::Config {
          durable_name: Some(CONSUMER_NAME.to_string()),
          ack_policy: AckPolicy::Explicit,
          max_deliver: -1,
          filter_subject: CART_QUEUE.to_string(),
          ..Default::default()
        },
      )
      .await
      .map_err(|e| CartError::Queue(format!("creating consumer {} failed: {}", CONSUMER_NAME, e)))?;
    let messages = consumer
      .messages()
      .await
      .map_err(|e| CartError::Queue(format!("subscribing to {} failed: {}", CART_QUEUE, e)))?;
    info!(consumer = CONSUMER_NAME, "Pull consumer attached");
    Ok(NatsSource { messages })
  }

  async fn publish_payload(&self, subject: &'static str, headers: HeaderMap, payload: Bytes) -> CartResult<()> {
    self
      .jetstream
      .publish_with_headers(subject, headers, payload)
      .await
      .map_err(|e| CartError::Queue(format!("publishing to {} failed: {}", subject, e)))?
      .await
      .map_err(|e| CartError::Queue(format!("{} did not acknowledge publish: {}", subject, e)))?;
    Ok(())
  }
}

#[async_trait]
impl IntentPublisher for NatsQueue {
  #[instrument(name = "nats::publish", skip(self, intent), fields(intent = %intent))]
  async fn publish(&self, intent: &CartIntent) -> CartResult<()> {
    let payload = Bytes::from(intent.to_bytes()?);
    self.publish_payload(CART_QUEUE, HeaderMap::new(), payload).await?;
    debug!("Intent published");
    Ok(())
  }
}

#[async_trait]
impl DeadLetterSink for NatsQueue {
  async fn dead_letter(&self, payload: &[u8], reason: &str, attempts: u32) -> CartResult<()> {
    let headers = dead_letter_headers(reason, attempts, chrono::Utc::now());
    self
      .publish_payload(CART_DEAD_LETTER_QUEUE, headers, Bytes::copy_from_slice(payload))
      .await?;
    warn!(attempts, reason, "Intent moved to dead-letter queue");
    Ok(())
  }
}

fn dead_letter_headers(reason: &str, attempts: u32, at: chrono::DateTime<chrono::Utc>) -> HeaderMap {
  let mut headers = HeaderMap::new();
  headers.insert(DEAD_LETTER_REASON_HEADER, header_safe(reason).as_str());
  headers.insert(DEAD_LETTER_ATTEMPTS_HEADER, attempts.to_string().as_str());
  headers.insert(DEAD_LETTER_AT_HEADER, at.to_rfc3339().as_str());
  headers
}

/// Header values cannot carry line breaks.
fn header_safe(value: &str) -> String {
  value.replace(['\r', '\n'], " ")
}

pub struct NatsSource {
  messages: pull::Stream,
}

#[async_trait]
impl IntentSource for NatsSource {
  type Delivery = NatsDelivery;

  async fn next_delivery(&mut self) -> Option<CartResult<NatsDelivery>> {
    let next = self.messages.next().await?;
    Some(
      next
        .map(NatsDelivery::new)
        .map_err(|e| CartError::Queue(format!("receiving from {} failed: {}", CART_QUEUE, e))),
    )
  }
}

pub struct NatsDelivery {
  message: jetstream::Message,
  attempt: u32,
}

impl NatsDelivery {
  fn new(message: jetstream::Message) -> Self {
    // Without metadata the message is treated as a first delivery.
    let attempt = message
      .info()
      .map(|info| u32::try_from(info.delivered).unwrap_or(u32::MAX).max(1))
      .unwrap_or(1);
    Self { message, attempt }
  }
}

#[async_trait]
impl Delivery for NatsDelivery {
  fn payload(&self) -> &[u8] {
    &self.message.payload
  }

  fn attempt(&self) -> u32 {
    self.attempt
  }

  async fn ack(&self) -> CartResult<()> {
    self
      .message
      .ack()
      .await
      .map_err(|e| CartError::Queue(format!("ack failed: {}", e)))
  }

  async fn nak(&self, delay: Duration) -> CartResult<()> {
    self
      .message
      .ack_with(AckKind::Nak(Some(delay)))
      .await
      .map_err(|e| CartError::Queue(format!("nak failed: {}", e)))
  }

  async fn term(&self) -> CartResult<()> {
    self
      .message
      .ack_with(AckKind::Term)
      .await
      .map_err(|e| CartError::Queue(format!("term failed: {}", e)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_values_are_single_line() {
    assert_eq!(header_safe("deadlock\ndetected\r\n"), "deadlock detected  ");
  }

  #[test]
  fn dead_letter_headers_describe_the_failure_only() {
    let at = chrono::DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z").unwrap().to_utc();
    let headers = dead_letter_headers("pool timed out\nretrying", 5, at);
    assert_eq!(headers.get(DEAD_LETTER_REASON_HEADER).unwrap().as_str(), "pool timed out retrying");
    assert_eq!(headers.get(DEAD_LETTER_ATTEMPTS_HEADER).unwrap().as_str(), "5");
    assert_eq!(headers.get(DEAD_LETTER_AT_HEADER).unwrap().as_str(), "2026-01-02T03:04:05+00:00");
    // Broker-side deduplication is not used; redelivered intents may apply twice.
    assert!(headers.get(async_nats::header::NATS_MESSAGE_ID).is_none());
  }
}
