//! Success notification publisher
//!
//! Fire-and-forget publish to the success queue once a lookup message has
//! been fully consumed. Failures are logged and swallowed — the delivery
//! decision for the inbound message never depends on this publish.

use anyhow::Context;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties};
use serde::Serialize;
use teamsearch_common::config::RabbitConfig;
use tracing::{info, warn};

/// Body published to the success queue
#[derive(Debug, Serialize)]
struct SuccessNotification<'a> {
    user_id: &'a str,
}

/// Publisher for the `olymps_success` queue.
///
/// Opens a fresh connection per publish; notifications are rare enough that
/// holding a broker connection open between them buys nothing.
pub struct SuccessNotifier {
    config: RabbitConfig,
}

impl SuccessNotifier {
    pub fn new(config: RabbitConfig) -> Self {
        Self { config }
    }

    /// Publish `{"user_id": ...}`; true when the broker accepted the message
    pub async fn send_success(&self, user_id: &str) -> bool {
        match self.publish(user_id).await {
            Ok(()) => {
                info!(user_id, queue = %self.config.success_queue, "success notification enqueued");
                true
            }
            Err(err) => {
                warn!(user_id, error = %err, "success notification publish failed");
                false
            }
        }
    }

    async fn publish(&self, user_id: &str) -> anyhow::Result<()> {
        let body = serde_json::to_vec(&SuccessNotification { user_id })
            .context("notification serialization failed")?;

        let connection = Connection::connect(&self.config.amqp_uri(), ConnectionProperties::default())
            .await
            .context("broker connect failed")?;
        let channel = connection
            .create_channel()
            .await
            .context("channel open failed")?;
        channel
            .queue_declare(
                &self.config.success_queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("queue declare failed")?;
        channel
            .basic_publish(
                "",
                &self.config.success_queue,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default(),
            )
            .await
            .context("publish failed")?
            .await
            .context("publish confirmation failed")?;

        connection.close(200, "notification sent").await.ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_shape() {
        let body = serde_json::to_value(SuccessNotification { user_id: "12345" }).unwrap();
        assert_eq!(body, serde_json::json!({"user_id": "12345"}));
    }
}
