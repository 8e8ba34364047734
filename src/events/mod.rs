use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a closed channel is logged, never surfaced to the caller.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

// Events emitted after a taxonomy mutation has been committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    // Category events
    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeleted(Uuid),

    // Attribute dictionary events
    AttributeCreated(Uuid),
    AttributeUpdated(Uuid),
    AttributeDeactivated(Uuid),
    AttributeDeleted(Uuid),
    AttributeValueCreated { attribute_id: Uuid, value_id: Uuid },
    AttributeValueUpdated(Uuid),
    AttributeValueDeleted(Uuid),

    // Binding / template replacement
    CategoryBindingsReplaced {
        category_id: Uuid,
        version: i32,
        attribute_count: usize,
    },
    ContentModelCreated(Uuid),
    ContentModelUpdated { model_id: Uuid, version: i32 },
    ContentModelDeleted(Uuid),

    // Content events
    ContentCreated(Uuid),
    ContentUpdated(Uuid),
    ContentAttributesAssigned {
        content_id: Uuid,
        value_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// The id of the entity the event is about
    pub fn subject_id(&self) -> Uuid {
        match self {
            Event::CategoryCreated(id)
            | Event::CategoryUpdated(id)
            | Event::CategoryDeleted(id)
            | Event::AttributeCreated(id)
            | Event::AttributeUpdated(id)
            | Event::AttributeDeactivated(id)
            | Event::AttributeDeleted(id)
            | Event::AttributeValueUpdated(id)
            | Event::AttributeValueDeleted(id)
            | Event::ContentModelCreated(id)
            | Event::ContentModelDeleted(id)
            | Event::ContentCreated(id)
            | Event::ContentUpdated(id) => *id,
            Event::AttributeValueCreated { value_id, .. } => *value_id,
            Event::CategoryBindingsReplaced { category_id, .. } => *category_id,
            Event::ContentModelUpdated { model_id, .. } => *model_id,
            Event::ContentAttributesAssigned { content_id, .. } => *content_id,
        }
    }

    /// True for events that invalidate faceted content listings
    pub fn affects_facets(&self) -> bool {
        matches!(
            self,
            Event::CategoryBindingsReplaced { .. }
                | Event::ContentModelUpdated { .. }
                | Event::ContentAttributesAssigned { .. }
                | Event::AttributeValueDeleted(_)
                | Event::AttributeDeleted(_)
        )
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::CategoryBindingsReplaced {
                category_id,
                version,
                attribute_count,
            } => {
                info!(
                    %category_id,
                    version,
                    attribute_count,
                    "Category bindings replaced"
                );
            }
            Event::ContentAttributesAssigned {
                content_id,
                value_count,
                ..
            } => {
                info!(%content_id, value_count, "Content attributes assigned");
            }
            other => {
                debug!(subject = %other.subject_id(), "Received event: {:?}", other);
            }
        }

        if event.affects_facets() {
            debug!(subject = %event.subject_id(), "Facet listings are stale");
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        sender.send_or_log(Event::CategoryCreated(Uuid::new_v4())).await;
        assert!(sender
            .send(Event::CategoryCreated(Uuid::new_v4()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        sender.send_or_log(Event::CategoryCreated(first)).await;
        sender.send_or_log(Event::CategoryDeleted(second)).await;

        assert_eq!(rx.recv().await, Some(Event::CategoryCreated(first)));
        assert_eq!(rx.recv().await.map(|e| e.subject_id()), Some(second));
    }

    #[test]
    fn facet_relevance() {
        let id = Uuid::new_v4();
        assert!(Event::ContentAttributesAssigned {
            content_id: id,
            value_count: 2,
            timestamp: Utc::now(),
        }
        .affects_facets());
        assert!(!Event::CategoryCreated(id).affects_facets());
    }
}
