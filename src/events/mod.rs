use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
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

    /// Sends an event, logging instead of failing when the consumer is gone.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Dropping domain event");
        }
    }
}

/// Domain events emitted by the reservation lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ReservationCreated {
        request_id: Uuid,
        reference_number: String,
        venue_id: Uuid,
        status: String,
    },
    ReservationStatusChanged {
        request_id: Uuid,
        old_status: String,
        new_status: String,
        actor: String,
        at: DateTime<Utc>,
    },
    SlotReserved {
        venue_id: Uuid,
        request_id: Uuid,
        slot: String,
    },
    SlotReleased {
        venue_id: Uuid,
        request_id: Uuid,
        slot: String,
        /// False when no matching entry was present
        removed: bool,
    },
    NotificationFailed {
        request_id: Uuid,
        recipient: String,
        error: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ReservationCreated { .. } => "reservation_created",
            Event::ReservationStatusChanged { .. } => "reservation_status_changed",
            Event::SlotReserved { .. } => "slot_reserved",
            Event::SlotReleased { .. } => "slot_released",
            Event::NotificationFailed { .. } => "notification_failed",
        }
    }
}

/// Creates the channel pair used between services and [`process_events`].
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("reservations.events", 1, "event" => event.name());

        match event {
            Event::ReservationCreated {
                request_id,
                reference_number,
                venue_id,
                status,
            } => {
                info!(
                    request_id = %request_id,
                    venue_id = %venue_id,
                    "Reservation {} created with status {}",
                    reference_number, status
                );
            }
            Event::ReservationStatusChanged {
                request_id,
                old_status,
                new_status,
                actor,
                at,
            } => {
                info!(
                    request_id = %request_id,
                    actor = %actor,
                    at = %at,
                    "Reservation moved from {} to {}",
                    old_status, new_status
                );
            }
            Event::SlotReserved {
                venue_id,
                request_id,
                slot,
            } => {
                info!(venue_id = %venue_id, request_id = %request_id, "Slot reserved: {}", slot);
            }
            Event::SlotReleased {
                venue_id,
                request_id,
                slot,
                removed,
            } => {
                if removed {
                    info!(venue_id = %venue_id, request_id = %request_id, "Slot released: {}", slot);
                } else {
                    warn!(
                        venue_id = %venue_id,
                        request_id = %request_id,
                        "Release requested for {} but no entry matched",
                        slot
                    );
                }
            }
            Event::NotificationFailed {
                request_id,
                recipient,
                error,
            } => {
                warn!(
                    request_id = %request_id,
                    recipient = %recipient,
                    "Notification was not delivered: {}",
                    error
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_fails_once_consumer_is_dropped() {
        let (sender, rx) = channel(4);
        drop(rx);
        let result = sender
            .send(Event::NotificationFailed {
                request_id: Uuid::new_v4(),
                recipient: "a@example.com".into(),
                error: "relay down".into(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn events_reach_the_receiver_in_order() {
        let (sender, mut rx) = channel(4);
        let id = Uuid::new_v4();
        sender
            .send(Event::SlotReserved {
                venue_id: id,
                request_id: id,
                slot: "a".into(),
            })
            .await
            .unwrap();
        sender
            .send(Event::SlotReleased {
                venue_id: id,
                request_id: id,
                slot: "a".into(),
                removed: true,
            })
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().name(), "slot_reserved");
        assert_eq!(rx.recv().await.unwrap().name(), "slot_released");
    }
}
