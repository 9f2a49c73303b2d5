//! Typed channel for commute lifecycle notifications
//!
//! Observers (UI, loggers) receive started/updated/ended events in the order
//! the engine produced them. Sending never blocks the engine: the channel is
//! unbounded and a closed receiver only costs a debug log.

use crate::domain::commute::Commute;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Notifications emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t", content = "commute", rename_all = "snake_case")]
pub enum CommuteEvent {
    Started(Commute),
    Updated(Commute),
    Ended(Commute),
}

impl CommuteEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommuteEvent::Started(_) => "started",
            CommuteEvent::Updated(_) => "updated",
            CommuteEvent::Ended(_) => "ended",
        }
    }

    pub fn commute(&self) -> &Commute {
        match self {
            CommuteEvent::Started(c) | CommuteEvent::Updated(c) | CommuteEvent::Ended(c) => c,
        }
    }
}

/// Sender handle for commute notifications
///
/// Clone this to share across multiple producers.
#[derive(Debug, Clone)]
pub struct CommuteNotifier {
    tx: mpsc::UnboundedSender<CommuteEvent>,
}

impl CommuteNotifier {
    pub fn new(tx: mpsc::UnboundedSender<CommuteEvent>) -> Self {
        Self { tx }
    }

    pub fn started(&self, commute: &Commute) {
        self.send(CommuteEvent::Started(commute.clone()));
    }

    pub fn updated(&self, commute: &Commute) {
        self.send(CommuteEvent::Updated(commute.clone()));
    }

    pub fn ended(&self, commute: &Commute) {
        self.send(CommuteEvent::Ended(commute.clone()));
    }

    fn send(&self, event: CommuteEvent) {
        let kind = event.as_str();
        if self.tx.send(event).is_err() {
            debug!(event = %kind, "commute_notification_dropped_no_receiver");
        }
    }
}

/// Create a notification channel pair
pub fn create_notification_channel() -> (CommuteNotifier, mpsc::UnboundedReceiver<CommuteEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommuteNotifier::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::EndpointId;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (notifier, mut rx) = create_notification_channel();
        let mut commute =
            Commute::new(Utc.with_ymd_and_hms(2024, 2, 7, 8, 0, 0).unwrap(), EndpointId::Home);

        notifier.started(&commute);
        notifier.updated(&commute);
        commute.finish(Utc.with_ymd_and_hms(2024, 2, 7, 8, 40, 0).unwrap());
        notifier.ended(&commute);

        let kinds: Vec<_> = [rx.recv().await, rx.recv().await, rx.recv().await]
            .into_iter()
            .map(|e| e.unwrap().as_str())
            .collect();
        assert_eq!(kinds, vec!["started", "updated", "ended"]);
    }

    #[test]
    fn test_send_without_receiver_does_not_panic() {
        let (notifier, rx) = create_notification_channel();
        drop(rx);
        let commute =
            Commute::new(Utc.with_ymd_and_hms(2024, 2, 7, 8, 0, 0).unwrap(), EndpointId::Work);
        notifier.started(&commute);
    }

    #[test]
    fn test_event_json_shape() {
        let commute =
            Commute::new(Utc.with_ymd_and_hms(2024, 2, 7, 8, 0, 0).unwrap(), EndpointId::Work);
        let json = serde_json::to_value(CommuteEvent::Started(commute)).unwrap();
        assert_eq!(json["t"], "started");
        assert_eq!(json["commute"]["start_point"], "work");
    }
}
