//! Server-to-client messages and the event handler that produces them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use prompting::logging::LogLine;
use prompting::panel::events::{PromptEvent, PromptEventHandler};
use prompting::parameters::StoredValue;
use serde::Serialize;
use tokio::sync::broadcast;

/// A message pushed to every connected WebSocket client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Full state, sent on connect, after every command and on lag.
    Snapshot { data: serde_json::Value },
    Submit { is_init: bool },
    SubmitStart,
    ParameterChanged { name: String, value: StoredValue },
    RefreshDeferred { queued: usize },
    Refreshed {
        added: usize,
        removed: usize,
        changed: usize,
    },
    Alert { message: String },
    /// Render lifecycle: `before_render`, `after_render`, `post_init`, `ready`.
    Lifecycle { event: String },
    Log { line: LogLine },
    /// Components re-rendered since the previous snapshot, parents first.
    Rendered { components: Vec<String> },
}

impl From<&PromptEvent> for WsMessage {
    fn from(event: &PromptEvent) -> Self {
        match event {
            PromptEvent::Submit { is_init } => WsMessage::Submit { is_init: *is_init },
            PromptEvent::SubmitStart => WsMessage::SubmitStart,
            PromptEvent::ParameterChanged { name, value } => WsMessage::ParameterChanged {
                name: name.clone(),
                value: value.clone(),
            },
            PromptEvent::RefreshDeferred { queued } => WsMessage::RefreshDeferred { queued: *queued },
            PromptEvent::Refreshed {
                added,
                removed,
                changed,
            } => WsMessage::Refreshed {
                added: *added,
                removed: *removed,
                changed: *changed,
            },
            PromptEvent::Alert { message } => WsMessage::Alert {
                message: message.clone(),
            },
            PromptEvent::BeforeRender
            | PromptEvent::AfterRender
            | PromptEvent::PostInit
            | PromptEvent::Ready => WsMessage::Lifecycle {
                event: event.name().to_string(),
            },
        }
    }
}

/// Forwards panel events to WebSocket clients and counts submits.
pub struct WebBroadcastHandler {
    sender: broadcast::Sender<WsMessage>,
    submits: Arc<AtomicU64>,
}

impl WebBroadcastHandler {
    pub fn new(sender: broadcast::Sender<WsMessage>) -> Self {
        Self {
            sender,
            submits: Arc::default(),
        }
    }

    /// Counter shared with the panel task for snapshots.
    pub fn submit_counter(&self) -> Arc<AtomicU64> {
        self.submits.clone()
    }
}

impl PromptEventHandler for WebBroadcastHandler {
    fn on_event(&self, event: &PromptEvent) {
        if matches!(event, PromptEvent::Submit { .. }) {
            self.submits.fetch_add(1, Ordering::Relaxed);
        }
        // No receivers is fine: nobody is connected.
        let _ = self.sender.send(WsMessage::from(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_a_type_tag() {
        let json = serde_json::to_value(WsMessage::Submit { is_init: true }).unwrap();
        assert_eq!(json["type"], "submit");
        assert_eq!(json["is_init"], true);

        let json = serde_json::to_value(WsMessage::SubmitStart).unwrap();
        assert_eq!(json, serde_json::json!({"type": "submit_start"}));
    }

    #[test]
    fn parameter_values_serialize_untagged() {
        let json = serde_json::to_value(WsMessage::ParameterChanged {
            name: "lines".into(),
            value: StoredValue::Multi(vec!["cars".into(), "ships".into()]),
        })
        .unwrap();
        assert_eq!(json["type"], "parameter_changed");
        assert_eq!(json["value"], serde_json::json!(["cars", "ships"]));
    }

    #[test]
    fn lifecycle_events_share_one_message() {
        assert_eq!(
            WsMessage::from(&PromptEvent::PostInit),
            WsMessage::Lifecycle {
                event: "post_init".into()
            }
        );
        assert_eq!(
            WsMessage::from(&PromptEvent::Refreshed {
                added: 1,
                removed: 2,
                changed: 3
            }),
            WsMessage::Refreshed {
                added: 1,
                removed: 2,
                changed: 3
            }
        );
    }

    #[test]
    fn handler_broadcasts_and_counts_submits() {
        let (tx, mut rx) = broadcast::channel(8);
        let handler = WebBroadcastHandler::new(tx);
        let submits = handler.submit_counter();

        handler.on_event(&PromptEvent::Submit { is_init: false });
        handler.on_event(&PromptEvent::Alert {
            message: "server down".into(),
        });

        assert_eq!(submits.load(Ordering::Relaxed), 1);
        assert_eq!(rx.try_recv().unwrap(), WsMessage::Submit { is_init: false });
        assert!(matches!(rx.try_recv().unwrap(), WsMessage::Alert { .. }));
    }

    #[test]
    fn handler_without_receivers_does_not_panic() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        WebBroadcastHandler::new(tx).on_event(&PromptEvent::Ready);
    }
}
