//! Cross-context message passing.
//!
//! Each message type gets its own channel. Delivery is best effort: posting to
//! a context whose inbox is gone reports [`Delivery::Dropped`] and nothing else
//! happens. There is no acknowledgment and no retry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::AnalysisRequest;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Overlay -> Relay: the user asked for an analysis.
    SentimentAnalyze,
    /// Relay -> Result Surface: deliver the request to the opened surface.
    PopupPrefill,
    /// Relay -> Overlay: surface unavailable, handle the request in the page.
    InlineAnalyze,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::SentimentAnalyze => "SENTIMENT_ANALYZE",
            MessageKind::PopupPrefill => "POPUP_PREFILL",
            MessageKind::InlineAnalyze => "INLINE_ANALYZE",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of a message, as a host runtime would serialize it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtensionMessage {
    SentimentAnalyze { text: String },
    PopupPrefill { text: String },
    InlineAnalyze { text: String },
}

impl ExtensionMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        let text = text.into();
        match kind {
            MessageKind::SentimentAnalyze => ExtensionMessage::SentimentAnalyze { text },
            MessageKind::PopupPrefill => ExtensionMessage::PopupPrefill { text },
            MessageKind::InlineAnalyze => ExtensionMessage::InlineAnalyze { text },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Shared by every message that stems from the same user request.
    pub correlation_id: Uuid,
    pub kind: MessageKind,
    pub sent_at: DateTime<Utc>,
    pub request: AnalysisRequest,
}

impl Envelope {
    pub fn to_wire(&self) -> ExtensionMessage {
        ExtensionMessage::new(self.kind, self.request.text.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Posted,
    Dropped,
}

/// Sending half of one message type's channel.
#[derive(Debug, Clone)]
pub struct Mailbox {
    kind: MessageKind,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Mailbox {
    /// Starts a new request (fresh correlation id).
    pub fn post_new(&self, request: AnalysisRequest) -> (Uuid, Delivery) {
        let correlation_id = Uuid::new_v4();
        (correlation_id, self.post(correlation_id, request))
    }

    pub fn post(&self, correlation_id: Uuid, request: AnalysisRequest) -> Delivery {
        let envelope = Envelope {
            correlation_id,
            kind: self.kind,
            sent_at: Utc::now(),
            request,
        };

        if log::log_enabled!(log::Level::Debug) {
            if let Ok(wire) = serde_json::to_string(&envelope.to_wire()) {
                log_debug!("[{}] -> {}", correlation_id, wire);
            }
        }

        match self.tx.send(envelope) {
            Ok(()) => Delivery::Posted,
            Err(_) => {
                log_debug!("[{}] {} dropped: receiver gone", correlation_id, self.kind);
                Delivery::Dropped
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half; drained by exactly one context loop.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Inbox {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

pub fn channel(kind: MessageKind) -> (Mailbox, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Mailbox { kind, tx }, Inbox { rx })
}
