use thiserror::Error;

use crate::messaging::MessageKind;

/// Why the active page's selection could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionFailure {
    #[error("Cannot access chrome:// or similar pages. Open a normal webpage.")]
    RestrictedAddress { scheme: String },
    #[error("Unable to read selection on this page.")]
    InjectionFailed { reason: String },
}

/// Failures that cross a context boundary. `Display` is the text shown to the
/// user where one is shown at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SentimentError {
    #[error(transparent)]
    SelectionUnavailable(#[from] SelectionFailure),
    #[error("Could not reach the local API.")]
    ServiceUnreachable { attempts: usize },
    #[error("result surface unavailable: {0}")]
    RelayUnavailable(String),
    #[error("no destination context for {kind}")]
    DeliveryDropped { kind: MessageKind },
}
