use url::Url;

use crate::{
    error::{SelectionFailure, SentimentError},
    host::{ScriptInjector, TabDirectory},
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Browser-internal schemes no extension script may run in.
pub const RESTRICTED_SCHEMES: [&str; 4] = ["chrome", "edge", "about", "chrome-extension"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressClass {
    Scriptable,
    Restricted { scheme: String },
}

/// Classifies a page address before any injection is attempted. Addresses
/// that do not parse are left to the injection attempt to reject.
pub fn classify_address(address: &str) -> AddressClass {
    let Ok(url) = Url::parse(address.trim()) else {
        return AddressClass::Scriptable;
    };

    let scheme = url.scheme();
    if RESTRICTED_SCHEMES.contains(&scheme) {
        AddressClass::Restricted {
            scheme: scheme.to_string(),
        }
    } else {
        AddressClass::Scriptable
    }
}

/// Reads the live selection out of the focused page. An empty string means
/// "no active page" or "nothing selected".
pub async fn selection_from_active_tab(
    tabs: &dyn TabDirectory,
    injector: &dyn ScriptInjector,
) -> Result<String, SentimentError> {
    let Some(tab) = tabs.active_tab().await else {
        return Ok(String::new());
    };

    if let AddressClass::Restricted { scheme } = classify_address(&tab.url) {
        log_info!("refusing to read selection from {} ({})", tab.id, scheme);
        return Err(SelectionFailure::RestrictedAddress { scheme }.into());
    }

    injector.read_selection(tab.id).await.map_err(|err| {
        SelectionFailure::InjectionFailed {
            reason: format!("{err:#}"),
        }
        .into()
    })
}
