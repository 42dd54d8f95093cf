use std::sync::Arc;

use anyhow::{bail, Context, Result};
use url::Url;

pub const PRODUCTION_ENDPOINT: &str = "https://sentanalysis.vercel.app/api/sentiment";

/// Priority order: hosted service first, then a locally running service.
pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    PRODUCTION_ENDPOINT,
    "http://127.0.0.1:5000/api/sentiment",
    "http://localhost:5000/api/sentiment",
];

/// Fixed, ordered candidate endpoints. Insertion order is try order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointList {
    urls: Arc<[String]>,
}

impl EndpointList {
    /// Validates every entry as an absolute http(s) URL.
    pub fn parse<I, S>(urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for raw in urls {
            let raw = raw.as_ref().trim();
            let url = Url::parse(raw).with_context(|| format!("invalid endpoint URL '{raw}'"))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("endpoint '{raw}' must use http or https");
            }
            parsed.push(url.to_string());
        }

        if parsed.is_empty() {
            bail!("endpoint list must contain at least one URL");
        }

        Ok(Self {
            urls: parsed.into(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
