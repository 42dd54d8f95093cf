use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Rendered in place of a field the service did not return (or returned in an
/// unusable shape).
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Body returned by a sentiment endpoint.
///
/// Every field is optional: endpoints are third-party and the shape is only a
/// convention. Numeric fields accept JSON numbers and numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "lenient_label")]
    pub sentiment: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub polarity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub subjectivity: Option<f64>,
}

impl AnalysisResult {
    pub fn new(sentiment: &str, polarity: f64, subjectivity: f64) -> Self {
        Self {
            sentiment: Some(sentiment.to_string()),
            polarity: Some(polarity),
            subjectivity: Some(subjectivity),
        }
    }

    pub fn sentiment_label(&self) -> &str {
        self.sentiment.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn render(&self) -> RenderedResult {
        RenderedResult {
            sentiment: self.sentiment_label().to_string(),
            polarity: format_score(self.polarity),
            subjectivity: format_score(self.subjectivity),
        }
    }
}

/// Display strings for a result, ready to drop into a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedResult {
    pub sentiment: String,
    pub polarity: String,
    pub subjectivity: String,
}

impl RenderedResult {
    pub fn summary(&self) -> String {
        format!("{} / {} / {}", self.sentiment, self.polarity, self.subjectivity)
    }
}

/// Three decimal places, or the placeholder for missing/non-finite values.
pub fn format_score(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{value:.3}"),
        _ => PLACEHOLDER.to_string(),
    }
}

fn lenient_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(label)) => Some(label),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}
