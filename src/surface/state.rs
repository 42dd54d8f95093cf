use serde::{Deserialize, Serialize};

use crate::{
    error::SentimentError,
    models::{AnalysisResult, RenderedResult},
};

pub const BLANK_INPUT_MESSAGE: &str = "Enter or select some text.";
pub const ANALYZING_MESSAGE: &str = "Analyzing...";
pub const DONE_MESSAGE: &str = "Done.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceStatus {
    #[default]
    Idle,
    Analyzing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceState {
    pub input: String,
    pub status: SurfaceStatus,
    pub status_message: String,
    pub is_error: bool,
    pub result: Option<RenderedResult>,
}

impl SurfaceState {
    fn show_status(&mut self, status: SurfaceStatus, message: impl Into<String>, is_error: bool) {
        self.status = status;
        self.status_message = message.into();
        self.is_error = is_error;
    }

    pub fn reject_blank(&mut self) {
        self.show_status(SurfaceStatus::Failed, BLANK_INPUT_MESSAGE, true);
    }

    pub fn begin(&mut self) {
        self.result = None;
        self.show_status(SurfaceStatus::Analyzing, ANALYZING_MESSAGE, false);
    }

    pub fn complete(&mut self, result: &AnalysisResult) {
        self.result = Some(result.render());
        self.show_status(SurfaceStatus::Done, DONE_MESSAGE, false);
    }

    pub fn fail(&mut self, err: &SentimentError) {
        self.show_status(SurfaceStatus::Failed, err.to_string(), true);
    }
}
