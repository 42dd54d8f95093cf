pub mod analysis;
pub mod selection;

pub use analysis::{format_score, AnalysisRequest, AnalysisResult, RenderedResult, PLACEHOLDER};
pub use selection::{LiveSelection, Point, SelectionSnapshot, MIN_SELECTION_CHARS};
