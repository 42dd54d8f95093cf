use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{LiveSelection, Point, SelectionSnapshot};

/// Trigger sits just below and to the right of the selection end.
pub const TRIGGER_OFFSET: (f64, f64) = (12.0, 12.0);
/// Feedback bubble sits below the trigger.
pub const FEEDBACK_OFFSET: (f64, f64) = (12.0, 54.0);
pub const AUTO_HIDE_DELAY: Duration = Duration::from_millis(3000);

pub const ANALYZING_TEXT: &str = "Analyzing...";
pub const FAILED_TEXT: &str = "Analysis failed.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayState {
    #[default]
    Hidden,
    Visible,
    Analyzing,
    ShowingResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackBubble {
    pub anchor: Point,
    pub text: String,
}

/// Everything a view needs to draw the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayFrame {
    pub state: OverlayState,
    pub trigger: Option<Point>,
    pub feedback: Option<FeedbackBubble>,
}

/// Overlay state machine. Pure: no timers, no I/O.
///
/// `interaction` increases on every user interaction and every analysis
/// transition; an auto-hide scheduled at generation `g` only applies while
/// `interaction == g`.
#[derive(Debug, Clone, Default)]
pub struct OverlayModel {
    state: OverlayState,
    snapshot: Option<SelectionSnapshot>,
    last_text: Option<String>,
    feedback: Option<FeedbackBubble>,
    interaction: u64,
}

impl OverlayModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&SelectionSnapshot> {
        self.snapshot.as_ref()
    }

    /// Last text long enough to analyze, kept after the live selection collapses.
    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }

    /// Applies a selection reading. Returns true when the rendered frame changed.
    pub fn observe_selection(&mut self, text: &str, anchor: Option<Point>) -> bool {
        let trimmed = text.trim();
        let Some(anchor) = anchor else {
            if let Some(snapshot) = SelectionSnapshot::capture(trimmed, Point::default()) {
                self.last_text = Some(snapshot.text);
            } else {
                return self.clear_selection();
            }
            return false;
        };

        match SelectionSnapshot::capture(trimmed, anchor) {
            Some(snapshot) => {
                self.interaction += 1;
                self.last_text = Some(snapshot.text.clone());
                self.snapshot = Some(snapshot);
                match self.state {
                    OverlayState::Analyzing => {}
                    OverlayState::Hidden | OverlayState::Visible | OverlayState::ShowingResult => {
                        self.state = OverlayState::Visible;
                        self.feedback = None;
                    }
                }
                true
            }
            None => self.clear_selection(),
        }
    }

    /// Empty selection: the trigger goes away in every state and nothing can be
    /// requested until a new snapshot is taken. An in-flight analysis keeps its
    /// bubble.
    fn clear_selection(&mut self) -> bool {
        let had_trigger = self.snapshot.take().is_some();
        self.last_text = None;
        match self.state {
            OverlayState::Visible | OverlayState::ShowingResult => {
                self.hide();
                true
            }
            OverlayState::Analyzing => had_trigger,
            OverlayState::Hidden => false,
        }
    }

    pub fn observe_outside_click(&mut self, inside_overlay: bool, selection_active: bool) -> bool {
        if inside_overlay || selection_active {
            return false;
        }
        match self.state {
            OverlayState::Visible | OverlayState::ShowingResult => {
                self.hide();
                true
            }
            OverlayState::Hidden | OverlayState::Analyzing => false,
        }
    }

    fn hide(&mut self) {
        self.interaction += 1;
        self.state = OverlayState::Hidden;
        self.feedback = None;
    }

    /// Text to send when the trigger is activated, or `None` when there is no
    /// trigger on screen or nothing to analyze.
    pub fn trigger_text(&self, live: &LiveSelection) -> Option<String> {
        if self.state == OverlayState::Hidden || self.snapshot.is_none() {
            return None;
        }
        live.usable_text()
            .map(str::to_string)
            .or_else(|| self.last_text.clone())
    }

    pub fn begin_analysis(&mut self) {
        self.interaction += 1;
        let base = self
            .snapshot
            .as_ref()
            .map(SelectionSnapshot::anchor)
            .unwrap_or_default();
        self.state = OverlayState::Analyzing;
        self.feedback = Some(FeedbackBubble {
            anchor: base.offset(FEEDBACK_OFFSET.0, FEEDBACK_OFFSET.1),
            text: ANALYZING_TEXT.to_string(),
        });
    }

    /// Moves to `ShowingResult` and returns the generation an auto-hide must match.
    pub fn finish_analysis(&mut self, text: String) -> u64 {
        self.interaction += 1;
        let anchor = self
            .feedback
            .as_ref()
            .map(|bubble| bubble.anchor)
            .unwrap_or_else(|| Point::default().offset(FEEDBACK_OFFSET.0, FEEDBACK_OFFSET.1));
        self.state = OverlayState::ShowingResult;
        self.feedback = Some(FeedbackBubble { anchor, text });
        self.interaction
    }

    pub fn auto_hide(&mut self, generation: u64) -> bool {
        if self.state != OverlayState::ShowingResult || self.interaction != generation {
            return false;
        }
        self.state = OverlayState::Hidden;
        self.feedback = None;
        true
    }

    pub fn frame(&self) -> OverlayFrame {
        let trigger = match self.state {
            OverlayState::Hidden => None,
            _ => self
                .snapshot
                .as_ref()
                .map(|snapshot| snapshot.anchor().offset(TRIGGER_OFFSET.0, TRIGGER_OFFSET.1)),
        };

        OverlayFrame {
            state: self.state,
            trigger,
            feedback: self.feedback.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible_model(text: &str, anchor: Point) -> OverlayModel {
        let mut model = OverlayModel::new();
        assert!(model.observe_selection(text, Some(anchor)));
        model
    }

    #[test]
    fn anchored_selection_shows_trigger_at_fixed_offset() {
        for (x, y) in [(0.0, 0.0), (100.0, 250.5), (1920.0, 12000.0)] {
            let model = visible_model("I love this", Point::new(x, y));
            let frame = model.frame();
            assert_eq!(frame.state, OverlayState::Visible);
            assert_eq!(frame.trigger, Some(Point::new(x + 12.0, y + 12.0)));
            assert_eq!(model.snapshot().map(|s| s.text.as_str()), Some("I love this"));
        }
    }

    #[test]
    fn empty_or_single_char_selection_hides_and_disables_trigger() {
        let mut model = visible_model("I love this", Point::new(5.0, 5.0));
        assert!(model.observe_selection("   ", Some(Point::new(5.0, 5.0))));
        assert_eq!(model.state(), OverlayState::Hidden);
        assert_eq!(model.frame().trigger, None);
        assert_eq!(model.trigger_text(&LiveSelection::empty()), None);

        let mut model = visible_model("I love this", Point::new(5.0, 5.0));
        model.observe_selection("x", None);
        assert_eq!(model.state(), OverlayState::Hidden);
    }

    #[test]
    fn unanchored_selection_only_remembers_text() {
        let mut model = OverlayModel::new();
        assert!(!model.observe_selection("re-selected text", None));
        assert_eq!(model.state(), OverlayState::Hidden);
        assert_eq!(model.last_text(), Some("re-selected text"));
    }

    #[test]
    fn trigger_text_falls_back_to_last_snapshot_when_selection_collapsed() {
        let model = visible_model("  keep me  ", Point::new(1.0, 1.0));
        assert_eq!(
            model.trigger_text(&LiveSelection::empty()).as_deref(),
            Some("keep me")
        );
        assert_eq!(
            model
                .trigger_text(&LiveSelection::new("fresh text", None))
                .as_deref(),
            Some("fresh text")
        );
    }

    #[test]
    fn outside_click_hides_only_without_selection() {
        let mut model = visible_model("I love this", Point::new(1.0, 1.0));
        assert!(!model.observe_outside_click(true, false));
        assert!(!model.observe_outside_click(false, true));
        assert_eq!(model.state(), OverlayState::Visible);
        assert!(model.observe_outside_click(false, false));
        assert_eq!(model.state(), OverlayState::Hidden);
    }

    #[test]
    fn analysis_runs_through_showing_result_to_hidden() {
        let mut model = visible_model("I love this", Point::new(10.0, 20.0));
        model.begin_analysis();
        let frame = model.frame();
        assert_eq!(frame.state, OverlayState::Analyzing);
        let bubble = frame.feedback.expect("working bubble");
        assert_eq!(bubble.text, ANALYZING_TEXT);
        assert_eq!(bubble.anchor, Point::new(22.0, 74.0));

        // Selection noise while working does not interrupt the analysis.
        model.observe_selection("", Some(Point::new(0.0, 0.0)));
        assert_eq!(model.state(), OverlayState::Analyzing);

        let generation = model.finish_analysis(FAILED_TEXT.to_string());
        assert_eq!(model.state(), OverlayState::ShowingResult);
        assert!(!model.auto_hide(generation - 1));
        assert!(model.auto_hide(generation));
        assert_eq!(model.frame().feedback, None);
        assert_eq!(model.state(), OverlayState::Hidden);
    }

    #[test]
    fn empty_selection_while_showing_result_hides_and_disarms_trigger() {
        let mut model = visible_model("I love this", Point::new(1.0, 1.0));
        model.begin_analysis();
        let generation = model.finish_analysis("Sentiment: positive | Polarity: 0.600".into());

        assert!(model.observe_selection("", None));
        let frame = model.frame();
        assert_eq!(frame.state, OverlayState::Hidden);
        assert_eq!(frame.trigger, None);
        assert_eq!(frame.feedback, None);
        assert_eq!(model.trigger_text(&LiveSelection::empty()), None);
        assert!(!model.auto_hide(generation));
    }

    #[test]
    fn empty_selection_while_analyzing_keeps_bubble_but_removes_trigger() {
        let mut model = visible_model("I love this", Point::new(1.0, 1.0));
        model.begin_analysis();

        assert!(model.observe_selection("  ", Some(Point::new(1.0, 1.0))));
        let frame = model.frame();
        assert_eq!(frame.state, OverlayState::Analyzing);
        assert_eq!(frame.trigger, None);
        assert_eq!(frame.feedback.map(|bubble| bubble.text), Some(ANALYZING_TEXT.to_string()));
        assert_eq!(model.trigger_text(&LiveSelection::empty()), None);

        model.finish_analysis(FAILED_TEXT.to_string());
        assert_eq!(model.frame().trigger, None);
        assert_eq!(model.trigger_text(&LiveSelection::empty()), None);
    }

    #[test]
    fn outside_click_without_selection_hides_result() {
        let mut model = visible_model("I love this", Point::new(1.0, 1.0));
        model.begin_analysis();
        assert!(!model.observe_outside_click(false, false));
        assert_eq!(model.state(), OverlayState::Analyzing);

        let generation = model.finish_analysis(FAILED_TEXT.to_string());
        assert!(!model.observe_outside_click(true, false));
        assert!(model.observe_outside_click(false, false));
        assert_eq!(model.state(), OverlayState::Hidden);
        assert_eq!(model.frame().feedback, None);
        assert!(!model.auto_hide(generation));
    }

    #[test]
    fn new_selection_while_showing_result_invalidates_auto_hide() {
        let mut model = visible_model("first", Point::new(1.0, 1.0));
        model.begin_analysis();
        let generation = model.finish_analysis("Sentiment: positive".into());
        assert!(model.observe_selection("second pick", Some(Point::new(3.0, 3.0))));
        assert_eq!(model.state(), OverlayState::Visible);
        assert!(!model.auto_hide(generation));
        assert_eq!(model.state(), OverlayState::Visible);
    }
}
