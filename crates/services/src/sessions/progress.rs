use quiz_core::integrity::IntegrityState;
use quiz_core::model::Lifecycle;
use serde::Serialize;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// Cursor into the sectioned question list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuizPosition {
    pub section: usize,
    pub question: usize,
}

/// Everything the rendering boundary needs after a state change.
///
/// Carries no option correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub lifecycle: Lifecycle,
    pub position: QuizPosition,
    pub has_previous: bool,
    pub has_next: bool,
    pub time_remaining: String,
    pub seconds_remaining: u32,
    pub integrity: IntegrityState,
    pub warning_visible: bool,
    pub grace_remaining_secs: Option<u32>,
    pub display_exits: u32,
    pub progress: SessionProgress,
    pub is_cheating: bool,
    pub score: Option<u32>,
}
