//! Core types for lecture-dl

use serde::{Deserialize, Serialize};

/// Unique identifier for a course, assigned by the remote system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub i64);

impl From<i64> for CourseId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a curriculum item, assigned by the remote system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of curriculum item
///
/// The remote system reports the kind as a free-form `_class` string;
/// anything outside the known set maps to [`ItemKind::Other`] so that
/// every branch point can match exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Section heading that groups the lectures after it
    Chapter,
    /// A lecture, possibly carrying a video asset with captions
    Lecture,
    /// A quiz (never fetched)
    Quiz,
    /// Any kind the remote system reports that we do not recognize
    Other,
}

impl ItemKind {
    /// Map a remote `_class` string to an item kind
    pub fn from_class(class: &str) -> Self {
        match class {
            "chapter" => ItemKind::Chapter,
            "lecture" => ItemKind::Lecture,
            "quiz" => ItemKind::Quiz,
            _ => ItemKind::Other,
        }
    }
}

/// One curriculum entry, in the order the remote system returned it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Kind of item (chapter, lecture, quiz, other)
    pub kind: ItemKind,
    /// Stable remote identifier
    pub id: ItemId,
    /// Display title
    pub title: String,
    /// Remote sort order; items are never re-sorted locally
    pub ordinal: i64,
    /// True only for lecture items whose asset is a video
    pub has_video_asset: bool,
    /// Whether this item's transcript has been fetched and persisted
    #[serde(default)]
    pub completed: bool,
    /// Normalized transcript text; set if and only if `completed` is true
    #[serde(default)]
    pub content: Option<String>,
}

impl WorkItem {
    /// Whether the processing loop should fetch a transcript for this item
    ///
    /// Only video lectures are eligible; anything already completed is
    /// skipped so a resumed run never repeats work.
    pub fn needs_transcript(&self) -> bool {
        self.kind == ItemKind::Lecture && self.has_video_asset && !self.completed
    }
}

/// Run status (the pipeline state machine's state)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No run data; initial state
    #[default]
    Idle,
    /// The processing loop is active
    Running,
    /// Paused by user; resumable from the first incomplete item
    Paused,
    /// All items visited and the archive delivered
    Completed,
    /// Initialization or finalization failed; a new START retries cleanly
    Error,
}

/// The single persisted record describing the in-progress or most recent run
///
/// This is the durable checkpoint that makes recovery possible: the
/// pipeline persists it after every item and on every status
/// transition, and it is never deleted, only overwritten in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Current state-machine state
    pub status: RunStatus,
    /// Course being processed; `None` only before the first START
    pub course_id: Option<CourseId>,
    /// Course title, used for archive naming
    pub course_title: String,
    /// Count of video lectures, computed once at initialization
    pub total_video_lectures: u32,
    /// Count of completed lecture items; recomputed on every persistence write
    pub completed_count: u32,
    /// Human-readable description of the current activity (observability only)
    pub current_task: String,
    /// Append-only diagnostic log, cleared at (re-)initialization
    pub log: Vec<String>,
    /// The full curriculum; stored order is the processing order
    pub items: Vec<WorkItem>,
    /// Unix timestamp in milliseconds, monotonically non-decreasing within a run
    pub last_updated_at: i64,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            course_id: None,
            course_title: "Ready".to_string(),
            total_video_lectures: 0,
            completed_count: 0,
            current_task: "Idle".to_string(),
            log: Vec::new(),
            items: Vec::new(),
            last_updated_at: 0,
        }
    }
}

/// Control command delivered to the pipeline
///
/// Serializes as `{"action":"START"}` etc., matching the message shape
/// a control surface sends over its channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum Command {
    /// (Re-)initialize and process the full curriculum from the top
    Start,
    /// Stop the loop at the next checkpoint, keeping all progress
    Pause,
    /// Continue a paused run from the first incomplete item
    Resume,
}

/// Course identity extracted from the calling context
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourseContext {
    /// Remote course identifier
    pub course_id: CourseId,
    /// Course title as shown to the user
    pub course_title: String,
}

/// Progress percentage for UI rendering
///
/// Defined as `round(100 * completed / total)`, and 0 when `total` is 0.
///
/// # Examples
///
/// ```
/// use lecture_dl::progress_percent;
///
/// assert_eq!(progress_percent(0, 0), 0);
/// assert_eq!(progress_percent(1, 3), 33);
/// assert_eq!(progress_percent(2, 3), 67);
/// assert_eq!(progress_percent(2, 2), 100);
/// ```
pub fn progress_percent(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((100.0 * f64::from(completed) / f64::from(total)).round()) as u32
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_maps_known_classes() {
        assert_eq!(ItemKind::from_class("chapter"), ItemKind::Chapter);
        assert_eq!(ItemKind::from_class("lecture"), ItemKind::Lecture);
        assert_eq!(ItemKind::from_class("quiz"), ItemKind::Quiz);
        assert_eq!(ItemKind::from_class("practice"), ItemKind::Other);
        assert_eq!(ItemKind::from_class(""), ItemKind::Other);
    }

    #[test]
    fn needs_transcript_requires_video_lecture() {
        let item = WorkItem {
            kind: ItemKind::Lecture,
            id: ItemId(1),
            title: "Welcome".to_string(),
            ordinal: 1,
            has_video_asset: true,
            completed: false,
            content: None,
        };
        assert!(item.needs_transcript());

        let completed = WorkItem {
            completed: true,
            ..item.clone()
        };
        assert!(!completed.needs_transcript(), "completed items are skipped");

        let article = WorkItem {
            has_video_asset: false,
            ..item.clone()
        };
        assert!(!article.needs_transcript(), "non-video lectures are skipped");

        let quiz = WorkItem {
            kind: ItemKind::Quiz,
            ..item
        };
        assert!(!quiz.needs_transcript(), "quizzes are never fetched");
    }

    #[test]
    fn default_state_is_idle_and_empty() {
        let state = RunState::default();
        assert_eq!(state.status, RunStatus::Idle);
        assert_eq!(state.course_id, None);
        assert_eq!(state.course_title, "Ready");
        assert_eq!(state.total_video_lectures, 0);
        assert_eq!(state.completed_count, 0);
        assert_eq!(state.current_task, "Idle");
        assert!(state.log.is_empty());
        assert!(state.items.is_empty());
        assert_eq!(state.last_updated_at, 0);
    }

    #[test]
    fn command_uses_action_wire_shape() {
        let json = serde_json::to_string(&Command::Start).unwrap();
        assert_eq!(json, r#"{"action":"START"}"#);

        let parsed: Command = serde_json::from_str(r#"{"action":"PAUSE"}"#).unwrap();
        assert_eq!(parsed, Command::Pause);
        let parsed: Command = serde_json::from_str(r#"{"action":"RESUME"}"#).unwrap();
        assert_eq!(parsed, Command::Resume);
    }

    #[test]
    fn progress_rounds_to_nearest_percent() {
        assert_eq!(progress_percent(0, 7), 0);
        assert_eq!(progress_percent(1, 7), 14);
        assert_eq!(progress_percent(6, 7), 86);
        assert_eq!(progress_percent(7, 7), 100);
    }
}
