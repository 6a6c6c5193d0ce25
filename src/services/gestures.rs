use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::models::Position;
use crate::services::{MoveOutcome, QuoteEditor, ReorderRequest};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// How long a finger must rest on a row before it can be dragged
    pub hold_delay: Duration,
    /// Movement that turns a not-yet-armed press into a scroll
    pub move_threshold_px: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            hold_delay: Duration::from_millis(300),
            move_threshold_px: 10.0,
        }
    }
}

/// Vertical extent of a rendered row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowBounds {
    pub position: Position,
    pub top: f32,
    pub height: f32,
}

impl RowBounds {
    pub fn contains(&self, y: f32) -> bool {
        y >= self.top && y < self.top + self.height
    }

    /// Lower half of the row means "insert after"
    pub fn insert_after(&self, y: f32) -> bool {
        y > self.top + self.height / 2.0
    }

    pub fn drop_target(&self, y: f32) -> DropTarget {
        DropTarget {
            position: self.position,
            insert_after: self.insert_after(y),
        }
    }
}

/// Find the row under `y`
pub fn hit_test(rows: &[RowBounds], y: f32) -> Option<DropTarget> {
    rows.iter()
        .find(|row| row.contains(y))
        .map(|row| row.drop_target(y))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTarget {
    pub position: Position,
    pub insert_after: bool,
}

impl DropTarget {
    /// The end of `day`, the only target an empty day offers
    pub fn end_of_day(day: usize, len: usize) -> Self {
        Self {
            position: Position::new(day, len),
            insert_after: false,
        }
    }

    fn request_from(self, source: Position) -> ReorderRequest {
        ReorderRequest {
            source,
            target: self.position,
            insert_after: self.insert_after,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HapticPattern {
    Success,
    Rejected,
}

impl HapticPattern {
    /// Alternating vibrate/pause durations in milliseconds
    pub fn pulses_ms(&self) -> &'static [u64] {
        match self {
            HapticPattern::Success => &[40],
            HapticPattern::Rejected => &[30, 60, 30],
        }
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.pulses_ms()
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }
}

/// Result of a completed drop
#[derive(Debug, Clone, PartialEq)]
pub struct DropFeedback {
    pub haptic: HapticPattern,
    pub outcome: Option<MoveOutcome>,
    /// Why the drop was rejected
    pub message: Option<String>,
}

impl DropFeedback {
    pub fn accepted(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Mouse drag: active immediately, target follows the cursor
#[derive(Debug, Clone, PartialEq)]
pub struct PointerDrag {
    source: Position,
    target: Option<DropTarget>,
}

impl PointerDrag {
    pub fn new(source: Position) -> Self {
        Self {
            source,
            target: None,
        }
    }

    pub fn source(&self) -> Position {
        self.source
    }

    pub fn target(&self) -> Option<DropTarget> {
        self.target
    }

    pub fn hover(&mut self, target: Option<DropTarget>) {
        self.target = target;
    }

    /// The reorder to perform, if released over a target
    pub fn release(self) -> Option<ReorderRequest> {
        self.target.map(|t| t.request_from(self.source))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchPhase {
    /// Finger down, hold delay not yet elapsed
    Pending,
    /// Held long enough; the next movement starts dragging
    Armed,
    Dragging,
    /// Moved too early: the gesture was a scroll
    Cancelled,
}

/// Floating copy of the dragged row that follows the finger
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ghost {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TouchRelease {
    /// Released while armed without moving
    Tap,
    /// Scrolled, released early, or dropped over nothing
    Cancelled,
    Drop(ReorderRequest),
}

/// Press-hold-drag gesture for touch screens
#[derive(Debug, Clone, PartialEq)]
pub struct TouchDrag {
    source: Position,
    config: GestureConfig,
    started_at: Instant,
    origin: (f32, f32),
    phase: TouchPhase,
    ghost: Option<Ghost>,
    target: Option<DropTarget>,
}

impl TouchDrag {
    pub fn start(source: Position, x: f32, y: f32, now: Instant, config: GestureConfig) -> Self {
        Self {
            source,
            config,
            started_at: now,
            origin: (x, y),
            phase: TouchPhase::Pending,
            ghost: None,
            target: None,
        }
    }

    pub fn source(&self) -> Position {
        self.source
    }

    pub fn phase(&self) -> TouchPhase {
        self.phase
    }

    pub fn ghost(&self) -> Option<Ghost> {
        self.ghost
    }

    pub fn target(&self) -> Option<DropTarget> {
        self.target
    }

    /// Advance the hold timer
    pub fn tick(&mut self, now: Instant) -> TouchPhase {
        if self.phase == TouchPhase::Pending
            && now.saturating_duration_since(self.started_at) >= self.config.hold_delay
        {
            debug!(day = self.source.day, index = self.source.index, "Touch drag armed");
            self.phase = TouchPhase::Armed;
        }
        self.phase
    }

    pub fn move_to(
        &mut self,
        x: f32,
        y: f32,
        now: Instant,
        target: Option<DropTarget>,
    ) -> TouchPhase {
        let distance = (x - self.origin.0).hypot(y - self.origin.1);

        match self.tick(now) {
            TouchPhase::Pending if distance > self.config.move_threshold_px => {
                debug!(distance, "Touch moved before hold delay, treating as scroll");
                self.phase = TouchPhase::Cancelled;
            }
            TouchPhase::Armed if distance > 0.0 => {
                self.phase = TouchPhase::Dragging;
                self.ghost = Some(Ghost { x, y });
                self.target = target;
            }
            TouchPhase::Dragging => {
                self.ghost = Some(Ghost { x, y });
                self.target = target;
            }
            _ => {}
        }
        self.phase
    }

    pub fn release(mut self, now: Instant) -> TouchRelease {
        match self.tick(now) {
            TouchPhase::Armed => TouchRelease::Tap,
            TouchPhase::Dragging => match self.target {
                Some(target) => TouchRelease::Drop(target.request_from(self.source)),
                None => TouchRelease::Cancelled,
            },
            TouchPhase::Pending | TouchPhase::Cancelled => TouchRelease::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragSession {
    Pointer(PointerDrag),
    Touch(TouchDrag),
}

impl DragSession {
    pub fn source(&self) -> Position {
        match self {
            DragSession::Pointer(drag) => drag.source(),
            DragSession::Touch(drag) => drag.source(),
        }
    }
}

/// Owner of the single in-flight drag
#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Start a mouse drag, abandoning any previous session
    pub fn begin_pointer(&mut self, source: Position) {
        self.replace(DragSession::Pointer(PointerDrag::new(source)));
    }

    /// Start a touch press, abandoning any previous session
    pub fn begin_touch(
        &mut self,
        source: Position,
        x: f32,
        y: f32,
        now: Instant,
        config: GestureConfig,
    ) {
        self.replace(DragSession::Touch(TouchDrag::start(source, x, y, now, config)));
    }

    pub fn pointer_hover(&mut self, target: Option<DropTarget>) {
        if let Some(DragSession::Pointer(drag)) = &mut self.session {
            drag.hover(target);
        }
    }

    /// Feed a touch movement; a scroll ends the session
    pub fn touch_move(
        &mut self,
        x: f32,
        y: f32,
        now: Instant,
        target: Option<DropTarget>,
    ) -> Option<TouchPhase> {
        let phase = match &mut self.session {
            Some(DragSession::Touch(drag)) => drag.move_to(x, y, now, target),
            _ => return None,
        };
        if phase == TouchPhase::Cancelled {
            self.session = None;
        }
        Some(phase)
    }

    pub fn cancel(&mut self) {
        if self.session.take().is_some() {
            debug!("Drag cancelled");
        }
    }

    /// End the session, yielding the reorder to perform if the gesture produced one
    pub fn end(&mut self, now: Instant) -> Option<ReorderRequest> {
        match self.session.take()? {
            DragSession::Pointer(drag) => drag.release(),
            DragSession::Touch(drag) => match drag.release(now) {
                TouchRelease::Drop(request) => Some(request),
                TouchRelease::Tap | TouchRelease::Cancelled => None,
            },
        }
    }

    /// Apply `request` through the editor and report haptic feedback
    pub fn finish(&mut self, editor: &mut QuoteEditor, request: ReorderRequest) -> DropFeedback {
        self.session = None;
        match editor.reorder(request) {
            Ok(outcome) => {
                info!(
                    from_day = outcome.from_day,
                    to_day = outcome.to_day,
                    index = outcome.index,
                    "Drop accepted"
                );
                DropFeedback {
                    haptic: HapticPattern::Success,
                    outcome: Some(outcome),
                    message: None,
                }
            }
            Err(e) => DropFeedback {
                haptic: HapticPattern::Rejected,
                outcome: None,
                message: Some(e.to_string()),
            },
        }
    }

    /// `end` followed by `finish`
    pub fn release(&mut self, editor: &mut QuoteEditor, now: Instant) -> Option<DropFeedback> {
        let request = self.end(now)?;
        Some(self.finish(editor, request))
    }

    fn replace(&mut self, session: DragSession) {
        if let Some(previous) = self.session.replace(session) {
            debug!(
                day = previous.source().day,
                index = previous.source().index,
                "Previous drag abandoned"
            );
        }
    }
}
