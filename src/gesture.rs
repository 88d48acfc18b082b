use egui::{Pos2, Rect, Vec2};

use crate::annotation::{Annotation, AnnotationId, AnnotationKind, AnnotationPatch, Handle, Tool};
use crate::geometry::{to_normalized, Point};
use crate::state::EditorSession;

/// Label shown on a dimension line while it is being drawn.
pub const DRAFT_LABEL: &str = "...";
pub const DEFAULT_TEXT_PROMPT: &str = "Label";
pub const DEFAULT_LABEL_PROMPT: &str = "0\"";

/// Input already reduced to what the recognizer cares about. Positions are in
/// screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerDown(Pos2),
    PointerMove(Pos2),
    PointerUp,
    /// Second finger landed; carries the midpoint of both touches.
    TwoFingerStart(Pos2),
    TwoFingerMove(Pos2),
    TwoFingerEnd,
    /// Wheel delta in page convention (positive y scrolls down).
    Wheel { delta: Vec2, zoom: bool },
    /// Ratio between successive pinch spans, from touch or trackpad.
    Pinch(f32),
}

/// On-screen placement of the photo for the current frame, after zoom/pan.
#[derive(Clone, Copy, Debug)]
pub struct CanvasFrame {
    pub image_rect: Rect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Move,
    Resize(Handle),
}

#[derive(Clone, Debug)]
pub struct DragState {
    pub id: AnnotationId,
    pub mode: DragMode,
    pub start: Point,
    pub original: Annotation,
}

#[derive(Clone, Debug, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Panning {
        last_midpoint: Pos2,
    },
    Dragging(DragState),
    Drawing(Annotation),
}

impl GestureState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Panning { .. } => "panning",
            Self::Dragging(_) => "dragging",
            Self::Drawing(_) => "drawing",
        }
    }

    pub fn draft(&self) -> Option<&Annotation> {
        match self {
            Self::Drawing(draft) => Some(draft),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum PromptKind {
    DimensionLabel(Annotation),
    NewText { position: Point },
    EditText(AnnotationId),
    EditLabel(AnnotationId),
}

/// A pending request for a string. While one is open every other input is
/// ignored; it resolves to either a value or a cancellation.
#[derive(Clone, Debug)]
pub struct PendingPrompt {
    pub kind: PromptKind,
    pub buffer: String,
}

impl PendingPrompt {
    pub fn title(&self) -> &'static str {
        match self.kind {
            PromptKind::DimensionLabel(_) => "Enter dimension (e.g. 10ft)",
            PromptKind::NewText { .. } => "Enter text label",
            PromptKind::EditText(_) => "Edit text",
            PromptKind::EditLabel(_) => "Edit dimension label",
        }
    }
}

/// Feeds one input event through the recognizer. Returns `true` when the
/// event was consumed.
pub fn handle_event(session: &mut EditorSession, frame: &CanvasFrame, event: InputEvent) -> bool {
    if session.prompt.is_some() {
        return false;
    }

    match event {
        InputEvent::TwoFingerStart(midpoint) => {
            abandon_gesture(session);
            transition(session, GestureState::Panning {
                last_midpoint: midpoint,
            });
            true
        }
        InputEvent::TwoFingerMove(midpoint) => {
            let GestureState::Panning { last_midpoint } = session.gesture else {
                return false;
            };
            session.viewport.pan_by(midpoint - last_midpoint);
            session.gesture = GestureState::Panning {
                last_midpoint: midpoint,
            };
            true
        }
        InputEvent::TwoFingerEnd => {
            if matches!(session.gesture, GestureState::Panning { .. }) {
                transition(session, GestureState::Idle);
                return true;
            }
            false
        }
        InputEvent::Wheel { delta, zoom } => {
            if zoom {
                session.viewport.zoom_wheel(delta.y);
                true
            } else {
                session.viewport.pan_by(-delta)
            }
        }
        InputEvent::Pinch(factor) => {
            session.viewport.zoom_pinch(factor);
            true
        }
        InputEvent::PointerDown(pos) => pointer_down(session, frame, pos),
        InputEvent::PointerMove(pos) => pointer_move(session, frame, pos),
        InputEvent::PointerUp => pointer_up(session),
    }
}

fn pointer_down(session: &mut EditorSession, frame: &CanvasFrame, pos: Pos2) -> bool {
    if !matches!(session.gesture, GestureState::Idle) {
        return false;
    }

    let point = to_normalized(pos, frame.image_rect);
    match session.tool {
        Tool::Select => {
            if let Some(drag) = drag_target(session, frame, pos, point) {
                session.model.select(Some(drag.id.clone()));
                transition(session, GestureState::Dragging(drag));
            } else {
                session.model.clear_selection();
            }
        }
        Tool::Dimension => {
            let draft = Annotation {
                id: AnnotationId::generate(),
                color: session.style.color.clone(),
                kind: AnnotationKind::Dimension {
                    start: point,
                    end: point,
                    label: DRAFT_LABEL.to_string(),
                    font_size: Some(session.style.font_size),
                    line_width: Some(session.style.line_width),
                },
            };
            transition(session, GestureState::Drawing(draft));
        }
        Tool::Freehand => {
            let draft = Annotation {
                id: AnnotationId::generate(),
                color: session.style.color.clone(),
                kind: AnnotationKind::Freehand {
                    points: vec![point],
                    line_width: Some(session.style.line_width),
                },
            };
            transition(session, GestureState::Drawing(draft));
        }
        Tool::Text => {
            session.prompt = Some(PendingPrompt {
                kind: PromptKind::NewText { position: point },
                buffer: DEFAULT_TEXT_PROMPT.to_string(),
            });
        }
    }
    true
}

/// Resize handles of the selected dimension win over the body of any
/// annotation; among bodies the most recently created wins.
fn drag_target(
    session: &EditorSession,
    frame: &CanvasFrame,
    pos: Pos2,
    point: Point,
) -> Option<DragState> {
    if let Some(selected) = session.model.selected() {
        if let Some(handle) = selected.handle_at(pos, frame.image_rect) {
            return Some(DragState {
                id: selected.id.clone(),
                mode: DragMode::Resize(handle),
                start: point,
                original: selected.clone(),
            });
        }
    }

    session
        .model
        .hit_test(pos, frame.image_rect, session.viewport.scale)
        .map(|hit| DragState {
            id: hit.id.clone(),
            mode: DragMode::Move,
            start: point,
            original: hit.clone(),
        })
}

fn pointer_move(session: &mut EditorSession, frame: &CanvasFrame, pos: Pos2) -> bool {
    let point = to_normalized(pos, frame.image_rect);
    match &mut session.gesture {
        GestureState::Dragging(drag) => {
            let mut updated = drag.original.clone();
            match drag.mode {
                DragMode::Move => {
                    let (dx, dy) = drag.start.delta_to(point);
                    updated.move_by(dx, dy);
                }
                DragMode::Resize(handle) => updated.move_handle(handle, point),
            }
            let id = drag.id.clone();
            if session.model.replace(&id, updated) {
                session.dirty = true;
            }
            true
        }
        GestureState::Drawing(draft) => {
            match &mut draft.kind {
                AnnotationKind::Dimension { end, .. } => *end = point,
                AnnotationKind::Freehand { points, .. } => points.push(point),
                AnnotationKind::Text { .. } => {}
            }
            true
        }
        GestureState::Idle | GestureState::Panning { .. } => false,
    }
}

fn pointer_up(session: &mut EditorSession) -> bool {
    match std::mem::take(&mut session.gesture) {
        GestureState::Dragging(drag) => {
            tracing::debug!(id = %drag.id, "drag finished");
            true
        }
        GestureState::Drawing(draft) => {
            if draft.is_zero_extent() {
                tracing::debug!(id = %draft.id, kind = draft.kind_name(), "zero-extent draw kept");
            }
            match &draft.kind {
                AnnotationKind::Dimension { .. } => {
                    session.prompt = Some(PendingPrompt {
                        kind: PromptKind::DimensionLabel(draft),
                        buffer: DEFAULT_LABEL_PROMPT.to_string(),
                    });
                }
                AnnotationKind::Freehand { .. } | AnnotationKind::Text { .. } => {
                    commit(session, draft);
                }
            }
            true
        }
        state @ GestureState::Panning { .. } => {
            session.gesture = state;
            false
        }
        GestureState::Idle => false,
    }
}

/// Completes the open prompt. `None`, or input with nothing but whitespace,
/// cancels it and discards whatever was waiting on it. Accepted input is
/// stored as typed.
pub fn resolve_prompt(session: &mut EditorSession, input: Option<String>) {
    let Some(prompt) = session.prompt.take() else {
        return;
    };
    let value = input.filter(|raw| !raw.trim().is_empty());

    let Some(value) = value else {
        tracing::debug!(prompt = prompt.title(), "prompt cancelled");
        return;
    };

    match prompt.kind {
        PromptKind::DimensionLabel(mut draft) => {
            if let AnnotationKind::Dimension { label, .. } = &mut draft.kind {
                *label = value;
            }
            commit(session, draft);
        }
        PromptKind::NewText { position } => {
            let annotation = Annotation {
                id: AnnotationId::generate(),
                color: session.style.color.clone(),
                kind: AnnotationKind::Text {
                    position,
                    text: value,
                    font_size: Some(session.style.font_size),
                },
            };
            commit(session, annotation);
        }
        PromptKind::EditText(id) => {
            let patch = AnnotationPatch {
                text: Some(value),
                ..AnnotationPatch::default()
            };
            if session.model.update(&id, &patch) {
                session.dirty = true;
            }
        }
        PromptKind::EditLabel(id) => {
            let patch = AnnotationPatch {
                label: Some(value),
                ..AnnotationPatch::default()
            };
            if session.model.update(&id, &patch) {
                session.dirty = true;
            }
        }
    }
}

/// Opens the edit prompt for the selected text or dimension.
pub fn begin_edit_selected(session: &mut EditorSession) {
    let Some(selected) = session.model.selected() else {
        return;
    };
    let prompt = match &selected.kind {
        AnnotationKind::Text { text, .. } => PendingPrompt {
            kind: PromptKind::EditText(selected.id.clone()),
            buffer: text.clone(),
        },
        AnnotationKind::Dimension { label, .. } => PendingPrompt {
            kind: PromptKind::EditLabel(selected.id.clone()),
            buffer: label.clone(),
        },
        AnnotationKind::Freehand { .. } => return,
    };
    session.prompt = Some(prompt);
}

fn commit(session: &mut EditorSession, annotation: Annotation) {
    session.model.create(annotation);
    session.dirty = true;
}

/// Drops an unfinished draw and puts a dragged annotation back where it was.
pub fn abandon_gesture(session: &mut EditorSession) {
    match std::mem::take(&mut session.gesture) {
        GestureState::Dragging(drag) => {
            session.model.replace(&drag.id, drag.original);
        }
        GestureState::Drawing(draft) => {
            tracing::debug!(id = %draft.id, "draft discarded");
        }
        GestureState::Idle | GestureState::Panning { .. } => {}
    }
}

fn transition(session: &mut EditorSession, next: GestureState) {
    tracing::debug!(from = session.gesture.name(), to = next.name(), "gesture");
    session.gesture = next;
}

#[cfg(test)]
mod tests {
    use egui::{pos2, vec2, Rect};

    use super::{handle_event, resolve_prompt, CanvasFrame, GestureState, InputEvent, PromptKind};
    use crate::annotation::fixtures::{dimension, text};
    use crate::annotation::{AnnotationKind, Tool};
    use crate::geometry::Point;
    use crate::model::AnnotationSet;
    use crate::state::{EditorSession, ToolStyle};

    fn frame() -> CanvasFrame {
        CanvasFrame {
            image_rect: Rect::from_min_size(pos2(0.0, 0.0), vec2(1000.0, 1000.0)),
        }
    }

    fn session_with(tool: Tool, annotations: AnnotationSet) -> EditorSession {
        let mut session = EditorSession::new(annotations, ToolStyle::default());
        session.set_tool(tool);
        session
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn create_dimension_with_label() {
        let mut session = session_with(Tool::Dimension, AnnotationSet::new());
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(200.0, 200.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerMove(pos2(600.0, 200.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);

        assert!(matches!(
            session.prompt.as_ref().map(|p| &p.kind),
            Some(PromptKind::DimensionLabel(_))
        ));
        assert!(session.model.annotations().is_empty());

        resolve_prompt(&mut session, Some("10ft".into()));
        let set = session.model.annotations();
        assert_eq!(set.len(), 1);
        let AnnotationKind::Dimension {
            start, end, label, ..
        } = &set.as_slice()[0].kind
        else {
            panic!("expected a dimension");
        };
        assert_eq!(*start, Point::new(0.2, 0.2));
        assert_eq!(*end, Point::new(0.6, 0.2));
        assert_eq!(label, "10ft");
        assert!(session.dirty);
    }

    #[test]
    fn cancelled_dimension_label_discards_line() {
        let mut session = session_with(Tool::Dimension, AnnotationSet::new());
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(100.0, 100.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerMove(pos2(300.0, 100.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);
        resolve_prompt(&mut session, None);
        assert!(session.model.annotations().is_empty());
        assert!(session.prompt.is_none());

        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(100.0, 100.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);
        resolve_prompt(&mut session, Some("   ".into()));
        assert!(session.model.annotations().is_empty());
    }

    #[test]
    fn freehand_stroke_keeps_point_order() {
        let mut session = session_with(Tool::Freehand, AnnotationSet::new());
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(100.0, 100.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerMove(pos2(150.0, 120.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerMove(pos2(200.0, 150.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);

        assert!(session.prompt.is_none());
        let set = session.model.annotations();
        assert_eq!(set.len(), 1);
        let AnnotationKind::Freehand { points, .. } = &set.as_slice()[0].kind else {
            panic!("expected a freehand stroke");
        };
        assert_eq!(
            points,
            &vec![
                Point::new(0.1, 0.1),
                Point::new(0.15, 0.12),
                Point::new(0.2, 0.15)
            ]
        );
    }

    #[test]
    fn tap_without_movement_commits_single_point_stroke() {
        let mut session = session_with(Tool::Freehand, AnnotationSet::new());
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(500.0, 500.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);
        assert_eq!(session.model.annotations().len(), 1);
        assert!(session.model.annotations().as_slice()[0].is_zero_extent());
    }

    #[test]
    fn drag_moves_only_the_grabbed_text() {
        let other = dimension("d", (0.1, 0.9), (0.3, 0.9), "2ft");
        let mut session = session_with(
            Tool::Select,
            AnnotationSet::from(vec![text("t", (0.5, 0.5), "Door"), other.clone()]),
        );

        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(510.0, 490.0)));
        assert!(matches!(session.gesture, GestureState::Dragging(_)));
        assert_eq!(session.model.selected_id().map(|id| id.as_str()), Some("t"));

        handle_event(&mut session, &frame(), InputEvent::PointerMove(pos2(560.0, 470.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerMove(pos2(610.0, 440.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);

        let set = session.model.annotations();
        let AnnotationKind::Text { position, .. } = &set.as_slice()[0].kind else {
            panic!("expected text");
        };
        assert!(close(*position, Point::new(0.6, 0.45)));
        assert_eq!(set.as_slice()[1], other);
        assert!(matches!(session.gesture, GestureState::Idle));
    }

    #[test]
    fn resize_handle_moves_one_endpoint() {
        let mut session = session_with(
            Tool::Select,
            AnnotationSet::from(vec![dimension("d", (0.2, 0.2), (0.6, 0.2), "10ft")]),
        );
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(400.0, 200.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);

        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(605.0, 203.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerMove(pos2(700.0, 400.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);

        let AnnotationKind::Dimension { start, end, .. } =
            &session.model.annotations().as_slice()[0].kind
        else {
            panic!("expected a dimension");
        };
        assert_eq!(*start, Point::new(0.2, 0.2));
        assert!(close(*end, Point::new(0.7, 0.4)));
    }

    #[test]
    fn select_click_on_empty_space_clears_selection() {
        let mut session = session_with(
            Tool::Select,
            AnnotationSet::from(vec![text("t", (0.5, 0.5), "Door")]),
        );
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(510.0, 490.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);
        assert!(session.model.selected().is_some());

        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(50.0, 50.0)));
        assert!(session.model.selected().is_none());
        assert!(matches!(session.gesture, GestureState::Idle));
    }

    #[test]
    fn drawing_tool_ignores_existing_annotations() {
        let mut session = session_with(
            Tool::Freehand,
            AnnotationSet::from(vec![text("t", (0.5, 0.5), "Door")]),
        );
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(510.0, 490.0)));
        assert!(matches!(session.gesture, GestureState::Drawing(_)));
    }

    #[test]
    fn text_tool_prompts_and_creates_at_down_point() {
        let mut session = session_with(Tool::Text, AnnotationSet::new());
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(250.0, 750.0)));
        assert!(matches!(session.gesture, GestureState::Idle));

        // Input is blocked while the prompt is open.
        assert!(!handle_event(
            &mut session,
            &frame(),
            InputEvent::PointerDown(pos2(10.0, 10.0))
        ));

        resolve_prompt(&mut session, Some("North wall".into()));
        let AnnotationKind::Text { position, text, .. } =
            &session.model.annotations().as_slice()[0].kind
        else {
            panic!("expected text");
        };
        assert_eq!(*position, Point::new(0.25, 0.75));
        assert_eq!(text, "North wall");
    }

    #[test]
    fn prompt_keeps_surrounding_whitespace() {
        let mut session = session_with(Tool::Text, AnnotationSet::new());
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(250.0, 750.0)));
        resolve_prompt(&mut session, Some(" Door ".into()));
        let AnnotationKind::Text { text, .. } = &session.model.annotations().as_slice()[0].kind
        else {
            panic!("expected text");
        };
        assert_eq!(text, " Door ");

        let mut session = session_with(Tool::Dimension, AnnotationSet::new());
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(100.0, 100.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerMove(pos2(300.0, 100.0)));
        handle_event(&mut session, &frame(), InputEvent::PointerUp);
        resolve_prompt(&mut session, Some("12 ft ".into()));
        let AnnotationKind::Dimension { label, .. } =
            &session.model.annotations().as_slice()[0].kind
        else {
            panic!("expected a dimension");
        };
        assert_eq!(label, "12 ft ");
    }

    #[test]
    fn two_finger_pan_moves_viewport_by_midpoint_delta() {
        let mut session = session_with(Tool::Select, AnnotationSet::new());
        session.viewport.zoom_by(1.0);
        handle_event(&mut session, &frame(), InputEvent::TwoFingerStart(pos2(100.0, 100.0)));
        handle_event(&mut session, &frame(), InputEvent::TwoFingerMove(pos2(130.0, 90.0)));
        handle_event(&mut session, &frame(), InputEvent::TwoFingerMove(pos2(140.0, 95.0)));
        handle_event(&mut session, &frame(), InputEvent::TwoFingerEnd);
        assert_eq!(session.viewport.offset, vec2(40.0, -5.0));
        assert!(matches!(session.gesture, GestureState::Idle));
    }

    #[test]
    fn second_finger_abandons_a_draw() {
        let mut session = session_with(Tool::Freehand, AnnotationSet::new());
        handle_event(&mut session, &frame(), InputEvent::PointerDown(pos2(100.0, 100.0)));
        handle_event(&mut session, &frame(), InputEvent::TwoFingerStart(pos2(150.0, 150.0)));
        handle_event(&mut session, &frame(), InputEvent::TwoFingerEnd);
        handle_event(&mut session, &frame(), InputEvent::PointerUp);
        assert!(session.model.annotations().is_empty());
    }

    #[test]
    fn wheel_pans_only_when_zoomed_and_zooms_with_modifier() {
        let mut session = session_with(Tool::Select, AnnotationSet::new());
        let wheel = InputEvent::Wheel {
            delta: vec2(0.0, 30.0),
            zoom: false,
        };
        assert!(!handle_event(&mut session, &frame(), wheel));
        assert_eq!(session.viewport.offset, vec2(0.0, 0.0));

        handle_event(
            &mut session,
            &frame(),
            InputEvent::Wheel {
                delta: vec2(0.0, -1000.0),
                zoom: true,
            },
        );
        assert_eq!(session.viewport.scale, 2.0);

        assert!(handle_event(&mut session, &frame(), wheel));
        assert_eq!(session.viewport.offset, vec2(0.0, -30.0));
    }
}
