use egui::{
    vec2, Align2, Color32, Context, CursorIcon, FontId, Key, MouseWheelUnit, Painter, Pos2, Rect,
    Response, Sense, Shape, Stroke, Ui, Vec2,
};

use crate::annotation::Tool;
use crate::geometry::fit_rect;
use crate::gesture::{self, CanvasFrame, InputEvent, PromptKind};
use crate::render::{build_scene, Primitive, RenderMode, RenderParams, TextAlign, GLOW, HALO};
use crate::state::{EditorSession, PhotoImage};
use crate::theme;
use crate::ui_controls;

const CANVAS_MARGIN: f32 = 24.0;
/// Descent below the baseline as a fraction of the font size.
const DESCENT: f32 = 0.25;

/// Per-window input bookkeeping that egui does not keep for us.
#[derive(Default)]
pub struct CanvasInput {
    /// Synthetic midpoint of an ongoing two-finger gesture.
    two_finger: Option<Pos2>,
}

pub fn show_canvas(
    ui: &mut Ui,
    ctx: &Context,
    session: &mut EditorSession,
    photo: &mut PhotoImage,
    input: &mut CanvasInput,
) {
    let texture_id = photo.ensure_texture(ctx, "sitemark-photo").id();
    let image_size = photo.size_vec2();

    let (canvas_rect, response) =
        ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    let fit = fit_rect(image_size, canvas_rect.shrink(CANVAS_MARGIN));

    for event in collect_events(ctx, &response, canvas_rect, input) {
        let frame = CanvasFrame {
            image_rect: session.viewport.apply(fit),
        };
        gesture::handle_event(session, &frame, event);
    }

    let shown = session.viewport.apply(fit);
    let painter = ui.painter_at(canvas_rect);
    draw_canvas_background(&painter, canvas_rect);
    painter.image(
        texture_id,
        shown,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );

    let pending_label = session.prompt.as_ref().and_then(|prompt| match &prompt.kind {
        PromptKind::DimensionLabel(draft) => Some(draft),
        _ => None,
    });
    let drafts = session.gesture.draft().into_iter().chain(pending_label);
    let scene = build_scene(
        session.model.annotations().iter().chain(drafts),
        RenderParams {
            overlay: shown,
            zoom: session.viewport.scale,
        },
        RenderMode::Editor {
            selected: session.model.selected_id(),
            handles: session.tool == Tool::Select,
        },
    );
    paint_scene(&painter, &scene);

    if response.hovered() {
        ctx.set_cursor_icon(match session.tool {
            Tool::Select if session.viewport.can_pan() => CursorIcon::Grab,
            Tool::Select => CursorIcon::Default,
            Tool::Text => CursorIcon::Text,
            Tool::Dimension | Tool::Freehand => CursorIcon::Crosshair,
        });
    }

    show_prompt(ctx, session);
}

/// Points scrolled per wheel line, matching egui's own line scrolling.
const POINTS_PER_WHEEL_LINE: f32 = 50.0;

/// Two or more touches seen this frame.
#[derive(Clone, Copy, Debug)]
struct TouchSample {
    start_pos: Pos2,
    translation_delta: Vec2,
    zoom_delta: f32,
}

/// One frame of raw egui input, copied out so it can be translated without
/// holding the input lock.
#[derive(Clone, Debug, Default)]
struct FrameInput {
    hovered: bool,
    touch: Option<TouchSample>,
    /// Wheel deltas in egui convention (positive y scrolls up) with whether
    /// Ctrl/Cmd was held.
    wheel: Vec<(Vec2, bool)>,
    /// Trackpad pinch ratio reported by the platform.
    zoom_delta: f32,
    pressed: bool,
    held: bool,
    released: bool,
    press_origin: Option<Pos2>,
    latest: Option<Pos2>,
    moved: bool,
}

fn read_frame_input(ctx: &Context, response: &Response, canvas_rect: Rect) -> FrameInput {
    let touch = ctx
        .multi_touch()
        .filter(|touch| touch.num_touches >= 2)
        .map(|touch| TouchSample {
            start_pos: touch.start_pos,
            translation_delta: touch.translation_delta,
            zoom_delta: touch.zoom_delta,
        });

    ctx.input(|i| FrameInput {
        hovered: response.hovered(),
        touch,
        wheel: i
            .events
            .iter()
            .filter_map(|event| match event {
                egui::Event::MouseWheel {
                    unit,
                    delta,
                    modifiers,
                } => {
                    let scale = match unit {
                        MouseWheelUnit::Point => 1.0,
                        MouseWheelUnit::Line => POINTS_PER_WHEEL_LINE,
                        MouseWheelUnit::Page => canvas_rect.height(),
                    };
                    Some((*delta * scale, modifiers.command || modifiers.ctrl))
                }
                _ => None,
            })
            .collect(),
        zoom_delta: i.zoom_delta(),
        pressed: i.pointer.primary_pressed(),
        held: i.pointer.primary_down(),
        released: i.pointer.primary_released(),
        press_origin: i.pointer.press_origin(),
        latest: i.pointer.latest_pos(),
        moved: i.pointer.delta() != Vec2::ZERO,
    })
}

fn collect_events(
    ctx: &Context,
    response: &Response,
    canvas_rect: Rect,
    input: &mut CanvasInput,
) -> Vec<InputEvent> {
    translate_input(&read_frame_input(ctx, response, canvas_rect), canvas_rect, input)
}

/// Reduces one frame of raw input to recognizer events.
fn translate_input(frame: &FrameInput, canvas_rect: Rect, input: &mut CanvasInput) -> Vec<InputEvent> {
    let mut events = Vec::new();

    if let Some(touch) = frame.touch {
        let midpoint = match input.two_finger {
            Some(midpoint) => midpoint + touch.translation_delta,
            None => {
                events.push(InputEvent::TwoFingerStart(touch.start_pos));
                touch.start_pos + touch.translation_delta
            }
        };
        input.two_finger = Some(midpoint);
        events.push(InputEvent::TwoFingerMove(midpoint));
        if touch.zoom_delta != 1.0 {
            events.push(InputEvent::Pinch(touch.zoom_delta));
        }
        return events;
    }
    if input.two_finger.take().is_some() {
        events.push(InputEvent::TwoFingerEnd);
    }

    if frame.hovered {
        // egui folds Ctrl/Cmd + wheel into zoom_delta too; the wheel event wins.
        if frame.wheel.is_empty() && frame.zoom_delta != 1.0 {
            events.push(InputEvent::Pinch(frame.zoom_delta));
        }
        for &(delta, zoom) in &frame.wheel {
            events.push(InputEvent::Wheel {
                delta: -delta,
                zoom,
            });
        }
    }

    if frame.pressed {
        if let Some(origin) = frame.press_origin.filter(|pos| canvas_rect.contains(*pos)) {
            events.push(InputEvent::PointerDown(origin));
        }
    }
    if frame.held && frame.moved {
        if let Some(pos) = frame.latest {
            events.push(InputEvent::PointerMove(pos));
        }
    }
    if frame.released {
        events.push(InputEvent::PointerUp);
    }

    events
}

pub fn draw_canvas_background(painter: &Painter, rect: Rect) {
    let theme = theme::field_dark_theme();
    painter.rect_filled(rect, 16.0, theme.surfaces.canvas_bg);
    painter.rect_stroke(rect, 16.0, Stroke::new(1.0, theme.surfaces.stroke_soft));
}

/// Paints a scene produced by [`build_scene`].
pub fn paint_scene(painter: &Painter, scene: &[Primitive]) {
    for primitive in scene {
        match primitive {
            Primitive::Line {
                from,
                to,
                width,
                color,
            } => {
                painter.line_segment([*from, *to], Stroke::new(*width, *color));
            }
            Primitive::Polyline {
                points,
                width,
                color,
            } => {
                if let [only] = points.as_slice() {
                    painter.circle_filled(*only, width / 2.0, *color);
                } else {
                    painter.add(Shape::line(points.clone(), Stroke::new(*width, *color)));
                }
            }
            Primitive::Dot {
                center,
                radius,
                color,
            } => {
                painter.circle_filled(*center, *radius, *color);
            }
            Primitive::Text {
                anchor,
                align,
                text,
                size,
                color,
            } => paint_text(painter, *anchor, *align, text, *size, *color),
            Primitive::Glow { points, width } => {
                painter.add(Shape::line(points.clone(), Stroke::new(*width, GLOW)));
            }
            Primitive::Handle {
                center,
                radius,
                outline,
            } => {
                painter.circle_filled(*center, *radius, Color32::from_white_alpha(150));
                painter.circle_stroke(*center, *radius, Stroke::new(2.0, *outline));
            }
        }
    }
}

fn paint_text(
    painter: &Painter,
    anchor: Pos2,
    align: TextAlign,
    text: &str,
    size: f32,
    color: Color32,
) {
    if text.is_empty() {
        return;
    }
    let align = match align {
        TextAlign::Start => Align2::LEFT_BOTTOM,
        TextAlign::Middle => Align2::CENTER_BOTTOM,
    };
    let pos = anchor + vec2(0.0, size * DESCENT);
    let font = FontId::proportional(size.max(1.0));
    for offset in [vec2(-1.0, -1.0), vec2(1.0, -1.0), vec2(-1.0, 1.0), vec2(1.0, 1.0)] {
        painter.text(pos + offset, align, text, font.clone(), HALO);
    }
    painter.text(pos, align, text, font, color);
}

/// Modal string prompt. Blocks canvas input until answered or dismissed.
fn show_prompt(ctx: &Context, session: &mut EditorSession) {
    let Some(prompt) = session.prompt.as_mut() else {
        return;
    };
    let theme = theme::field_dark_theme();
    let title = prompt.title();
    let mut answer: Option<Option<String>> = None;

    egui::Window::new(title)
        .id(egui::Id::new("sitemark_prompt"))
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(Align2::CENTER_CENTER, vec2(0.0, 0.0))
        .frame(ui_controls::card_frame(&theme))
        .show(ctx, |ui| {
            ui.set_min_width(320.0);
            ui.label(egui::RichText::new(title).strong());
            ui.add_space(theme.layout.space_2);
            let edit = ui.add(
                egui::TextEdit::singleline(&mut prompt.buffer).desired_width(f32::INFINITY),
            );
            edit.request_focus();
            ui.add_space(theme.layout.space_2);
            ui.horizontal(|ui| {
                let size = vec2(88.0, theme.controls.action_height);
                if ui_controls::primary_button(ui, &theme, "OK", size).clicked() {
                    answer = Some(Some(prompt.buffer.clone()));
                }
                if ui_controls::ghost_button(ui, &theme, "Cancel", size).clicked() {
                    answer = Some(None);
                }
            });
            if ui.input(|i| i.key_pressed(Key::Enter)) {
                answer = Some(Some(prompt.buffer.clone()));
            }
            if ui.input(|i| i.key_pressed(Key::Escape)) {
                answer = Some(None);
            }
        });

    if let Some(answer) = answer {
        gesture::resolve_prompt(session, answer);
    }
}

#[cfg(test)]
mod tests {
    use egui::{pos2, vec2, Rect};

    use super::{translate_input, CanvasInput, FrameInput, TouchSample};
    use crate::gesture::{self, CanvasFrame, InputEvent};
    use crate::model::AnnotationSet;
    use crate::state::{EditorSession, ToolStyle};

    fn canvas() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0))
    }

    fn hovered() -> FrameInput {
        FrameInput {
            hovered: true,
            zoom_delta: 1.0,
            ..FrameInput::default()
        }
    }

    #[test]
    fn ctrl_wheel_becomes_a_zooming_wheel_event() {
        let frame = FrameInput {
            wheel: vec![(vec2(0.0, 100.0), true)],
            // egui reports the same ctrl+wheel as a zoom ratio as well.
            zoom_delta: 1.2,
            ..hovered()
        };
        let events = translate_input(&frame, canvas(), &mut CanvasInput::default());
        assert_eq!(
            events,
            vec![InputEvent::Wheel {
                delta: vec2(0.0, -100.0),
                zoom: true,
            }]
        );

        let mut session = EditorSession::new(AnnotationSet::new(), ToolStyle::default());
        let image = CanvasFrame { image_rect: canvas() };
        for event in events {
            gesture::handle_event(&mut session, &image, event);
        }
        // scale + (-deltaY * 0.001) * scale with deltaY = -100
        assert!((session.viewport.scale - 1.1).abs() < 1e-5);
    }

    #[test]
    fn plain_wheel_pans_and_trackpad_pinch_zooms() {
        let frame = FrameInput {
            wheel: vec![(vec2(0.0, -30.0), false)],
            ..hovered()
        };
        assert_eq!(
            translate_input(&frame, canvas(), &mut CanvasInput::default()),
            vec![InputEvent::Wheel {
                delta: vec2(0.0, 30.0),
                zoom: false,
            }]
        );

        let pinch = FrameInput {
            zoom_delta: 1.5,
            ..hovered()
        };
        assert_eq!(
            translate_input(&pinch, canvas(), &mut CanvasInput::default()),
            vec![InputEvent::Pinch(1.5)]
        );
    }

    #[test]
    fn wheel_outside_the_canvas_is_ignored() {
        let frame = FrameInput {
            hovered: false,
            wheel: vec![(vec2(0.0, 100.0), true)],
            ..hovered()
        };
        assert!(translate_input(&frame, canvas(), &mut CanvasInput::default()).is_empty());
    }

    #[test]
    fn two_finger_midpoint_is_tracked_across_frames() {
        let mut input = CanvasInput::default();
        let touch = |dx: f32| FrameInput {
            touch: Some(TouchSample {
                start_pos: pos2(100.0, 100.0),
                translation_delta: vec2(dx, 0.0),
                zoom_delta: 1.0,
            }),
            ..hovered()
        };
        assert_eq!(
            translate_input(&touch(0.0), canvas(), &mut input),
            vec![
                InputEvent::TwoFingerStart(pos2(100.0, 100.0)),
                InputEvent::TwoFingerMove(pos2(100.0, 100.0)),
            ]
        );
        assert_eq!(
            translate_input(&touch(10.0), canvas(), &mut input),
            vec![InputEvent::TwoFingerMove(pos2(110.0, 100.0))]
        );
        assert_eq!(
            translate_input(&hovered(), canvas(), &mut input),
            vec![InputEvent::TwoFingerEnd]
        );
    }

    #[test]
    fn press_outside_the_canvas_does_not_start_a_gesture() {
        let frame = FrameInput {
            pressed: true,
            held: true,
            press_origin: Some(pos2(900.0, 50.0)),
            ..hovered()
        };
        assert!(translate_input(&frame, canvas(), &mut CanvasInput::default()).is_empty());
    }
}
