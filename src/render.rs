//! Turns an annotation set into a flat list of drawing primitives in screen
//! space.
//!
//! The editor canvas, the read-only viewers and the image exporter all paint
//! from the same scene, so placement is identical everywhere for the same
//! normalized data and overlay box.

use egui::{vec2, Color32, Pos2, Rect, Vec2};

use crate::annotation::{text_bounds, Annotation, AnnotationId, AnnotationKind, HANDLE_RADIUS};
use crate::geometry::to_screen;

/// Distance between a dimension line and its label, before zoom.
pub const LABEL_OFFSET: f32 = 10.0;
pub const LABEL_SCALE: f32 = 0.7;
const GLOW_EXTRA_WIDTH: f32 = 8.0;

pub const HALO: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 170);
pub const GLOW: Color32 = Color32::from_rgba_premultiplied(110, 110, 110, 110);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlign {
    /// Anchor is the left end of the baseline.
    Start,
    /// Anchor is the middle of the baseline.
    Middle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Line {
        from: Pos2,
        to: Pos2,
        width: f32,
        color: Color32,
    },
    Polyline {
        points: Vec<Pos2>,
        width: f32,
        color: Color32,
    },
    Dot {
        center: Pos2,
        radius: f32,
        color: Color32,
    },
    Text {
        anchor: Pos2,
        align: TextAlign,
        text: String,
        size: f32,
        color: Color32,
    },
    /// Selection feedback painted under the selected annotation.
    Glow { points: Vec<Pos2>, width: f32 },
    /// Resize handle of the selected dimension.
    Handle {
        center: Pos2,
        radius: f32,
        outline: Color32,
    },
}

impl Primitive {
    pub fn is_editor_only(&self) -> bool {
        matches!(self, Self::Glow { .. } | Self::Handle { .. })
    }

    /// Reference position used to compare placements across overlay sizes.
    pub fn anchor(&self) -> Pos2 {
        match self {
            Self::Line { from, .. } => *from,
            Self::Polyline { points, .. } | Self::Glow { points, .. } => {
                points.first().copied().unwrap_or(Pos2::ZERO)
            }
            Self::Dot { center, .. } | Self::Handle { center, .. } => *center,
            Self::Text { anchor, .. } => *anchor,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum RenderMode<'a> {
    /// Interactive editor: selection feedback for `selected`, plus resize
    /// handles when `handles` is set (only the select tool can use them).
    Editor {
        selected: Option<&'a AnnotationId>,
        handles: bool,
    },
    /// Detail and share viewers.
    Static,
}

#[derive(Clone, Copy, Debug)]
pub struct RenderParams {
    /// Box the normalized coordinates are stretched over.
    pub overlay: Rect,
    /// Scale the whole drawing is shown at. Sizes follow it, except freehand
    /// strokes which keep a constant on-screen width.
    pub zoom: f32,
}

pub fn build_scene<'a>(
    annotations: impl IntoIterator<Item = &'a Annotation>,
    params: RenderParams,
    mode: RenderMode<'_>,
) -> Vec<Primitive> {
    let mut scene = Vec::new();
    for annotation in annotations {
        let (selected, handles) = match mode {
            RenderMode::Editor { selected, handles } => {
                let selected = selected == Some(&annotation.id);
                (selected, selected && handles)
            }
            RenderMode::Static => (false, false),
        };
        push_annotation(&mut scene, annotation, params, selected, handles);
    }
    scene
}

fn push_annotation(
    scene: &mut Vec<Primitive>,
    annotation: &Annotation,
    params: RenderParams,
    selected: bool,
    handles: bool,
) {
    let color = annotation.color.color32();
    let zoom = params.zoom;
    let line_width = annotation.line_width() as f32;
    let font_size = annotation.font_size() as f32;

    match &annotation.kind {
        AnnotationKind::Dimension {
            start, end, label, ..
        } => {
            let from = to_screen(*start, params.overlay);
            let to = to_screen(*end, params.overlay);
            let width = line_width * zoom;
            if selected {
                scene.push(Primitive::Glow {
                    points: vec![from, to],
                    width: width + GLOW_EXTRA_WIDTH,
                });
            }
            scene.push(Primitive::Line {
                from,
                to,
                width,
                color,
            });
            for center in [from, to] {
                scene.push(Primitive::Dot {
                    center,
                    radius: (line_width + 2.0) * zoom,
                    color,
                });
            }
            scene.push(Primitive::Text {
                anchor: label_anchor(from, to, LABEL_OFFSET * zoom),
                align: TextAlign::Middle,
                text: label.clone(),
                size: font_size * LABEL_SCALE * zoom,
                color,
            });
            if handles {
                for center in [from, to] {
                    scene.push(Primitive::Handle {
                        center,
                        radius: HANDLE_RADIUS,
                        outline: color,
                    });
                }
            }
        }
        AnnotationKind::Text { position, text, .. } => {
            if selected {
                let bounds = text_bounds(*position, text, f64::from(font_size), params.overlay, zoom);
                scene.push(Primitive::Glow {
                    points: rect_outline(bounds.expand(3.0)),
                    width: 2.0,
                });
            }
            scene.push(Primitive::Text {
                anchor: to_screen(*position, params.overlay),
                align: TextAlign::Start,
                text: text.clone(),
                size: font_size * zoom,
                color,
            });
        }
        AnnotationKind::Freehand { points, .. } => {
            let screen: Vec<Pos2> = points
                .iter()
                .map(|point| to_screen(*point, params.overlay))
                .collect();
            if selected {
                scene.push(Primitive::Glow {
                    points: screen.clone(),
                    width: line_width + GLOW_EXTRA_WIDTH,
                });
            }
            scene.push(Primitive::Polyline {
                points: screen,
                width: line_width,
                color,
            });
        }
    }
}

/// Midpoint of the line pushed `offset` pixels along the perpendicular that
/// points up the screen.
pub fn label_anchor(from: Pos2, to: Pos2, offset: f32) -> Pos2 {
    let mid = from + (to - from) * 0.5;
    let dir = to - from;
    let len = dir.length();
    if len <= f32::EPSILON {
        return mid - vec2(0.0, offset);
    }
    let unit = dir / len;
    let perp_a = vec2(-unit.y, unit.x);
    let perp_b = vec2(unit.y, -unit.x);
    let up: Vec2 = if perp_a.y < perp_b.y { perp_a } else { perp_b };
    mid + up * offset
}

fn rect_outline(rect: Rect) -> Vec<Pos2> {
    vec![
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
        rect.left_top(),
    ]
}

#[cfg(test)]
mod tests {
    use egui::{pos2, vec2, Pos2, Rect};

    use super::{build_scene, label_anchor, Primitive, RenderMode, RenderParams, TextAlign};
    use crate::annotation::fixtures::{dimension, freehand, text};
    use crate::annotation::{Annotation, AnnotationId};

    fn sample() -> Vec<Annotation> {
        vec![
            dimension("d", (0.2, 0.2), (0.6, 0.2), "10ft"),
            text("t", (0.5, 0.5), "Door"),
            freehand("f", &[(0.1, 0.1), (0.15, 0.12), (0.2, 0.15)]),
        ]
    }

    fn relative(pos: Pos2, overlay: Rect) -> (f32, f32) {
        (
            (pos.x - overlay.left()) / overlay.width(),
            (pos.y - overlay.top()) / overlay.height(),
        )
    }

    #[test]
    fn placement_is_invariant_across_overlay_sizes() {
        let small = Rect::from_min_size(pos2(10.0, 20.0), vec2(400.0, 300.0));
        let large = Rect::from_min_size(pos2(0.0, 0.0), vec2(1600.0, 1200.0));
        let annotations = sample();

        let geometric = |p: &&Primitive| !matches!(p, Primitive::Text { align: TextAlign::Middle, .. });
        let a: Vec<Primitive> = build_scene(
            &annotations,
            RenderParams { overlay: small, zoom: 1.0 },
            RenderMode::Static,
        );
        let b: Vec<Primitive> = build_scene(
            &annotations,
            RenderParams { overlay: large, zoom: 1.0 },
            RenderMode::Static,
        );
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().filter(geometric).zip(b.iter().filter(geometric)) {
            let (ax, ay) = relative(pa.anchor(), small);
            let (bx, by) = relative(pb.anchor(), large);
            assert!((ax - bx).abs() < 1e-4, "{pa:?} vs {pb:?}");
            assert!((ay - by).abs() < 1e-4, "{pa:?} vs {pb:?}");
        }
    }

    #[test]
    fn static_scene_is_editor_scene_without_feedback() {
        let overlay = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        let params = RenderParams { overlay, zoom: 1.0 };
        let annotations = sample();
        for id in ["d", "t", "f"] {
            let selected = AnnotationId::from(id);
            let editor = build_scene(
                &annotations,
                params,
                RenderMode::Editor {
                    selected: Some(&selected),
                    handles: true,
                },
            );
            let stripped: Vec<Primitive> =
                editor.iter().filter(|p| !p.is_editor_only()).cloned().collect();
            assert!(editor.len() > stripped.len());
            assert_eq!(stripped, build_scene(&annotations, params, RenderMode::Static));
        }
    }

    #[test]
    fn selected_dimension_gets_two_handles() {
        let overlay = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        let annotations = sample();
        let selected = AnnotationId::from("d");
        let scene = build_scene(
            &annotations,
            RenderParams { overlay, zoom: 1.0 },
            RenderMode::Editor {
                selected: Some(&selected),
                handles: true,
            },
        );
        assert_eq!(handle_centers(&scene), vec![pos2(20.0, 20.0), pos2(60.0, 20.0)]);
    }

    #[test]
    fn handles_hidden_outside_the_select_tool() {
        let overlay = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        let annotations = sample();
        let selected = AnnotationId::from("d");
        let scene = build_scene(
            &annotations,
            RenderParams { overlay, zoom: 1.0 },
            RenderMode::Editor {
                selected: Some(&selected),
                handles: false,
            },
        );
        assert!(handle_centers(&scene).is_empty());
        assert!(scene.iter().any(|p| matches!(p, Primitive::Glow { .. })));
    }

    fn handle_centers(scene: &[Primitive]) -> Vec<Pos2> {
        scene
            .iter()
            .filter_map(|p| match p {
                Primitive::Handle { center, .. } => Some(*center),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn freehand_width_ignores_zoom_while_dimension_width_follows_it() {
        let overlay = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        let annotations = sample();
        let scene = build_scene(
            &annotations,
            RenderParams { overlay, zoom: 3.0 },
            RenderMode::Static,
        );
        for primitive in &scene {
            match primitive {
                Primitive::Line { width, .. } => assert_eq!(*width, 15.0),
                Primitive::Polyline { width, .. } => assert_eq!(*width, 5.0),
                _ => {}
            }
        }
    }

    #[test]
    fn label_sits_above_horizontal_line() {
        let anchor = label_anchor(pos2(0.0, 100.0), pos2(200.0, 100.0), 10.0);
        assert_eq!(anchor, pos2(100.0, 90.0));

        let degenerate = label_anchor(pos2(50.0, 50.0), pos2(50.0, 50.0), 10.0);
        assert_eq!(degenerate, pos2(50.0, 40.0));
    }
}
