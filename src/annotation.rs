use std::fmt;

use egui::{Color32, Pos2, Rect, Vec2};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::geometry::{to_screen, Point};

pub const DEFAULT_FONT_SIZE: f64 = 24.0;
pub const DEFAULT_LINE_WIDTH: f64 = 5.0;

/// Width of the invisible stroke that accepts pointer input around lines, in
/// screen pixels. Independent of the visible stroke so thin lines stay easy to
/// grab.
pub const HIT_STROKE_WIDTH: f32 = 30.0;
pub const HANDLE_RADIUS: f32 = 15.0;

pub const PALETTE: [&str; 6] = [
    "#FFFF00", "#FF0000", "#00FFFF", "#00FF00", "#FFFFFF", "#000000",
];
pub const FONT_SIZE_CHOICES: [f64; 5] = [16.0, 24.0, 32.0, 48.0, 64.0];
pub const LINE_WIDTH_CHOICES: [f64; 5] = [3.0, 5.0, 8.0, 12.0, 20.0];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Tool {
    Select,
    Dimension,
    Text,
    Freehand,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Select, Tool::Dimension, Tool::Text, Tool::Freehand];

    pub fn label(self) -> &'static str {
        match self {
            Self::Select => "Select",
            Self::Dimension => "Measure",
            Self::Text => "Text",
            Self::Freehand => "Draw",
        }
    }

    pub fn uses_font_size(self) -> bool {
        matches!(self, Self::Dimension | Self::Text)
    }

    pub fn uses_line_width(self) -> bool {
        matches!(self, Self::Dimension | Self::Freehand)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    pub fn generate() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self(raw[..12].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Color as stored on the wire (`#RRGGBB`). The string is kept verbatim so a
/// value written by another producer survives a load/save cycle untouched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA`. Anything else falls back to
    /// the first palette entry.
    pub fn rgba(&self) -> [u8; 4] {
        parse_hex(&self.0).unwrap_or([0xFF, 0xFF, 0x00, 0xFF])
    }

    pub fn color32(&self) -> Color32 {
        let [r, g, b, a] = self.rgba();
        Color32::from_rgba_unmultiplied(r, g, b, a)
    }

    pub fn is(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(PALETTE[0])
    }
}

fn parse_hex(value: &str) -> Option<[u8; 4]> {
    let hex = value.trim().strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0xFF; 4];
            for (idx, ch) in hex.chars().enumerate() {
                let v = ch.to_digit(16)? as u8;
                out[idx] = v * 17;
            }
            Some(out)
        }
        6 | 8 => {
            let r = channel(hex.get(0..2)?)?;
            let g = channel(hex.get(2..4)?)?;
            let b = channel(hex.get(4..6)?)?;
            let a = if hex.len() == 8 {
                channel(hex.get(6..8)?)?
            } else {
                0xFF
            };
            Some([r, g, b, a])
        }
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    Start,
    End,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub color: Color,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Dimension {
        start: Point,
        end: Point,
        label: String,
        #[serde(rename = "fontSize", default, skip_serializing_if = "Option::is_none")]
        font_size: Option<f64>,
        #[serde(rename = "lineWidth", default, skip_serializing_if = "Option::is_none")]
        line_width: Option<f64>,
    },
    Text {
        position: Point,
        text: String,
        #[serde(rename = "fontSize", default, skip_serializing_if = "Option::is_none")]
        font_size: Option<f64>,
    },
    Freehand {
        #[serde(deserialize_with = "non_empty_points")]
        points: Vec<Point>,
        #[serde(rename = "lineWidth", default, skip_serializing_if = "Option::is_none")]
        line_width: Option<f64>,
    },
}

fn non_empty_points<'de, D>(deserializer: D) -> Result<Vec<Point>, D::Error>
where
    D: Deserializer<'de>,
{
    let points = Vec::<Point>::deserialize(deserializer)?;
    if points.is_empty() {
        return Err(D::Error::custom("freehand stroke needs at least one point"));
    }
    Ok(points)
}

/// Partial update applied through the properties panel. Fields that do not
/// apply to the target's kind are ignored; the kind itself never changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationPatch {
    pub color: Option<Color>,
    pub font_size: Option<f64>,
    pub line_width: Option<f64>,
    pub text: Option<String>,
    pub label: Option<String>,
}

impl AnnotationPatch {
    pub fn color(color: Color) -> Self {
        Self {
            color: Some(color),
            ..Self::default()
        }
    }

    pub fn font_size(size: f64) -> Self {
        Self {
            font_size: Some(size),
            ..Self::default()
        }
    }

    pub fn line_width(width: f64) -> Self {
        Self {
            line_width: Some(width),
            ..Self::default()
        }
    }
}

impl Annotation {
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            AnnotationKind::Dimension { .. } => "dimension",
            AnnotationKind::Text { .. } => "text",
            AnnotationKind::Freehand { .. } => "freehand",
        }
    }

    pub fn font_size(&self) -> f64 {
        match &self.kind {
            AnnotationKind::Dimension { font_size, .. } | AnnotationKind::Text { font_size, .. } => {
                font_size.unwrap_or(DEFAULT_FONT_SIZE)
            }
            AnnotationKind::Freehand { .. } => DEFAULT_FONT_SIZE,
        }
    }

    pub fn line_width(&self) -> f64 {
        match &self.kind {
            AnnotationKind::Dimension { line_width, .. }
            | AnnotationKind::Freehand { line_width, .. } => {
                line_width.unwrap_or(DEFAULT_LINE_WIDTH)
            }
            AnnotationKind::Text { .. } => DEFAULT_LINE_WIDTH,
        }
    }

    pub fn same_kind(&self, other: &Annotation) -> bool {
        std::mem::discriminant(&self.kind) == std::mem::discriminant(&other.kind)
    }

    /// Whether the annotation collapses to a single point.
    pub fn is_zero_extent(&self) -> bool {
        match &self.kind {
            AnnotationKind::Dimension { start, end, .. } => start == end,
            AnnotationKind::Freehand { points, .. } => points.windows(2).all(|w| w[0] == w[1]),
            AnnotationKind::Text { .. } => false,
        }
    }

    pub fn apply_patch(&mut self, patch: &AnnotationPatch) -> bool {
        let before = self.clone();
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        match &mut self.kind {
            AnnotationKind::Dimension {
                label,
                font_size,
                line_width,
                ..
            } => {
                if let Some(size) = patch.font_size {
                    *font_size = Some(size);
                }
                if let Some(width) = patch.line_width {
                    *line_width = Some(width);
                }
                if let Some(new_label) = &patch.label {
                    *label = new_label.clone();
                }
            }
            AnnotationKind::Text {
                text, font_size, ..
            } => {
                if let Some(size) = patch.font_size {
                    *font_size = Some(size);
                }
                if let Some(new_text) = &patch.text {
                    *text = new_text.clone();
                }
            }
            AnnotationKind::Freehand { line_width, .. } => {
                if let Some(width) = patch.line_width {
                    *line_width = Some(width);
                }
            }
        }
        *self != before
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        match &mut self.kind {
            AnnotationKind::Dimension { start, end, .. } => {
                *start = start.offset(dx, dy);
                *end = end.offset(dx, dy);
            }
            AnnotationKind::Text { position, .. } => *position = position.offset(dx, dy),
            AnnotationKind::Freehand { points, .. } => {
                for point in points.iter_mut() {
                    *point = point.offset(dx, dy);
                }
            }
        }
    }

    pub fn handles(&self) -> Vec<(Handle, Point)> {
        match &self.kind {
            AnnotationKind::Dimension { start, end, .. } => {
                vec![(Handle::Start, *start), (Handle::End, *end)]
            }
            AnnotationKind::Text { .. } | AnnotationKind::Freehand { .. } => vec![],
        }
    }

    pub fn move_handle(&mut self, handle: Handle, to: Point) {
        if let AnnotationKind::Dimension { start, end, .. } = &mut self.kind {
            match handle {
                Handle::Start => *start = to,
                Handle::End => *end = to,
            }
        }
    }

    pub fn handle_at(&self, pos: Pos2, overlay: Rect) -> Option<Handle> {
        self.handles()
            .into_iter()
            .find(|(_, point)| to_screen(*point, overlay).distance(pos) <= HANDLE_RADIUS)
            .map(|(handle, _)| handle)
    }

    /// Hit test against the enlarged hit region, in screen space.
    pub fn hit_test(&self, pos: Pos2, overlay: Rect, zoom: f32) -> bool {
        let reach = HIT_STROKE_WIDTH * 0.5;
        match &self.kind {
            AnnotationKind::Dimension { start, end, .. } => {
                distance_to_segment(pos, to_screen(*start, overlay), to_screen(*end, overlay))
                    <= reach
            }
            AnnotationKind::Freehand { points, .. } => {
                let screen: Vec<Pos2> = points.iter().map(|p| to_screen(*p, overlay)).collect();
                match screen.as_slice() {
                    [single] => single.distance(pos) <= reach,
                    _ => screen
                        .windows(2)
                        .any(|w| distance_to_segment(pos, w[0], w[1]) <= reach),
                }
            }
            AnnotationKind::Text {
                position,
                text,
                font_size,
            } => text_bounds(
                *position,
                text,
                font_size.unwrap_or(DEFAULT_FONT_SIZE),
                overlay,
                zoom,
            )
            .contains(pos),
        }
    }
}

/// Conservative glyph box for a text annotation anchored on its baseline.
pub fn text_bounds(position: Point, text: &str, font_size: f64, overlay: Rect, zoom: f32) -> Rect {
    let size = font_size as f32 * zoom;
    let anchor = to_screen(position, overlay);
    let width = (text.chars().count().max(1) as f32 * size * 0.6).max(20.0);
    Rect::from_min_max(
        Pos2::new(anchor.x, anchor.y - size),
        Pos2::new(anchor.x + width, anchor.y + size * 0.25),
    )
}

pub fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab: Vec2 = b - a;
    let ap: Vec2 = point - a;
    let ab_len_sq = ab.length_sq();
    if ab_len_sq <= f32::EPSILON {
        return ap.length();
    }
    let t = (ap.dot(ab) / ab_len_sq).clamp(0.0, 1.0);
    let projection = a + ab * t;
    (point - projection).length()
}


#[cfg(test)]
mod tests {
    use egui::{pos2, vec2, Rect};

    use super::fixtures::{dimension, freehand, text};
    use super::{Annotation, AnnotationKind, AnnotationPatch, Color, Handle};

    fn overlay() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(1000.0, 500.0))
    }

    #[test]
    fn dimension_hit_region_is_wider_than_the_line() {
        let annotation = dimension("a", (0.1, 0.5), (0.9, 0.5), "10ft");
        assert!(annotation.hit_test(pos2(500.0, 262.0), overlay(), 1.0));
        assert!(!annotation.hit_test(pos2(500.0, 280.0), overlay(), 1.0));
    }

    #[test]
    fn single_point_freehand_is_hittable() {
        let annotation = freehand("f", &[(0.5, 0.5)]);
        assert!(annotation.hit_test(pos2(505.0, 250.0), overlay(), 1.0));
        assert!(!annotation.hit_test(pos2(560.0, 250.0), overlay(), 1.0));
    }

    #[test]
    fn text_hit_uses_glyph_box_above_baseline() {
        let annotation = text("t", (0.5, 0.5), "Beam");
        assert!(annotation.hit_test(pos2(510.0, 240.0), overlay(), 1.0));
        assert!(!annotation.hit_test(pos2(490.0, 240.0), overlay(), 1.0));
    }

    #[test]
    fn handles_exist_only_on_dimensions() {
        let line = dimension("a", (0.1, 0.1), (0.2, 0.2), "x");
        assert_eq!(line.handle_at(pos2(200.0, 100.0), overlay()), Some(Handle::End));
        assert_eq!(line.handle_at(pos2(100.0, 50.0), overlay()), Some(Handle::Start));
        assert!(text("t", (0.1, 0.1), "x").handles().is_empty());
        assert!(freehand("f", &[(0.1, 0.1)]).handles().is_empty());
    }

    #[test]
    fn move_by_shifts_every_point() {
        let mut stroke = freehand("f", &[(0.1, 0.1), (0.2, 0.3)]);
        stroke.move_by(0.05, -0.05);
        let AnnotationKind::Freehand { points, .. } = &stroke.kind else {
            panic!("kind changed");
        };
        assert!((points[0].x - 0.15).abs() < 1e-12);
        assert!((points[1].y - 0.25).abs() < 1e-12);
    }

    #[test]
    fn patch_ignores_fields_foreign_to_the_kind() {
        let mut stroke = freehand("f", &[(0.1, 0.1)]);
        let changed = stroke.apply_patch(&AnnotationPatch {
            font_size: Some(48.0),
            text: Some("nope".into()),
            ..AnnotationPatch::default()
        });
        assert!(!changed);

        let mut label = text("t", (0.5, 0.5), "old");
        assert!(label.apply_patch(&AnnotationPatch {
            color: Some(Color::new("#000000")),
            text: Some("new".into()),
            ..AnnotationPatch::default()
        }));
        assert_eq!(label.color, Color::new("#000000"));
        assert!(matches!(&label.kind, AnnotationKind::Text { text, .. } if text == "new"));
    }

    #[test]
    fn serializes_with_type_tag_and_camel_case_styling() {
        let json = serde_json::to_value(dimension("d1", (0.2, 0.2), (0.6, 0.2), "10ft"))
            .expect("serialize");
        assert_eq!(json["type"], "dimension");
        assert_eq!(json["fontSize"], 24.0);
        assert_eq!(json["lineWidth"], 5.0);
        assert_eq!(json["start"]["x"], 0.2);

        let stroke = serde_json::to_value(freehand("f", &[(0.1, 0.1)])).expect("serialize");
        assert!(stroke.get("lineWidth").is_none());
    }

    #[test]
    fn rejects_empty_freehand() {
        let raw = r##"{"id":"f","type":"freehand","color":"#fff","points":[]}"##;
        assert!(serde_json::from_str::<Annotation>(raw).is_err());
    }

    #[test]
    fn color_parsing_accepts_short_and_alpha_forms() {
        assert_eq!(Color::new("#fff").rgba(), [255, 255, 255, 255]);
        assert_eq!(Color::new("#FF000080").rgba(), [255, 0, 0, 128]);
        assert_eq!(Color::new("red").rgba(), [255, 255, 0, 255]);
    }

    #[test]
    fn zero_extent_detection() {
        assert!(dimension("d", (0.3, 0.3), (0.3, 0.3), "0").is_zero_extent());
        assert!(freehand("f", &[(0.3, 0.3)]).is_zero_extent());
        assert!(!freehand("f", &[(0.3, 0.3), (0.4, 0.3)]).is_zero_extent());
    }
}
