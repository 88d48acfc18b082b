use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f32 = 1.0;
pub const MAX_SCALE: f32 = 5.0;
pub const WHEEL_ZOOM_SENSITIVITY: f32 = 0.001;

/// A position expressed as a fraction of the photo's intrinsic width and height.
///
/// Origin is the top-left corner of the photo. Values are not clamped: a drag
/// that drifts past the photo edge produces coordinates outside `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn delta_to(self, other: Point) -> (f64, f64) {
        (other.x - self.x, other.y - self.y)
    }
}

/// Converts a pointer location into normalized photo space.
///
/// `image_box` is the on-screen bounding box of the photo after the viewport
/// transform has been applied, so the result is independent of zoom and pan.
pub fn to_normalized(client: Pos2, image_box: Rect) -> Point {
    let width = f64::from(image_box.width().max(f32::EPSILON));
    let height = f64::from(image_box.height().max(f32::EPSILON));
    Point::new(
        (f64::from(client.x) - f64::from(image_box.left())) / width,
        (f64::from(client.y) - f64::from(image_box.top())) / height,
    )
}

/// Maps a normalized point onto an overlay box. This is the only place
/// normalized coordinates become pixels.
pub fn to_screen(point: Point, overlay: Rect) -> Pos2 {
    Pos2::new(
        overlay.left() + (point.x * f64::from(overlay.width())) as f32,
        overlay.top() + (point.y * f64::from(overlay.height())) as f32,
    )
}

/// Largest rect with the image's aspect ratio that fits inside `available`,
/// centered.
pub fn fit_rect(image_size: Vec2, available: Rect) -> Rect {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return Rect::from_center_size(available.center(), Vec2::ZERO);
    }
    let scale = (available.width() / image_size.x).min(available.height() / image_size.y);
    Rect::from_center_size(available.center(), image_size * scale.max(0.0))
}

/// Zoom and pan applied to the photo and its overlay as one unit.
///
/// Never persisted; annotation coordinates are never adjusted by it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Viewport {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: Vec2::ZERO,
    };

    pub fn zoom_by(&mut self, delta_scale: f32) {
        if !delta_scale.is_finite() {
            return;
        }
        self.scale = (self.scale + delta_scale).clamp(MIN_SCALE, MAX_SCALE);
    }

    /// Ctrl/Cmd + wheel. Proportional to the current scale so zooming feels
    /// uniform at every level.
    pub fn zoom_wheel(&mut self, wheel_delta_y: f32) {
        let delta = -wheel_delta_y * WHEEL_ZOOM_SENSITIVITY;
        self.zoom_by(delta * self.scale);
    }

    /// Pinch gesture, `factor` being the ratio between successive finger spans.
    pub fn zoom_pinch(&mut self, factor: f32) {
        self.zoom_by(self.scale * (factor - 1.0));
    }

    pub fn can_pan(&self) -> bool {
        self.scale > MIN_SCALE
    }

    pub fn pan_by(&mut self, delta: Vec2) -> bool {
        if !self.can_pan() {
            return false;
        }
        self.offset += delta;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    pub fn percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    /// Translate + scale around the center of `fit`, the way a CSS
    /// `translate(x, y) scale(s)` with a centered origin would.
    pub fn apply(&self, fit: Rect) -> Rect {
        Rect::from_center_size(fit.center() + self.offset, fit.size() * self.scale)
    }
}
