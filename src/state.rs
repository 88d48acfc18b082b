use egui::{ColorImage, Context as EguiContext, TextureHandle, TextureOptions, Vec2};
use image::DynamicImage;

use crate::annotation::{AnnotationPatch, Color, Tool, DEFAULT_FONT_SIZE, DEFAULT_LINE_WIDTH};
use crate::config::UserSettings;
use crate::geometry::Viewport;
use crate::gesture::{self, GestureState, PendingPrompt};
use crate::model::{AnnotationModel, AnnotationSet};

pub const TOAST_SECONDS: f64 = 3.0;

/// Styling applied to newly created annotations.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolStyle {
    pub color: Color,
    pub font_size: f64,
    pub line_width: f64,
}

impl Default for ToolStyle {
    fn default() -> Self {
        Self {
            color: Color::default(),
            font_size: DEFAULT_FONT_SIZE,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl From<&UserSettings> for ToolStyle {
    fn from(settings: &UserSettings) -> Self {
        Self {
            color: Color::new(settings.last_color.clone()),
            font_size: settings.last_font_size,
            line_width: settings.last_line_width,
        }
    }
}

/// Everything the editor's gesture and render code works on for one photo.
pub struct EditorSession {
    pub model: AnnotationModel,
    pub tool: Tool,
    pub style: ToolStyle,
    pub viewport: Viewport,
    pub gesture: GestureState,
    pub prompt: Option<PendingPrompt>,
    pub dirty: bool,
    pub saving: bool,
}

impl EditorSession {
    pub fn new(annotations: AnnotationSet, style: ToolStyle) -> Self {
        Self {
            model: AnnotationModel::new(annotations),
            tool: Tool::Select,
            style,
            viewport: Viewport::IDENTITY,
            gesture: GestureState::Idle,
            prompt: None,
            dirty: false,
            saving: false,
        }
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool == tool {
            return;
        }
        gesture::abandon_gesture(self);
        self.tool = tool;
    }

    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.model.selected_id().cloned() else {
            return false;
        };
        let removed = self.model.delete(&id);
        self.dirty |= removed;
        removed
    }

    pub fn undo_last(&mut self) -> bool {
        let removed = self.model.undo_last().is_some();
        self.dirty |= removed;
        removed
    }

    pub fn update_selected(&mut self, patch: &AnnotationPatch) -> bool {
        let Some(id) = self.model.selected_id().cloned() else {
            return false;
        };
        let changed = self.model.update(&id, patch);
        self.dirty |= changed;
        changed
    }

    /// Marks a save as in flight. Refused while another one is running.
    pub fn begin_save(&mut self) -> bool {
        if self.saving {
            return false;
        }
        self.saving = true;
        self.model.clear_selection();
        true
    }

    pub fn finish_save(&mut self, succeeded: bool) {
        self.saving = false;
        if succeeded {
            self.dirty = false;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub until: f64,
}

pub struct AppUiFlags {
    pub toast: Option<Toast>,
    pub show_annotations: bool,
}

impl AppUiFlags {
    pub fn new() -> Self {
        Self {
            toast: None,
            show_annotations: true,
        }
    }

    pub fn notify(&mut self, now: f64, kind: ToastKind, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            kind,
            until: now + TOAST_SECONDS,
        });
    }

    pub fn active_toast(&self, now: f64) -> Option<&Toast> {
        self.toast.as_ref().filter(|toast| now <= toast.until)
    }
}

/// Decoded photo plus its lazily uploaded texture.
pub struct PhotoImage {
    pub dynamic: DynamicImage,
    pub texture: Option<TextureHandle>,
}

impl PhotoImage {
    pub fn new(dynamic: DynamicImage) -> Self {
        Self {
            dynamic,
            texture: None,
        }
    }

    pub fn size_vec2(&self) -> Vec2 {
        Vec2::new(self.dynamic.width() as f32, self.dynamic.height() as f32)
    }

    pub fn ensure_texture(&mut self, ctx: &EguiContext, name: &str) -> &TextureHandle {
        self.texture.get_or_insert_with(|| {
            let rgba = self.dynamic.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let color = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
            ctx.load_texture(name, color, TextureOptions::LINEAR)
        })
    }
}
