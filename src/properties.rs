use egui::{vec2, Align, Layout, RichText, Slider, Ui};

use crate::annotation::{AnnotationKind, AnnotationPatch, Color, PALETTE};
use crate::gesture;
use crate::state::EditorSession;
use crate::theme;
use crate::toolbar::group_separator;
use crate::ui_controls;

pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<f64> = 12.0..=72.0;
pub const FONT_SIZE_STEP: f64 = 4.0;
pub const LINE_WIDTH_RANGE: std::ops::RangeInclusive<f64> = 1.0..=20.0;

/// Editing controls for the selected annotation. Shown in place of the tool
/// palette while something is selected.
pub fn show_properties(ui: &mut Ui, session: &mut EditorSession) {
    let theme = theme::field_dark_theme();
    let Some(selected) = session.model.selected() else {
        return;
    };
    let kind = selected.kind_name();
    let current_color = selected.color.clone();
    let font_size = selected.font_size();
    let line_width = selected.line_width();
    let (has_font, has_width, edit_label) = match &selected.kind {
        AnnotationKind::Dimension { .. } => (true, true, Some("Edit label")),
        AnnotationKind::Text { .. } => (true, false, Some("Edit text")),
        AnnotationKind::Freehand { .. } => (false, true, None),
    };

    ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
        ui.spacing_mut().interact_size.y = theme.layout.chip_h;
        ui.spacing_mut().item_spacing = vec2(theme.layout.control_gap, 0.0);

        ui_controls::subtle_badge(ui, &theme, kind);
        group_separator(ui, &theme);

        for hex in PALETTE {
            let selected = current_color.is(hex);
            let color = Color::new(hex);
            if ui_controls::color_chip(ui, &theme, color.color32(), selected)
                .on_hover_text(hex)
                .clicked()
            {
                session.update_selected(&AnnotationPatch::color(color));
            }
        }

        if has_font {
            group_separator(ui, &theme);
            let mut value = font_size;
            ui.label(RichText::new("Size").color(theme.text.muted).size(12.0));
            if ui
                .add(Slider::new(&mut value, FONT_SIZE_RANGE).step_by(FONT_SIZE_STEP))
                .changed()
            {
                session.update_selected(&AnnotationPatch::font_size(value));
            }
        }

        if has_width {
            group_separator(ui, &theme);
            let mut value = line_width;
            ui.label(RichText::new("Width").color(theme.text.muted).size(12.0));
            if ui
                .add(Slider::new(&mut value, LINE_WIDTH_RANGE).step_by(1.0))
                .changed()
            {
                session.update_selected(&AnnotationPatch::line_width(value));
            }
        }

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let size = vec2(84.0, theme.controls.action_height);
            if ui_controls::primary_button(ui, &theme, "Done", size).clicked() {
                session.model.clear_selection();
            }
            if ui_controls::ghost_button(ui, &theme, "Delete", size)
                .on_hover_text("Delete / Backspace")
                .clicked()
            {
                session.delete_selected();
            }
            if let Some(label) = edit_label {
                if ui_controls::ghost_button(ui, &theme, label, vec2(100.0, size.y)).clicked() {
                    gesture::begin_edit_selected(session);
                }
            }
        });
    });
}
