use egui::{vec2, Align, Layout, Ui};

use crate::state::EditorSession;
use crate::theme::{self, WidthClass};
use crate::ui_controls;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionBarOutput {
    pub fit: bool,
    pub undo: bool,
    pub export: bool,
    pub save: bool,
    pub cancel: bool,
}

pub fn should_show_shortcut_label(width_class: WidthClass, available_width: f32) -> bool {
    match width_class {
        WidthClass::Compact => available_width >= 420.0,
        WidthClass::Regular | WidthClass::Wide => true,
    }
}

pub fn save_label(saving: bool) -> &'static str {
    if saving {
        "Saving…"
    } else {
        "Save"
    }
}

pub fn show_action_bar(
    ui: &mut Ui,
    session: &EditorSession,
    width_class: WidthClass,
) -> ActionBarOutput {
    let theme = theme::field_dark_theme();
    let action_h = theme.controls.action_height;
    let button_gap = theme.layout.space_3 + 2.0;
    let compact = width_class == WidthClass::Compact;
    let small_w = if compact { 72.0 } else { 88.0 };
    let save_w = if compact { 92.0 } else { 108.0 };
    let shortcut_visible = should_show_shortcut_label(
        width_class,
        ui.available_width() - small_w * 4.0 - save_w - button_gap * 5.0,
    );

    let mut out = ActionBarOutput::default();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing = vec2(button_gap, 0.0);

        if ui_controls::ghost_button(ui, &theme, "Fit", vec2(small_w, action_h))
            .on_hover_text("Reset zoom (0)")
            .clicked()
        {
            out.fit = true;
        }
        ui_controls::subtle_badge(ui, &theme, &format!("{}%", session.viewport.percent()));

        let undo = ui.add_enabled_ui(!session.model.annotations().is_empty(), |ui| {
            ui_controls::ghost_button(ui, &theme, "↩ Undo", vec2(small_w, action_h))
        });
        if undo.inner.clicked() {
            out.undo = true;
        }

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            ui.add_space(theme.layout.space_2);

            if shortcut_visible {
                ui_controls::keycap(ui, &theme, "S");
                ui.add_space(theme.layout.space_2);
                ui_controls::keycap(ui, &theme, "Ctrl");
                ui.add_space(theme.layout.space_3);
                ui_controls::vertical_divider(ui, &theme, 16.0);
                ui.add_space(theme.layout.space_3);
            }

            let save = ui.add_enabled_ui(!session.saving, |ui| {
                ui_controls::primary_button(
                    ui,
                    &theme,
                    save_label(session.saving),
                    vec2(save_w, action_h),
                )
            });
            let mut save_response = save.inner;
            if !shortcut_visible {
                save_response = save_response.on_hover_text("Ctrl+S");
            }
            if save_response.clicked() {
                out.save = true;
            }

            if session.dirty && !compact {
                ui_controls::subtle_badge(ui, &theme, "unsaved");
            }

            if ui_controls::ghost_button(ui, &theme, "Export", vec2(small_w, action_h))
                .on_hover_text("Save a flattened copy of the photo")
                .clicked()
            {
                out.export = true;
            }

            let cancel = ui.add_enabled_ui(!session.saving, |ui| {
                ui_controls::ghost_button(ui, &theme, "Cancel", vec2(small_w, action_h))
                    .on_hover_text("Back to the photo without saving")
            });
            if cancel.inner.clicked() {
                out.cancel = true;
            }
        });
    });

    out
}

#[cfg(test)]
mod tests {
    use super::{save_label, should_show_shortcut_label};
    use crate::theme::WidthClass;

    #[test]
    fn action_bar_compact_hides_shortcut_label_first() {
        assert!(!should_show_shortcut_label(WidthClass::Compact, 320.0));
        assert!(should_show_shortcut_label(WidthClass::Compact, 420.0));
        assert!(should_show_shortcut_label(WidthClass::Regular, 320.0));
    }

    #[test]
    fn save_button_reflects_in_flight_state() {
        assert_eq!(save_label(false), "Save");
        assert_eq!(save_label(true), "Saving…");
    }
}
