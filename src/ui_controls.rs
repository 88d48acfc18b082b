use egui::{vec2, Button, Color32, Frame, Margin, Response, RichText, Rounding, Sense, Stroke, Ui, Vec2};

use crate::theme::AppTheme;

fn bar_frame(theme: &AppTheme, vertical_padding: f32) -> Frame {
    Frame::none()
        .fill(theme.surfaces.panel_bg)
        .stroke(Stroke::new(1.0, theme.surfaces.stroke_soft))
        .inner_margin(Margin::symmetric(theme.layout.panel_padding_x, vertical_padding))
}

pub fn card_frame(theme: &AppTheme) -> Frame {
    Frame::none()
        .fill(theme.surfaces.card_bg_alt)
        .rounding(Rounding::same(theme.controls.card_rounding))
        .stroke(Stroke::new(1.0, theme.surfaces.stroke_soft))
        .shadow(egui::epaint::Shadow {
            offset: vec2(0.0, 4.0),
            blur: 12.0,
            spread: 0.0,
            color: theme.shadows.ambient,
        })
        .inner_margin(Margin::symmetric(theme.layout.space_4, theme.layout.space_3))
}

pub fn toolbar_frame(theme: &AppTheme) -> Frame {
    bar_frame(theme, theme.layout.panel_padding_y)
}

/// Centers `action_height` controls inside the bottom bar.
pub fn action_bar_frame(theme: &AppTheme) -> Frame {
    let slack = theme.layout.action_bar_height - theme.controls.action_height;
    bar_frame(theme, (slack * 0.5).floor().max(theme.layout.space_1))
}

/// Button filled with the accent when `selected`, with the given ring color.
fn toggle_button(
    ui: &mut Ui,
    theme: &AppTheme,
    text: RichText,
    min_size: Vec2,
    rounding: f32,
    selected: bool,
    ring: Color32,
) -> Response {
    let (fill, stroke) = if selected {
        (theme.surfaces.accent_soft, Stroke::new(1.0, ring))
    } else {
        (theme.surfaces.card_bg_alt, Stroke::NONE)
    };
    ui.add(
        Button::new(text)
            .min_size(min_size)
            .rounding(Rounding::same(rounding))
            .fill(fill)
            .stroke(stroke),
    )
}

pub fn tool_chip(ui: &mut Ui, theme: &AppTheme, label: &str, selected: bool) -> Response {
    toggle_button(
        ui,
        theme,
        RichText::new(label).size(theme.controls.toolbar_icon_size),
        vec2(theme.layout.chip_w_tool, theme.layout.chip_h),
        theme.controls.chip_rounding,
        selected,
        theme.shadows.focus_ring,
    )
}

pub fn segmented(ui: &mut Ui, theme: &AppTheme, label: &str, selected: bool) -> Response {
    toggle_button(
        ui,
        theme,
        RichText::new(label).size(13.0),
        vec2(theme.layout.chip_w_segment, theme.layout.chip_h),
        theme.controls.button_rounding,
        selected,
        theme.surfaces.accent,
    )
}

/// Round palette swatch. Dark swatches get a light rim so black stays visible.
pub fn color_chip(ui: &mut Ui, theme: &AppTheme, color: Color32, selected: bool) -> Response {
    let size = theme.layout.chip_h - 6.0;
    let (rect, response) = ui.allocate_exact_size(vec2(size, size), Sense::click());
    let painter = ui.painter();
    let radius = size * 0.5;
    let rim = if selected {
        Stroke::new(2.5, theme.shadows.focus_ring)
    } else if response.hovered() || luminance(color) < 0.2 {
        Stroke::new(1.0, theme.surfaces.stroke_strong)
    } else {
        Stroke::new(1.0, theme.surfaces.stroke_soft)
    };
    painter.circle_filled(rect.center(), radius - 1.0, color);
    painter.circle_stroke(rect.center(), radius - 1.0, rim);
    response
}

fn luminance(color: Color32) -> f32 {
    (0.2126 * color.r() as f32 + 0.7152 * color.g() as f32 + 0.0722 * color.b() as f32) / 255.0
}

pub fn primary_button(ui: &mut Ui, theme: &AppTheme, label: &str, min_size: Vec2) -> Response {
    ui.add(
        Button::new(RichText::new(label).strong().color(theme.text.primary))
            .min_size(min_size)
            .rounding(Rounding::same(theme.controls.button_rounding))
            .fill(theme.surfaces.accent.gamma_multiply(0.55))
            .stroke(Stroke::new(1.0, theme.surfaces.accent)),
    )
}

pub fn ghost_button(ui: &mut Ui, theme: &AppTheme, label: &str, min_size: Vec2) -> Response {
    ui.add(
        Button::new(RichText::new(label).color(theme.text.secondary))
            .min_size(min_size)
            .rounding(Rounding::same(theme.controls.button_rounding))
            .fill(theme.surfaces.card_bg_alt)
            .stroke(Stroke::new(1.0, theme.surfaces.stroke_soft)),
    )
}

fn pill(ui: &mut Ui, fill: Color32, stroke: Color32, rounding: f32, margin: Vec2, text: RichText) {
    Frame::none()
        .fill(fill)
        .stroke(Stroke::new(1.0, stroke))
        .rounding(Rounding::same(rounding))
        .inner_margin(Margin::symmetric(margin.x, margin.y))
        .show(ui, |ui| {
            ui.label(text);
        });
}

pub fn subtle_badge(ui: &mut Ui, theme: &AppTheme, text: &str) {
    pill(
        ui,
        theme.surfaces.accent.gamma_multiply(0.14),
        theme.surfaces.accent_soft,
        10.0,
        vec2(8.0, 3.0),
        RichText::new(text).size(12.0).strong().color(theme.text.accent),
    );
}

pub fn keycap(ui: &mut Ui, theme: &AppTheme, label: &str) {
    pill(
        ui,
        theme.surfaces.stroke_soft,
        theme.surfaces.stroke_strong,
        4.0,
        vec2(6.0, 2.0),
        RichText::new(label).size(11.0).strong().color(theme.text.secondary),
    );
}

pub fn vertical_divider(ui: &mut Ui, theme: &AppTheme, height: f32) {
    let (rect, _) = ui.allocate_exact_size(vec2(1.0, height), Sense::hover());
    ui.painter().vline(
        rect.center().x,
        rect.y_range(),
        Stroke::new(1.0, theme.surfaces.stroke_soft),
    );
}
