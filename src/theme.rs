use egui::epaint::Shadow;
use egui::style::WidgetVisuals;
use egui::{vec2, Color32, Context, FontFamily, FontId, Margin, Rounding, Stroke, TextStyle, Visuals};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidthClass {
    Compact,
    Regular,
    Wide,
}

/// Design tokens for the sitemark chrome. The photo is the only bright
/// surface; everything around it stays low-contrast.
#[derive(Clone, Debug)]
pub struct AppTheme {
    pub surfaces: SurfaceTokens,
    pub text: TextTokens,
    pub controls: ControlTokens,
    pub layout: LayoutTokens,
    pub breakpoints: Breakpoints,
    pub shadows: ShadowTokens,
    pub motion: MotionTokens,
}

#[derive(Clone, Debug)]
pub struct SurfaceTokens {
    pub app_bg: Color32,
    pub panel_bg: Color32,
    pub panel_bg_alt: Color32,
    pub card_bg: Color32,
    pub card_bg_alt: Color32,
    pub canvas_bg: Color32,
    pub stroke_soft: Color32,
    pub stroke_strong: Color32,
    pub accent: Color32,
    pub accent_soft: Color32,
}

#[derive(Clone, Debug)]
pub struct TextTokens {
    pub primary: Color32,
    pub secondary: Color32,
    pub muted: Color32,
    pub accent: Color32,
    pub error: Color32,
}

#[derive(Clone, Debug)]
pub struct ControlTokens {
    pub card_rounding: f32,
    pub panel_rounding: f32,
    pub chip_rounding: f32,
    pub button_rounding: f32,
    pub toolbar_icon_size: f32,
    pub action_height: f32,
    pub global_spacing_scale: f32,
}

#[derive(Clone, Debug)]
pub struct LayoutTokens {
    pub space_1: f32,
    pub space_2: f32,
    pub space_3: f32,
    pub space_4: f32,
    pub panel_padding_x: f32,
    pub panel_padding_y: f32,
    pub control_gap: f32,
    pub group_gap: f32,
    pub toolbar_height: f32,
    pub action_bar_height: f32,
    pub chip_h: f32,
    pub chip_w_tool: f32,
    pub chip_w_segment: f32,
}

#[derive(Clone, Debug)]
pub struct Breakpoints {
    pub compact_max: f32,
    pub regular_max: f32,
}

#[derive(Clone, Debug)]
pub struct ShadowTokens {
    pub ambient: Color32,
    pub elevation: Color32,
    pub focus_ring: Color32,
}

#[derive(Clone, Debug)]
pub struct MotionTokens {
    /// Repaint cadence while waiting on the store worker.
    pub fast_ms: u32,
    pub normal_ms: u32,
}

impl AppTheme {
    pub fn width_class(&self, width: f32) -> WidthClass {
        width_class(width, &self.breakpoints)
    }
}

pub fn width_class(width: f32, breakpoints: &Breakpoints) -> WidthClass {
    if width <= breakpoints.compact_max {
        WidthClass::Compact
    } else if width <= breakpoints.regular_max {
        WidthClass::Regular
    } else {
        WidthClass::Wide
    }
}

const fn white(alpha: u8) -> Color32 {
    Color32::from_rgba_premultiplied(alpha, alpha, alpha, alpha)
}

const fn black(alpha: u8) -> Color32 {
    Color32::from_rgba_premultiplied(0, 0, 0, alpha)
}

pub fn field_dark_theme() -> AppTheme {
    let accent = Color32::from_rgb(0x00, 0x99, 0xFF);

    AppTheme {
        surfaces: SurfaceTokens {
            app_bg: Color32::from_rgb(0x15, 0x17, 0x19),
            panel_bg: Color32::from_rgb(0x1B, 0x1E, 0x21),
            panel_bg_alt: Color32::from_rgb(0x1E, 0x21, 0x25),
            card_bg: Color32::from_rgb(0x24, 0x28, 0x2C),
            card_bg_alt: Color32::from_rgb(0x21, 0x24, 0x28),
            canvas_bg: Color32::from_rgb(0x10, 0x12, 0x14),
            stroke_soft: white(26),
            stroke_strong: white(48),
            accent,
            accent_soft: accent.gamma_multiply(0.32),
        },
        text: TextTokens {
            primary: Color32::from_rgb(0xF4, 0xF6, 0xF8),
            secondary: Color32::from_rgb(0xB8, 0xC1, 0xCC),
            muted: Color32::from_rgb(0x88, 0x93, 0xA0),
            accent: Color32::from_rgb(0x7C, 0xC4, 0xFF),
            error: Color32::from_rgb(0xFF, 0x7A, 0x6E),
        },
        controls: ControlTokens {
            card_rounding: 10.0,
            panel_rounding: 10.0,
            chip_rounding: 7.0,
            button_rounding: 7.0,
            toolbar_icon_size: 18.0,
            action_height: 30.0,
            global_spacing_scale: 1.0,
        },
        layout: LayoutTokens {
            space_1: 4.0,
            space_2: 8.0,
            space_3: 12.0,
            space_4: 16.0,
            panel_padding_x: 14.0,
            panel_padding_y: 8.0,
            control_gap: 6.0,
            group_gap: 12.0,
            toolbar_height: 48.0,
            action_bar_height: 52.0,
            chip_h: 30.0,
            chip_w_tool: 40.0,
            chip_w_segment: 38.0,
        },
        // Field tablets in portrait land in the compact class.
        breakpoints: Breakpoints {
            compact_max: 820.0,
            regular_max: 1180.0,
        },
        shadows: ShadowTokens {
            ambient: black(60),
            elevation: black(120),
            focus_ring: accent.gamma_multiply(0.85),
        },
        motion: MotionTokens {
            fast_ms: 100,
            normal_ms: 160,
        },
    }
}

fn widget(bg: Color32, stroke: Color32, fg: Color32, rounding: f32) -> WidgetVisuals {
    WidgetVisuals {
        bg_fill: bg,
        weak_bg_fill: bg,
        bg_stroke: Stroke::new(1.0, stroke),
        fg_stroke: Stroke::new(1.0, fg),
        rounding: Rounding::same(rounding),
        expansion: 0.0,
    }
}

fn shadow(offset_y: f32, blur: f32, color: Color32) -> Shadow {
    Shadow {
        offset: vec2(0.0, offset_y),
        blur,
        spread: 0.0,
        color,
    }
}

fn visuals(theme: &AppTheme) -> Visuals {
    let s = &theme.surfaces;
    let t = &theme.text;
    let r = theme.controls.button_rounding;

    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(t.primary);
    visuals.panel_fill = s.panel_bg;
    visuals.window_fill = s.panel_bg_alt;
    visuals.faint_bg_color = s.panel_bg;
    visuals.extreme_bg_color = s.app_bg;
    visuals.code_bg_color = s.card_bg_alt;
    visuals.window_rounding = Rounding::same(theme.controls.panel_rounding);
    visuals.hyperlink_color = t.accent;
    visuals.error_fg_color = t.error;

    visuals.widgets.noninteractive = widget(s.panel_bg, s.stroke_soft, t.secondary, r);
    visuals.widgets.inactive = widget(s.card_bg_alt, s.stroke_soft, t.secondary, r);
    visuals.widgets.hovered = widget(s.card_bg, s.stroke_strong, t.primary, r);
    visuals.widgets.active = widget(s.accent_soft, s.accent, t.primary, r);
    visuals.widgets.open = widget(s.card_bg, s.stroke_strong, t.primary, r);

    visuals.selection.bg_fill = s.accent_soft;
    visuals.selection.stroke = Stroke::new(1.0, s.accent);
    visuals.popup_shadow = shadow(8.0, 20.0, theme.shadows.ambient);
    visuals.window_shadow = shadow(12.0, 26.0, theme.shadows.elevation);
    visuals
}

pub fn apply_theme(ctx: &Context, theme: &AppTheme) {
    let layout = &theme.layout;
    let mut style = (*ctx.style()).clone();

    style.spacing.item_spacing = vec2(
        layout.control_gap * theme.controls.global_spacing_scale,
        layout.space_2,
    );
    style.spacing.button_padding = vec2(layout.space_3, layout.space_2);
    style.spacing.menu_margin = Margin::same(layout.space_2);
    style.spacing.window_margin = Margin::same(layout.space_3);
    style.animation_time = theme.motion.normal_ms as f32 / 1000.0;
    style.visuals = visuals(theme);

    for (text_style, size) in [
        (TextStyle::Heading, 26.0),
        (TextStyle::Body, 15.0),
        (TextStyle::Button, 14.0),
        (TextStyle::Small, 12.0),
    ] {
        style
            .text_styles
            .insert(text_style, FontId::new(size, FontFamily::Proportional));
    }

    ctx.set_style(style);
}

#[cfg(test)]
mod tests {
    use super::{field_dark_theme, width_class, Breakpoints, WidthClass};

    #[test]
    fn width_class_boundaries_are_inclusive() {
        let breakpoints = Breakpoints {
            compact_max: 820.0,
            regular_max: 1180.0,
        };

        assert_eq!(width_class(640.0, &breakpoints), WidthClass::Compact);
        assert_eq!(width_class(820.0, &breakpoints), WidthClass::Compact);
        assert_eq!(width_class(821.0, &breakpoints), WidthClass::Regular);
        assert_eq!(width_class(1180.0, &breakpoints), WidthClass::Regular);
        assert_eq!(width_class(1181.0, &breakpoints), WidthClass::Wide);
    }

    #[test]
    fn portrait_tablet_is_compact() {
        let theme = field_dark_theme();
        assert_eq!(theme.width_class(768.0), WidthClass::Compact);
        assert_eq!(theme.width_class(1400.0), WidthClass::Wide);
    }
}
