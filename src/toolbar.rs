use egui::{vec2, Align, Align2, Color32, FontId, Layout, Pos2, Rect, RichText, Shape, Stroke, Ui};

use crate::annotation::{Color, Tool, FONT_SIZE_CHOICES, LINE_WIDTH_CHOICES, PALETTE};
use crate::state::EditorSession;
use crate::theme::{self, AppTheme, WidthClass};
use crate::ui_controls;

#[derive(Clone, Copy, Debug)]
pub struct ToolbarPlan {
    pub visible_color_count: usize,
    pub show_font_size: bool,
    pub show_line_width: bool,
    pub sizes_inline: bool,
    pub show_overflow: bool,
}

pub fn plan_toolbar_items(width_class: WidthClass, tool: Tool) -> ToolbarPlan {
    let visible_color_count = match width_class {
        WidthClass::Compact => 3,
        WidthClass::Regular | WidthClass::Wide => PALETTE.len(),
    };
    let show_font_size = tool.uses_font_size();
    let show_line_width = tool.uses_line_width();
    let sizes_inline = width_class != WidthClass::Compact;

    ToolbarPlan {
        visible_color_count,
        show_font_size,
        show_line_width,
        sizes_inline,
        show_overflow: visible_color_count < PALETTE.len()
            || (!sizes_inline && (show_font_size || show_line_width)),
    }
}

/// Returns `true` when the tool style changed and should be remembered.
pub fn show_toolbar(ui: &mut Ui, session: &mut EditorSession, width_class: WidthClass) -> bool {
    let theme = theme::field_dark_theme();
    let plan = plan_toolbar_items(width_class, session.tool);
    let mut style_changed = false;

    ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
        ui.spacing_mut().interact_size.y = theme.layout.chip_h;
        ui.spacing_mut().button_padding.y = theme.layout.space_1;
        ui.spacing_mut().item_spacing = vec2(theme.layout.control_gap, 0.0);

        for tool in Tool::ALL {
            tool_button(ui, session, tool, &theme);
        }

        group_separator(ui, &theme);
        style_changed |= render_palette_group(ui, session, &theme, 0..plan.visible_color_count);

        if plan.sizes_inline {
            style_changed |= render_size_groups(ui, session, &theme, &plan);
        }

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if plan.show_overflow {
                ui.menu_button("…", |ui| {
                    ui.spacing_mut().item_spacing =
                        vec2(theme.layout.control_gap, theme.layout.space_2);
                    if plan.visible_color_count < PALETTE.len() {
                        ui.label(RichText::new("Colors").color(theme.text.muted).size(12.0));
                        ui.horizontal_wrapped(|ui| {
                            style_changed |= render_palette_group(
                                ui,
                                session,
                                &theme,
                                plan.visible_color_count..PALETTE.len(),
                            );
                        });
                    }
                    if !plan.sizes_inline {
                        ui.horizontal_wrapped(|ui| {
                            style_changed |= render_size_groups(ui, session, &theme, &plan);
                        });
                    }
                });
            }
        });
    });

    style_changed
}

fn render_palette_group(
    ui: &mut Ui,
    session: &mut EditorSession,
    theme: &AppTheme,
    range: std::ops::Range<usize>,
) -> bool {
    let mut changed = false;
    for hex in &PALETTE[range] {
        let color = Color::new(*hex);
        let selected = session.style.color.is(hex);
        if ui_controls::color_chip(ui, theme, color.color32(), selected)
            .on_hover_text(*hex)
            .clicked()
            && !selected
        {
            session.style.color = color;
            changed = true;
        }
    }
    changed
}

fn render_size_groups(
    ui: &mut Ui,
    session: &mut EditorSession,
    theme: &AppTheme,
    plan: &ToolbarPlan,
) -> bool {
    let mut changed = false;
    if plan.show_font_size {
        group_separator(ui, theme);
        ui.label(RichText::new("Size").color(theme.text.muted).size(12.0));
        for size in FONT_SIZE_CHOICES {
            let selected = session.style.font_size == size;
            if ui_controls::segmented(ui, theme, &format!("{size}"), selected)
                .on_hover_text("Font size")
                .clicked()
                && !selected
            {
                session.style.font_size = size;
                changed = true;
            }
        }
    }
    if plan.show_line_width {
        group_separator(ui, theme);
        ui.label(RichText::new("Width").color(theme.text.muted).size(12.0));
        for width in LINE_WIDTH_CHOICES {
            let selected = session.style.line_width == width;
            if ui_controls::segmented(ui, theme, &format!("{width}"), selected)
                .on_hover_text("Line width")
                .clicked()
                && !selected
            {
                session.style.line_width = width;
                changed = true;
            }
        }
    }
    changed
}

pub fn group_separator(ui: &mut Ui, theme: &AppTheme) {
    ui.separator();
    let extra = (theme.layout.group_gap - theme.layout.control_gap).max(0.0);
    if extra > 0.0 {
        ui.add_space(extra);
    }
}

fn tool_button(ui: &mut Ui, session: &mut EditorSession, tool: Tool, theme: &AppTheme) {
    let selected = session.tool == tool;
    let key = match tool {
        Tool::Select => "V",
        Tool::Dimension => "M",
        Tool::Text => "T",
        Tool::Freehand => "D",
    };
    let response = ui_controls::tool_chip(ui, theme, "", selected)
        .on_hover_text(format!("{} ({key})", tool.label()));
    draw_tool_icon(ui, response.rect, tool, selected, theme);
    if response.clicked() {
        session.set_tool(tool);
    }
}

fn draw_tool_icon(ui: &Ui, rect: Rect, tool: Tool, selected: bool, theme: &AppTheme) {
    let color = if selected {
        theme.text.primary
    } else {
        theme.text.secondary
    };
    let stroke = Stroke::new(1.65, color);
    let painter = ui.painter();
    let icon_rect = rect.shrink2(vec2(8.0, 5.0));

    match tool {
        Tool::Select => {
            let tip = Pos2::new(icon_rect.left() + 2.0, icon_rect.top() + 1.0);
            let base = Pos2::new(icon_rect.left() + 8.6, icon_rect.bottom() - 1.6);
            let inner = Pos2::new(icon_rect.left() + 10.8, icon_rect.center().y + 1.8);
            let wing = Pos2::new(icon_rect.right() - 1.8, icon_rect.center().y - 0.6);

            painter.add(Shape::convex_polygon(
                vec![tip, base, inner, wing],
                Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), 40),
                Stroke::NONE,
            ));
            painter.line_segment([tip, base], stroke);
            painter.line_segment([base, inner], stroke);
            painter.line_segment([inner, wing], stroke);
            painter.line_segment([wing, tip], stroke);
        }
        Tool::Dimension => {
            let y = icon_rect.center().y + 2.0;
            let start = Pos2::new(icon_rect.left() + 2.0, y);
            let end = Pos2::new(icon_rect.right() - 2.0, y);
            painter.line_segment([start, end], stroke);
            painter.circle_filled(start, 2.2, color);
            painter.circle_filled(end, 2.2, color);
            painter.text(
                Pos2::new(icon_rect.center().x, y - 3.0),
                Align2::CENTER_BOTTOM,
                "ft",
                FontId::proportional(9.5),
                color,
            );
        }
        Tool::Text => {
            painter.text(
                icon_rect.center(),
                Align2::CENTER_CENTER,
                "T",
                FontId::proportional(14.5),
                color,
            );
        }
        Tool::Freehand => {
            let left = icon_rect.left() + 2.0;
            let width = icon_rect.width() - 4.0;
            let mid = icon_rect.center().y;
            let points = (0..=12)
                .map(|step| {
                    let t = step as f32 / 12.0;
                    Pos2::new(left + t * width, mid + (t * std::f32::consts::TAU).sin() * 4.0)
                })
                .collect();
            painter.add(Shape::line(points, stroke));
        }
    }
}
