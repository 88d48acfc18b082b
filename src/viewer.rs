//! Read-only screens: the photo detail view and the public share view.
//! Both draw annotations through the same scene as the editor, without
//! selection feedback.

use chrono::{DateTime, Local, Utc};
use egui::{vec2, Color32, Context, Pos2, Rect, RichText, ScrollArea, Sense, Ui, Vec2};

use crate::canvas::{draw_canvas_background, paint_scene};
use crate::geometry::fit_rect;
use crate::model::AnnotationSet;
use crate::render::{build_scene, RenderMode, RenderParams};
use crate::state::PhotoImage;
use crate::store::{SharedNote, SharedPhoto, SharedPhotoView, SharedProject};
use crate::theme::{self, AppTheme};
use crate::ui_controls;

const SHARED_PHOTO_MAX_HEIGHT: f32 = 480.0;

pub struct DetailView {
    pub photo_id: String,
    pub caption: Option<String>,
    pub annotations: AnnotationSet,
    pub photo: PhotoImage,
}

pub struct SharedPhotoCard {
    pub photo: SharedPhoto,
    pub annotations: AnnotationSet,
    pub image: Option<PhotoImage>,
}

pub struct ShareView {
    pub project: SharedProject,
    pub photos: Vec<SharedPhotoCard>,
}

impl ShareView {
    pub fn new(project: SharedProject, photos: Vec<SharedPhotoView>) -> Self {
        let photos = photos
            .into_iter()
            .map(|view| SharedPhotoCard {
                photo: view.photo,
                annotations: view.annotations,
                image: view.image.map(PhotoImage::new),
            })
            .collect();
        Self { project, photos }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailAction {
    None,
    Annotate,
}

/// Draws a photo scaled into `max_size` with its annotations on top.
pub fn paint_annotated_photo(
    ui: &mut Ui,
    ctx: &Context,
    photo: &mut PhotoImage,
    texture_name: &str,
    annotations: &AnnotationSet,
    show_annotations: bool,
    max_size: Vec2,
) {
    let texture_id = photo.ensure_texture(ctx, texture_name).id();
    let fitted = fit_rect(
        photo.size_vec2(),
        Rect::from_min_size(Pos2::ZERO, max_size),
    );
    let (rect, _) = ui.allocate_exact_size(fitted.size(), Sense::hover());
    let painter = ui.painter_at(rect);
    painter.image(
        texture_id,
        rect,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );
    if show_annotations {
        let scene = build_scene(
            annotations,
            RenderParams {
                overlay: rect,
                zoom: 1.0,
            },
            RenderMode::Static,
        );
        paint_scene(&painter, &scene);
    }
}

pub fn show_detail(
    ui: &mut Ui,
    ctx: &Context,
    view: &mut DetailView,
    show_annotations: &mut bool,
) -> DetailAction {
    let theme = theme::field_dark_theme();
    let mut action = DetailAction::None;

    ui.horizontal(|ui| {
        ui.label(RichText::new(format!("Photo {}", view.photo_id)).strong());
        ui_controls::subtle_badge(ui, &theme, &annotation_count(&view.annotations));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let size = vec2(110.0, theme.controls.action_height);
            if ui_controls::primary_button(ui, &theme, "Annotate", size).clicked() {
                action = DetailAction::Annotate;
            }
            ui.checkbox(show_annotations, "Show annotations");
        });
    });
    ui.add_space(theme.layout.space_2);

    let caption_height = if view.caption.is_some() { 32.0 } else { 0.0 };
    let available = ui.available_size() - vec2(0.0, caption_height);
    let (frame_rect, _) = ui.allocate_exact_size(available, Sense::hover());
    draw_canvas_background(ui.painter(), frame_rect);
    let mut child = ui.child_ui(
        frame_rect.shrink(theme.layout.space_3),
        egui::Layout::centered_and_justified(egui::Direction::TopDown),
    );
    paint_annotated_photo(
        &mut child,
        ctx,
        &mut view.photo,
        "sitemark-detail",
        &view.annotations,
        *show_annotations,
        frame_rect.shrink(theme.layout.space_3).size(),
    );

    if let Some(caption) = &view.caption {
        ui.label(RichText::new(caption).color(theme.text.secondary));
    }

    action
}

pub fn show_share(ui: &mut Ui, ctx: &Context, view: &mut ShareView, show_annotations: &mut bool) {
    let theme = theme::field_dark_theme();

    project_header(ui, &theme, &view.project, show_annotations);
    ui.add_space(theme.layout.space_3);

    ScrollArea::vertical()
        .id_source("sitemark_share_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.label(RichText::new(format!("Photos ({})", view.photos.len())).strong());
            if view.photos.is_empty() {
                ui.label(RichText::new("No photos yet.").color(theme.text.muted));
            }
            let width = ui.available_width();
            for (index, card) in view.photos.iter_mut().enumerate() {
                ui_controls::card_frame(&theme).show(ui, |ui| {
                    ui.set_width(width - theme.layout.space_4 * 2.0);
                    match card.image.as_mut() {
                        Some(image) => paint_annotated_photo(
                            ui,
                            ctx,
                            image,
                            &format!("sitemark-share-{index}"),
                            &card.annotations,
                            *show_annotations,
                            vec2(ui.available_width(), SHARED_PHOTO_MAX_HEIGHT),
                        ),
                        None => {
                            ui.label(
                                RichText::new("Photo unavailable").color(theme.text.muted),
                            );
                        }
                    }
                    photo_footer(ui, &theme, &card.photo);
                });
                ui.add_space(theme.layout.space_2);
            }

            ui.add_space(theme.layout.space_3);
            ui.label(RichText::new(format!("Notes ({})", view.project.notes.len())).strong());
            if view.project.notes.is_empty() {
                ui.label(RichText::new("No notes yet.").color(theme.text.muted));
            }
            for note in &view.project.notes {
                note_card(ui, &theme, note);
            }
        });
}

fn project_header(
    ui: &mut Ui,
    theme: &AppTheme,
    project: &SharedProject,
    show_annotations: &mut bool,
) {
    ui.horizontal(|ui| {
        let job = project.job_number.as_deref().unwrap_or("Project");
        ui.label(RichText::new(job).size(22.0).strong());
        if let Some(status) = &project.status {
            ui_controls::subtle_badge(ui, theme, status);
        }
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.checkbox(show_annotations, "Show annotations");
        });
    });
    for (label, value) in [
        ("Client", project.client_name.as_deref()),
        ("Site", project.site_address.as_deref()),
    ] {
        if let Some(value) = value {
            ui.label(RichText::new(format!("{label}: {value}")).color(theme.text.secondary));
        }
    }
}

fn photo_footer(ui: &mut Ui, theme: &AppTheme, photo: &SharedPhoto) {
    if photo.caption.is_none() && photo.status_at_capture.is_none() {
        return;
    }
    ui.add_space(theme.layout.space_1);
    if let Some(caption) = &photo.caption {
        ui.label(caption);
    }
    if let Some(status) = &photo.status_at_capture {
        ui.label(
            RichText::new(format!("Status at capture: {status}"))
                .small()
                .color(theme.text.muted),
        );
    }
}

fn note_card(ui: &mut Ui, theme: &AppTheme, note: &SharedNote) {
    ui_controls::card_frame(theme).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.label(&note.note_text);
        if let Some(created) = note.created_at {
            ui.label(
                RichText::new(local_date(created))
                    .small()
                    .color(theme.text.muted),
            );
        }
    });
    ui.add_space(theme.layout.space_1);
}

fn local_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

fn annotation_count(annotations: &AnnotationSet) -> String {
    match annotations.len() {
        1 => "1 annotation".to_owned(),
        n => format!("{n} annotations"),
    }
}

#[cfg(test)]
mod tests {
    use super::annotation_count;
    use crate::annotation::fixtures::text;
    use crate::model::AnnotationSet;

    #[test]
    fn annotation_count_pluralizes() {
        assert_eq!(annotation_count(&AnnotationSet::new()), "0 annotations");
        assert_eq!(
            annotation_count(&AnnotationSet::from(vec![text("a", (0.1, 0.1), "x")])),
            "1 annotation"
        );
    }
}
