use std::path::Path;

use ab_glyph::FontArc;
use anyhow::{anyhow, Context, Result};
use egui::{pos2, Color32, Pos2};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::model::AnnotationSet;
use crate::render::{build_scene, Primitive, RenderMode, RenderParams, TextAlign, HALO};

/// Photo width the on-screen sizes are tuned for. Wider photos get
/// proportionally larger labels and dimension strokes when exported.
const REFERENCE_WIDTH: f32 = 1000.0;
/// Baseline to top-of-glyph distance as a fraction of the font size.
const ASCENT: f32 = 0.8;

/// Burns the annotation set into a copy of the photo.
pub fn flatten(image: &DynamicImage, annotations: &AnnotationSet) -> Result<DynamicImage> {
    let mut pixmap = Pixmap::new(image.width(), image.height())
        .ok_or_else(|| anyhow!("cannot allocate pixmap"))?;

    copy_image_to_pixmap(image, &mut pixmap)?;

    let overlay = egui::Rect::from_min_size(
        Pos2::ZERO,
        egui::vec2(image.width() as f32, image.height() as f32),
    );
    let params = RenderParams {
        overlay,
        zoom: (overlay.width() / REFERENCE_WIDTH).max(1.0),
    };
    let scene = build_scene(annotations, params, RenderMode::Static);

    for primitive in &scene {
        draw_shape(&mut pixmap, primitive)?;
    }

    let mut output = RgbaImage::from_raw(image.width(), image.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("cannot construct output image"))?;

    draw_text_primitives(&mut output, &scene);

    Ok(DynamicImage::ImageRgba8(output))
}

/// Writes the flattened photo, picking PNG or JPEG from the extension.
pub fn export_to_path(image: &DynamicImage, annotations: &AnnotationSet, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    let flattened = flatten(image, annotations)?;
    let bytes = encode(&flattened, format)?;
    std::fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))?;
    tracing::info!(path = %path.display(), count = annotations.len(), "exported annotated photo");
    Ok(())
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .context("cannot encode JPEG")?,
        _ => image
            .write_to(&mut buffer, ImageFormat::Png)
            .context("cannot encode PNG")?,
    }
    Ok(buffer.into_inner())
}

fn copy_image_to_pixmap(image: &DynamicImage, pixmap: &mut Pixmap) -> Result<()> {
    let rgba = image.to_rgba8();
    let data = pixmap.data_mut();
    if data.len() != rgba.len() {
        return Err(anyhow!("source image and pixmap size mismatch"));
    }
    data.copy_from_slice(rgba.as_raw());
    Ok(())
}

fn paint_for(color: Color32) -> Paint<'static> {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn draw_shape(pixmap: &mut Pixmap, primitive: &Primitive) -> Result<()> {
    match primitive {
        Primitive::Line {
            from,
            to,
            width,
            color,
        } => stroke_points(pixmap, &[*from, *to], *width, *color),
        Primitive::Polyline {
            points,
            width,
            color,
        } => {
            if let [only] = points.as_slice() {
                return fill_circle(pixmap, *only, width / 2.0, *color);
            }
            stroke_points(pixmap, points, *width, *color)
        }
        Primitive::Dot {
            center,
            radius,
            color,
        } => fill_circle(pixmap, *center, *radius, *color),
        // Text goes through imageproc; feedback primitives never reach export.
        Primitive::Text { .. } | Primitive::Glow { .. } | Primitive::Handle { .. } => Ok(()),
    }
}

fn stroke_points(pixmap: &mut Pixmap, points: &[Pos2], width: f32, color: Color32) -> Result<()> {
    let Some((first, rest)) = points.split_first() else {
        return Ok(());
    };
    if rest.iter().all(|point| point == first) {
        return fill_circle(pixmap, *first, width / 2.0, color);
    }
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for point in rest {
        pb.line_to(point.x, point.y);
    }
    let path = pb.finish().ok_or_else(|| anyhow!("cannot build stroke path"))?;
    let stroke = Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &paint_for(color), &stroke, Transform::identity(), None);
    Ok(())
}

fn fill_circle(pixmap: &mut Pixmap, center: Pos2, radius: f32, color: Color32) -> Result<()> {
    let path = PathBuilder::from_circle(center.x, center.y, radius.max(0.5))
        .ok_or_else(|| anyhow!("cannot build circle path"))?;
    pixmap.fill_path(
        &path,
        &paint_for(color),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    Ok(())
}

fn draw_text_primitives(image: &mut RgbaImage, scene: &[Primitive]) {
    let texts = scene.iter().filter_map(|primitive| match primitive {
        Primitive::Text {
            anchor,
            align,
            text,
            size,
            color,
        } => Some((*anchor, *align, text.as_str(), *size, *color)),
        _ => None,
    });

    let mut texts = texts.peekable();
    if texts.peek().is_none() {
        return;
    }
    let Some(font) = load_system_font() else {
        tracing::warn!("no system font found; exporting without text");
        return;
    };

    for (anchor, align, text, size, color) in texts {
        let (width, _) = text_size(size, &font, text);
        let left = match align {
            TextAlign::Start => anchor.x,
            TextAlign::Middle => anchor.x - width as f32 / 2.0,
        };
        let top = pos2(left, anchor.y - size * ASCENT);

        let halo = Rgba(HALO.to_srgba_unmultiplied());
        for (dx, dy) in [(-1, -1), (1, -1), (-1, 1), (1, 1)] {
            draw_text_mut(
                image,
                halo,
                top.x as i32 + dx,
                top.y as i32 + dy,
                size,
                &font,
                text,
            );
        }
        draw_text_mut(
            image,
            Rgba(color.to_srgba_unmultiplied()),
            top.x as i32,
            top.y as i32,
            size,
            &font,
            text,
        );
    }
}

fn load_system_font() -> Option<FontArc> {
    let candidates = [
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Helvetica.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    for path in candidates {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontArc::try_from_vec(bytes) {
                return Some(font);
            }
        }
    }

    None
}
