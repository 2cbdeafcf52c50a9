//! Cairo-based rendering of annotation strokes.

use super::color::Color;
use super::path::{PathSegment, pressure_width, quad_to_cubic, smoothed_segments};
use super::stroke::{Annotation, Stroke};
use crate::input::Tool;

/// Redraws a whole page layer.
///
/// Clears the surface, applies the viewport scale so annotations can be given
/// in document units, draws every committed annotation in order and finally the
/// in-progress stroke (if any) on top. A list entry sharing the active stroke's
/// id is its live preview copy and is skipped so it is not drawn twice.
///
/// # Arguments
/// * `ctx` - Cairo drawing context of the raster surface
/// * `annotations` - Committed annotations for the page, bottom first
/// * `active` - Stroke currently being drawn, not yet committed
/// * `scale` - Viewport scale (surface pixels per document unit)
pub fn render_page(
    ctx: &cairo::Context,
    annotations: &[Annotation],
    active: Option<&Stroke>,
    scale: f64,
) -> Result<(), cairo::Error> {
    ctx.save()?;
    ctx.set_operator(cairo::Operator::Clear);
    ctx.paint()?;
    ctx.restore()?;

    ctx.save()?;
    ctx.scale(scale, scale);
    let active_id = active.map(|stroke| stroke.id.as_str());
    for annotation in annotations {
        if Some(annotation.id()) == active_id {
            continue;
        }
        render_annotation(ctx, annotation)?;
    }
    if let Some(stroke) = active {
        render_stroke(ctx, stroke)?;
    }
    ctx.restore()?;

    Ok(())
}

/// Renders a single annotation, dispatching on its kind.
pub fn render_annotation(ctx: &cairo::Context, annotation: &Annotation) -> Result<(), cairo::Error> {
    match annotation {
        Annotation::Stroke(stroke) => render_stroke(ctx, stroke),
    }
}

/// Renders one stroke with its tool's compositing.
///
/// The stroke is first drawn opaque into a group and the group is then
/// composited once: `Over` for the pen, `Multiply` at capped opacity for the
/// highlighter and `DestOut` for the eraser. Compositing the group as a whole
/// keeps overlapping round caps of neighbouring segments from stacking alpha.
/// Strokes with fewer than two points draw nothing.
pub fn render_stroke(ctx: &cairo::Context, stroke: &Stroke) -> Result<(), cairo::Error> {
    if !stroke.is_drawable() {
        return Ok(());
    }

    let (operator, opacity) = match stroke.tool {
        Tool::Pen => (cairo::Operator::Over, stroke.tool.effective_opacity(stroke.opacity)),
        Tool::Highlighter => (
            cairo::Operator::Multiply,
            stroke.tool.effective_opacity(stroke.opacity),
        ),
        Tool::Eraser => (cairo::Operator::DestOut, 1.0),
    };
    let color = Color::from_hex_or_black(&stroke.color);

    ctx.save()?;
    ctx.push_group();
    ctx.set_source_rgb(color.r, color.g, color.b);
    ctx.set_line_cap(cairo::LineCap::Round);
    ctx.set_line_join(cairo::LineJoin::Round);

    for weighted in smoothed_segments(&stroke.points) {
        ctx.set_line_width(pressure_width(stroke.size, weighted.pressure));
        trace_segment(ctx, &weighted.segment);
        ctx.stroke()?;
    }

    ctx.pop_group_to_source()?;
    ctx.set_operator(operator);
    ctx.paint_with_alpha(opacity)?;
    ctx.restore()?;

    Ok(())
}

fn trace_segment(ctx: &cairo::Context, segment: &PathSegment) {
    match *segment {
        PathSegment::Line { from, to } => {
            ctx.move_to(from.0, from.1);
            ctx.line_to(to.0, to.1);
        }
        PathSegment::Quad { from, ctrl, to } => {
            let (c1, c2) = quad_to_cubic(from, ctrl, to);
            ctx.move_to(from.0, from.1);
            ctx.curve_to(c1.0, c1.1, c2.0, c2.1, to.0, to.1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::Point;

    fn surface(width: i32, height: i32) -> (cairo::ImageSurface, cairo::Context) {
        let surface = cairo::ImageSurface::create(cairo::Format::ARgb32, width, height).unwrap();
        let ctx = cairo::Context::new(&surface).unwrap();
        (surface, ctx)
    }

    fn pixel(surface: &mut cairo::ImageSurface, x: usize, y: usize) -> [u8; 4] {
        surface.flush();
        let stride = surface.stride() as usize;
        let data = surface.data().unwrap();
        let offset = y * stride + x * 4;
        [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]
    }

    fn horizontal(tool: Tool, color: &str, opacity: f64, y: f64) -> Stroke {
        let mut stroke = Stroke::begin(tool, color, 6.0, opacity, Point::new(5.0, y));
        stroke.points.push(Point::new(25.0, y));
        stroke.points.push(Point::new(45.0, y));
        stroke
    }

    #[test]
    fn pen_draws_opaque_pixels_under_the_stroke() {
        let (mut surface, ctx) = surface(50, 50);
        let stroke = horizontal(Tool::Pen, "#ff0000", 1.0, 20.0);
        render_page(&ctx, &[Annotation::Stroke(stroke)], None, 1.0).unwrap();
        drop(ctx);

        // ARGB32 is BGRA in memory on little-endian hosts
        let [b, g, r, a] = pixel(&mut surface, 25, 20);
        assert_eq!(a, 255);
        assert_eq!((r, g, b), (255, 0, 0));
        assert_eq!(pixel(&mut surface, 25, 40)[3], 0);
    }

    #[test]
    fn highlighter_alpha_never_exceeds_cap() {
        let (mut surface, ctx) = surface(50, 50);
        let stroke = horizontal(Tool::Highlighter, "#ffff00", 1.0, 20.0);
        render_page(&ctx, &[Annotation::Stroke(stroke)], None, 1.0).unwrap();
        drop(ctx);

        let alpha = pixel(&mut surface, 25, 20)[3];
        assert!(alpha > 0);
        assert!(alpha <= 103, "alpha {alpha} above the 0.4 cap");
    }

    #[test]
    fn highlighter_multiplies_with_ink_below() {
        let (mut surface, ctx) = surface(50, 50);
        let pen = horizontal(Tool::Pen, "#0000ff", 1.0, 20.0);
        let highlighter = horizontal(Tool::Highlighter, "#ffff00", 1.0, 20.0);
        render_page(&ctx, &[pen.into(), highlighter.into()], None, 1.0).unwrap();
        drop(ctx);

        // Multiply: blue x yellow is black, mixed in at 0.4 -> (0, 0, 153).
        // Over would give (102, 102, 153) instead.
        let [b, g, r, a] = pixel(&mut surface, 25, 20);
        assert_eq!(a, 255);
        assert!(r <= 3 && g <= 3, "({r}, {g}, {b}) is not a multiply result");
        assert!((150..=156).contains(&b), "blue channel {b}");
    }

    #[test]
    fn eraser_removes_pixels_below_it() {
        let (mut surface, ctx) = surface(50, 50);
        let pen = horizontal(Tool::Pen, "#000000", 1.0, 20.0);
        let eraser = horizontal(Tool::Eraser, "#ffffff", 1.0, 20.0);
        render_page(&ctx, &[pen.into(), eraser.into()], None, 1.0).unwrap();
        drop(ctx);

        assert_eq!(pixel(&mut surface, 25, 20)[3], 0);
    }

    #[test]
    fn active_stroke_is_drawn_and_scale_is_applied() {
        let (mut surface, ctx) = surface(100, 100);
        let stroke = horizontal(Tool::Pen, "#0000ff", 1.0, 20.0);
        render_page(&ctx, &[], Some(&stroke), 2.0).unwrap();
        drop(ctx);

        assert_eq!(pixel(&mut surface, 50, 40)[3], 255);
        assert_eq!(pixel(&mut surface, 50, 20)[3], 0);
    }

    #[test]
    fn preview_copy_of_active_stroke_is_not_drawn_twice() {
        let stroke = horizontal(Tool::Highlighter, "#ffff00", 1.0, 20.0);

        let (mut alone, ctx) = surface(50, 50);
        render_page(&ctx, &[], Some(&stroke), 1.0).unwrap();
        drop(ctx);

        let (mut with_copy, ctx) = surface(50, 50);
        render_page(&ctx, &[stroke.clone().into()], Some(&stroke), 1.0).unwrap();
        drop(ctx);

        assert_eq!(pixel(&mut alone, 25, 20), pixel(&mut with_copy, 25, 20));
    }

    #[test]
    fn single_point_strokes_draw_nothing() {
        let (mut surface, ctx) = surface(20, 20);
        let stroke = Stroke::begin(Tool::Pen, "#000000", 10.0, 1.0, Point::new(10.0, 10.0));
        render_page(&ctx, &[Annotation::Stroke(stroke)], None, 1.0).unwrap();
        drop(ctx);

        surface.flush();
        assert!(surface.data().unwrap().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn rendering_twice_is_pixel_identical() {
        let annotations: Vec<Annotation> = vec![
            horizontal(Tool::Pen, "#123456", 0.8, 10.0).into(),
            horizontal(Tool::Highlighter, "#ffff00", 0.9, 14.0).into(),
            horizontal(Tool::Eraser, "#000000", 1.0, 30.0).into(),
        ];
        let (mut surface, ctx) = surface(60, 60);

        render_page(&ctx, &annotations, None, 1.0).unwrap();
        drop(ctx);
        surface.flush();
        let first = surface.data().unwrap().to_vec();

        let ctx = cairo::Context::new(&surface).unwrap();
        render_page(&ctx, &annotations, None, 1.0).unwrap();
        drop(ctx);
        surface.flush();
        let second = surface.data().unwrap().to_vec();

        assert!(first.iter().any(|byte| *byte != 0));
        assert_eq!(first, second);
    }
}
