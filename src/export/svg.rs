//! SVG serialization of a page's annotation layer.
//!
//! The output mirrors the live renderer: the same smoothed segments and
//! pressure widths, multiply blending for highlighters, and erasers that cut
//! through everything drawn before them (an SVG `<mask>`).

use crate::draw::{
    Annotation, Color, PageInfo, PathSegment, Stroke, pressure_width, smoothed_segments,
};
use crate::input::Tool;
use std::fmt::Write;

/// Serializes `annotations` as a standalone SVG document sized to the page,
/// in page units with y growing downward.
pub fn layer_svg(info: &PageInfo, annotations: &[Annotation]) -> String {
    let mut defs = String::new();
    let mut body = String::new();
    let mut mask_count = 0;

    for annotation in annotations {
        match annotation {
            Annotation::Stroke(stroke) if stroke.is_drawable() => match stroke.tool {
                Tool::Pen | Tool::Highlighter => write_stroke_group(&mut body, info, stroke),
                Tool::Eraser => {
                    mask_count += 1;
                    let id = format!("erase{mask_count}");
                    write_eraser_mask(&mut defs, &id, info, stroke);
                    body = format!("<g mask=\"url(#{id})\">{body}</g>");
                }
            },
            Annotation::Stroke(_) => {}
        }
    }

    let mut svg = String::with_capacity(defs.len() + body.len() + 256);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = num(info.width),
        h = num(info.height),
    );
    if !defs.is_empty() {
        let _ = write!(svg, "<defs>{defs}</defs>");
    }
    svg.push_str(&body);
    svg.push_str("</svg>");
    svg
}

fn write_stroke_group(out: &mut String, info: &PageInfo, stroke: &Stroke) {
    let opacity = stroke.tool.effective_opacity(stroke.opacity);
    let color = Color::from_hex_or_black(&stroke.color).to_hex();
    let blend = match stroke.tool {
        Tool::Highlighter => " style=\"mix-blend-mode:multiply\"",
        Tool::Pen | Tool::Eraser => "",
    };

    let _ = write!(out, "<g opacity=\"{}\"{blend}>", num(opacity));
    write_segments(out, info, stroke, &color);
    out.push_str("</g>");
}

/// A mask that is white everywhere except under the eraser's path.
fn write_eraser_mask(out: &mut String, id: &str, info: &PageInfo, stroke: &Stroke) {
    let _ = write!(
        out,
        "<mask id=\"{id}\" maskUnits=\"userSpaceOnUse\" x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\">\
         <rect width=\"{w}\" height=\"{h}\" fill=\"#ffffff\"/>",
        w = num(info.width),
        h = num(info.height),
    );
    write_segments(out, info, stroke, "#000000");
    out.push_str("</mask>");
}

/// Widths follow the page's `/UserUnit`, as in the vector pipeline.
fn write_segments(out: &mut String, info: &PageInfo, stroke: &Stroke, color: &str) {
    let unit = info.user_unit_or_default();
    for weighted in smoothed_segments(&stroke.points) {
        let d = match weighted.segment {
            PathSegment::Line { from, to } => format!(
                "M{} {} L{} {}",
                num(from.0),
                num(from.1),
                num(to.0),
                num(to.1)
            ),
            PathSegment::Quad { from, ctrl, to } => format!(
                "M{} {} Q{} {} {} {}",
                num(from.0),
                num(from.1),
                num(ctrl.0),
                num(ctrl.1),
                num(to.0),
                num(to.1)
            ),
        };
        let _ = write!(
            out,
            "<path d=\"{d}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{}\" \
             stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
            num(pressure_width(stroke.size, weighted.pressure) * unit),
        );
    }
}

/// Compact decimal form: at most three fractional digits, no trailing zeros.
fn num(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
