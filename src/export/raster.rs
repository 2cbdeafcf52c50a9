//! Rasterizes an SVG annotation layer and embeds it as a full-page image.

use super::ExportError;
use super::document;
use flate2::{Compression, write::ZlibEncoder};
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use log::debug;
use resvg::{tiny_skia, usvg};
use std::io::Write;

/// Largest raster edge in pixels; bigger pages are rendered at a lower scale.
pub const MAX_RASTER_EDGE: u32 = 16_384;

/// An RGBA raster split into the two planes an image XObject needs.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRaster {
    pub width: u32,
    pub height: u32,
    /// Straight (non-premultiplied) RGB, 3 bytes per pixel
    pub rgb: Vec<u8>,
    /// One alpha byte per pixel
    pub alpha: Vec<u8>,
}

/// Renders `svg` at `scale` pixels per page unit onto a transparent buffer.
pub fn rasterize_svg(
    svg: &str,
    page_width: f64,
    page_height: f64,
    scale: f64,
) -> Result<LayerRaster, ExportError> {
    let tree = usvg::Tree::from_str(svg, &usvg::Options::default())
        .map_err(|e| ExportError::Raster(format!("invalid annotation layer: {e}")))?;

    let width = pixel_extent(page_width, scale);
    let height = pixel_extent(page_height, scale);
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| ExportError::Raster(format!("cannot allocate {width}x{height} raster")))?;

    let transform = tiny_skia::Transform::from_scale(
        (width as f64 / page_width.max(f64::EPSILON)) as f32,
        (height as f64 / page_height.max(f64::EPSILON)) as f32,
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let pixels = pixmap.pixels();
    let mut rgb = Vec::with_capacity(pixels.len() * 3);
    let mut alpha = Vec::with_capacity(pixels.len());
    for pixel in pixels {
        let color = pixel.demultiply();
        rgb.extend_from_slice(&[color.red(), color.green(), color.blue()]);
        alpha.push(color.alpha());
    }

    Ok(LayerRaster {
        width,
        height,
        rgb,
        alpha,
    })
}

/// Draws `svg` over page `page_number` of `source` as a flattened image layer.
///
/// `progress` receives a short phase description before each step.
pub fn rasterize_into_page(
    source: &[u8],
    page_number: u32,
    svg: &str,
    scale: f64,
    compress_streams: bool,
    progress: &mut dyn FnMut(&str),
) -> Result<Vec<u8>, ExportError> {
    let mut doc = document::load(source)?;
    let page_id = doc
        .get_pages()
        .get(&page_number)
        .copied()
        .ok_or_else(|| ExportError::Raster(format!("page {page_number} not found in document")))?;
    let info = document::page_info(&doc, page_id);

    progress("rasterizing");
    let raster = rasterize_svg(svg, info.width, info.height, scale)?;
    debug!(
        "Page {} layer rasterized at {}x{}",
        page_number, raster.width, raster.height
    );

    progress("encoding");
    let alpha = deflate(&raster.alpha)?;
    let rgb = deflate(&raster.rgb)?;

    progress("embedding");
    let image_dict = |color_space: &str| {
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(raster.width)),
            "Height" => Object::Integer(i64::from(raster.height)),
            "ColorSpace" => color_space,
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => "FlateDecode",
        }
    };
    let mask_id = doc.add_object(Stream::new(image_dict("DeviceGray"), alpha));
    let mut layer = image_dict("DeviceRGB");
    layer.set("SMask", Object::Reference(mask_id));
    let layer_id = doc.add_object(Stream::new(layer, rgb));

    let name = document::add_page_resource(
        &mut doc,
        page_id,
        "XObject",
        "ExamLayer",
        Object::Reference(layer_id),
    )?;

    let [x0, y0] = match document::media_box(&doc, page_id) {
        Some([x0, y0, _, _]) => [x0, y0],
        None => [0.0, 0.0],
    };
    let real = |value: f64| Object::Real(value as f32);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(info.width),
                    real(0.0),
                    real(0.0),
                    real(info.height),
                    real(x0),
                    real(y0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    }
    .encode()
    .map_err(|e| ExportError::Encode(e.to_string()))?;
    document::append_page_content(&mut doc, page_id, content)?;

    progress("saving");
    document::save(&mut doc, compress_streams)
}

fn pixel_extent(page_extent: f64, scale: f64) -> u32 {
    let pixels = (page_extent * scale).ceil();
    if pixels.is_finite() {
        (pixels as u32).clamp(1, MAX_RASTER_EDGE)
    } else {
        1
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ExportError::Encode(format!("failed to compress image: {e}")))?;
    encoder
        .finish()
        .map_err(|e| ExportError::Encode(format!("failed to finalise compressed image: {e}")))
}
