//! Page rasterisation for the vision model: single-page PDF → base64 PNG.
//!
//! ## Why cap pixels, not DPI?
//!
//! BOL scans arrive at every physical size. `max_rendered_pixels` caps the
//! longest edge regardless, keeping memory bounded and the image inside the
//! size range vision models read fine print at.
//!
//! ## Why PNG with `detail: "high"`?
//!
//! Lossless compression keeps handwritten notes and checkbox marks crisp;
//! the high-detail hint makes tiling providers look at the full image rather
//! than a single downscaled tile.

use crate::error::PageError;
use crate::output::PageDocument;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use tracing::debug;

/// Render the first page of `page` to an [`ImageData`] on the blocking pool.
pub async fn rasterise_page(
    page: &PageDocument,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<ImageData, PageError> {
    let page_num = page.page_number();
    let bytes = page.bytes().to_vec();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let image = render_blocking(page_num, &bytes, max_pixels, password.as_deref())?;
        encode_png(&image).map_err(|e| PageError::Render {
            page: page_num,
            detail: format!("Image encoding failed: {}", e),
        })
    })
    .await
    .map_err(|e| PageError::Render {
        page: page_num,
        detail: format!("Render task panicked: {}", e),
    })?
}

fn render_blocking(
    page_num: usize,
    bytes: &[u8],
    max_pixels: u32,
    password: Option<&str>,
) -> Result<DynamicImage, PageError> {
    let render_err = |detail: String| PageError::Render {
        page: page_num,
        detail,
    };

    let pdfium = pdfium_auto::bind_pdfium_silent().map_err(|e| render_err(e.to_string()))?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| render_err(format!("{:?}", e)))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let pages = document.pages();
    let page = pages
        .get(0)
        .map_err(|e| render_err(format!("{:?}", e)))?;
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| render_err(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_num,
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Encode a rendered page as a base64 PNG attachment.
pub fn encode_png(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_png_produces_valid_base64_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([0, 0, 0, 255])));
        let data = encode_png(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");

        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
