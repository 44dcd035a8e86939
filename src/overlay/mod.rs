pub mod browser;

use crate::caption::CaptionChunk;
use crate::error::{AutocapError, AutocapResult};
use image::{imageops, Rgba, RgbaImage};
use tracing::{debug, trace};

/// Extra pixels between the caption panel and the bottom margin.
const BOTTOM_OFFSET: i64 = 20;

/// Largest accepted panel padding, in pixels.
pub const MAX_PADDING: u32 = 4096;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// CSS hex notation, e.g. `#ffffff`.
    pub fn to_css(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// How caption text is drawn and backed.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font: String,
    pub size: u32,
    pub text_color: Rgb,
    pub background_color: Rgb,
    /// 0.0 is fully transparent, 1.0 opaque.
    pub background_opacity: f64,
    pub padding: u32,
    pub clamp_to_frame: bool,
}

/// Pixel size of the base video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

/// Renders a line of text to a tightly cropped RGBA bitmap.
pub trait TextRasterizer {
    fn render(&self, text: &str, style: &CaptionStyle) -> AutocapResult<RgbaImage>;
}

/// A positioned caption panel and the window it is shown in.
#[derive(Debug, Clone)]
pub struct OverlayFrame {
    pub bitmap: RgbaImage,
    pub x: i64,
    pub y: i64,
    pub start_time: f64,
    pub end_time: f64,
}

/// Pad a text bitmap into its background panel.
///
/// The panel is `text_width + 2 * padding` wide and `text_height + padding`
/// tall; the text is inset `padding` from the left and centered vertically.
/// Fails if the panel size does not fit in `u32`.
pub fn build_panel(text: &RgbaImage, style: &CaptionStyle) -> AutocapResult<RgbaImage> {
    let padding = style.padding;
    let width = padding.checked_mul(2).and_then(|p| text.width().checked_add(p));
    let height = text.height().checked_add(padding);
    let (Some(width), Some(height)) = (width, height) else {
        return Err(AutocapError::Rasterization(format!(
            "padding {padding} around a {}x{} bitmap overflows the panel size",
            text.width(),
            text.height()
        )));
    };
    let alpha = (style.background_opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let Rgb(r, g, b) = style.background_color;

    let mut panel = RgbaImage::from_pixel(width, height, Rgba([r, g, b, alpha]));
    let top = (height - text.height()) / 2;
    imageops::overlay(&mut panel, text, i64::from(padding), i64::from(top));
    Ok(panel)
}

/// Screen position of a panel: a fixed anchor a quarter of the way in from the
/// left, sitting above a bottom margin of `height / 30 + 20` pixels.
///
/// The anchor ignores panel width, so long captions can run past the right
/// edge unless `clamp` is set.
pub fn anchor(frame: FrameGeometry, panel_width: u32, panel_height: u32, clamp: bool) -> (i64, i64) {
    let width = i64::from(frame.width);
    let height = i64::from(frame.height);
    let mut x = width / 4;
    let mut y = height - i64::from(panel_height) - height / 30 - BOTTOM_OFFSET;

    if clamp {
        x = x.min(width - i64::from(panel_width)).max(0);
        y = y.min(height - i64::from(panel_height)).max(0);
    }
    (x, y)
}

/// Turn every chunk into a positioned overlay.
///
/// Fails on the first chunk that cannot be rasterized; no partial list is returned.
pub fn composite<I>(
    frame: FrameGeometry,
    chunks: I,
    style: &CaptionStyle,
    rasterizer: &dyn TextRasterizer,
) -> AutocapResult<Vec<OverlayFrame>>
where
    I: IntoIterator<Item = CaptionChunk>,
{
    let mut overlays = Vec::new();

    for chunk in chunks {
        let text = rasterizer.render(&chunk.display_text, style)?;
        if text.width() == 0 || text.height() == 0 {
            return Err(AutocapError::Rasterization(format!(
                "\"{}\" rendered to an empty bitmap",
                chunk.display_text
            )));
        }

        let panel = build_panel(&text, style)?;
        let (x, y) = anchor(frame, panel.width(), panel.height(), style.clamp_to_frame);
        trace!(
            "Overlay {:.3}-{:.3}s at ({x}, {y}), {}x{}: {}",
            chunk.start_time,
            chunk.end_time,
            panel.width(),
            panel.height(),
            chunk.display_text
        );

        overlays.push(OverlayFrame {
            bitmap: panel,
            x,
            y,
            start_time: chunk.start_time,
            end_time: chunk.end_time,
        });
    }

    debug!("Composited {} caption overlay(s)", overlays.len());
    Ok(overlays)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Produces solid text-colored blocks of a fixed size per character.
    struct BlockRasterizer {
        char_width: u32,
        height: u32,
    }

    impl TextRasterizer for BlockRasterizer {
        fn render(&self, text: &str, style: &CaptionStyle) -> AutocapResult<RgbaImage> {
            let Rgb(r, g, b) = style.text_color;
            Ok(RgbaImage::from_pixel(
                self.char_width * text.chars().count() as u32,
                self.height,
                Rgba([r, g, b, 255]),
            ))
        }
    }

    struct MissingGlyphRasterizer;

    impl TextRasterizer for MissingGlyphRasterizer {
        fn render(&self, text: &str, _style: &CaptionStyle) -> AutocapResult<RgbaImage> {
            if text.contains('!') {
                Err(AutocapError::Rasterization("no glyph for '!'".into()))
            } else {
                Ok(RgbaImage::new(10, 10))
            }
        }
    }

    fn style(padding: u32, opacity: f64) -> CaptionStyle {
        CaptionStyle {
            font: "Amiri".into(),
            size: 34,
            text_color: Rgb(255, 255, 255),
            background_color: Rgb(0, 0, 0),
            background_opacity: opacity,
            padding,
            clamp_to_frame: false,
        }
    }

    fn chunk(start: f64, end: f64, text: &str) -> CaptionChunk {
        CaptionChunk {
            start_time: start,
            end_time: end,
            display_text: text.into(),
        }
    }

    const HD: FrameGeometry = FrameGeometry {
        width: 1920,
        height: 1080,
    };

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse("#FF8000"), Some(Rgb(255, 128, 0)));
        assert_eq!(Rgb::parse("00ff00"), Some(Rgb(0, 255, 0)));
        assert_eq!(Rgb::parse("#FFF"), None);
        assert_eq!(Rgb::parse("white"), None);
        assert_eq!(Rgb::parse("#GG0000"), None);
        assert_eq!(Rgb(255, 128, 0).to_css(), "#ff8000");
    }

    #[test]
    fn test_panel_geometry_and_position() {
        // 20 chars x 10px = 200px wide text, 40px tall.
        let rasterizer = BlockRasterizer {
            char_width: 10,
            height: 40,
        };
        let text = "abcdefghijklmnopqrst";
        let overlays =
            composite(HD, vec![chunk(0.0, 1.0, text)], &style(20, 0.5), &rasterizer).unwrap();

        let overlay = &overlays[0];
        assert_eq!(overlay.bitmap.width(), 240);
        assert_eq!(overlay.bitmap.height(), 60);
        assert_eq!(overlay.x, 480);
        assert_eq!(overlay.y, 1080 - 60 - 36 - 20);
        assert_eq!(overlay.start_time, 0.0);
        assert_eq!(overlay.end_time, 1.0);
    }

    #[test]
    fn test_panel_background_and_text_inset() {
        let text = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let panel = build_panel(&text, &style(6, 0.5)).unwrap();
        assert_eq!(panel.dimensions(), (16, 10));

        // Background pixel: black at half opacity.
        assert_eq!(panel.get_pixel(0, 0), &Rgba([0, 0, 0, 128]));
        // Text starts `padding` from the left, vertically centered: (10 - 4) / 2 = 3.
        assert_eq!(panel.get_pixel(6, 3).0[..3], [255, 255, 255]);
        assert_eq!(panel.get_pixel(9, 6).0[..3], [255, 255, 255]);
        assert_eq!(panel.get_pixel(5, 3), &Rgba([0, 0, 0, 128]));
        assert_eq!(panel.get_pixel(6, 2), &Rgba([0, 0, 0, 128]));
        assert_eq!(panel.get_pixel(10, 3), &Rgba([0, 0, 0, 128]));
    }

    #[test]
    fn test_transparent_background() {
        let text = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let panel = build_panel(&text, &style(4, 0.0)).unwrap();
        assert_eq!(panel.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_anchor_ignores_panel_width() {
        let narrow = anchor(HD, 100, 50, false);
        let wide = anchor(HD, 1800, 50, false);
        assert_eq!(narrow, wide);
        assert_eq!(narrow, (480, 1080 - 50 - 36 - 20));
    }

    #[test]
    fn test_long_caption_overflows_without_clamp() {
        let (x, _) = anchor(HD, 1800, 50, false);
        assert!(x + 1800 > 1920, "fixed anchor lets wide panels overflow");
    }

    #[test]
    fn test_clamp_keeps_panel_in_frame() {
        let (x, y) = anchor(HD, 1800, 50, true);
        assert_eq!(x, 120);
        assert_eq!(y, 1080 - 50 - 36 - 20);

        // Wider than the frame: pinned to the left edge.
        let (x, _) = anchor(HD, 2500, 50, true);
        assert_eq!(x, 0);

        // Taller than the frame: pinned to the top edge.
        let (_, y) = anchor(FrameGeometry { width: 640, height: 100 }, 100, 200, true);
        assert_eq!(y, 0);
    }

    #[test]
    fn test_clamp_is_noop_for_small_panels() {
        assert_eq!(anchor(HD, 240, 60, true), anchor(HD, 240, 60, false));
    }

    #[test]
    fn test_overlays_follow_chunk_order_and_timing() {
        let rasterizer = BlockRasterizer {
            char_width: 8,
            height: 30,
        };
        let chunks = vec![
            chunk(0.0, 1.0, "Hello"),
            chunk(1.0, 2.0, "Hello World"),
            chunk(2.0, 16.0, "Hello World !"),
        ];
        let overlays = composite(HD, chunks, &style(5, 0.0), &rasterizer).unwrap();
        assert_eq!(overlays.len(), 3);
        assert_eq!(overlays[1].start_time, 1.0);
        assert_eq!(overlays[2].end_time, 16.0);
        assert!(overlays[2].bitmap.width() > overlays[0].bitmap.width());
        // All share the same anchor.
        assert!(overlays.iter().all(|o| o.x == 480));
    }

    #[test]
    fn test_rasterization_failure_is_fatal() {
        let chunks = vec![chunk(0.0, 1.0, "Hello"), chunk(1.0, 2.0, "Hello !")];
        let err = composite(HD, chunks, &style(5, 0.0), &MissingGlyphRasterizer).unwrap_err();
        assert!(matches!(err, AutocapError::Rasterization(_)));
    }

    #[test]
    fn test_empty_bitmap_is_rasterization_error() {
        let rasterizer = BlockRasterizer {
            char_width: 0,
            height: 30,
        };
        let err = composite(HD, vec![chunk(0.0, 1.0, "x")], &style(5, 0.0), &rasterizer)
            .unwrap_err();
        assert!(matches!(err, AutocapError::Rasterization(_)));
    }

    #[test]
    fn test_oversized_padding_is_rasterization_error() {
        let text = RgbaImage::new(2, 2);
        let err = build_panel(&text, &style(3_000_000_000, 0.0)).unwrap_err();
        assert!(matches!(err, AutocapError::Rasterization(_)));
    }
}
