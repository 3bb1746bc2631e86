//! Page geometry for a single image
//!
//! Every page holds exactly one image. The page size comes either from the
//! image itself (automatic paper size, 96 DPI assumed) or from a fixed paper
//! size, in which case the image is scaled uniformly to fit and centered.

use crate::settings::PdfSettings;
use crate::types::Orientation;

/// Points per pixel for an image at the nominal 96 DPI
pub const PX_TO_PT: f32 = 72.0 / 96.0;

const MM_PER_INCH: f32 = 25.4;

pub fn mm_to_pt(mm: f32) -> f32 {
    mm / MM_PER_INCH * 72.0
}

/// Where the image is drawn on its page, in points from the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Points per image pixel
    pub scale: f32,
}

/// Page size plus image placement for one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub placement: Placement,
}

/// Resolve the orientation of a fixed-size page for an image.
///
/// Returns `Portrait` or `Landscape`, never `Automatic`.
pub fn effective_orientation(
    orientation: Orientation,
    width_px: u32,
    height_px: u32,
) -> Orientation {
    match orientation {
        Orientation::Portrait => Orientation::Portrait,
        Orientation::Landscape => Orientation::Landscape,
        Orientation::Automatic if height_px > width_px => Orientation::Portrait,
        Orientation::Automatic => Orientation::Landscape,
    }
}

/// Compute the page layout for an image of `width_px` x `height_px` pixels.
///
/// Both dimensions must be non-zero.
pub fn compute_page_layout(width_px: u32, height_px: u32, settings: &PdfSettings) -> PageLayout {
    let w = width_px as f32;
    let h = height_px as f32;

    let Some((portrait_width, portrait_height)) = settings.paper_size.dimensions_pt() else {
        let page_width = w * PX_TO_PT;
        let page_height = h * PX_TO_PT;
        return PageLayout {
            page_width,
            page_height,
            placement: Placement {
                x: 0.0,
                y: 0.0,
                width: page_width,
                height: page_height,
                scale: PX_TO_PT,
            },
        };
    };

    let (page_width, page_height) =
        match effective_orientation(settings.orientation, width_px, height_px) {
            Orientation::Landscape => (portrait_height, portrait_width),
            _ => (portrait_width, portrait_height),
        };

    let scale = (page_width / w).min(page_height / h);
    let width = w * scale;
    let height = h * scale;

    PageLayout {
        page_width,
        page_height,
        placement: Placement {
            x: (page_width - width) / 2.0,
            y: (page_height - height) / 2.0,
            width,
            height,
            scale,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_conversion() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-4);
        assert!((mm_to_pt(210.0) - 595.2756).abs() < 1e-3);
    }

    #[test]
    fn automatic_orientation_square_is_landscape() {
        assert_eq!(
            effective_orientation(Orientation::Automatic, 500, 500),
            Orientation::Landscape
        );
        assert_eq!(
            effective_orientation(Orientation::Automatic, 499, 500),
            Orientation::Portrait
        );
    }
}
