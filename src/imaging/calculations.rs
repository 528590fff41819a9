//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions of `source` scaled to fit inside `bounds`, preserving aspect
/// ratio. Sources already inside the box are returned unchanged.
///
/// ```
/// # use gallery_ingest::imaging::fit_within;
/// // 4000x3000 landscape into a 1200x1800 portrait box → width-limited
/// assert_eq!(fit_within((4000, 3000), (1200, 1800)), (1200, 900));
///
/// // small sources are never upscaled
/// assert_eq!(fit_within((640, 480), (1200, 1800)), (640, 480));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return source;
    }

    let scale = f64::min(max_w as f64 / src_w as f64, max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Whether `source` needs shrinking to fit `bounds`.
pub fn exceeds(source: (u32, u32), bounds: (u32, u32)) -> bool {
    source.0 > bounds.0 || source.1 > bounds.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portrait_height_limited() {
        // 3000x6000 into 1200x1800: height limits (0.3), width 900
        assert_eq!(fit_within((3000, 6000), (1200, 1800)), (900, 1800));
    }

    #[test]
    fn landscape_width_limited() {
        assert_eq!(fit_within((4000, 3000), (1200, 1800)), (1200, 900));
    }

    #[test]
    fn exact_fit_unchanged() {
        assert_eq!(fit_within((1200, 1800), (1200, 1800)), (1200, 1800));
    }

    #[test]
    fn never_upscales() {
        assert_eq!(fit_within((10, 10), (1200, 1800)), (10, 10));
    }

    #[test]
    fn preview_box() {
        // 1200x1800 into 10x10: height limits, width rounds to 7
        assert_eq!(fit_within((1200, 1800), (10, 10)), (7, 10));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within((10000, 10), (10, 10)), (10, 1));
    }

    #[test]
    fn poster_box_for_landscape_frame() {
        // 1280x720 frame into 720x1280: width limits
        assert_eq!(fit_within((1280, 720), (720, 1280)), (720, 405));
    }

    #[test]
    fn exceeds_checks_either_edge() {
        assert!(exceeds((1300, 100), (1200, 1800)));
        assert!(exceeds((100, 1900), (1200, 1800)));
        assert!(!exceeds((1200, 1800), (1200, 1800)));
    }
}
