use chrono::NaiveDate;

use crate::loader::DecodedImage;
use crate::model::{Comic, FavoriteEntry};

// ---------------------------------------------------------------------------
// Fit to viewport
// ---------------------------------------------------------------------------

/// Size limits applied by [`fit_scale`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPolicy {
    /// Minimum width and height. Small images grow to reach it, regardless
    /// of `up_scale_limit`.
    pub min_size: f64,
    /// Smallest factor allowed when shrinking an image that is slightly too
    /// large. Images never shrink below `min_size`.
    pub down_scale_limit: f64,
    /// Largest factor allowed when growing an image smaller than the viewport.
    pub up_scale_limit: f64,
}

impl Default for FitPolicy {
    fn default() -> Self {
        Self {
            min_size: 250.0,
            down_scale_limit: 0.70,
            up_scale_limit: 4.0,
        }
    }
}

/// Scale factor for showing an `img_w` x `img_h` image in a `win_w` x `win_h`
/// viewport. Viewport dimensions may be infinite.
pub fn fit_scale(img_w: f64, img_h: f64, win_w: f64, win_h: f64, policy: &FitPolicy) -> f64 {
    let min_size = policy.min_size;
    let mut scale = 1.0;

    if img_w < min_size || img_h < min_size {
        scale = (min_size / img_w).max(min_size / img_h);
    }
    let floor = scale;

    let fit = (win_w / (img_w * scale)).min(win_h / (img_h * scale));
    if img_w * scale > win_w || img_h * scale > win_h {
        // Too large: shrink, but only a little and never below min_size.
        if fit >= policy.down_scale_limit
            && img_w * scale * fit >= min_size
            && img_h * scale * fit >= min_size
        {
            scale *= fit;
        }
    } else {
        scale *= fit;
        // The min_size floor wins over the upscale limit.
        let limit = policy.up_scale_limit.max(floor);
        if scale > limit {
            scale = limit;
        }
    }
    scale
}

/// On-screen size of `image` after fitting and applying the manual `zoom`.
pub fn display_size(
    image: &DecodedImage,
    viewport: (f64, f64),
    zoom: f64,
    policy: &FitPolicy,
) -> (f64, f64) {
    let (w, h) = image.size();
    let scale = fit_scale(w, h, viewport.0, viewport.1, policy) * zoom;
    (w * scale, h * scale)
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Abbreviated date, e.g. `Jan 1, 2006`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// `#614 - Jul 24, 2009`. No digit grouping in the number.
pub fn comic_subtitle(comic: &Comic) -> String {
    format!("#{} - {}", comic.number, format_date(comic.date))
}

pub fn favorite_line(entry: &FavoriteEntry) -> String {
    format!("#{} - {}  {}", entry.number, format_date(entry.date), entry.title)
}
