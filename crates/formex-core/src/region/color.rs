//! HSV thresholding for color-marked form zones.

use image::{Rgb, RgbImage};

use super::Region;

/// Convert an RGB pixel to (hue in degrees, saturation 0-255, value 0-255).
pub fn rgb_to_hsv(pixel: &Rgb<u8>) -> (f32, u8, u8) {
    let [r, g, b] = pixel.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as f32;

    if max == 0 {
        return (0.0, 0, 0);
    }

    let saturation = (delta / max as f32 * 255.0).round() as u8;
    if delta == 0.0 {
        return (0.0, saturation, max);
    }

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let hue = if max as f32 == r {
        60.0 * ((g - b) / delta)
    } else if max as f32 == g {
        60.0 * ((b - r) / delta) + 120.0
    } else {
        60.0 * ((r - g) / delta) + 240.0
    };

    (hue.rem_euclid(360.0), saturation, max)
}

/// Pixel predicate over HSV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvThreshold {
    /// Lower hue bound in degrees.
    pub hue_min: f32,
    /// Upper hue bound in degrees. A bound below `hue_min` wraps through 0.
    pub hue_max: f32,
    /// Minimum saturation.
    pub sat_min: u8,
    /// Minimum value (brightness).
    pub val_min: u8,
}

impl HsvThreshold {
    /// Check whether a pixel falls inside the threshold.
    pub fn matches(&self, pixel: &Rgb<u8>) -> bool {
        let (hue, sat, val) = rgb_to_hsv(pixel);
        if sat < self.sat_min || val < self.val_min {
            return false;
        }

        if self.hue_min <= self.hue_max {
            hue >= self.hue_min && hue <= self.hue_max
        } else {
            hue >= self.hue_min || hue <= self.hue_max
        }
    }
}

/// Bounding box of every pixel matching `threshold`, or `None` if no pixel matches.
pub fn mask_bounding_box(image: &RgbImage, threshold: &HsvThreshold) -> Option<Region> {
    let mut bounds: Option<Region> = None;

    for (x, y, pixel) in image.enumerate_pixels() {
        if !threshold.matches(pixel) {
            continue;
        }

        bounds = Some(match bounds {
            None => Region::new(x, y, x + 1, y + 1),
            Some(b) => Region::new(
                b.left.min(x),
                b.top.min(y),
                b.right.max(x + 1),
                b.bottom.max(y + 1),
            ),
        });
    }

    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    const YELLOW: HsvThreshold = HsvThreshold {
        hue_min: 40.0,
        hue_max: 70.0,
        sat_min: 80,
        val_min: 80,
    };

    #[test]
    fn test_rgb_to_hsv_primaries() {
        assert_eq!(rgb_to_hsv(&Rgb([255, 0, 0])), (0.0, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([0, 255, 0])), (120.0, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 255])), (240.0, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([255, 255, 0])), (60.0, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 0])), (0.0, 0, 0));
    }

    #[test]
    fn test_threshold_rejects_grey() {
        assert!(YELLOW.matches(&Rgb([250, 220, 30])));
        assert!(!YELLOW.matches(&Rgb([200, 200, 200])));
        assert!(!YELLOW.matches(&Rgb([30, 30, 200])));
    }

    #[test]
    fn test_threshold_wraps_through_zero() {
        let red = HsvThreshold {
            hue_min: 340.0,
            hue_max: 20.0,
            sat_min: 50,
            val_min: 50,
        };
        assert!(red.matches(&Rgb([255, 0, 0])));
        assert!(red.matches(&Rgb([255, 0, 40])));
        assert!(!red.matches(&Rgb([0, 255, 0])));
    }

    #[test]
    fn test_bounding_box() {
        let mut img = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        for y in 30..40 {
            for x in 10..20 {
                img.put_pixel(x, y, Rgb([255, 230, 0]));
            }
        }

        assert_eq!(
            mask_bounding_box(&img, &YELLOW),
            Some(Region::new(10, 30, 20, 40))
        );
    }

    #[test]
    fn test_bounding_box_no_match() {
        let img = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
        assert_eq!(mask_bounding_box(&img, &YELLOW), None);
    }
}
