//! Region selection: picks the part of a form image that is sent to OCR.

mod color;

pub use color::{mask_bounding_box, rgb_to_hsv, HsvThreshold};

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegionError;

/// Name of the implicit whole-page region.
pub const FULL_REGION: &str = "full";

/// Axis-aligned rectangle in pixel coordinates. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Region {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Region covering a whole image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Clamp the rectangle to `width` x `height`.
    pub fn clip(self, width: u32, height: u32) -> Self {
        let right = self.right.min(width);
        let bottom = self.bottom.min(height);
        Self::new(self.left.min(right), self.top.min(bottom), right, bottom)
    }

    /// Grow by `margin` pixels on every side, staying inside `width` x `height`.
    pub fn expand(self, margin: u32, width: u32, height: u32) -> Self {
        Self::new(
            self.left.saturating_sub(margin),
            self.top.saturating_sub(margin),
            self.right.saturating_add(margin),
            self.bottom.saturating_add(margin),
        )
        .clip(width, height)
    }
}

/// How to pick a region out of a form image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionSpec {
    /// The whole image.
    Full,

    /// The whole image, with the recognized text cut down to its first `lines` lines.
    TopLines { lines: usize },

    /// A crop given as fractions of width and height.
    FractionalCrop {
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    },

    /// Bounding box of the pixels inside an HSV threshold, plus a margin.
    ColorMask {
        hue_min: f32,
        hue_max: f32,
        sat_min: u8,
        val_min: u8,
        #[serde(default)]
        margin: u32,
    },
}

impl RegionSpec {
    /// Bottom half of the page.
    pub fn bottom_half() -> Self {
        RegionSpec::FractionalCrop {
            left: 0.0,
            top: 0.5,
            right: 1.0,
            bottom: 1.0,
        }
    }

    /// Footer strip (last fifth of the page).
    pub fn footer() -> Self {
        RegionSpec::FractionalCrop {
            left: 0.0,
            top: 0.8,
            right: 1.0,
            bottom: 1.0,
        }
    }

    /// Yellow adhesive label.
    pub fn yellow_sticker() -> Self {
        RegionSpec::ColorMask {
            hue_min: 40.0,
            hue_max: 70.0,
            sat_min: 80,
            val_min: 80,
            margin: 10,
        }
    }

    /// Check that the parameters describe a usable region.
    pub fn validate(&self) -> Result<(), RegionError> {
        match *self {
            RegionSpec::Full => Ok(()),
            RegionSpec::TopLines { lines } => {
                if lines == 0 {
                    Err(RegionError::ZeroLines)
                } else {
                    Ok(())
                }
            }
            RegionSpec::FractionalCrop {
                left,
                top,
                right,
                bottom,
            } => {
                let in_unit = |v: f32| (0.0..=1.0).contains(&v);
                if [left, top, right, bottom].into_iter().all(in_unit) && left < right && top < bottom
                {
                    Ok(())
                } else {
                    Err(RegionError::InvalidFraction {
                        left,
                        top,
                        right,
                        bottom,
                    })
                }
            }
            RegionSpec::ColorMask {
                hue_min, hue_max, ..
            } => {
                let valid = |h: f32| (0.0..360.0).contains(&h);
                if valid(hue_min) && valid(hue_max) {
                    Ok(())
                } else {
                    Err(RegionError::InvalidHue(hue_min, hue_max))
                }
            }
        }
    }

    /// Compute the pixel rectangle this spec selects in `image`.
    ///
    /// The result is always clipped to the image. A color mask that matches no
    /// pixel yields the full image bounds.
    pub fn locate(&self, image: &DynamicImage) -> Region {
        let (width, height) = image.dimensions();
        let full = Region::full(width, height);

        match *self {
            RegionSpec::Full | RegionSpec::TopLines { .. } => full,
            RegionSpec::FractionalCrop {
                left,
                top,
                right,
                bottom,
            } => fractional_region(width, height, [left, top, right, bottom]),
            RegionSpec::ColorMask {
                hue_min,
                hue_max,
                sat_min,
                val_min,
                margin,
            } => {
                let threshold = HsvThreshold {
                    hue_min,
                    hue_max,
                    sat_min,
                    val_min,
                };
                match mask_bounding_box(&image.to_rgb8(), &threshold) {
                    Some(bbox) => bbox.expand(margin, width, height),
                    None => {
                        debug!("Color mask matched no pixels, using full image");
                        full
                    }
                }
            }
        }
    }

    /// Crop `image` to the region this spec selects.
    pub fn select(&self, image: &DynamicImage) -> DynamicImage {
        let region = self.locate(image);
        let (width, height) = image.dimensions();

        if region == Region::full(width, height) {
            return image.clone();
        }

        debug!(
            "Cropping {}x{} image to ({}, {}) {}x{}",
            width,
            height,
            region.left,
            region.top,
            region.width(),
            region.height()
        );
        image.crop_imm(region.left, region.top, region.width(), region.height())
    }

    /// Cut recognized text down for `TopLines`; other kinds pass it through.
    pub fn restrict_text(&self, text: &str) -> String {
        match *self {
            RegionSpec::TopLines { lines } => text.lines().take(lines).collect::<Vec<_>>().join("\n"),
            _ => text.to_string(),
        }
    }
}

fn fractional_region(width: u32, height: u32, fractions: [f32; 4]) -> Region {
    let scale = |f: f32, extent: u32| ((f * extent as f32).round().max(0.0) as u32).min(extent);
    let [l, t, r, b] = fractions;

    let mut region = Region::new(
        scale(l, width),
        scale(t, height),
        scale(r, width),
        scale(b, height),
    )
    .clip(width, height);

    // Keep at least one pixel in each direction.
    if region.width() == 0 && width > 0 {
        region.left = region.left.min(width - 1);
        region.right = region.left + 1;
    }
    if region.height() == 0 && height > 0 {
        region.top = region.top.min(height - 1);
        region.bottom = region.top + 1;
    }

    region
}

/// A region spec with a name that field rules refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRegion {
    pub name: String,
    #[serde(flatten)]
    pub spec: RegionSpec,
}

impl NamedRegion {
    pub fn new(name: impl Into<String>, spec: RegionSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

/// Validated set of named regions. `full` is always present.
#[derive(Debug, Clone)]
pub struct RegionSet {
    regions: Vec<NamedRegion>,
}

impl RegionSet {
    /// Validate and collect named regions.
    pub fn new(regions: Vec<NamedRegion>) -> Result<Self, RegionError> {
        let mut all = vec![NamedRegion::new(FULL_REGION, RegionSpec::Full)];

        for region in regions {
            region.spec.validate()?;
            if all.iter().any(|r| r.name == region.name) {
                return Err(RegionError::DuplicateName(region.name));
            }
            all.push(region);
        }

        Ok(Self { regions: all })
    }

    /// Look up a region by name.
    pub fn get(&self, name: &str) -> Option<&RegionSpec> {
        self.regions.iter().find(|r| r.name == name).map(|r| &r.spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedRegion> {
        self.regions.iter()
    }
}

impl Default for RegionSet {
    fn default() -> Self {
        Self {
            regions: vec![NamedRegion::new(FULL_REGION, RegionSpec::Full)],
        }
    }
}
