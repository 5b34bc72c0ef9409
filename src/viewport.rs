use crate::error::{Error, Result};

/// Virtual viewport the unpatched game was authored against.
pub const REFERENCE: Resolution = Resolution {
    width: 1920,
    height: 1080,
};

/// A display resolution as requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidResolution { width, height });
        }
        Ok(Resolution { width, height })
    }

    pub fn center_x(&self) -> f64 {
        self.width as f64 / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.height as f64 / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingMode {
    /// Preserve vertical field of view, expand horizontal (default).
    HorPlus,
    /// Use the target resolution verbatim, no aspect correction.
    PixelBased,
}

/// The viewport dimensions written into binaries, resources, and scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn center_x(&self) -> f64 {
        self.width as f64 / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.height as f64 / 2.0
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Compute the viewport to patch from the target resolution and scaling mode.
///
/// `HorPlus` keeps the reference height and widens to the target aspect
/// ratio, rounding to an even width since binary dimension fields are
/// word-aligned. `PixelBased` passes the target resolution through.
pub fn compute_viewport(
    reference: Resolution,
    target: Resolution,
    mode: ScalingMode,
) -> Result<Viewport> {
    if target.width == 0 || target.height == 0 {
        return Err(Error::InvalidResolution {
            width: target.width,
            height: target.height,
        });
    }
    match mode {
        ScalingMode::HorPlus => {
            let width =
                target.width as f64 / target.height as f64 * reference.height as f64;
            let even_width = (width / 2.0).round() as u32 * 2;
            if even_width == 0 {
                return Err(Error::InvalidResolution {
                    width: target.width,
                    height: target.height,
                });
            }
            Ok(Viewport {
                width: even_width,
                height: reference.height,
            })
        }
        ScalingMode::PixelBased => Ok(Viewport {
            width: target.width,
            height: target.height,
        }),
    }
}

/// Per-axis stretch factors between the reference viewport and the patched one.
#[derive(Debug, Clone, Copy)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
    pub max: f64,
}

impl ScaleFactors {
    pub fn new(reference: Resolution, viewport: Viewport) -> Self {
        let x = viewport.width as f64 / reference.width as f64;
        let y = viewport.height as f64 / reference.height as f64;
        ScaleFactors {
            x,
            y,
            max: x.max(y),
        }
    }
}

/// Recompute a value fixed at an offset from a reference point, preserving
/// the offset under the new reference point.
///
/// Examples: a value of 1020 fixed relative to the old center 960 becomes
/// 1350 under a new center of 1290; a value of 1000 fixed relative to the
/// old bottom edge 1080 becomes 1520 under a new bottom edge of 1600.
pub fn recompute_fixed(value: f64, old_reference: f64, new_reference: f64) -> f64 {
    new_reference - (old_reference - value)
}
