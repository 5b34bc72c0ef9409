use log::debug;

use crate::sjson::{self, SjsonError, Value};
use crate::viewport::{recompute_fixed, Resolution, ScaleFactors, Viewport, REFERENCE};

/// Everything the recompute rules need about the source and target viewport.
#[derive(Debug, Clone, Copy)]
pub struct RecomputeContext {
    pub reference: Resolution,
    pub viewport: Viewport,
    pub scale: ScaleFactors,
}

impl RecomputeContext {
    pub fn new(viewport: Viewport) -> Self {
        RecomputeContext {
            reference: REFERENCE,
            viewport,
            scale: ScaleFactors::new(REFERENCE, viewport),
        }
    }
}

/// Keys an element can carry to override the resolution its coordinates were
/// authored against.
const REFERENCE_WIDTH_KEY: &str = "ReferenceWidth";
const REFERENCE_HEIGHT_KEY: &str = "ReferenceHeight";

/// Rewrite all screen-space coordinate and size keys of an SJSON resource
/// file relative to the new viewport. Returns the rewritten text and the
/// number of recomputed values; zero means the file had no positional keys
/// (a warning-level signal for the caller, not an error).
pub fn patch_resource(text: &str, ctx: &RecomputeContext) -> Result<(String, usize), SjsonError> {
    let mut doc = sjson::parse(text)?;
    let changed = walk(&mut doc, ctx);
    Ok((sjson::to_string(&doc), changed))
}

fn walk(value: &mut Value, ctx: &RecomputeContext) -> usize {
    match value {
        Value::Object(entries) => {
            let reference = element_reference(entries, ctx.reference);
            let mut changed = 0;
            for entry in entries.iter_mut() {
                changed += apply_rule(&entry.key, &mut entry.value, reference, ctx);
                changed += walk(&mut entry.value, ctx);
            }
            changed
        }
        Value::Array(items) => items.iter_mut().map(|item| walk(item, ctx)).sum(),
        _ => 0,
    }
}

/// An element may record the resolution its coordinates were authored
/// against; fall back to the global reference otherwise.
fn element_reference(entries: &[sjson::Entry], global: Resolution) -> Resolution {
    let lookup = |key: &str| {
        entries
            .iter()
            .find(|e| e.key == key)
            .and_then(|e| e.value.as_f64())
            .map(|v| v as u32)
    };
    match (lookup(REFERENCE_WIDTH_KEY), lookup(REFERENCE_HEIGHT_KEY)) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            Resolution { width, height }
        }
        _ => global,
    }
}

fn apply_rule(
    key: &str,
    value: &mut Value,
    reference: Resolution,
    ctx: &RecomputeContext,
) -> usize {
    let vp = ctx.viewport;
    let recomputed = match key {
        // Positions are fixed offsets from the screen center.
        "X" => apply(value, |v| {
            recompute_fixed(v, reference.center_x(), vp.center_x())
        }),
        "Y" => apply(value, |v| {
            recompute_fixed(v, reference.center_y(), vp.center_y())
        }),
        // Sizes are fixed offsets from the right/bottom edges, so
        // full-screen backings keep covering the whole viewport.
        "Width" => apply(value, |v| {
            recompute_fixed(v, reference.width as f64, vp.width as f64)
        }),
        "Height" => apply(value, |v| {
            recompute_fixed(v, reference.height as f64, vp.height as f64)
        }),
        // Anchor offsets shift by the center/bottom displacement.
        "OffsetX" => apply(value, |v| v + (vp.center_x() - reference.center_x())),
        "OffsetY" => apply(value, |v| v + (vp.height as f64 - reference.height as f64)),
        // Stretch factors scale per axis.
        "ScaleX" => apply(value, |v| v * ctx.scale.x),
        "ScaleY" => apply(value, |v| v * ctx.scale.y),
        _ => false,
    };
    if recomputed {
        debug!("recomputed '{key}'");
        1
    } else {
        0
    }
}

/// Apply a numeric rewrite, keeping integers integral and floats floating.
fn apply(value: &mut Value, f: impl Fn(f64) -> f64) -> bool {
    match value {
        Value::Int(i) => {
            *i = f(*i as f64).round() as i64;
            true
        }
        Value::Float(x) => {
            *x = f(*x);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_2580() -> RecomputeContext {
        RecomputeContext::new(Viewport { width: 2580, height: 1080 })
    }

    fn patched(text: &str) -> (String, usize) {
        patch_resource(text, &ctx_2580()).unwrap()
    }

    #[test]
    fn test_centered_element_moves_to_new_center() {
        let (out, changed) = patched("Screen = { TitleText = { X = 960 Y = 540 } }\n");
        assert!(out.contains("X = 1290"));
        assert!(out.contains("Y = 540"));
        assert_eq!(changed, 2);
    }

    #[test]
    fn test_offset_from_center_is_preserved() {
        let (out, _) = patched("Screen = { Button = { X = 1325 } }\n");
        // +365 from the old center 960 stays +365 from the new center 1290.
        assert!(out.contains("X = 1655"));
    }

    #[test]
    fn test_fullscreen_backing_resizes() {
        let (out, _) = patched("Screen = { Back = { Width = 1920 Height = 1080 } }\n");
        assert!(out.contains("Width = 2580"));
        assert!(out.contains("Height = 1080"));
    }

    #[test]
    fn test_float_values_stay_floats() {
        let (out, _) = patched("Screen = { Fx = { X = 960.5 ScaleX = 1.0 } }\n");
        assert!(out.contains("X = 1290.5"));
        assert!(out.contains(&format!("ScaleX = {:?}", 2580.0 / 1920.0)));
    }

    #[test]
    fn test_element_reference_resolution_override() {
        let text = "Screen = { Hud = { ReferenceWidth = 2560 ReferenceHeight = 1080 X = 1280 } }\n";
        let (out, _) = patched(text);
        // Centered under the element's own 2560-wide reference.
        assert!(out.contains("X = 1290"));
        // The reference keys themselves are untouched.
        assert!(out.contains("ReferenceWidth = 2560"));
    }

    #[test]
    fn test_offsets_shift_by_center_delta() {
        let (out, _) = patched("Thing = { OffsetX = 10 OffsetY = 20 }\n");
        // Center moved 960 -> 1290, height unchanged.
        assert!(out.contains("OffsetX = 340"));
        assert!(out.contains("OffsetY = 20"));
    }

    #[test]
    fn test_no_positional_keys_reports_zero() {
        let (out, changed) = patched("Audio = { Volume = 90 Name = \"Mix\" }\n");
        assert_eq!(changed, 0);
        assert!(out.contains("Volume = 90"));
    }

    #[test]
    fn test_arrays_of_elements_are_walked() {
        let text = "Obstacles = [\n{ Name = \"A\" X = 960 }\n{ Name = \"B\" X = 0 }\n]\n";
        let (out, changed) = patched(text);
        assert_eq!(changed, 2);
        assert!(out.contains("X = 1290"));
        assert!(out.contains("X = 330"));
    }
}
