use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::viewport::{Viewport, REFERENCE};

/// One engine backend shipped with the game. Every backend embeds the same
/// resolution constants but with backend-specific occurrence counts.
#[derive(Debug)]
pub struct Engine {
    pub name: &'static str,
    pub path: &'static str,
}

pub const ENGINES: &[Engine] = &[
    Engine { name: "DirectX", path: "x64/EngineWin64s.dll" },
    Engine { name: "Vulkan", path: "x64Vk/EngineWin64sv.dll" },
    Engine { name: "32-bit", path: "x86/EngineWin32s.dll" },
];

const ENGINE_32BIT: &str = "32-bit";

/// A fixed byte signature identifying patchable constants in an engine
/// binary. `None` bytes are wildcards (instruction-encoding bytes that vary
/// between occurrences); `replacements` overwrite value bytes in place at
/// fixed offsets within each match, preserving byte width exactly.
pub struct Signature {
    pub name: &'static str,
    pub pattern: Vec<Option<u8>>,
    pub replacements: Vec<(usize, Vec<u8>)>,
    pub expected: usize,
}

fn le_i32(value: u32) -> [u8; 4] {
    (value as i32).to_le_bytes()
}

fn le_f32(value: f64) -> [u8; 4] {
    (value as f32).to_le_bytes()
}

fn literal(pattern: &mut Vec<Option<u8>>, bytes: &[u8]) {
    pattern.extend(bytes.iter().map(|&b| Some(b)));
}

fn wildcards(pattern: &mut Vec<Option<u8>>, count: usize) {
    pattern.extend(std::iter::repeat(None).take(count));
}

/// Build the signature table for one engine backend and target viewport.
///
/// The constants come from the unpatched engine's data and code sections:
/// the virtual viewport setup writes the default width/height as i32
/// immediates, while fullscreen extent and screen-center vectors are stored
/// as f32 pairs.
pub fn signatures(engine: &Engine, viewport: Viewport) -> Vec<Signature> {
    let mut sigs = Vec::new();

    // Two `mov dword ptr` immediates setting the virtual viewport size.
    let mut pattern = Vec::new();
    literal(&mut pattern, &[0xC7]);
    wildcards(&mut pattern, 5);
    literal(&mut pattern, &le_i32(REFERENCE.width));
    literal(&mut pattern, &[0xC7]);
    wildcards(&mut pattern, 5);
    literal(&mut pattern, &le_i32(REFERENCE.height));
    sigs.push(Signature {
        name: "viewport",
        pattern,
        replacements: vec![
            (6, le_i32(viewport.width).to_vec()),
            (16, le_i32(viewport.height).to_vec()),
        ],
        expected: 2,
    });

    // Fullscreen extent vectors (width, height) as adjacent f32 pairs.
    let mut pattern = Vec::new();
    literal(&mut pattern, &le_f32(REFERENCE.width as f64));
    literal(&mut pattern, &le_f32(REFERENCE.height as f64));
    sigs.push(Signature {
        name: "fullscreen-vector",
        pattern,
        replacements: vec![
            (0, le_f32(viewport.width as f64).to_vec()),
            (4, le_f32(viewport.height as f64).to_vec()),
        ],
        // The 32-bit backend splits one load-screen vector into scalar
        // loads, patched by the dedicated signature below.
        expected: if engine.name == ENGINE_32BIT { 243 } else { 244 },
    });

    // Load-screen transition scalars, split apart on the 32-bit backend
    // only: height followed by four unrelated constants, then width.
    let mut pattern = Vec::new();
    literal(&mut pattern, &le_f32(REFERENCE.height as f64));
    for constant in [1250.0, 1440.0, 1600.0, 1632.0] {
        literal(&mut pattern, &le_f32(constant));
    }
    literal(&mut pattern, &le_f32(REFERENCE.width as f64));
    sigs.push(Signature {
        name: "loadscreen-draw-x86",
        pattern,
        replacements: vec![
            (0, le_f32(viewport.height as f64).to_vec()),
            (20, le_f32(viewport.width as f64).to_vec()),
        ],
        expected: if engine.name == ENGINE_32BIT { 1 } else { 0 },
    });

    // Native/screen center vectors used for camera tether reference points.
    let mut pattern = Vec::new();
    literal(&mut pattern, &le_f32(REFERENCE.center_x()));
    literal(&mut pattern, &le_f32(REFERENCE.center_y()));
    sigs.push(Signature {
        name: "screencenter-vector",
        pattern,
        replacements: vec![
            (0, le_f32(viewport.center_x()).to_vec()),
            (4, le_f32(viewport.center_y()).to_vec()),
        ],
        expected: 486,
    });

    sigs
}

/// Find all non-overlapping occurrences of a masked pattern, left to right.
pub fn find_matches(data: &[u8], pattern: &[Option<u8>]) -> Vec<usize> {
    let mut matches = Vec::new();
    if pattern.is_empty() || data.len() < pattern.len() {
        return matches;
    }
    let mut i = 0;
    while i + pattern.len() <= data.len() {
        let hit = pattern
            .iter()
            .zip(&data[i..i + pattern.len()])
            .all(|(p, b)| p.map_or(true, |expected| expected == *b));
        if hit {
            matches.push(i);
            i += pattern.len();
        } else {
            i += 1;
        }
    }
    matches
}

/// Patch one engine image: locate every signature and overwrite the embedded
/// resolution constants with the target viewport's encoding.
///
/// The occurrence count of each signature must match the expected count
/// exactly, otherwise the binary is not the version this table was built for
/// and patching it would silently corrupt it. Input is always the pristine
/// (backup) image, so the scan never runs over already-substituted values.
pub fn patch_engine(
    data: &[u8],
    engine: &Engine,
    viewport: Viewport,
    path: &Path,
) -> Result<Vec<u8>> {
    let mut out = data.to_vec();
    for sig in signatures(engine, viewport) {
        let matches = find_matches(&out, &sig.pattern);
        debug!(
            "signature '{}' in '{}': {} matches (expected {})",
            sig.name,
            path.display(),
            matches.len(),
            sig.expected
        );
        if matches.len() != sig.expected {
            return Err(Error::PatternNotFound {
                path: path.to_path_buf(),
                signature: sig.name,
                expected: sig.expected,
                found: matches.len(),
            });
        }
        for start in matches {
            for (offset, bytes) in &sig.replacements {
                out[start + offset..start + offset + bytes.len()].copy_from_slice(bytes);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport { width: 2580, height: 1080 };

    /// Assemble an image containing exactly the expected number of
    /// occurrences of every signature, wildcards filled with NOPs and
    /// blocks separated by padding so no accidental matches form.
    fn synthetic_image(engine: &Engine) -> Vec<u8> {
        let mut data = vec![0xCC; 16];
        for sig in signatures(engine, VIEWPORT) {
            for _ in 0..sig.expected {
                data.extend(sig.pattern.iter().map(|b| b.unwrap_or(0x90)));
                data.extend([0xCC; 16]);
            }
        }
        data
    }

    #[test]
    fn test_find_matches_with_wildcards() {
        let pattern = vec![Some(0xC7), None, Some(0x01)];
        let data = [0x00, 0xC7, 0xFF, 0x01, 0xC7, 0xAA, 0x01];
        assert_eq!(find_matches(&data, &pattern), vec![1, 4]);
    }

    #[test]
    fn test_find_matches_non_overlapping() {
        let pattern = vec![Some(0xAA), Some(0xAA)];
        let data = [0xAA, 0xAA, 0xAA];
        assert_eq!(find_matches(&data, &pattern), vec![0]);
    }

    #[test]
    fn test_patch_engine_substitutes_all_signatures() {
        for engine in ENGINES {
            let image = synthetic_image(engine);
            let patched = patch_engine(&image, engine, VIEWPORT, Path::new(engine.path)).unwrap();
            assert_eq!(patched.len(), image.len(), "size must never change");
            assert_ne!(patched, image);
            // Original constants must be gone from every patched signature.
            for sig in signatures(engine, VIEWPORT) {
                if sig.expected > 0 {
                    assert!(find_matches(&patched, &sig.pattern).is_empty());
                }
            }
        }
    }

    #[test]
    fn test_patch_engine_is_deterministic() {
        let engine = &ENGINES[0];
        let image = synthetic_image(engine);
        let a = patch_engine(&image, engine, VIEWPORT, Path::new(engine.path)).unwrap();
        let b = patch_engine(&image, engine, VIEWPORT, Path::new(engine.path)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unexpected_count_is_rejected() {
        let engine = &ENGINES[0];
        let mut image = synthetic_image(engine);
        // Append one extra screen-center vector to break the count.
        image.extend(le_f32(960.0));
        image.extend(le_f32(540.0));
        let err = patch_engine(&image, engine, VIEWPORT, Path::new(engine.path)).unwrap_err();
        assert!(matches!(
            err,
            Error::PatternNotFound { signature: "screencenter-vector", expected: 486, found: 487, .. }
        ));
    }

    #[test]
    fn test_unknown_binary_is_rejected() {
        let engine = &ENGINES[0];
        let err = patch_engine(&[0u8; 1024], engine, VIEWPORT, Path::new(engine.path)).unwrap_err();
        assert!(matches!(err, Error::PatternNotFound { .. }));
    }
}
