use std::path::{Path, PathBuf};

use memmap2::Mmap;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Compute the BLAKE3 hash of a byte slice as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Stream-hash a file using BLAKE3.
/// Uses a 256 KB BufReader to reduce syscall overhead vs the default 8 KB.
pub fn hash_file(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|e| Error::io("open", path, e))?;
    let mut reader = std::io::BufReader::with_capacity(256 * 1024, file);
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut reader, &mut hasher).map_err(|e| Error::io("hash", path, e))?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Memory-map a file for read-only access.
///
/// # Safety
/// The mapping is read-only. Callers must not concurrently truncate or replace
/// the underlying file while the `Mmap` is live.
pub fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = std::fs::File::open(path).map_err(|e| Error::io("open", path, e))?;
    // SAFETY: We only read from this mapping; the tool is strictly
    // single-threaded and never writes a file while it is mapped.
    unsafe { Mmap::map(&file).map_err(|e| Error::io("memory-map", path, e)) }
}

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::io("read", path, e))
}

pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;
    }
    std::fs::write(path, data).map_err(|e| Error::io("write", path, e))
}

pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;
    }
    std::fs::copy(from, to).map_err(|e| Error::io("copy", from, e))?;
    Ok(())
}

/// Scan a directory for SJSON resource files, returning game-relative paths
/// with forward slashes (sorted for deterministic patch order).
pub fn find_sjson_files(game_dir: &Path, sub_dir: &str) -> Result<Vec<String>> {
    let root = game_dir.join(sub_dir);
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(&root) {
        let entry = entry.map_err(|e| {
            Error::io(
                "scan",
                root.clone(),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walkdir error")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("sjson") {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(game_dir) else {
            continue;
        };
        if let Some(s) = relative.to_str() {
            found.push(s.replace('\\', "/"));
        }
    }
    found.sort();
    Ok(found)
}

/// Resolve a forward-slash relative path against a root directory.
pub fn join_rel(root: &Path, rel: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in rel.split('/') {
        path.push(part);
    }
    path
}
