use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ReelError, ReelResult};

/// First `<prefix><N><extension>` in `directory` that does not exist yet,
/// counting from N = 1.
///
/// Nothing is created, so two calls without writing the file in between
/// return the same path. Callers allocate sequentially within one run.
pub fn next_available_path(directory: &Path, prefix: &str, extension: &str) -> ReelResult<PathBuf> {
    let dir_error = |source| ReelError::OutputDirectory {
        path: directory.to_path_buf(),
        source,
    };

    fs::read_dir(directory).map_err(dir_error)?;

    let extension = normalize_extension(extension);
    for n in 1u64.. {
        let candidate = directory.join(format!("{prefix}{n}{extension}"));
        if !candidate.try_exists().map_err(dir_error)? {
            return Ok(candidate);
        }
    }

    unreachable!("u64 suffix space exhausted")
}

/// File-name prefix for one part: parts are only labelled when there are
/// several, and multi-part names end in `_` so the counter stays readable.
pub fn part_prefix(base: &str, part_index: usize, total_parts: usize) -> String {
    if total_parts > 1 {
        format!("{base}Part{part_index}of{total_parts}_")
    } else {
        base.to_string()
    }
}

fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{trimmed}")
    }
}
