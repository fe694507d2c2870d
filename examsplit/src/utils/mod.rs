//! Utilities for input collection, object copying and formatting.

use crate::{Result, error::ExamSplitError};
use globset::{GlobBuilder, GlobMatcher};
use lopdf::{Document, Object};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Resolve command-line inputs into an ordered list of PDF files.
///
/// Each input is handled on its own and the results are concatenated in
/// argument order:
/// - an existing file is taken as is
/// - an existing directory is walked recursively for `*.pdf` files, sorted by path
/// - anything else is expanded as a glob pattern
///
/// # Errors
///
/// Returns an error for invalid glob patterns, unreadable directory entries,
/// or an input that matches nothing.
pub fn resolve_inputs<T>(inputs: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<Path>,
{
    let mut resolved = Vec::new();

    for input in inputs {
        let input = input.as_ref();

        if input.is_file() {
            resolved.push(input.to_path_buf());
        } else if input.is_dir() {
            resolved.extend(collect_pdfs_in_dir(input)?);
        } else {
            let pattern = input.to_string_lossy();
            let matches = collect_paths_for_patterns([pattern.as_ref()])?;
            if matches.is_empty() {
                return Err(ExamSplitError::file_not_found(input.to_path_buf()));
            }
            resolved.extend(matches);
        }
    }

    Ok(resolved)
}

/// Expand multiple glob patterns into filesystem paths.
///
/// Errors:
/// - Propagates `glob` parse errors.
/// - Propagates filesystem errors from glob iterator.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns.into_iter() {
        let paths = glob::glob(pattern.as_ref()).map_err(|err| ExamSplitError::Other {
            message: format!("Invalid pattern '{}': {err}", pattern.as_ref()),
        })?;

        for entry in paths {
            let path = entry.map_err(|err| ExamSplitError::Other {
                message: err.to_string(),
            })?;
            resolved_paths.push(path);
        }
    }

    Ok(resolved_paths)
}

/// Recursively collect `*.pdf` files (case-insensitive) below `dir`, sorted by path.
pub fn collect_pdfs_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let matcher = pdf_matcher()?;
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|err| ExamSplitError::Other {
            message: format!("Cannot read {}: {err}", dir.display()),
        })?;

        if entry.file_type().is_file() && matcher.is_match(entry.file_name()) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

fn pdf_matcher() -> Result<GlobMatcher> {
    let glob = GlobBuilder::new("*.pdf")
        .case_insensitive(true)
        .build()
        .map_err(|err| ExamSplitError::other(err.to_string()))?;
    Ok(glob.compile_matcher())
}

/// Copy object references from one PDF document to another.
///
/// If `obj` is a reference, this walks the structure recursively and inserts
/// missing referenced objects into the `target` document under the same ids.
pub fn copy_references(target: &mut Document, source: &Document, obj: &Object) {
    match obj {
        Object::Reference(ref_id) => {
            if !target.objects.contains_key(ref_id)
                && let Ok(referenced_obj) = source.get_object(*ref_id)
            {
                target.objects.insert(*ref_id, referenced_obj.clone());
                copy_references(target, source, referenced_obj);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                copy_references(target, source, value);
            }
        }
        Object::Array(arr) => {
            for item in arr {
                copy_references(target, source, item);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                copy_references(target, source, value);
            }
        }
        _ => {}
    }
}

/// Make a string safe to use as a single path component.
///
/// Path separators, `:` and control characters become `_`; an empty result
/// or a bare `.`/`..` becomes `_`.
pub fn sanitize_file_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
