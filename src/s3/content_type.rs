use std::path::Path;

/// Detect Content-Type based on file extension
///
/// Returns `None` for unknown or missing extensions; the store then applies
/// its own default.
pub fn resolve_content_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first_raw().map(str::to_string)
}
