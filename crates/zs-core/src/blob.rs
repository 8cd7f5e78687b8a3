//! Naming helpers shared by the `BlobStore` plugins.

use std::path::Path;

use uuid::Uuid;

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// The declared content type, or one guessed from the file name.
pub fn resolve_content_type(declared: &str, file_name: &str) -> String {
    let declared = declared.trim();
    if !declared.is_empty() {
        return declared.to_string();
    }
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

/// A fresh, collision-resistant object name: a v4 UUID plus an extension
/// taken from the file name, else from the content type.
pub fn generate_object_name(file_name: &str, content_type: &str) -> String {
    let id = Uuid::new_v4();
    match extension(file_name, content_type) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

fn extension(file_name: &str, content_type: &str) -> Option<String> {
    let from_name = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return Some(ext.to_ascii_lowercase());
    }
    // first_raw() is alphabetical (jpe before jpg), so prefer the common spellings
    let known = mime_guess::get_mime_extensions_str(content_type)?;
    ["jpg", "png", "gif", "webp", "heic"]
        .into_iter()
        .find(|e| known.contains(e))
        .or_else(|| known.first().copied())
        .map(str::to_string)
}
