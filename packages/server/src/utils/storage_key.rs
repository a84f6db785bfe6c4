use uuid::Uuid;

/// Generate a collision-resistant storage key for an uploaded file.
///
/// The key is a random 128-bit token plus the original extension (dot
/// included), so an exposed key reveals nothing about the original
/// filename beyond its type. A filename without a usable extension
/// yields the bare token. Extensions are carried verbatim; only ASCII
/// alphanumeric extensions are kept, since the key must stay a single
/// flat path segment in every backend.
pub fn generate_storage_key(original_filename: &str) -> String {
    let token = Uuid::new_v4().to_string();
    match original_filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("{token}.{ext}")
        }
        _ => token,
    }
}
