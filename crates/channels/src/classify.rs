use crate::ContentType;

/// Classify plain text coming from a chat client.
///
/// Text starting with one of `image_prefixes` is an image generation
/// request; the prefix is stripped from the returned content. Everything
/// else is regular text, passed through untouched so control commands still
/// match exactly.
pub fn classify_text(content: &str, image_prefixes: &[String]) -> (ContentType, String) {
    for prefix in image_prefixes.iter().filter(|p| !p.is_empty()) {
        if let Some(rest) = content.strip_prefix(prefix.as_str()) {
            return (ContentType::ImageCreate, rest.trim().to_string());
        }
    }
    (ContentType::Text, content.to_string())
}
