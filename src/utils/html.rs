use std::collections::HashSet;

/// Strips markup from admin-authored text before it is echoed back.
///
/// Uses ammonia with an empty tag whitelist: tags are dropped and their text
/// kept, except script and style whose bodies are removed entirely.
pub fn clean_text(input: &str) -> String {
    let mut builder = ammonia::Builder::empty();
    builder.clean_content_tags(HashSet::from(["script", "style"]));
    builder.clean(input).to_string()
}
