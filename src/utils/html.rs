use std::collections::HashSet;

/// Strips every HTML tag from free-text profile fields.
///
/// Names and phone numbers end up in the admin user table, so no markup is
/// allowed at all. `<script>` and `<style>` are dropped together with their
/// content; other tags are removed and their text kept. The result is plain
/// text: the entities ammonia emits for the kept text are decoded again.
pub fn clean_text(input: &str) -> String {
    let sanitized = ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(input)
        .to_string();

    decode_text_entities(sanitized.trim())
}

/// Reverses the escaping html5ever applies to text nodes.
/// `&amp;` goes last so `&amp;lt;` decodes to `&lt;`, not `<`.
fn decode_text_entities(escaped: &str) -> String {
    escaped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
