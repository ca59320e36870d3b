use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (like <b>, <p>) survive while
/// dangerous tags (like <script>, <iframe>) and attributes (like onclick)
/// are stripped. Question and choice content is teacher-supplied but ends
/// up rendered in every participant's client, so it passes through here on
/// every write.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
