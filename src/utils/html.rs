/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) are kept, dangerous tags (like
/// <script>) are removed with their content, and event-handler attributes are
/// stripped. Applied to teacher-authored exam and question text before storage.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// `clean_html` over an optional field.
pub fn clean_opt(input: Option<String>) -> Option<String> {
    input.map(|s| clean_html(&s))
}
