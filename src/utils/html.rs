// src/utils/html.rs

/// Clean HTML content using the ammonia library.
///
/// Safe inline tags (like <b>, <code>) survive; <script>, <iframe> and event
/// handler attributes are stripped. Applied to every admin-authored text that
/// is later rendered to candidates.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
