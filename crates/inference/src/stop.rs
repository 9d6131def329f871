/// Truncate `text` at the first occurrence of any stop token.
///
/// Across all tokens the earliest match wins; with no tokens or no match the
/// text is returned unchanged.
pub fn enforce_stop_tokens(text: &str, stop: &[String]) -> String {
    let mut cut = text.len();
    for token in stop {
        if token.is_empty() {
            continue;
        }
        if let Some(idx) = text.find(token.as_str()) {
            cut = cut.min(idx);
        }
    }
    text[..cut].to_string()
}
