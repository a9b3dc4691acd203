//! Document-path extraction from free-text item descriptions.
//!
//! Work items often reference a spec or design document by repository path,
//! e.g. `docs/specs/frobnicator.md`, sometimes quoted or wrapped in a
//! markdown link. The extractor finds the first such token in document
//! order: a path-like run of characters that starts with the configured
//! root segment and ends with the configured extension.
//!
//! Absence is the common case and yields `None`, never an error.

/// Characters that may appear inside a repository path token.
///
/// Quotes, backticks, brackets, and parentheses are deliberately excluded,
/// which is what makes quoted and markdown-link-wrapped paths fall out of
/// the same scan as bare ones.
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.')
}

/// Extracts the first document path from `text`.
///
/// A match starts with `root` (e.g. `docs/`), continues through path
/// characters, and ends with `ext` (e.g. `.md`). The first match in
/// document order wins.
///
/// # Examples
///
/// ```
/// use kickoff_bot::normalize::extract_doc_path;
///
/// let bare = "spec lives at docs/specs/frob.md, please read";
/// assert_eq!(extract_doc_path(Some(bare), "docs/", ".md").as_deref(), Some("docs/specs/frob.md"));
///
/// let linked = "see [the design doc](docs/specs/frob.md)";
/// assert_eq!(extract_doc_path(Some(linked), "docs/", ".md").as_deref(), Some("docs/specs/frob.md"));
///
/// assert_eq!(extract_doc_path(None, "docs/", ".md"), None);
/// ```
pub fn extract_doc_path(text: Option<&str>, root: &str, ext: &str) -> Option<String> {
    let text = text?;
    if root.is_empty() || ext.is_empty() {
        return None;
    }

    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(root) {
        let start = search_from + rel;

        // A root match inside a longer token (e.g. "mydocs/...") is not a
        // path start.
        let preceded_by_path_char = text[..start]
            .chars()
            .next_back()
            .is_some_and(is_path_char);

        if !preceded_by_path_char {
            let token: String = text[start..].chars().take_while(|&c| is_path_char(c)).collect();

            // Trailing sentence punctuation ('.' is a path char) would
            // otherwise glue onto the token; the extension check handles it
            // because ".md." does not end with ".md". Trim one trailing dot
            // first so "docs/a.md." still matches.
            let token = token.strip_suffix('.').unwrap_or(&token);

            if token.len() > root.len() + ext.len() && token.ends_with(ext) {
                return Some(token.to_string());
            }
        }

        search_from = start + root.len();
    }

    None
}
