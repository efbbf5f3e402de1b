use scraper::Html;

/// Best-effort text extraction from a chat message body.
///
/// Graph delivers message bodies as HTML fragments; the engine wants plain
/// text. Malformed markup degrades to whatever text nodes survive parsing,
/// never an error.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}
