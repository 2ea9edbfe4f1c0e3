//! Allow-list sanitization applied to assistant markup before it becomes
//! part of the display tree.
//!
//! Two rules:
//! - raw HTML is never interpreted. Executable or embedding elements are
//!   dropped together with their content (void ones such as `<embed>` have
//!   none and go alone), everything else is kept as literal text;
//! - link and image destinations must be relative or use an allowed scheme.

use pulldown_cmark::Event;

/// URL schemes a link or image may point to.
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Elements removed along with everything up to their closing tag.
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "object", "noscript", "template", "svg", "math",
];

/// Void elements: no content or closing tag, so only the tag is removed.
const DROPPED_VOID_ELEMENTS: &[&str] = &["embed", "base", "link", "meta"];

/// Whether `url` is safe to use as a link or image destination.
///
/// Relative references and fragments are allowed. Absolute URLs must use
/// one of [`ALLOWED_SCHEMES`]. Whitespace and control characters are
/// ignored when reading the scheme, as browsers do.
pub fn is_safe_url(url: &str) -> bool {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();

    let Some(colon) = compact.find(':') else {
        return true;
    };
    let scheme = &compact[..colon];
    if scheme.contains(['/', '?', '#']) {
        // The colon belongs to the path or query of a relative reference.
        return true;
    }
    ALLOWED_SCHEMES
        .iter()
        .any(|allowed| scheme.eq_ignore_ascii_case(allowed))
}

/// Turns raw HTML events into inert text, dropping executable elements.
///
/// Dropped elements may span several events (`<script>` inline HTML, then
/// text, then `</script>`), so the neutralizer keeps state between calls.
/// An element left open is only suppressed until its enclosing block ends.
/// Structural start/end events always pass through to keep the event
/// stream balanced.
#[derive(Debug, Default)]
pub(crate) struct HtmlNeutralizer {
    suppressing: Option<Suppression>,
    depth: usize,
}

#[derive(Debug, Clone, Copy)]
struct Suppression {
    tag: &'static str,
    /// Nesting depth at which the element was opened.
    depth: usize,
}

impl HtmlNeutralizer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn apply<'a>(&mut self, event: Event<'a>) -> Option<Event<'a>> {
        match event {
            Event::Html(raw) | Event::InlineHtml(raw) => {
                let kept = self.strip(&raw);
                if kept.is_empty() {
                    None
                } else {
                    Some(Event::Text(kept.into()))
                }
            }
            Event::Start(_) => {
                self.depth += 1;
                Some(event)
            }
            Event::End(_) => {
                self.depth = self.depth.saturating_sub(1);
                if self.suppressing.is_some_and(|open| self.depth < open.depth) {
                    self.suppressing = None;
                }
                Some(event)
            }
            _ if self.suppressing.is_some() => None,
            other => Some(other),
        }
    }

    fn strip(&mut self, raw: &str) -> String {
        let mut kept = String::new();
        let mut rest = raw;

        loop {
            if let Some(Suppression { tag, .. }) = self.suppressing {
                let closing = format!("</{tag}");
                let Some(start) = find_ignore_case(rest, &closing) else {
                    return kept;
                };
                rest = &rest[tag_end(rest, start)..];
                self.suppressing = None;
                continue;
            }

            let Some((start, tag, is_void)) = find_dropped_open_tag(rest) else {
                kept.push_str(rest);
                return kept;
            };
            kept.push_str(&rest[..start]);
            let end = tag_end(rest, start);
            let self_closing = rest[start..end].trim_end_matches('>').ends_with('/');
            if !is_void && !self_closing {
                self.suppressing = Some(Suppression {
                    tag,
                    depth: self.depth,
                });
            }
            rest = &rest[end..];
        }
    }
}

/// Byte index just past the `>` closing the tag that starts at `start`,
/// or the end of `text` if the tag continues in a later fragment.
fn tag_end(text: &str, start: usize) -> usize {
    text[start..]
        .find('>')
        .map(|offset| start + offset + 1)
        .unwrap_or(text.len())
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets stable.
    haystack.to_ascii_lowercase().find(needle)
}

fn find_dropped_open_tag(text: &str) -> Option<(usize, &'static str, bool)> {
    let lower = text.to_ascii_lowercase();
    let containers = DROPPED_ELEMENTS.iter().map(|tag| (*tag, false));
    let voids = DROPPED_VOID_ELEMENTS.iter().map(|tag| (*tag, true));

    containers
        .chain(voids)
        .filter_map(|(tag, is_void)| {
            let needle = format!("<{tag}");
            lower
                .match_indices(&needle)
                .find(|(index, _)| {
                    lower[index + needle.len()..]
                        .chars()
                        .next()
                        .is_none_or(|c| c.is_ascii_whitespace() || c == '>' || c == '/')
                })
                .map(|(index, _)| (index, tag, is_void))
        })
        .min_by_key(|(index, _, _)| *index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{CowStr, Tag, TagEnd};

    fn text_of(event: Option<Event<'_>>) -> Option<String> {
        match event {
            Some(Event::Text(text)) => Some(text.to_string()),
            Some(other) => panic!("unexpected event {other:?}"),
            None => None,
        }
    }

    #[test]
    fn test_safe_urls() {
        assert!(is_safe_url("https://example.com"));
        assert!(is_safe_url("HTTP://example.com"));
        assert!(is_safe_url("mailto:sales@example.com"));
        assert!(is_safe_url("/reports/2024"));
        assert!(is_safe_url("#summary"));
        assert!(is_safe_url("reports?q=a:b"));
    }

    #[test]
    fn test_unsafe_urls() {
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("JaVaScRiPt:alert(1)"));
        assert!(!is_safe_url(" java\tscript:alert(1)"));
        assert!(!is_safe_url("data:text/html;base64,PHNjcmlwdD4="));
        assert!(!is_safe_url("vbscript:msgbox"));
    }

    #[test]
    fn test_plain_html_becomes_text() {
        let mut neutralizer = HtmlNeutralizer::new();
        let out = neutralizer.apply(Event::InlineHtml(CowStr::from("<b onclick=\"x()\">")));
        assert_eq!(text_of(out).as_deref(), Some("<b onclick=\"x()\">"));
    }

    #[test]
    fn test_script_spanning_events_is_dropped() {
        let mut neutralizer = HtmlNeutralizer::new();

        assert!(neutralizer.apply(Event::InlineHtml("<script>".into())).is_none());
        assert!(neutralizer.apply(Event::Text("alert(1)".into())).is_none());
        assert!(neutralizer.apply(Event::InlineHtml("</script>".into())).is_none());
        assert_eq!(
            text_of(neutralizer.apply(Event::Text(" after".into()))).as_deref(),
            Some(" after")
        );
    }

    #[test]
    fn test_script_inside_single_fragment_keeps_surroundings() {
        let mut neutralizer = HtmlNeutralizer::new();
        let out = neutralizer.apply(Event::Html(
            "<div>before<SCRIPT type=\"x\">steal()</script>after</div>\n".into(),
        ));
        assert_eq!(
            text_of(out).as_deref(),
            Some("<div>beforeafter</div>\n")
        );
    }

    #[test]
    fn test_void_element_is_removed_alone() {
        let mut neutralizer = HtmlNeutralizer::new();
        let out = neutralizer.apply(Event::Html("<embed src=\"x.swf\">rest".into()));
        assert_eq!(text_of(out).as_deref(), Some("rest"));
        assert!(neutralizer.suppressing.is_none());
    }

    #[test]
    fn test_unclosed_script_ends_with_its_block() {
        let mut neutralizer = HtmlNeutralizer::new();

        assert!(neutralizer.apply(Event::Start(Tag::Paragraph)).is_some());
        assert!(neutralizer.apply(Event::InlineHtml("<script>".into())).is_none());
        assert!(neutralizer.apply(Event::Text(" tag".into())).is_none());
        assert!(neutralizer.apply(Event::Start(Tag::Strong)).is_some());
        assert!(neutralizer.apply(Event::Text("still inside".into())).is_none());
        assert!(neutralizer.apply(Event::End(TagEnd::Strong)).is_some());
        assert!(neutralizer.apply(Event::End(TagEnd::Paragraph)).is_some());

        assert!(neutralizer.apply(Event::Start(Tag::Paragraph)).is_some());
        assert_eq!(
            text_of(neutralizer.apply(Event::Text("next block".into()))).as_deref(),
            Some("next block")
        );
    }

    #[test]
    fn test_similar_tag_names_are_not_dropped() {
        let mut neutralizer = HtmlNeutralizer::new();
        let out = neutralizer.apply(Event::InlineHtml("<scripture>".into()));
        assert_eq!(text_of(out).as_deref(), Some("<scripture>"));
    }
}
