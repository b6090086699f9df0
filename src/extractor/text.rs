use scraper::node::Node;
use scraper::ElementRef;

/// Subtrees that never contribute visible text.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that open and close their own line. Everything else is inline.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody", "td", "tfoot",
    "th", "thead", "tr", "ul",
];

/// Plain-text rendering of an element subtree, approximating the text a
/// browser reports for it: hidden subtrees are dropped, block elements
/// break lines, whitespace inside a line collapses to single spaces.
pub fn rendered_text(root: ElementRef) -> String {
    let mut out = String::new();
    walk(root, &mut out);
    normalize(&out)
}

fn walk(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_collapsed(out, text),
            Node::Element(_) => {
                let Some(el) = ElementRef::wrap(child) else {
                    continue;
                };
                let tag = el.value().name();
                if SKIPPED_TAGS.contains(&tag) || is_hidden(el) {
                    continue;
                }
                if tag == "br" {
                    break_line(out);
                    continue;
                }
                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    break_line(out);
                }
                walk(el, out);
                if block {
                    break_line(out);
                }
            }
            _ => {}
        }
    }
}

/// Snapshot-level approximation of "not rendered": the hidden attribute
/// or an inline display:none. Stylesheet-driven visibility is not
/// recoverable from a saved page.
fn is_hidden(el: ElementRef) -> bool {
    let value = el.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    value
        .attr("style")
        .is_some_and(|s| s.to_ascii_lowercase().replace(' ', "").contains("display:none"))
}

fn push_collapsed(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !out.ends_with([' ', '\n']) {
                out.push(' ');
            }
        } else {
            out.push(ch);
        }
    }
}

fn break_line(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn normalize(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n")
}

// ── Tests ──
