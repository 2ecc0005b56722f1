//! Free-text sections (notes, relations, sources) flattened to plain text.
//!
//! Three independent renderers run over the same section: a heading block, a
//! bullet list of `<li>` items, and the life timeline table. Non-empty outputs
//! are joined with a blank line.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

use crate::parser::dom::{self, LI};
use crate::parser::sections::{self, Section, SectionKind};

static H2: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").unwrap());
static H3: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());
static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static NESTED_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li, table, div").unwrap());
static TIMELINE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"table[class^="ligne_vie"]"#).unwrap());
static TR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Render a notes-bearing section. Sources lose everything before their first `<h2>`.
pub fn extract(section: &Section) -> String {
    match section.kind {
        SectionKind::Sources => match section.html.find("<h2") {
            Some(start) => render(&sections::parse_clean(&section.html[start..])),
            None => render(&section.dom),
        },
        _ => render(&section.dom),
    }
}

pub fn render(doc: &Html) -> String {
    [render_heading(doc), render_list(doc), render_timeline(doc)]
        .into_iter()
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_heading(doc: &Html) -> String {
    let mut lines = Vec::new();
    if let Some(h2) = doc.select(&H2).next().map(dom::text_of).filter(|t| !t.is_empty()) {
        lines.push(underline(&h2, '='));
    }
    if let Some(h3) = doc.select(&H3).next().map(dom::text_of).filter(|t| !t.is_empty()) {
        lines.push(underline(&h3, '-'));
    }
    // the innermost paragraph div: lists and tables have their own renderers
    let paragraph = doc
        .select(&DIV)
        .find(|div| div.select(&NESTED_BLOCKS).next().is_none())
        .map(multiline_text)
        .filter(|t| !t.is_empty());
    if let Some(p) = paragraph {
        lines.push(p);
    }
    lines.join("\n")
}

fn underline(title: &str, mark: char) -> String {
    let rule: String = std::iter::repeat(mark).take(title.chars().count()).collect();
    format!("{}\n{}", title, rule)
}

fn render_list(doc: &Html) -> String {
    doc.select(&LI)
        .map(dom::text_of)
        .filter(|t| !t.is_empty())
        .map(|t| format!("- {}", t))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_timeline(doc: &Html) -> String {
    let mut lines = Vec::new();
    for table in doc.select(&TIMELINE) {
        for row in table.select(&TR) {
            let Some(cell) = row.select(&TD).nth(1) else {
                continue;
            };
            let text = multiline_text(cell);
            if !text.is_empty() {
                lines.push(format!("- {}", text));
            }
        }
    }
    lines.join("\n")
}

/// Text with inline tags unwrapped and `<br>` kept as line breaks.
fn multiline_text(el: ElementRef) -> String {
    let mut raw = String::new();
    for node in el.descendants() {
        match node.value() {
            Node::Text(t) => raw.push_str(&t.text),
            Node::Element(e) if e.name() == "br" => raw.push('\n'),
            _ => {}
        }
    }
    raw.lines()
        .map(dom::collapse_ws)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
