use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

static PERSO: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#perso").unwrap());
static CONTENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#content").unwrap());
static SCRIPT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="javascript"]"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Portrait,
    Parents,
    Unions,
    Siblings,
    /// "Famille" blocks duplicate what the other sections already carry.
    Family,
    Notes,
    Sources,
    Other,
}

/// Lower-cased substring → kind. First match wins, so order matters.
const DISPATCH: [(&str, SectionKind); 9] = [
    ("portrait", SectionKind::Portrait),
    ("parents", SectionKind::Parents),
    ("union", SectionKind::Unions),
    ("freres et soeurs", SectionKind::Siblings),
    ("famille", SectionKind::Family),
    ("relation", SectionKind::Notes),
    ("related", SectionKind::Notes),
    ("notes", SectionKind::Notes),
    ("sources", SectionKind::Sources),
];

impl SectionKind {
    pub fn classify(name: &str) -> Self {
        let lower = name.to_lowercase();
        DISPATCH
            .iter()
            .find(|(marker, _)| lower.contains(marker))
            .map(|(_, kind)| *kind)
            .unwrap_or(SectionKind::Other)
    }
}

/// One comment-delimited region of a person page.
#[derive(Debug)]
pub struct Section {
    pub name: String,
    pub kind: SectionKind,
    /// Serialized content, script links included.
    pub html: String,
    /// Parsed content with `javascript:` links removed.
    pub dom: Html,
}

impl Section {
    fn new(name: String, html: String) -> Self {
        let kind = SectionKind::classify(&name);
        let dom = parse_clean(&html);
        Section { name, kind, html, dom }
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.dom.root_element()
    }

    pub fn has_content(&self) -> bool {
        self.root().text().any(|t| !t.trim().is_empty())
    }
}

/// Parse an HTML fragment and drop every `<a>` whose href mentions `javascript`.
pub fn parse_clean(html: &str) -> Html {
    let mut dom = Html::parse_fragment(html);
    let ids: Vec<_> = dom.select(&SCRIPT_LINK).map(|a| a.id()).collect();
    for id in ids {
        if let Some(mut node) = dom.tree.get_mut(id) {
            node.detach();
        }
    }
    dom
}

/// Split a person page into sections, in document order.
///
/// The site marks each region with an HTML comment naming it; a section is
/// the run of siblings following its comment up to the next comment.
pub fn split_sections(fragment: &str) -> Vec<Section> {
    let doc = Html::parse_fragment(fragment);
    let container = doc
        .select(&PERSO)
        .next()
        .or_else(|| doc.select(&CONTENT).next())
        .unwrap_or_else(|| doc.root_element());

    let mut sections = Vec::new();
    for node in container.descendants() {
        let Node::Comment(comment) = node.value() else {
            continue;
        };
        let name = comment.trim();
        if is_widget_marker(name) {
            continue;
        }

        let mut html = String::new();
        for sibling in node.next_siblings() {
            match sibling.value() {
                Node::Comment(_) => break,
                Node::Text(t) => html.push_str(&escape_text(&t.text)),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(sibling) {
                        html.push_str(&el.html());
                    }
                }
                _ => {}
            }
        }
        sections.push(Section::new(name.to_string(), html));
    }
    sections
}

/// Template comments from the page's JS framework (`ng…`) and the tree widget.
fn is_widget_marker(name: &str) -> bool {
    name.contains("ng") || name.to_lowercase().contains("arbre")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ── Tests ──
