//! Small DOM helpers shared by the section extractors.

use std::sync::LazyLock;

use scraper::{ElementRef, Node, Selector};
use tracing::warn;
use url::Url;

use crate::reference::{self, Reference};

pub static A: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
pub static LI: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
pub static UL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

/// Query keys that make a link point at a person rather than a site page.
const PERSON_PARAMS: [&str; 3] = ["p", "n", "i"];

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All text below `el`, whitespace collapsed.
pub fn text_of(el: ElementRef) -> String {
    collapse_ws(&el.text().collect::<String>())
}

/// Text of `scope` that does not belong to a nested list.
pub fn own_text(scope: ElementRef) -> String {
    let mut raw = String::new();
    for node in scope.descendants() {
        if let Node::Text(t) = node.value() {
            let inside = node
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|p| in_nested_list(p, scope));
            if !inside {
                raw.push_str(&t.text);
            }
        }
    }
    collapse_ws(&raw)
}

/// Whether `el` sits inside a `ul`/`ol` nested below `scope` (inclusive of `el`).
pub fn in_nested_list(el: ElementRef, scope: ElementRef) -> bool {
    if el.id() == scope.id() {
        return false;
    }
    if is_list(el) {
        return true;
    }
    for ancestor in el.ancestors() {
        if ancestor.id() == scope.id() {
            return false;
        }
        if ElementRef::wrap(ancestor).is_some_and(is_list) {
            return true;
        }
    }
    false
}

fn is_list(el: ElementRef) -> bool {
    matches!(el.value().name(), "ul" | "ol")
}

/// Direct `<li>` children of a list element.
pub fn list_items<'a>(list: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "li")
}

/// Decorative Sosa-number icons are wrapped in their own links.
pub fn is_sosa_link(a: ElementRef) -> bool {
    a.select(&IMG)
        .any(|img| img.value().attr("alt").is_some_and(|alt| alt.trim().eq_ignore_ascii_case("sosa")))
}

/// Resolve a link to a person reference. Links to non-person pages yield `None`.
pub fn person_ref(a: ElementRef, base: &Url) -> Option<Reference> {
    let href = a.value().attr("href")?;
    match reference::resolve(base, href) {
        Ok(r) if r.url.query_pairs().any(|(k, _)| PERSON_PARAMS.iter().any(|p| *p == k)) => Some(r),
        Ok(_) => None,
        Err(e) => {
            warn!("Skipping link: {}", e);
            None
        }
    }
}

/// A link with visible text, not a Sosa icon, pointing at a person.
pub fn is_person_link(a: ElementRef, base: &Url) -> Option<Reference> {
    if is_sosa_link(a) || text_of(a).is_empty() {
        return None;
    }
    person_ref(a, base)
}

/// First person link below `scope`, optionally skipping nested lists.
pub fn first_person_link(scope: ElementRef, base: &Url, skip_nested: bool) -> Option<Reference> {
    scope
        .select(&A)
        .filter(|a| !skip_nested || !in_nested_list(*a, scope))
        .find_map(|a| is_person_link(a, base))
}

/// Python-style title case: first letter of every alphabetic run upper-cased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Split on commas, trim, drop empty pieces, rejoin with `,`.
pub fn normalize_place(s: &str) -> Option<String> {
    let joined = s
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
