use tracing::warn;
use url::Url;

use crate::parser::dom::{self, A};
use crate::parser::sections::Section;
use crate::reference::Reference;

/// Parent links in document order: father first, mother second.
pub fn extract(section: &Section, base: &Url) -> Vec<Reference> {
    let mut parents: Vec<Reference> = Vec::new();
    for a in section.root().select(&A) {
        let Some(r) = dom::is_person_link(a, base) else {
            continue;
        };
        if !parents.iter().any(|p| p.key == r.key) {
            parents.push(r);
        }
    }
    if parents.len() > 2 {
        warn!("{} parent links found, keeping the first two", parents.len());
        parents.truncate(2);
    }
    parents
}
