use url::Url;

use crate::parser::dom::{self, UL};
use crate::parser::sections::Section;
use crate::reference::Reference;

/// One reference per item of the first list, in page order.
pub fn extract(section: &Section, base: &Url) -> Vec<Reference> {
    let Some(list) = section.root().select(&UL).next() else {
        return Vec::new();
    };
    dom::list_items(list)
        .filter_map(|li| dom::first_person_link(li, base, false))
        .collect()
}
