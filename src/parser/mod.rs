pub mod dates;
pub mod dom;
pub mod extract;
pub mod sections;

use url::Url;

use crate::model::PersonRecord;

/// Two-pass pipeline: page fragment → sections → extracted record.
pub fn process_page(fragment: &str, page_url: &Url) -> PersonRecord {
    let sections = sections::split_sections(fragment);
    extract::extract_all(&sections, page_url)
}
