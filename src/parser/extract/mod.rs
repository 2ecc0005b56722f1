pub mod notes;
pub mod parents;
pub mod portrait;
pub mod siblings;
pub mod unions;

use tracing::{debug, info};
use url::Url;

use super::sections::{Section, SectionKind};
use crate::model::PersonRecord;

/// Run every section through its extractor, in page order.
pub fn extract_all(sections: &[Section], page_url: &Url) -> PersonRecord {
    let mut record = PersonRecord::default();

    for section in sections {
        match section.kind {
            SectionKind::Portrait => portrait::extract(section, &mut record.portrait),
            SectionKind::Parents => record.parents = parents::extract(section, page_url),
            SectionKind::Unions => record.unions.extend(unions::extract(section, page_url)),
            SectionKind::Siblings => record.siblings = siblings::extract(section, page_url),
            SectionKind::Family => {
                debug!("Skipping \"{}\" section on {}", section.name, page_url);
            }
            SectionKind::Notes | SectionKind::Sources => {
                record.portrait.append_notes(&notes::extract(section));
            }
            SectionKind::Other if section.has_content() => {
                info!("Unhandled section \"{}\" on {}", section.name, page_url);
            }
            SectionKind::Other => {}
        }
    }

    record
}

// ── Tests ──
