use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use url::Url;

use crate::model::{Event, Union};
use crate::parser::dates;
use crate::parser::dom::{self, UL};
use crate::parser::sections::Section;

static EM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("em").unwrap());

/// One union per item of the section's first list.
pub fn extract(section: &Section, base: &Url) -> Vec<Union> {
    let Some(list) = section.root().select(&UL).next() else {
        return Vec::new();
    };
    dom::list_items(list).map(|li| extract_union(li, base)).collect()
}

fn extract_union(li: ElementRef, base: &Url) -> Union {
    let marriage = li
        .select(&EM)
        .find(|em| !dom::in_nested_list(*em, li))
        .map(dom::text_of)
        .map(|phrase| marriage_event(&phrase))
        .filter(|e| !e.is_empty());

    let spouse = dom::first_person_link(li, base, true);

    let children = li
        .select(&UL)
        .next()
        .map(|kids| {
            dom::list_items(kids)
                .filter_map(|child| dom::first_person_link(child, base, false))
                .collect()
        })
        .unwrap_or_default();

    let text = dom::own_text(li);
    let flag = |marker: &str| text.contains(marker).then(Event::default);

    Union {
        spouse,
        marriage,
        annulment: flag("annulé"),
        divorce: flag("divorcé"),
        publish: flag("bans"),
        license: flag("license"),
        separation: flag("séparé"),
        engagement: flag("fiancé"),
        children,
    }
}

/// "Marié le 12 juin 1900, Paris, 75000" → date from the first segment
/// (keyword dropped), place from the rest.
fn marriage_event(phrase: &str) -> Event {
    let mut segments = phrase.split(',');
    let head = segments.next().unwrap_or_default();
    let tokens: Vec<&str> = head.split_whitespace().skip(1).collect();
    let rest: Vec<&str> = segments.collect();

    Event {
        date: dates::parse(&tokens),
        place: dom::normalize_place(&rest.join(",")),
    }
}
