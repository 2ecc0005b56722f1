use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use tracing::warn;

use crate::model::{Event, Portrait, Sex};
use crate::parser::dates;
use crate::parser::dom::{self, A, LI};
use crate::parser::sections::Section;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#person-title, .person-title").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

static BIRTH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bNée?\b").unwrap());
static DEATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bDécédée?\b").unwrap());
static BAPTISM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bbaptisée?\b").unwrap());
static BURIAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\binhumée?\b").unwrap());
static AGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)à l['’]âge").unwrap());

/// Fill names, sex, life events and occupation from a Portrait section.
/// Notes already gathered from other sections are left alone.
pub fn extract(section: &Section, portrait: &mut Portrait) {
    let root = section.root();

    match root.select(&TITLE).next() {
        Some(title) => {
            let mut names = title
                .select(&A)
                .map(dom::text_of)
                .filter(|t| !t.is_empty());
            portrait.firstname = names.next().map(|n| dom::title_case(&n)).unwrap_or_default();
            portrait.lastname = names.next().map(|n| dom::title_case(&n)).unwrap_or_default();
            portrait.sex = title
                .select(&IMG)
                .next()
                .and_then(|img| img.value().attr("alt"))
                .map(Sex::from_alt)
                .unwrap_or_default();
        }
        None => warn!("Portrait section without a person-title block"),
    }

    let items: Vec<String> = root.select(&LI).map(dom::text_of).collect();
    let find = |re: &Regex| items.iter().find(|t| re.is_match(t)).map(|t| parse_event(t));

    portrait.birth = find(&*BIRTH_RE);
    portrait.death = find(&*DEATH_RE);
    portrait.baptism = find(&*BAPTISM_RE);
    portrait.burial = find(&*BURIAL_RE);

    portrait.occupation = items
        .iter()
        .find(|t| {
            !t.is_empty()
                && ![&*BIRTH_RE, &*DEATH_RE, &*BAPTISM_RE, &*BURIAL_RE]
                    .iter()
                    .any(|re| re.is_match(t))
        })
        .cloned();
}

/// "Né le 15 janvier 1873 - Paris, 75000, France" → date + place.
///
/// The first word of the date half is the event keyword and is dropped.
pub fn parse_event(text: &str) -> Event {
    let (when, where_) = match text.split_once('-') {
        Some((left, right)) => (left, Some(right)),
        None => (text, None),
    };

    let tokens: Vec<&str> = when.split_whitespace().skip(1).collect();
    let date = dates::parse(&tokens);

    let place = where_.and_then(|p| {
        let p = match AGE_RE.find(p) {
            Some(m) => &p[..m.start()],
            None => p,
        };
        dom::normalize_place(p)
    });

    Event { date, place }
}
