use crate::fetch::TreeInfo;
use crate::model::{Event, Family, Portrait};
use crate::store::{self, FamiliesStore, FamilyView, IndividualView, PersonsStore};

use super::{REPOSITORY_ID, SUBMITTER_ID};

const PROGRAM: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest value written on one line before the rest goes to `CONC`.
const MAX_VALUE_CHARS: usize = 248;

/// Render the whole document. Every person and family in the stores is written.
pub fn emit(persons: &PersonsStore, families: &FamiliesStore, info: Option<&TreeInfo>) -> String {
    let projection = store::project(persons, families);

    let mut w = Writer::default();
    header(&mut w, info);
    for individual in &projection.individuals {
        individual_record(&mut w, individual);
    }
    for family in &projection.families {
        family_record(&mut w, family);
    }
    w.line(0, "TRLR", "");
    w.out
}

/// Line-oriented GEDCOM writer.
#[derive(Default)]
struct Writer {
    out: String,
}

impl Writer {
    /// A line with a plain value. Every `@` in it is doubled.
    fn line(&mut self, level: u8, tag: &str, value: &str) {
        self.raw(level, tag, &value.replace('@', "@@"));
    }

    /// A line whose value is a cross-reference pointer.
    fn link(&mut self, level: u8, tag: &str, xref: &str) {
        self.raw(level, tag, xref);
    }

    fn raw(&mut self, level: u8, tag: &str, value: &str) {
        self.out.push_str(&level.to_string());
        self.out.push(' ');
        self.out.push_str(tag);
        if !value.is_empty() {
            self.out.push(' ');
            self.out.push_str(value);
        }
        self.out.push('\n');
    }

    fn record(&mut self, xref: &str, tag: &str) {
        self.raw(0, xref, tag);
    }

    /// A free-text value: line breaks become `CONT`, long lines are cut with `CONC`.
    fn text(&mut self, level: u8, tag: &str, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            let line = line.trim_end_matches('\r');
            let mut chunks = chunks(line, MAX_VALUE_CHARS);
            let first = chunks.next().unwrap_or_default();
            if i == 0 {
                self.line(level, tag, first);
            } else {
                self.line(level + 1, "CONT", first);
            }
            for rest in chunks {
                self.line(level + 1, "CONC", rest);
            }
        }
    }

    /// Sub-record for a life event; dropped when neither date nor place is known.
    fn event(&mut self, tag: &str, event: Option<&Event>) {
        let Some(event) = event.filter(|e| !e.is_empty()) else {
            return;
        };
        self.line(1, tag, "");
        if let Some(date) = &event.date {
            self.line(2, "DATE", date);
        }
        if let Some(place) = &event.place {
            self.text(2, "PLAC", place);
        }
    }

    /// Family event that may be known to have happened without any detail.
    fn family_event(&mut self, tag: &str, kind: Option<&str>, event: Option<&Event>) {
        let Some(event) = event else {
            return;
        };
        if event.is_empty() {
            self.line(1, tag, if kind.is_some() { "" } else { "Y" });
        } else {
            self.line(1, tag, "");
        }
        if let Some(kind) = kind {
            self.line(2, "TYPE", kind);
        }
        if let Some(date) = &event.date {
            self.line(2, "DATE", date);
        }
        if let Some(place) = &event.place {
            self.text(2, "PLAC", place);
        }
    }
}

/// Split at char boundaries into pieces of at most `max` chars once written,
/// counting `@` twice since it is escaped. Yields at least one (possibly
/// empty) piece.
fn chunks(s: &str, max: usize) -> impl Iterator<Item = &str> {
    let mut rest = Some(s);
    std::iter::from_fn(move || {
        let current = rest?;
        let mut width = 0;
        let cut = current.char_indices().find_map(|(i, c)| {
            width += if c == '@' { 2 } else { 1 };
            (width > max).then_some(i)
        });
        match cut {
            Some(cut) if cut > 0 => {
                rest = Some(&current[cut..]);
                Some(&current[..cut])
            }
            _ => {
                rest = None;
                Some(current)
            }
        }
    })
}

fn header(w: &mut Writer, info: Option<&TreeInfo>) {
    w.line(0, "HEAD", "");
    w.line(1, "SOUR", &PROGRAM.to_uppercase());
    w.line(2, "VERS", VERSION);
    w.line(2, "NAME", PROGRAM);
    w.link(1, "SUBM", SUBMITTER_ID);
    w.line(1, "GEDC", "");
    w.line(2, "VERS", "5.5");
    w.line(2, "FORM", "LINEAGE-LINKED");
    w.line(1, "CHAR", "UTF-8");

    let author = info.and_then(|i| i.author.as_deref());
    w.record(SUBMITTER_ID, "SUBM");
    w.line(1, "NAME", author.unwrap_or(PROGRAM));

    if let Some(info) = info {
        w.record(REPOSITORY_ID, "REPO");
        w.line(1, "NAME", author.unwrap_or(&info.url));
        // CHAN takes an exact date only
        if let Some(date) = info
            .last_change_date
            .as_deref()
            .filter(|d| d.starts_with(|c: char| c.is_ascii_digit()) && d.len() > 4)
        {
            w.line(1, "CHAN", "");
            w.line(2, "DATE", date);
        }
        let mut note = info.url.clone();
        if let Some(count) = info.persons_count {
            note.push_str(&format!("\n{} individus", count));
        }
        w.text(1, "NOTE", &note);
    }
}

fn individual_record(w: &mut Writer, view: &IndividualView) {
    let person = view.individual;
    let portrait = &person.portrait;

    w.record(&pointer(&view.id), "INDI");
    name(w, portrait);
    w.line(1, "SEX", portrait.sex.as_gedcom());
    if let Some(occupation) = &portrait.occupation {
        w.text(1, "OCCU", occupation);
    }
    w.event("BIRT", portrait.birth.as_ref());
    w.event("BAPM", portrait.baptism.as_ref());
    w.event("DEAT", portrait.death.as_ref());
    w.event("BURI", portrait.burial.as_ref());
    for family in &view.fams {
        w.link(1, "FAMS", &pointer(family));
    }
    for family in &view.famc {
        w.link(1, "FAMC", &pointer(family));
    }
    if !portrait.notes.is_empty() {
        w.text(1, "NOTE", &portrait.notes);
    }
    w.line(1, "SOUR", &person.url);
}

fn name(w: &mut Writer, portrait: &Portrait) {
    if portrait.firstname.is_empty() && portrait.lastname.is_empty() {
        return;
    }
    let full = format!("{} /{}/", portrait.firstname, portrait.lastname);
    w.line(1, "NAME", full.trim_start());
    if !portrait.firstname.is_empty() {
        w.line(2, "GIVN", &portrait.firstname);
    }
    if !portrait.lastname.is_empty() {
        w.line(2, "SURN", &portrait.lastname);
    }
}

fn family_record(w: &mut Writer, view: &FamilyView) {
    let family: &Family = view.family;

    w.record(&pointer(&view.id), "FAM");
    if let Some(husband) = &view.husband {
        w.link(1, "HUSB", &pointer(husband));
    }
    if let Some(wife) = &view.wife {
        w.link(1, "WIFE", &pointer(wife));
    }
    for child in &view.children {
        w.link(1, "CHIL", &pointer(child));
    }
    w.family_event("ENGA", None, family.engagement.as_ref());
    w.family_event("MARB", None, family.publish.as_ref());
    w.family_event("MARL", None, family.license.as_ref());
    w.event("MARR", family.marriage.as_ref());
    w.family_event("EVEN", Some("Separation"), family.separation.as_ref());
    w.family_event("DIV", None, family.divorce.as_ref());
    w.family_event("ANUL", None, family.annulment.as_ref());
}

fn pointer(id: &str) -> String {
    format!("@{}@", id)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Family, Individual, Sex, Union};
    use crate::testing::person;

    fn individual(name: &str, portrait: Portrait) -> Individual {
        let r = person(name);
        Individual {
            key: r.key,
            url: r.url.to_string(),
            portrait,
            parents: Vec::new(),
            siblings: Vec::new(),
            families: Vec::new(),
        }
    }

    #[test]
    fn empty_stores_give_a_complete_document() {
        let out = emit(&PersonsStore::new(), &FamiliesStore::new(), None);
        assert!(out.starts_with("0 HEAD\n1 SOUR GENEA_SCRAPER\n"));
        assert!(out.contains("1 GEDC\n2 VERS 5.5\n2 FORM LINEAGE-LINKED\n1 CHAR UTF-8\n"));
        assert!(out.contains("0 @B00000@ SUBM\n1 NAME genea_scraper\n"));
        assert!(!out.contains("REPO"));
        assert!(out.ends_with("0 TRLR\n"));
    }

    #[test]
    fn repository_from_tree_info() {
        let info = TreeInfo {
            author: Some("Jean Dupont".into()),
            persons_count: Some(1200),
            last_change_date: Some("03 MAR 2023".into()),
            url: "https://gw.geneanet.org/dupont".into(),
        };
        let out = emit(&PersonsStore::new(), &FamiliesStore::new(), Some(&info));
        assert!(out.contains("0 @B00000@ SUBM\n1 NAME Jean Dupont\n"));
        assert!(out.contains(
            "0 @R00000@ REPO\n1 NAME Jean Dupont\n1 CHAN\n2 DATE 03 MAR 2023\n\
             1 NOTE https://gw.geneanet.org/dupont\n2 CONT 1200 individus\n"
        ));
    }

    #[test]
    fn individual_with_events_and_notes() {
        let mut persons = PersonsStore::new();
        let portrait = Portrait {
            firstname: "Jean".into(),
            lastname: "Dupont".into(),
            sex: Sex::M,
            birth: Some(Event {
                date: Some("15 JAN 1873".into()),
                place: Some("Paris,75000".into()),
            }),
            death: Some(Event::default()),
            burial: Some(Event {
                date: None,
                place: Some("Lyon".into()),
            }),
            occupation: Some("Cultivateur".into()),
            notes: "Notes\n=====\n\nMaire".into(),
            ..Portrait::default()
        };
        persons.insert(person("jean").key, individual("jean", portrait));

        let out = emit(&persons, &FamiliesStore::new(), None);
        let expected = "0 @I00001@ INDI\n\
            1 NAME Jean /Dupont/\n2 GIVN Jean\n2 SURN Dupont\n\
            1 SEX M\n1 OCCU Cultivateur\n\
            1 BIRT\n2 DATE 15 JAN 1873\n2 PLAC Paris,75000\n\
            1 BURI\n2 PLAC Lyon\n\
            1 NOTE Notes\n2 CONT =====\n2 CONT\n2 CONT Maire\n\
            1 SOUR https://gw.geneanet.org/tree?lang=fr&p=jean&n=x\n";
        assert!(out.contains(expected), "{}", out);
        assert!(!out.contains("DEAT"));
    }

    #[test]
    fn nameless_person_has_no_name_line() {
        let mut persons = PersonsStore::new();
        persons.insert(person("x").key, individual("x", Portrait::default()));
        let out = emit(&persons, &FamiliesStore::new(), None);
        assert!(out.contains("0 @I00001@ INDI\n1 SEX U\n"));
    }

    #[test]
    fn family_events_and_flags() {
        let mut persons = PersonsStore::new();
        let wife = Portrait { sex: Sex::F, ..Portrait::default() };
        let husband = Portrait { sex: Sex::M, ..Portrait::default() };
        persons.insert(person("w").key, individual("w", wife));
        persons.insert(person("h").key, individual("h", husband));

        let mut families = FamiliesStore::new();
        families.insert(Family::from_union(
            person("w"),
            Union {
                spouse: Some(person("h")),
                marriage: Some(Event {
                    date: Some("12 JUN 1900".into()),
                    place: None,
                }),
                divorce: Some(Event::default()),
                separation: Some(Event::default()),
                children: vec![person("unknown")],
                ..Union::default()
            },
        ));

        let out = emit(&persons, &families, None);
        let expected = "0 @F00001@ FAM\n1 HUSB @I00002@\n1 WIFE @I00001@\n\
            1 MARR\n2 DATE 12 JUN 1900\n\
            1 EVEN\n2 TYPE Separation\n\
            1 DIV Y\n0 TRLR\n";
        assert!(out.ends_with(expected), "{}", out);
        assert!(out.contains("0 @I00001@ INDI\n1 SEX F\n1 FAMS @F00001@\n"));
        assert!(!out.contains("CHIL"));
    }

    #[test]
    fn long_values_are_continued() {
        let long: String = "é".repeat(MAX_VALUE_CHARS + 10);
        let mut w = Writer::default();
        w.text(1, "NOTE", &format!("{}\nfin", long));
        let lines: Vec<&str> = w.out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].chars().count(), "1 NOTE ".len() + MAX_VALUE_CHARS);
        assert_eq!(lines[1], format!("2 CONC {}", "é".repeat(10)));
        assert_eq!(lines[2], "2 CONT fin");
    }

    #[test]
    fn at_signs_in_values_are_doubled() {
        let mut persons = PersonsStore::new();
        let portrait = Portrait {
            firstname: "Jean".into(),
            notes: "Contact: jean@example.org".into(),
            burial: Some(Event {
                date: None,
                place: Some("Chez @Lyon".into()),
            }),
            ..Portrait::default()
        };
        let mut jean = individual("jean", portrait);
        jean.url = "https://gw.geneanet.org/tree?p=jean@x&n=x".into();
        persons.insert(person("jean").key, jean);

        let out = emit(&persons, &FamiliesStore::new(), None);
        assert!(out.contains("1 NOTE Contact: jean@@example.org\n"), "{}", out);
        assert!(out.contains("2 PLAC Chez @@Lyon\n"));
        assert!(out.contains("1 SOUR https://gw.geneanet.org/tree?p=jean@@x&n=x\n"));
        assert!(out.contains("1 SUBM @B00000@\n"));
        assert!(crate::gedcom::validate::validate_str(&out).is_ok());
    }

    #[test]
    fn escaped_at_signs_count_towards_line_length() {
        let text = format!("{}@tail", "a".repeat(MAX_VALUE_CHARS - 1));
        let mut w = Writer::default();
        w.text(1, "NOTE", &text);
        let lines: Vec<&str> = w.out.lines().collect();
        assert_eq!(lines[0], format!("1 NOTE {}", "a".repeat(MAX_VALUE_CHARS - 1)));
        assert_eq!(lines[1], "2 CONC @@tail");
    }

    #[test]
    fn emission_is_deterministic() {
        let mut persons = PersonsStore::new();
        persons.insert(person("a").key, individual("a", Portrait::default()));
        let first = emit(&persons, &FamiliesStore::new(), None);
        let second = emit(&persons, &FamiliesStore::new(), None);
        assert_eq!(first, second);
    }
}
