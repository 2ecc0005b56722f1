use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

/// Event tags counted in [`Stats::events`].
const EVENT_TAGS: [&str; 12] = [
    "BIRT", "BAPM", "DEAT", "BURI", "MARR", "DIV", "ANUL", "ENGA", "MARB", "MARL", "EVEN", "OCCU",
];

/// Errors beyond this many are counted but not listed.
const MAX_LISTED: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub individuals: usize,
    pub families: usize,
    pub notes: usize,
    pub submitters: usize,
    pub repositories: usize,
    pub events: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} individuals, {} families, {} events, {} notes, {} submitters, {} repositories",
            self.individuals, self.families, self.events, self.notes, self.submitters, self.repositories
        )
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub status: Status,
    pub message: String,
    pub stats: Stats,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

pub fn validate_file(path: &Path) -> Result<Report> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(validate_str(&text))
}

struct Line<'a> {
    number: usize,
    level: u32,
    xref: Option<&'a str>,
    tag: &'a str,
    value: &'a str,
}

/// Records as seen by the reciprocity checks: INDI and FAM links only.
#[derive(Default)]
struct Links<'a> {
    fams: Vec<&'a str>,
    famc: Vec<&'a str>,
    spouses: Vec<&'a str>,
    children: Vec<&'a str>,
}

pub fn validate_str(text: &str) -> Report {
    let mut errors = Vec::new();
    let mut stats = Stats::default();

    let mut lines = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        match parse_line(i + 1, raw) {
            Some(line) => lines.push(line),
            None => errors.push(format!("line {}: malformed: {:?}", i + 1, raw)),
        }
    }

    match (lines.first(), lines.last()) {
        (Some(first), Some(last)) => {
            if (first.level, first.tag) != (0, "HEAD") {
                errors.push("first record is not HEAD".to_string());
            }
            if (last.level, last.tag) != (0, "TRLR") {
                errors.push("last record is not TRLR".to_string());
            }
        }
        _ => errors.push("empty file".to_string()),
    }

    let mut defined = HashSet::new();
    let mut records: HashMap<&str, (&str, Links)> = HashMap::new();
    let mut current: Option<&str> = None;
    let mut previous_level = 0;

    for line in &lines {
        if line.level > previous_level + 1 {
            errors.push(format!(
                "line {}: level jumps from {} to {}",
                line.number, previous_level, line.level
            ));
        }
        previous_level = line.level;

        if line.level == 0 {
            current = line.xref;
            match line.tag {
                "INDI" => stats.individuals += 1,
                "FAM" => stats.families += 1,
                "SUBM" => stats.submitters += 1,
                "REPO" => stats.repositories += 1,
                "NOTE" => stats.notes += 1,
                _ => {}
            }
            if let Some(xref) = line.xref {
                if !defined.insert(xref) {
                    errors.push(format!("line {}: duplicate record {}", line.number, xref));
                }
                records.insert(xref, (line.tag, Links::default()));
            }
            continue;
        }

        if line.tag == "NOTE" {
            stats.notes += 1;
        }
        if line.level == 1 && EVENT_TAGS.contains(&line.tag) {
            stats.events += 1;
        }

        if line.level != 1 || !is_pointer(line.value) {
            continue;
        }
        let Some((_, links)) = current.and_then(|c| records.get_mut(c)) else {
            continue;
        };
        match line.tag {
            "FAMS" => links.fams.push(line.value),
            "FAMC" => links.famc.push(line.value),
            "HUSB" | "WIFE" => links.spouses.push(line.value),
            "CHIL" => links.children.push(line.value),
            _ => {}
        }
    }

    for line in &lines {
        if !is_pointer(line.value) && line.value.replace("@@", "").contains('@') {
            errors.push(format!("line {}: unescaped @ in {}", line.number, line.tag));
        }
        if is_pointer(line.value) && !defined.contains(line.value) {
            errors.push(format!(
                "line {}: {} points to undefined {}",
                line.number, line.tag, line.value
            ));
        }
    }

    check_reciprocity(&records, &mut errors);

    let message = if errors.is_empty() {
        stats.to_string()
    } else {
        let mut listed: Vec<String> = errors.iter().take(MAX_LISTED).cloned().collect();
        if errors.len() > MAX_LISTED {
            listed.push(format!("... and {} more", errors.len() - MAX_LISTED));
        }
        listed.join("; ")
    };

    Report {
        status: if errors.is_empty() { Status::Ok } else { Status::Error },
        message,
        stats,
    }
}

fn check_reciprocity(records: &HashMap<&str, (&str, Links<'_>)>, errors: &mut Vec<String>) {
    let mut xrefs: Vec<&&str> = records.keys().collect();
    xrefs.sort();
    for xref in xrefs {
        let (tag, links) = &records[*xref];
        match *tag {
            "INDI" => {
                for fam in &links.fams {
                    if !links_of(records, fam, "FAM").is_some_and(|f| f.spouses.contains(xref)) {
                        errors.push(format!("{} has FAMS {} but is not a spouse there", xref, fam));
                    }
                }
                for fam in &links.famc {
                    if !links_of(records, fam, "FAM").is_some_and(|f| f.children.contains(xref)) {
                        errors.push(format!("{} has FAMC {} but is not a child there", xref, fam));
                    }
                }
            }
            "FAM" => {
                for spouse in &links.spouses {
                    if !links_of(records, spouse, "INDI").is_some_and(|p| p.fams.contains(xref)) {
                        errors.push(format!("{} lists spouse {} without FAMS back", xref, spouse));
                    }
                }
                for child in &links.children {
                    if !links_of(records, child, "INDI").is_some_and(|p| p.famc.contains(xref)) {
                        errors.push(format!("{} lists child {} without FAMC back", xref, child));
                    }
                }
            }
            _ => {}
        }
    }
}

fn links_of<'r, 'a>(
    records: &'r HashMap<&'a str, (&'a str, Links<'a>)>,
    xref: &str,
    tag: &str,
) -> Option<&'r Links<'a>> {
    match records.get(xref) {
        Some((t, links)) if *t == tag => Some(links),
        _ => None,
    }
}

/// `LEVEL [@XREF@] TAG [VALUE]`
fn parse_line(number: usize, raw: &str) -> Option<Line<'_>> {
    let raw = raw.trim_start_matches('\u{feff}').trim_end_matches('\r');
    let (level, rest) = raw.split_once(' ')?;
    let level = level.parse().ok()?;

    let (xref, rest) = if rest.starts_with('@') {
        let (xref, rest) = rest.split_once(' ')?;
        if !is_pointer(xref) {
            return None;
        }
        (Some(xref), rest)
    } else {
        (None, rest)
    };

    let (tag, value) = rest.split_once(' ').unwrap_or((rest, ""));
    if tag.is_empty() {
        return None;
    }
    Some(Line {
        number,
        level,
        xref,
        tag,
        value,
    })
}

fn is_pointer(value: &str) -> bool {
    value.len() > 2 && value.starts_with('@') && value.ends_with('@') && !value[1..value.len() - 1].contains('@')
}

// ── Tests ──
