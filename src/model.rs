use crate::reference::{FamilyKey, Reference, ReferenceKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Sex {
    M,
    F,
    #[default]
    U,
}

impl Sex {
    /// The site marks sex with the `alt` text of the title icon: `H` (homme) or `F`.
    pub fn from_alt(alt: &str) -> Self {
        match alt.trim() {
            "H" => Sex::M,
            "F" => Sex::F,
            _ => Sex::U,
        }
    }

    pub fn as_gedcom(self) -> &'static str {
        match self {
            Sex::M => "M",
            Sex::F => "F",
            Sex::U => "U",
        }
    }
}

/// A dated, placed life event. Both parts are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub date: Option<String>,
    pub place: Option<String>,
}

impl Event {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.place.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Portrait {
    pub firstname: String,
    pub lastname: String,
    pub sex: Sex,
    pub birth: Option<Event>,
    pub death: Option<Event>,
    pub baptism: Option<Event>,
    pub burial: Option<Event>,
    pub occupation: Option<String>,
    pub notes: String,
}

impl Portrait {
    /// Append a block of notes, separated from earlier ones by a blank line.
    pub fn append_notes(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.notes.is_empty() {
            self.notes.push_str("\n\n");
        }
        self.notes.push_str(text);
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }
}

/// A union as read from one person's page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Union {
    pub spouse: Option<Reference>,
    pub marriage: Option<Event>,
    pub divorce: Option<Event>,
    pub annulment: Option<Event>,
    pub engagement: Option<Event>,
    pub publish: Option<Event>,
    pub license: Option<Event>,
    pub separation: Option<Event>,
    pub children: Vec<Reference>,
}

/// Everything extracted from one person page.
#[derive(Debug, Clone, Default)]
pub struct PersonRecord {
    pub portrait: Portrait,
    pub parents: Vec<Reference>,
    pub siblings: Vec<Reference>,
    pub unions: Vec<Union>,
}

#[derive(Debug, Clone)]
pub struct Individual {
    pub key: ReferenceKey,
    pub url: String,
    pub portrait: Portrait,
    pub parents: Vec<Reference>,
    pub siblings: Vec<Reference>,
    /// One entry per union on the page, in page order.
    pub families: Vec<FamilyKey>,
}

#[derive(Debug, Clone)]
pub struct Family {
    pub key: FamilyKey,
    /// Spouses in the order they were first seen: page owner, then partner.
    pub spouses: Vec<Reference>,
    pub marriage: Option<Event>,
    pub divorce: Option<Event>,
    pub annulment: Option<Event>,
    pub engagement: Option<Event>,
    pub publish: Option<Event>,
    pub license: Option<Event>,
    pub separation: Option<Event>,
    pub children: Vec<Reference>,
}

impl Family {
    pub fn from_union(owner: Reference, union: Union) -> Self {
        let key = FamilyKey::new(
            owner.key.clone(),
            union.spouse.as_ref().map(|s| s.key.clone()),
        );
        let mut spouses = vec![owner];
        if let Some(spouse) = union.spouse {
            if spouse.key != spouses[0].key {
                spouses.push(spouse);
            }
        }
        Family {
            key,
            spouses,
            marriage: union.marriage,
            divorce: union.divorce,
            annulment: union.annulment,
            engagement: union.engagement,
            publish: union.publish,
            license: union.license,
            separation: union.separation,
            children: union.children,
        }
    }

    /// Merge what another page says about the same couple. Fields already
    /// known are kept; only gaps are filled and new children appended.
    pub fn absorb(&mut self, other: Family) {
        for spouse in other.spouses {
            if !self.spouses.iter().any(|s| s.key == spouse.key) {
                self.spouses.push(spouse);
            }
        }
        for child in other.children {
            if !self.children.iter().any(|c| c.key == child.key) {
                self.children.push(child);
            }
        }
        fill(&mut self.marriage, other.marriage);
        fill(&mut self.divorce, other.divorce);
        fill(&mut self.annulment, other.annulment);
        fill(&mut self.engagement, other.engagement);
        fill(&mut self.publish, other.publish);
        fill(&mut self.license, other.license);
        fill(&mut self.separation, other.separation);
    }

    /// A couple known only from a child's parents section.
    pub fn from_parents(key: FamilyKey, parents: &[Reference], child: Reference) -> Self {
        Family {
            key,
            spouses: parents.iter().take(2).cloned().collect(),
            marriage: None,
            divorce: None,
            annulment: None,
            engagement: None,
            publish: None,
            license: None,
            separation: None,
            children: vec![child],
        }
    }
}

fn fill(slot: &mut Option<Event>, other: Option<Event>) {
    if slot.is_none() {
        *slot = other;
    }
}
