//! Insertion-ordered arenas for persons and families, and the emission-time
//! projection of their links onto GEDCOM IDs.

use std::collections::HashMap;
use std::hash::Hash;

use crate::model::{Family, Individual, Sex};
use crate::reference::{FamilyKey, Reference, ReferenceKey};

/// A map that remembers insertion order. Entries are never replaced or removed.
#[derive(Debug)]
pub struct OrderedStore<K, V> {
    items: Vec<V>,
    index: HashMap<K, usize>,
}

impl<K: Eq + Hash + Clone, V> Default for OrderedStore<K, V> {
    fn default() -> Self {
        OrderedStore {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> OrderedStore<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.index.get(key).map(|&i| &mut self.items[i])
    }

    /// Zero-based insertion rank of `key`.
    pub fn position(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Insert unless present. Returns `false` (and drops `value`) on a second encounter.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.items.len());
        self.items.push(value);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub type PersonsStore = OrderedStore<ReferenceKey, Individual>;

#[derive(Debug, Default)]
pub struct FamiliesStore {
    inner: OrderedStore<FamilyKey, Family>,
}

impl FamiliesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `family`, or fold it into the family already recorded for the
    /// same couple. Returns `true` when a new family was created.
    pub fn insert(&mut self, family: Family) -> bool {
        match self.inner.get_mut(&family.key) {
            Some(existing) => {
                existing.absorb(family);
                false
            }
            None => self.inner.insert(family.key.clone(), family),
        }
    }

    /// Record `child` under its parents' family, creating the family if no
    /// page described that couple yet.
    pub fn link_child(&mut self, parents: &[Reference], child: &Reference) {
        let Some(key) = FamilyKey::from_parents(parents) else {
            return;
        };
        // keys are normalized, so one orientation covers both
        match self.inner.get_mut(&key) {
            Some(family) => {
                if !family.children.iter().any(|c| c.key == child.key) {
                    family.children.push(child.clone());
                }
            }
            None => {
                let family = Family::from_parents(key.clone(), parents, child.clone());
                self.inner.insert(key, family);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Family> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

pub fn person_id(rank: usize) -> String {
    format!("I{:05}", rank + 1)
}

pub fn family_id(rank: usize) -> String {
    format!("F{:05}", rank + 1)
}

/// An individual with its links resolved to GEDCOM IDs.
#[derive(Debug)]
pub struct IndividualView<'a> {
    pub id: String,
    pub individual: &'a Individual,
    /// Families this person is a spouse in.
    pub fams: Vec<String>,
    /// Families this person is a child of, parental pair first.
    pub famc: Vec<String>,
}

/// A family with its links resolved to GEDCOM IDs.
#[derive(Debug)]
pub struct FamilyView<'a> {
    pub id: String,
    pub family: &'a Family,
    pub husband: Option<String>,
    pub wife: Option<String>,
    pub children: Vec<String>,
}

#[derive(Debug)]
pub struct Projection<'a> {
    pub individuals: Vec<IndividualView<'a>>,
    pub families: Vec<FamilyView<'a>>,
}

/// Assign IDs by insertion order and resolve every link.
///
/// References to persons that were never scraped resolve to nothing and are
/// dropped. Spouse and child links are derived from the families alone, so
/// FAMS/HUSB/WIFE and FAMC/CHIL always agree.
pub fn project<'a>(persons: &'a PersonsStore, families: &'a FamiliesStore) -> Projection<'a> {
    let mut individuals: Vec<IndividualView> = persons
        .iter()
        .enumerate()
        .map(|(rank, individual)| IndividualView {
            id: person_id(rank),
            individual,
            fams: Vec::new(),
            famc: Vec::new(),
        })
        .collect();

    let mut family_views = Vec::with_capacity(families.len());
    for (rank, family) in families.iter().enumerate() {
        let id = family_id(rank);

        let spouses: Vec<(usize, Sex)> = family
            .spouses
            .iter()
            .filter_map(|s| persons.position(&s.key))
            .map(|slot| (slot, individuals[slot].individual.portrait.sex))
            .collect();
        let (husband, wife) = assign_spouses(&spouses);
        for &slot in husband.iter().chain(wife.iter()) {
            individuals[slot].fams.push(id.clone());
        }

        let mut children = Vec::new();
        for child in &family.children {
            let Some(slot) = persons.position(&child.key) else {
                continue;
            };
            let child_id = person_id(slot);
            if children.contains(&child_id) {
                continue;
            }
            let view = &mut individuals[slot];
            let parental =
                FamilyKey::from_parents(&view.individual.parents).as_ref() == Some(&family.key);
            if parental {
                view.famc.insert(0, id.clone());
            } else {
                view.famc.push(id.clone());
            }
            children.push(child_id);
        }

        family_views.push(FamilyView {
            id,
            family,
            husband: husband.map(person_id),
            wife: wife.map(person_id),
            children,
        });
    }

    Projection {
        individuals,
        families: family_views,
    }
}

/// Pick HUSB/WIFE by sex, falling back to the order the spouses were seen in.
fn assign_spouses(spouses: &[(usize, Sex)]) -> (Option<usize>, Option<usize>) {
    match *spouses {
        [] => (None, None),
        [(only, Sex::F)] => (None, Some(only)),
        [(only, _)] => (Some(only), None),
        [(a, Sex::F), (b, sb), ..] if sb != Sex::F => (Some(b), Some(a)),
        [(a, sa), (b, Sex::M), ..] if sa != Sex::M => (Some(b), Some(a)),
        [(a, _), (b, _), ..] => (Some(a), Some(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Portrait, Union};
    use crate::reference::canonicalize;

    fn r(name: &str) -> Reference {
        canonicalize(&format!("https://host/t?p={}&n=x", name)).unwrap()
    }

    fn person(name: &str, sex: Sex, parents: &[&str]) -> Individual {
        Individual {
            key: r(name).key,
            url: r(name).url.to_string(),
            portrait: Portrait {
                firstname: name.to_string(),
                sex,
                ..Portrait::default()
            },
            parents: parents.iter().map(|p| r(p)).collect(),
            siblings: Vec::new(),
            families: Vec::new(),
        }
    }

    fn family(a: &str, b: Option<&str>, children: &[&str]) -> Family {
        Family::from_union(
            r(a),
            Union {
                spouse: b.map(r),
                children: children.iter().map(|c| r(c)).collect(),
                ..Union::default()
            },
        )
    }

    #[test]
    fn ids_follow_insertion_order() {
        assert_eq!(person_id(0), "I00001");
        assert_eq!(family_id(41), "F00042");

        let mut persons = PersonsStore::new();
        assert!(persons.insert(r("b").key, person("b", Sex::M, &[])));
        assert!(persons.insert(r("a").key, person("a", Sex::F, &[])));
        assert!(!persons.insert(r("b").key, person("other", Sex::U, &[])));
        assert_eq!(persons.len(), 2);
        assert_eq!(persons.iter().next().unwrap().portrait.firstname, "b");
        assert_eq!(persons.position(&r("a").key), Some(1));
    }

    #[test]
    fn couple_from_either_side_is_one_family() {
        let mut families = FamiliesStore::new();
        assert!(families.insert(family("a", Some("b"), &["c"])));
        assert!(!families.insert(family("b", Some("a"), &["c", "d"])));
        assert_eq!(families.len(), 1);

        let ba = FamilyKey::new(r("b").key, Some(r("a").key));
        let family = families.iter().next().unwrap();
        assert_eq!(family.key, ba);
        assert_eq!(family.children.len(), 2);
        assert_eq!(family.spouses[0].key, r("a").key);
    }

    #[test]
    fn projection_is_reciprocal_and_drops_unknowns() {
        let mut persons = PersonsStore::new();
        persons.insert(r("wife").key, person("wife", Sex::F, &[]));
        persons.insert(r("husband").key, person("husband", Sex::M, &[]));
        persons.insert(r("kid").key, person("kid", Sex::U, &["husband", "wife"]));

        let mut families = FamiliesStore::new();
        families.insert(family("wife", Some("husband"), &["kid", "ghost"]));
        families.insert(family("husband", Some("stranger"), &["kid"]));

        let p = project(&persons, &families);
        let f1 = &p.families[0];
        assert_eq!(f1.husband.as_deref(), Some("I00002"));
        assert_eq!(f1.wife.as_deref(), Some("I00001"));
        assert_eq!(f1.children, vec!["I00003"]);

        let f2 = &p.families[1];
        assert_eq!(f2.husband.as_deref(), Some("I00002"));
        assert_eq!(f2.wife, None);

        assert_eq!(p.individuals[0].fams, vec!["F00001"]);
        assert_eq!(p.individuals[1].fams, vec!["F00001", "F00002"]);
        // parental family first even though both list the child
        assert_eq!(p.individuals[2].famc, vec!["F00001", "F00002"]);
    }

    #[test]
    fn link_child_creates_then_extends() {
        let mut families = FamiliesStore::new();
        families.link_child(&[r("p"), r("m")], &r("a"));
        families.link_child(&[r("m"), r("p")], &r("b"));
        families.link_child(&[r("m"), r("p")], &r("a"));
        families.link_child(&[], &r("c"));
        assert_eq!(families.len(), 1);
        let family = families.iter().next().unwrap();
        let kids: Vec<_> = family.children.iter().map(|c| c.key.clone()).collect();
        assert_eq!(kids, vec![r("a").key, r("b").key]);
        assert_eq!(family.spouses.len(), 2);
        assert!(family.marriage.is_none());
    }

    #[test]
    fn single_spouse_slot_by_sex() {
        let mut persons = PersonsStore::new();
        persons.insert(r("widow").key, person("widow", Sex::F, &[]));
        let mut families = FamiliesStore::new();
        families.insert(family("widow", None, &[]));
        let p = project(&persons, &families);
        assert_eq!(p.families[0].wife.as_deref(), Some("I00001"));
        assert_eq!(p.families[0].husband, None);
    }
}
