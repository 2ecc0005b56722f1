use std::fmt;

use tracing::debug;
use url::Url;

use crate::error::ReferenceError;

/// Query keys that identify a person on the source site, in the order they
/// are written into a [`ReferenceKey`]. Changing this order changes every key
/// and therefore every GEDCOM ID assignment.
const KEY_PARAMS: [&str; 6] = ["m", "v", "p", "n", "oc", "i"];

/// Parameters the site adds for display only; dropping them is not worth a log line.
const NOISE_PARAMS: [&str; 4] = ["lang", "pz", "nz", "iz"];

const FETCH_LANG: &str = "fr";

/// Canonical identifier of a person on the source site: `userid?m=..&p=..&n=..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceKey(String);

impl ReferenceKey {
    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A person link: identity plus the URL to fetch it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub key: ReferenceKey,
    pub url: Url,
}

/// Unordered pair of spouses. `{A,B}` and `{B,A}` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FamilyKey {
    first: ReferenceKey,
    second: Option<ReferenceKey>,
}

impl FamilyKey {
    /// Build a key from one or two spouses. A spouse equal to `a` is dropped,
    /// so both slots never name the same person.
    pub fn new(a: ReferenceKey, b: Option<ReferenceKey>) -> Self {
        match b {
            Some(b) if b == a => FamilyKey { first: a, second: None },
            Some(b) if b < a => FamilyKey { first: b, second: Some(a) },
            b => FamilyKey { first: a, second: b },
        }
    }

    /// The key of the family formed by a person's parents, if any are known.
    pub fn from_parents(parents: &[Reference]) -> Option<Self> {
        let mut keys = parents.iter().map(|p| p.key.clone());
        let first = keys.next()?;
        Some(FamilyKey::new(first, keys.next()))
    }
}

/// Parse an absolute URL and canonicalize it.
pub fn canonicalize(url: &str) -> Result<Reference, ReferenceError> {
    let parsed = Url::parse(url).map_err(|e| ReferenceError::InvalidUrl {
        url: url.to_string(),
        source: e,
    })?;
    Ok(canonicalize_url(&parsed))
}

/// Resolve an `href` found on a page against that page's URL, then canonicalize.
pub fn resolve(base: &Url, href: &str) -> Result<Reference, ReferenceError> {
    let joined = base.join(href.trim()).map_err(|e| ReferenceError::InvalidUrl {
        url: href.to_string(),
        source: e,
    })?;
    Ok(canonicalize_url(&joined))
}

pub fn canonicalize_url(url: &Url) -> Reference {
    Reference {
        key: reference_key(url),
        url: fetch_url(url),
    }
}

fn reference_key(url: &Url) -> ReferenceKey {
    let userid = url.path().trim_start_matches('/');

    let mut dropped = Vec::new();
    let mut values: [Option<String>; KEY_PARAMS.len()] = Default::default();
    for (k, v) in url.query_pairs() {
        match KEY_PARAMS.iter().position(|p| *p == k) {
            // first occurrence wins
            Some(idx) => {
                values[idx].get_or_insert_with(|| v.into_owned());
            }
            None if NOISE_PARAMS.iter().any(|p| *p == k) => {}
            None => dropped.push(k.into_owned()),
        }
    }
    if !dropped.is_empty() {
        debug!("Dropped query parameters {:?} from {}", dropped, url);
    }

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in KEY_PARAMS.iter().zip(values.iter()) {
        match (value, *name) {
            (Some(v), _) => {
                query.append_pair(name, v);
            }
            (None, "p") | (None, "n") => {
                query.append_pair(name, "");
            }
            (None, _) => {}
        }
    }

    ReferenceKey(format!("{}?{}", userid, query.finish()))
}

fn fetch_url(url: &Url) -> Url {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    match pairs.iter_mut().find(|(k, _)| k == "lang") {
        Some(lang) => lang.1 = FETCH_LANG.to_string(),
        None => pairs.push(("lang".to_string(), FETCH_LANG.to_string())),
    }

    let mut out = url.clone();
    out.set_fragment(None);
    out.query_pairs_mut().clear().extend_pairs(pairs);
    out
}

/// Scheme, host and userid path of a person URL: the tree's home page.
pub fn tree_base(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base
}

/// The tree owner's userid (URL path without the leading slash).
pub fn userid(url: &Url) -> &str {
    url.path().trim_start_matches('/')
}
