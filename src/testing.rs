//! In-memory page source and a builder for minimal person pages.

use std::cell::RefCell;
use std::collections::HashMap;

use url::Url;

use crate::error::FetchError;
use crate::fetch::{PageFetcher, TreeInfo};
use crate::reference::{self, Reference};

pub const BASE: &str = "https://gw.geneanet.org/tree";

/// Reference of the test person `name` (`tree?p=<name>&n=x`).
pub fn person(name: &str) -> Reference {
    reference::canonicalize(&format!("{}?lang=en&p={}&n=x", BASE, name)).unwrap()
}

/// Serves pages by canonical key and records every fetch.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    pub info: Option<TreeInfo>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, page: PageBuilder) -> Self {
        self.pages.insert(person(name).key.to_string(), page.build());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &Url, _force: bool) -> Result<String, FetchError> {
        let key = reference::canonicalize_url(url).key.to_string();
        self.calls.borrow_mut().push(key.clone());
        self.pages
            .get(&key)
            .cloned()
            .ok_or(FetchError::Status { url: key, status: 404 })
    }

    async fn informations(&self, base_url: &Url, _force: bool) -> Result<TreeInfo, FetchError> {
        self.info
            .clone()
            .ok_or_else(|| FetchError::Status {
                url: base_url.to_string(),
                status: 404,
            })
    }
}

struct UnionSpec {
    spouse: Option<String>,
    phrase: Option<String>,
    children: Vec<String>,
}

/// Person-container HTML in the shape the site serves.
#[derive(Default)]
pub struct PageBuilder {
    first: String,
    last: String,
    sex: &'static str,
    facts: Vec<String>,
    parents: Vec<String>,
    unions: Vec<UnionSpec>,
    notes: Option<String>,
}

pub fn page(first: &str, sex: &'static str) -> PageBuilder {
    PageBuilder {
        first: first.to_string(),
        last: "X".to_string(),
        sex,
        ..PageBuilder::default()
    }
}

impl PageBuilder {
    pub fn fact(mut self, line: &str) -> Self {
        self.facts.push(line.to_string());
        self
    }

    pub fn parents(mut self, names: &[&str]) -> Self {
        self.parents = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn union(mut self, spouse: Option<&str>, phrase: Option<&str>, children: &[&str]) -> Self {
        self.unions.push(UnionSpec {
            spouse: spouse.map(str::to_string),
            phrase: phrase.map(str::to_string),
            children: children.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn notes(mut self, text: &str) -> Self {
        self.notes = Some(text.to_string());
        self
    }

    pub fn build(&self) -> String {
        let link = |name: &str| format!(r#"<a href="tree?lang=fr&amp;p={0}&amp;n=x">{0} X</a>"#, name);

        let mut html = String::from(r#"<div id="perso">"#);
        html.push_str(&format!(
            r#"<!-- Portrait --><div id="person-title"><h1><img alt="{}"> <a href="tree?p={}&amp;n=x">{}</a> <a href="tree?n=x">{}</a></h1></div><ul>"#,
            self.sex, self.first, self.first, self.last
        ));
        for fact in &self.facts {
            html.push_str(&format!("<li>{}</li>", fact));
        }
        html.push_str("</ul>");

        if !self.parents.is_empty() {
            html.push_str("<!-- Parents --><ul>");
            for p in &self.parents {
                html.push_str(&format!("<li>{}</li>", link(p)));
            }
            html.push_str("</ul>");
        }

        if !self.unions.is_empty() {
            html.push_str(r#"<!-- Union --><ul class="fiche_union">"#);
            for u in &self.unions {
                html.push_str("<li>");
                if let Some(phrase) = &u.phrase {
                    html.push_str(&format!("<em>{}</em> ", phrase));
                }
                if let Some(spouse) = &u.spouse {
                    html.push_str(&format!("avec {}", link(spouse)));
                }
                if !u.children.is_empty() {
                    html.push_str(" dont<ul>");
                    for c in &u.children {
                        html.push_str(&format!("<li>{}</li>", link(c)));
                    }
                    html.push_str("</ul>");
                }
                html.push_str("</li>");
            }
            html.push_str("</ul>");
        }

        if let Some(notes) = &self.notes {
            html.push_str(&format!("<!-- Notes --><div>{}</div>", notes));
        }
        html.push_str("</div>");
        html
    }
}
