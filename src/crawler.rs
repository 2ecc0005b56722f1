use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::fetch::PageFetcher;
use crate::model::{Family, Individual};
use crate::parser;
use crate::reference::{Reference, ReferenceKey};
use crate::store::{FamiliesStore, PersonsStore};

/// Which relations to follow, and how far.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlOptions {
    /// Maximum BFS depth. Seeds are at depth 0.
    pub max_levels: u32,
    pub ascendants: bool,
    pub spouses: bool,
    pub descendants: bool,
    /// Bypass the page cache.
    pub force: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlStats {
    pub visited: usize,
    pub failed: usize,
    pub families: usize,
}

/// Breadth-first walk over person pages. Owns the stores it fills.
pub struct Crawler<'f, F> {
    fetcher: &'f F,
    options: CrawlOptions,
    persons: PersonsStore,
    families: FamiliesStore,
    failed: HashSet<ReferenceKey>,
    progress: ProgressBar,
}

impl<'f, F: PageFetcher> Crawler<'f, F> {
    pub fn new(fetcher: &'f F, options: CrawlOptions) -> Self {
        Crawler {
            fetcher,
            options,
            persons: PersonsStore::new(),
            families: FamiliesStore::new(),
            failed: HashSet::new(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Show a spinner with the person being fetched.
    pub fn with_progress(mut self) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} persons {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        self.progress = pb;
        self
    }

    /// Visit every seed and everything reachable from them within the depth bound.
    pub async fn crawl(&mut self, seeds: &[Reference]) -> CrawlStats {
        let mut queue: VecDeque<(Reference, u32)> =
            seeds.iter().cloned().map(|seed| (seed, 0)).collect();

        while let Some((reference, depth)) = queue.pop_front() {
            if self.persons.contains(&reference.key) || self.failed.contains(&reference.key) {
                continue;
            }
            self.progress.set_message(reference.key.to_string());

            let expand = depth < self.options.max_levels;
            let Some(neighbours) = self.visit(&reference, expand).await else {
                self.failed.insert(reference.key);
                continue;
            };
            self.progress.inc(1);

            if expand {
                for next in neighbours {
                    if !self.persons.contains(&next.key) && !self.failed.contains(&next.key) {
                        queue.push_back((next, depth + 1));
                    }
                }
            }
        }

        self.progress.finish_and_clear();
        let stats = CrawlStats {
            visited: self.persons.len(),
            failed: self.failed.len(),
            families: self.families.len(),
        };
        info!(
            "Crawled {} persons ({} failed), {} families",
            stats.visited, stats.failed, stats.families
        );
        stats
    }

    /// Fetch, parse and record one person, returning the relatives to follow:
    /// parents, then spouses, then children, each in page order.
    /// `None` if the page could not be fetched.
    async fn visit(&mut self, reference: &Reference, expand: bool) -> Option<Vec<Reference>> {
        let html = match self.fetcher.fetch(&reference.url, self.options.force).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Skipping {}: {}", reference.key, e);
                return None;
            }
        };

        let record = parser::process_page(&html, &reference.url);

        // parents about to be visited get their family now, with this person as a child
        if expand && self.options.ascendants {
            self.families.link_child(&record.parents, reference);
        }

        let mut spouses = Vec::new();
        let mut children = Vec::new();
        let mut family_keys = Vec::with_capacity(record.unions.len());
        for union in record.unions {
            spouses.extend(union.spouse.clone());
            children.extend(union.children.iter().cloned());
            let family = Family::from_union(reference.clone(), union);
            family_keys.push(family.key.clone());
            // a couple seen from both sides is merged, never duplicated
            self.families.insert(family);
        }

        let mut neighbours = Vec::new();
        if self.options.ascendants {
            neighbours.extend(record.parents.iter().cloned());
        }
        if self.options.spouses {
            neighbours.extend(spouses);
        }
        if self.options.descendants {
            neighbours.extend(children);
        }

        let individual = Individual {
            key: reference.key.clone(),
            url: reference.url.to_string(),
            portrait: record.portrait,
            parents: record.parents,
            siblings: record.siblings,
            families: family_keys,
        };
        info!("{} {}", reference.key, individual.portrait.display_name());
        debug!(
            "{}: {} parents, {} siblings, {} unions",
            reference.key,
            individual.parents.len(),
            individual.siblings.len(),
            individual.families.len()
        );
        self.persons.insert(reference.key.clone(), individual);

        Some(neighbours)
    }

    #[cfg(test)]
    pub fn persons(&self) -> &PersonsStore {
        &self.persons
    }

    #[cfg(test)]
    pub fn families(&self) -> &FamiliesStore {
        &self.families
    }

    pub fn into_stores(self) -> (PersonsStore, FamiliesStore) {
        (self.persons, self.families)
    }
}

// ── Tests ──
