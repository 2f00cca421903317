use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{Result, ScrapeError};

/// Processor display name -> kimovil internal ID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorCatalog {
    ids: HashMap<String, String>,
}

impl ProcessorCatalog {
    pub fn new(ids: HashMap<String, String>) -> Self {
        Self { ids }
    }

    pub fn id_of(&self, processor: &str) -> Option<&str> {
        self.ids.get(processor).map(String::as_str)
    }

    pub fn contains(&self, processor: &str) -> bool {
        self.ids.contains_key(processor)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Names sorted alphabetically
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ids.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Fails with every configured name the catalog does not know
    pub fn validate(&self, query: &QuerySpec) -> Result<()> {
        let missing: Vec<String> = query
            .processors()
            .iter()
            .filter(|p| !self.contains(p))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ScrapeError::UnknownProcessors(missing))
        }
    }
}

impl FromIterator<(String, String)> for ProcessorCatalog {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Processors x bands to query, both in configured order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    processors: Vec<String>,
    bands: Vec<String>,
}

impl QuerySpec {
    pub fn new(processors: Vec<String>, bands: Vec<String>) -> Self {
        Self { processors, bands }
    }

    pub fn processors(&self) -> &[String] {
        &self.processors
    }

    /// Band tokens to walk. No configured band means a single unfiltered query.
    pub fn bands(&self) -> Vec<&str> {
        if self.bands.is_empty() {
            vec![""]
        } else {
            self.bands.iter().map(String::as_str).collect()
        }
    }

    /// Every (processor, band) query unit in run order
    pub fn units(&self) -> Vec<(&str, &str)> {
        let bands = self.bands();
        self.processors
            .iter()
            .flat_map(|p| bands.iter().map(move |b| (p.as_str(), *b)))
            .collect()
    }
}

/// Raw page fragments collected during a run, keyed by (processor, band) then page index
#[derive(Debug, Default)]
pub struct PageStore {
    pages: HashMap<(String, String), BTreeMap<u32, String>>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, processor: &str, band: &str, page: u32, content: String) {
        self.pages
            .entry((processor.to_string(), band.to_string()))
            .or_default()
            .insert(page, content);
    }

    /// Fragments for one query unit, ordered by page index
    pub fn fragments(&self, processor: &str, band: &str) -> impl Iterator<Item = &str> {
        self.pages
            .get(&(processor.to_string(), band.to_string()))
            .into_iter()
            .flat_map(|pages| pages.values().map(String::as_str))
    }

    pub fn page_count(&self, processor: &str, band: &str) -> usize {
        self.pages
            .get(&(processor.to_string(), band.to_string()))
            .map_or(0, BTreeMap::len)
    }

    pub fn total_pages(&self) -> usize {
        self.pages.values().map(BTreeMap::len).sum()
    }
}

/// Request counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub total_requests: u32,
    pub pages_fetched: u32,
    pub rate_limited: u32,
}

/// Body of the catalog listing request
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogResponse {
    pub filters: Option<String>,
}

/// Body of one paginated listing request
#[derive(Debug, Clone, Deserialize)]
pub struct ListingResponse {
    #[serde(default)]
    pub page_results: u64,
    pub content: Option<String>,
    pub next_page_url: Option<String>,
}

/// Processor -> deduplicated phone models, in configured processor order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeResult {
    models: Vec<(String, Vec<String>)>,
}

impl ScrapeResult {
    pub fn new(models: Vec<(String, Vec<String>)>) -> Self {
        Self { models }
    }

    pub fn models_for(&self, processor: &str) -> Option<&[String]> {
        self.models
            .iter()
            .find(|(p, _)| p == processor)
            .map(|(_, m)| m.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.models.iter().map(|(p, m)| (p.as_str(), m.as_slice()))
    }

    pub fn counts(&self) -> Vec<(&str, usize)> {
        self.iter().map(|(p, m)| (p, m.len())).collect()
    }

    pub fn total(&self) -> usize {
        self.models.iter().map(|(_, m)| m.len()).sum()
    }

    pub fn processor_count(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Plain processor -> models map, for JSON output
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        self.models.iter().cloned().collect()
    }
}

/// Drops repeated names, keeping the first occurrence of each
pub fn dedupe_preserving_order<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
