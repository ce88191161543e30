//! Domain sub-clients.
//!
//! Thin wrappers that turn typed arguments into endpoint paths and query
//! parameters and hand them to the shared [`FetchPipeline`]. They return the
//! raw JSON-LD document; mapping it onto domain records is up to the caller.

use serde_json::Value;

use crate::params::QueryParams;
use crate::pipeline::{FetchPipeline, JSON_LD};
use crate::{EuroparlError, Result};

/// Offset/limit paging for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

impl Page {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }

    /// First page of `limit` items.
    pub fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }

    /// The page after this one.
    pub fn next(self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }
}

fn list_params(page: Page) -> QueryParams {
    QueryParams::new()
        .with("format", JSON_LD)
        .with("offset", page.offset)
        .with("limit", page.limit)
}

fn item_params() -> QueryParams {
    QueryParams::new().with("format", JSON_LD)
}

/// `"{collection}/{id}"`, rejecting ids that would escape the collection.
fn item_path(collection: &str, id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(EuroparlError::InvalidInput(format!(
            "{collection}: identifier must not be empty"
        )));
    }
    if id.contains(['/', '?', '#']) || id == "." || id == ".." {
        return Err(EuroparlError::InvalidInput(format!(
            "{collection}: invalid identifier '{id}'"
        )));
    }
    Ok(format!("{collection}/{id}"))
}

/// Filters for MEP listings.
#[derive(Debug, Clone, Default)]
pub struct MepQuery {
    /// ISO 3166-1 alpha-2 country of representation, e.g. `"SE"`.
    pub country: Option<String>,
    /// Political group identifier, e.g. `"EPP"`.
    pub political_group: Option<String>,
    pub page: Page,
}

impl MepQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into().to_ascii_uppercase());
        self
    }

    pub fn political_group(mut self, group: impl Into<String>) -> Self {
        self.political_group = Some(group.into());
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    fn to_params(&self) -> QueryParams {
        list_params(self.page)
            .with_opt("country-of-representation", self.country.as_deref())
            .with_opt("political-group", self.political_group.as_deref())
    }
}

/// Members of the European Parliament.
#[derive(Debug, Clone, Copy)]
pub struct Meps<'a> {
    pipeline: &'a FetchPipeline,
}

impl<'a> Meps<'a> {
    pub(crate) fn new(pipeline: &'a FetchPipeline) -> Self {
        Self { pipeline }
    }

    /// All MEPs matching `query`, across terms.
    pub async fn list(&self, query: &MepQuery) -> Result<Value> {
        self.pipeline.fetch("meps", &query.to_params()).await
    }

    /// A single MEP by identifier.
    pub async fn get(&self, id: &str) -> Result<Value> {
        self.pipeline
            .fetch(&item_path("meps", id)?, &item_params())
            .await
    }

    /// MEPs currently in office.
    pub async fn current(&self, query: &MepQuery) -> Result<Value> {
        self.pipeline
            .fetch("meps/show-current", &query.to_params())
            .await
    }
}

/// Plenary sittings and their votes.
#[derive(Debug, Clone, Copy)]
pub struct Plenary<'a> {
    pipeline: &'a FetchPipeline,
}

impl<'a> Plenary<'a> {
    pub(crate) fn new(pipeline: &'a FetchPipeline) -> Self {
        Self { pipeline }
    }

    /// Plenary meetings, optionally restricted to one calendar year.
    pub async fn meetings(&self, year: Option<u16>, page: Page) -> Result<Value> {
        let params = list_params(page).with_opt("year", year);
        self.pipeline.fetch("meetings", &params).await
    }

    pub async fn meeting(&self, id: &str) -> Result<Value> {
        self.pipeline
            .fetch(&item_path("meetings", id)?, &item_params())
            .await
    }

    /// Roll-call vote results recorded for a meeting.
    pub async fn vote_results(&self, meeting_id: &str, page: Page) -> Result<Value> {
        let path = format!("{}/vote-results", item_path("meetings", meeting_id)?);
        self.pipeline.fetch(&path, &list_params(page)).await
    }
}

/// Committees and other corporate bodies.
#[derive(Debug, Clone, Copy)]
pub struct Committees<'a> {
    pipeline: &'a FetchPipeline,
}

impl<'a> Committees<'a> {
    pub(crate) fn new(pipeline: &'a FetchPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn list(&self, page: Page) -> Result<Value> {
        self.pipeline
            .fetch("corporate-bodies", &list_params(page))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Value> {
        self.pipeline
            .fetch(&item_path("corporate-bodies", id)?, &item_params())
            .await
    }

    /// Bodies active in the current term.
    pub async fn current(&self, page: Page) -> Result<Value> {
        self.pipeline
            .fetch("corporate-bodies/show-current", &list_params(page))
            .await
    }
}

/// Plenary documents and adopted texts.
#[derive(Debug, Clone, Copy)]
pub struct Documents<'a> {
    pipeline: &'a FetchPipeline,
}

impl<'a> Documents<'a> {
    pub(crate) fn new(pipeline: &'a FetchPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn plenary_documents(&self, year: Option<u16>, page: Page) -> Result<Value> {
        let params = list_params(page).with_opt("year", year);
        self.pipeline.fetch("plenary-documents", &params).await
    }

    pub async fn plenary_document(&self, id: &str) -> Result<Value> {
        self.pipeline
            .fetch(&item_path("plenary-documents", id)?, &item_params())
            .await
    }

    pub async fn adopted_texts(&self, year: Option<u16>, page: Page) -> Result<Value> {
        let params = list_params(page).with_opt("year", year);
        self.pipeline.fetch("adopted-texts", &params).await
    }
}

/// Legislative procedures and events.
#[derive(Debug, Clone, Copy)]
pub struct Legislative<'a> {
    pipeline: &'a FetchPipeline,
}

impl<'a> Legislative<'a> {
    pub(crate) fn new(pipeline: &'a FetchPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn procedures(&self, year: Option<u16>, page: Page) -> Result<Value> {
        let params = list_params(page).with_opt("year", year);
        self.pipeline.fetch("procedures", &params).await
    }

    /// A procedure by reference, e.g. `"2023-0212"`.
    pub async fn procedure(&self, id: &str) -> Result<Value> {
        self.pipeline
            .fetch(&item_path("procedures", id)?, &item_params())
            .await
    }

    pub async fn events(&self, page: Page) -> Result<Value> {
        self.pipeline.fetch("events", &list_params(page)).await
    }
}

/// Parliamentary questions.
#[derive(Debug, Clone, Copy)]
pub struct Questions<'a> {
    pipeline: &'a FetchPipeline,
}

impl<'a> Questions<'a> {
    pub(crate) fn new(pipeline: &'a FetchPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn list(&self, year: Option<u16>, page: Page) -> Result<Value> {
        let params = list_params(page).with_opt("year", year);
        self.pipeline.fetch("parliamentary-questions", &params).await
    }

    pub async fn get(&self, id: &str) -> Result<Value> {
        self.pipeline
            .fetch(&item_path("parliamentary-questions", id)?, &item_params())
            .await
    }
}

/// Controlled vocabularies (countries, groups, document types, ...).
#[derive(Debug, Clone, Copy)]
pub struct Vocabularies<'a> {
    pipeline: &'a FetchPipeline,
}

impl<'a> Vocabularies<'a> {
    pub(crate) fn new(pipeline: &'a FetchPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn list(&self, page: Page) -> Result<Value> {
        self.pipeline
            .fetch("controlled-vocabularies", &list_params(page))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Value> {
        self.pipeline
            .fetch(&item_path("controlled-vocabularies", id)?, &item_params())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_advances_by_limit() {
        let page = Page::first(20).next().next();
        assert_eq!(page, Page::new(40, 20));
    }

    #[test]
    fn item_path_rejects_traversal() {
        assert_eq!(item_path("meps", " 124810 ").unwrap(), "meps/124810");
        assert!(item_path("meps", "").is_err());
        assert!(item_path("meps", "../admin").is_err());
        assert!(item_path("meps", "1?x=y").is_err());
    }

    #[test]
    fn mep_query_params() {
        let params = MepQuery::new().country("se").page(Page::first(5)).to_params();
        let pairs = params.to_pairs();
        assert!(pairs.contains(&("country-of-representation".into(), "SE".into())));
        assert!(pairs.contains(&("limit".into(), "5".into())));
        assert!(pairs.contains(&("format".into(), JSON_LD.into())));
        assert!(params.get("political-group").is_none());
    }
}
