//! Query engine over the church catalog.
//!
//! Two query shapes, both stateless and re-derived from the immutable
//! corpus on every request: windowed listing with free-text search
//! (OR across fields) and multi-field conjunctive filtering (AND
//! across fields). Matching is a full linear scan per request — a
//! deliberate simplicity/throughput trade-off for a corpus in the tens
//! of thousands, not a missing index.

use serde::Serialize;
use std::collections::HashMap;

use crate::catalog::{Catalog, Church};

/// Default page size for the listing endpoint.
pub const DEFAULT_LIMIT: usize = 100;

/// Fixed window size for the filter endpoint. The filter shape has no
/// page parameter; callers wanting more than the first window re-issue
/// with narrower constraints.
pub const FILTER_WINDOW: usize = 1000;

/// Pagination descriptor. `total` counts records matching the active
/// predicate, not the whole corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub limit: usize,
}

/// A contiguous window of the (possibly filtered) corpus.
#[derive(Debug, Serialize)]
pub struct Page<'a> {
    pub churches: Vec<&'a Church>,
    pub pagination: Pagination,
}

/// Per-field substring constraints for the filter shape. Needles are
/// normalized at construction: lowercased, with empty strings treated
/// as "no constraint".
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    pub title: Option<String>,
    pub jurisdiction: Option<String>,
    pub rite: Option<String>,
    pub kind: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
}

impl FilterParams {
    /// Extracts filter constraints from a raw query map. The `type`
    /// key maps to `kind`.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let needle = |name: &str| {
            query
                .get(name)
                .map(|v| v.to_lowercase())
                .filter(|v| !v.is_empty())
        };
        Self {
            title: needle("title"),
            jurisdiction: needle("jurisdiction"),
            rite: needle("rite"),
            kind: needle("type"),
            country: needle("country"),
            address: needle("address"),
        }
    }

    /// Logical AND of one substring test per populated field.
    pub fn matches(&self, church: &Church) -> bool {
        let p = &church.properties;
        field_matches(p.title.as_deref(), &self.title)
            && field_matches(p.jurisdiction.as_deref(), &self.jurisdiction)
            && field_matches(p.rite.as_deref(), &self.rite)
            && field_matches(p.kind.as_deref(), &self.kind)
            && field_matches(p.country.as_deref(), &self.country)
            && field_matches(p.address.as_deref(), &self.address)
    }
}

/// An absent constraint always passes; a constrained field must be
/// present and contain the needle (case-insensitive, substring, never
/// exact match, never tokenized).
fn field_matches(value: Option<&str>, needle: &Option<String>) -> bool {
    match needle {
        None => true,
        Some(n) => contains_ci(value, n),
    }
}

fn contains_ci(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle_lower))
}

impl Catalog {
    /// Windowed listing with free-text search.
    ///
    /// An empty `search` matches all; otherwise a case-insensitive
    /// substring match against ANY of title, address, country,
    /// jurisdiction, type and rite. Result ordering is corpus order.
    pub fn list(&self, page: usize, limit: usize, search: &str) -> Page<'_> {
        let page = page.max(1);
        let limit = limit.max(1);
        let needle = search.to_lowercase();

        let matched: Vec<&Church> = if needle.is_empty() {
            self.churches().iter().collect()
        } else {
            self.churches()
                .iter()
                .filter(|c| {
                    c.properties
                        .search_fields()
                        .iter()
                        .any(|field| contains_ci(*field, &needle))
                })
                .collect()
        };

        paginate(matched, page, limit)
    }

    /// Multi-field conjunctive filter, fixed to the first
    /// [`FILTER_WINDOW`]-sized page.
    pub fn filter(&self, params: &FilterParams) -> Page<'_> {
        let matched: Vec<&Church> = self
            .churches()
            .iter()
            .filter(|c| params.matches(c))
            .collect();
        paginate(matched, 1, FILTER_WINDOW)
    }
}

fn paginate(matched: Vec<&Church>, page: usize, limit: usize) -> Page<'_> {
    let total = matched.len();
    let start = (page - 1).saturating_mul(limit);
    let churches = if start >= total {
        Vec::new()
    } else {
        matched[start..(start + limit).min(total)].to_vec()
    };

    Page {
        churches,
        pagination: Pagination {
            total,
            total_pages: total.div_ceil(limit),
            current_page: page,
            limit,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Church, ChurchProperties};
    use serde_json::Value;

    fn church(title: &str, country: &str, kind: &str) -> Church {
        Church {
            geometry: Value::Null,
            properties: ChurchProperties {
                title: Some(title.to_string()),
                country: Some(country.to_string()),
                kind: Some(kind.to_string()),
                ..ChurchProperties::default()
            },
            extra: serde_json::Map::new(),
        }
    }

    fn numbered_catalog(n: usize) -> Catalog {
        Catalog::new(
            (0..n)
                .map(|i| church(&format!("Church {i:03}"), "Kenya", "parish"))
                .collect(),
        )
    }

    #[test]
    fn window_size_follows_the_pagination_formula() {
        let n = 25;
        let limit = 10;
        let catalog = numbered_catalog(n);
        for page in 1..=4 {
            let result = catalog.list(page, limit, "");
            let expected = limit.min(n.saturating_sub((page - 1) * limit));
            assert_eq!(result.churches.len(), expected, "page {page}");
            assert_eq!(result.pagination.total, n);
            assert_eq!(result.pagination.total_pages, 3);
        }
    }

    #[test]
    fn concatenating_pages_reconstructs_the_corpus() {
        let catalog = numbered_catalog(23);
        let mut seen = Vec::new();
        for page in 1..=5 {
            let result = catalog.list(page, 5, "");
            for c in result.churches {
                seen.push(c.properties.title.clone().unwrap());
            }
        }
        let expected: Vec<_> = catalog
            .churches()
            .iter()
            .map(|c| c.properties.title.clone().unwrap())
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let catalog = Catalog::new(vec![
            church("St. Mary's Cathedral", "Italy", "cathedral"),
            church("Village Chapel", "Italy", "chapel"),
        ]);
        for term in ["cathedral", "CATHEDRAL"] {
            let result = catalog.list(1, 10, term);
            assert_eq!(result.pagination.total, 1, "term {term}");
            assert_eq!(
                result.churches[0].properties.title.as_deref(),
                Some("St. Mary's Cathedral")
            );
        }
    }

    #[test]
    fn search_matches_any_field() {
        let mut by_rite = church("Plain Name", "France", "parish");
        by_rite.properties.rite = Some("Byzantine".to_string());
        let catalog = Catalog::new(vec![by_rite, church("Other", "France", "parish")]);
        let result = catalog.list(1, 10, "byzantine");
        assert_eq!(result.pagination.total, 1);
    }

    #[test]
    fn filter_requires_every_populated_field() {
        let catalog = Catalog::new(vec![
            church("Sacred Heart", "Italy", "basilica"),
            church("St. Peter", "Italy", "parish"),
            church("Our Lady", "France", "basilica"),
        ]);
        let params = FilterParams {
            country: Some("italy".to_string()),
            kind: Some("basilica".to_string()),
            ..FilterParams::default()
        };
        let result = catalog.filter(&params);
        assert_eq!(result.pagination.total, 1);
        assert_eq!(result.churches[0].properties.title.as_deref(), Some("Sacred Heart"));
    }

    #[test]
    fn empty_filter_returns_the_whole_corpus_in_one_window() {
        let catalog = numbered_catalog(12);
        let result = catalog.filter(&FilterParams::default());
        assert_eq!(result.churches.len(), 12);
        assert_eq!(
            result.pagination,
            Pagination {
                total: 12,
                total_pages: 1,
                current_page: 1,
                limit: FILTER_WINDOW,
            }
        );
    }

    #[test]
    fn filter_window_is_capped_at_one_thousand() {
        let catalog = numbered_catalog(1205);
        let result = catalog.filter(&FilterParams::default());
        assert_eq!(result.churches.len(), FILTER_WINDOW);
        assert_eq!(result.pagination.total, 1205);
        assert_eq!(result.pagination.total_pages, 2);
        assert_eq!(result.pagination.current_page, 1);
    }

    #[test]
    fn kenya_italy_scenario() {
        let catalog = Catalog::new(vec![
            church("A Church", "Kenya", "parish"),
            church("B Shrine", "Kenya", "shrine"),
            church("C Basilica", "Italy", "basilica"),
        ]);

        let params = FilterParams {
            country: Some("kenya".to_string()),
            ..FilterParams::default()
        };
        let filtered = catalog.filter(&params);
        let titles: Vec<_> = filtered
            .churches
            .iter()
            .map(|c| c.properties.title.clone().unwrap())
            .collect();
        assert_eq!(titles, vec!["A Church", "B Shrine"]);

        let listed = catalog.list(1, 2, "");
        let titles: Vec<_> = listed
            .churches
            .iter()
            .map(|c| c.properties.title.clone().unwrap())
            .collect();
        assert_eq!(titles, vec!["A Church", "B Shrine"]);
        assert_eq!(listed.pagination.total_pages, 2);
    }

    #[test]
    fn constrained_field_missing_from_record_does_not_match() {
        let mut no_country = church("Nameless", "Kenya", "parish");
        no_country.properties.country = None;
        let catalog = Catalog::new(vec![no_country]);
        let params = FilterParams {
            country: Some("kenya".to_string()),
            ..FilterParams::default()
        };
        assert_eq!(catalog.filter(&params).pagination.total, 0);
    }

    #[test]
    fn page_past_the_end_is_empty_but_well_formed() {
        let catalog = numbered_catalog(5);
        let result = catalog.list(4, 2, "");
        assert!(result.churches.is_empty());
        assert_eq!(result.pagination.total, 5);
        assert_eq!(result.pagination.total_pages, 3);
        assert_eq!(result.pagination.current_page, 4);
    }
}
