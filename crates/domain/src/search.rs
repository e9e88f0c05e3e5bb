//! Pure search/filter functions over local mirror snapshots.
//!
//! Filtering is deterministic and side-effect free: the same collection,
//! query, and facets always produce the same rows in the same relative
//! order. Text matching requires every whitespace-separated token of the
//! query to appear as a substring of the entity's searchable text (AND
//! semantics, no stemming, no fuzziness).

use crate::{Product, ProductFilters, ThirdParty, ThirdPartyFilters};

/// Splits a query into lowercase tokens on whitespace runs.
///
/// An empty or all-whitespace query yields no tokens, which places no
/// text constraint on the view.
#[must_use]
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Returns whether every token appears as a substring of the haystack.
#[must_use]
pub fn matches_tokens(haystack: &str, tokens: &[String]) -> bool {
    tokens.iter().all(|token| haystack.contains(token.as_str()))
}

/// Returns the lowercase searchable text of a third party.
#[must_use]
pub fn third_party_search_text(row: &ThirdParty) -> String {
    let fields = [
        Some(row.name.as_str()),
        row.name_alias.as_deref(),
        row.email.as_deref(),
        row.address.as_deref(),
        row.zip.as_deref(),
        row.town.as_deref(),
        row.phone.as_deref(),
        row.notes.as_deref(),
    ];

    join_search_fields(&fields)
}

/// Returns the lowercase searchable text of a product.
#[must_use]
pub fn product_search_text(row: &Product) -> String {
    let fields = [
        Some(row.reference.as_str()),
        Some(row.label.as_str()),
        row.description.as_deref(),
        Some(row.category.as_str()),
    ];

    join_search_fields(&fields)
}

fn join_search_fields(fields: &[Option<&str>]) -> String {
    fields
        .iter()
        .map(|field| field.unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Computes the filtered third-party view for a query and facet set.
///
/// The text filter runs first; exact-equality facets follow, each
/// independently optional. The result preserves the input order.
#[must_use]
pub fn filter_third_parties(rows: &[ThirdParty], filters: &ThirdPartyFilters) -> Vec<ThirdParty> {
    let tokens = tokenize(&filters.query);

    rows.iter()
        .filter(|row| tokens.is_empty() || matches_tokens(&third_party_search_text(row), &tokens))
        .filter(|row| filters.client.is_none_or(|wanted| row.client == wanted))
        .filter(|row| filters.supplier.is_none_or(|wanted| row.supplier == wanted))
        .filter(|row| filters.prospect.is_none_or(|wanted| row.prospect == wanted))
        .filter(|row| filters.status.is_none_or(|wanted| row.status == wanted))
        .cloned()
        .collect()
}

/// Computes the filtered product view for a query and facet set.
#[must_use]
pub fn filter_products(rows: &[Product], filters: &ProductFilters) -> Vec<Product> {
    let tokens = tokenize(&filters.query);

    rows.iter()
        .filter(|row| tokens.is_empty() || matches_tokens(&product_search_text(row), &tokens))
        .filter(|row| filters.kind.is_none_or(|wanted| row.kind == wanted))
        .filter(|row| {
            filters
                .status
                .as_deref()
                .is_none_or(|wanted| row.status_label() == wanted)
        })
        .filter(|row| {
            filters
                .category
                .as_deref()
                .is_none_or(|wanted| row.category == wanted)
        })
        .cloned()
        .collect()
}
