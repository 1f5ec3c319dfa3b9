//! Predictive search.
//!
//! Each keystroke (debounced by the caller) runs [`PredictiveSearch::search`],
//! which fetches the storefront's rendered `predictive-search` section and
//! swaps its contents into the results panel.

use tracing::instrument;

use crate::error::Result;
use crate::render::{Patch, SharedSink, Target, apply_shared, fragment};
use crate::shopify::StorefrontClient;

/// Section wrapper the storefront renders the suggestions into.
const SECTION_SELECTOR: &str = "#shopify-section-predictive-search";

/// Element carrying the screen-reader results summary.
const COUNT_SELECTOR: &str = "[data-predictive-search-count]";

/// What a search run did to the results panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Empty query: panel emptied and hidden.
    Cleared,
    /// Suggestions rendered.
    Rendered,
    /// Request failed; the panel kept its previous contents.
    Failed,
}

/// The search-as-you-type widget.
pub struct PredictiveSearch {
    client: StorefrontClient,
    sink: SharedSink,
    text_loading: String,
}

impl PredictiveSearch {
    #[must_use]
    pub fn new(client: StorefrontClient, sink: SharedSink, text_loading: impl Into<String>) -> Self {
        Self {
            client,
            sink,
            text_loading: text_loading.into(),
        }
    }

    /// Run a search for the current input value.
    ///
    /// # Errors
    ///
    /// Returns a render error; storefront failures are logged and reported
    /// as [`SearchOutcome::Failed`].
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        if query.is_empty() {
            let mut patches = vec![Patch::hidden(Target::SEARCH_RESET, true)];
            patches.extend(clear_patches());
            apply_shared(&self.sink, &patches)?;
            return Ok(SearchOutcome::Cleared);
        }

        let mut patches = vec![Patch::hidden(Target::SEARCH_RESET, false)];
        patches.extend(loading_patches(true, &self.text_loading));
        apply_shared(&self.sink, &patches)?;

        let outcome = match self.client.predictive_search(query).await {
            Ok(html) => match results_patches(&html) {
                Some(patches) => {
                    apply_shared(&self.sink, &patches)?;
                    SearchOutcome::Rendered
                }
                None => {
                    tracing::warn!("search response has no predictive-search section");
                    SearchOutcome::Failed
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Error fetching suggestions");
                SearchOutcome::Failed
            }
        };

        apply_shared(&self.sink, &loading_patches(false, &self.text_loading))?;
        Ok(outcome)
    }
}

/// Spinner, submit button and busy state while a request is in flight.
#[must_use]
pub fn loading_patches(loading: bool, text_loading: &str) -> Vec<Patch> {
    let mut patches = vec![
        Patch::hidden(Target::SEARCH_LOADING, !loading),
        Patch::hidden(Target::SEARCH_SUBMIT, loading),
    ];
    if loading {
        patches.push(Patch::attr(Target::SEARCH_RESULTS, "aria-busy", "true"));
        patches.push(Patch::text(Target::SEARCH_STATUS, text_loading));
    } else {
        patches.push(Patch::remove_attr(Target::SEARCH_RESULTS, "aria-busy"));
    }
    patches
}

/// Empty and collapse the results panel.
#[must_use]
pub fn clear_patches() -> Vec<Patch> {
    vec![
        Patch::inner_html(Target::SEARCH_RESULTS, ""),
        Patch::hidden(Target::SEARCH_RESULTS, true),
        Patch::attr(Target::SEARCH_INPUT, "aria-expanded", "false"),
        Patch::remove_attr(Target::SEARCH_INPUT, "aria-activedescendant"),
        Patch::text(Target::SEARCH_STATUS, ""),
    ]
}

/// Patches showing a rendered search section, `None` when the page lacks it.
#[must_use]
pub fn results_patches(page: &str) -> Option<Vec<Patch>> {
    let results = fragment::inner_html(page, SECTION_SELECTOR)?;
    let status = fragment::text(&results, COUNT_SELECTOR).unwrap_or_default();
    Some(vec![
        Patch::inner_html(Target::SEARCH_RESULTS, results),
        Patch::hidden(Target::SEARCH_RESULTS, false),
        Patch::attr(Target::SEARCH_INPUT, "aria-expanded", "true"),
        Patch::text(Target::SEARCH_STATUS, status),
    ])
}
