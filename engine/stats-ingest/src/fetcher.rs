use crate::error::Result;
use crate::models::StatRecord;
use crate::provider::{Endpoint, PageQuery, StatsProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Records collected for one endpoint/filter
#[derive(Debug, Clone, Default)]
pub struct FetchedPages {
    pub records: Vec<StatRecord>,
    pub pages_fetched: u32,
    pub total_pages: u32,
}

impl FetchedPages {
    /// True when a later page failed and only a prefix was collected
    pub fn is_partial(&self) -> bool {
        self.pages_fetched < self.total_pages
    }
}

/// Follows provider pagination until exhausted
pub struct PaginatedFetcher {
    provider: Arc<dyn StatsProvider>,
}

impl PaginatedFetcher {
    pub fn new(provider: Arc<dyn StatsProvider>) -> Self {
        Self { provider }
    }

    /// Fetch every page for `query`, starting at page 1.
    ///
    /// A failure on the first page is returned. A failure on a later page is
    /// logged and the pages collected so far are returned; nothing after the
    /// failing page is requested.
    pub async fn fetch_all(&self, endpoint: Endpoint, query: &PageQuery) -> Result<FetchedPages> {
        let first = self.provider.fetch_page(endpoint, &query.at_page(1)).await?;

        let total_pages = first.total_pages.max(1);
        let mut fetched = FetchedPages { records: first.records, pages_fetched: 1, total_pages };

        let mut page = 1;
        while page < total_pages {
            tokio::time::sleep(self.provider.page_delay(page)).await;
            page += 1;

            match self.provider.fetch_page(endpoint, &query.at_page(page)).await {
                Ok(next) => {
                    fetched.records.extend(next.records);
                    fetched.pages_fetched = page;
                }
                Err(e) => {
                    warn!(
                        endpoint = %endpoint,
                        season = query.season,
                        team = query.team.as_deref().unwrap_or("-"),
                        page,
                        total_pages,
                        error = %e,
                        "Page fetch failed, keeping {} records from earlier pages",
                        fetched.records.len()
                    );
                    break;
                }
            }
        }

        info!(
            endpoint = %endpoint,
            provider = self.provider.name(),
            season = query.season,
            phase = %query.phase,
            pages = fetched.pages_fetched,
            total_pages,
            "Fetched {} records",
            fetched.records.len()
        );

        Ok(fetched)
    }
}
