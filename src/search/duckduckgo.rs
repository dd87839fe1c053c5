//! DuckDuckGo search collaborator
//!
//! Uses the HTML-only endpoint at `https://html.duckduckgo.com/html/`, which
//! needs no JavaScript. Every keyword's results are recorded in the SQLite
//! result store before being streamed to the pipeline.

use crate::search::{
    BatchCallback, ResultHandle, ResultItem, ScrapeConfig, ScrapeMethod, SearchCollaborator,
    SearchError,
};
use crate::storage::{SqliteStorage, Storage, StoredResults};
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use scraper::{Html, Selector};
use std::path::Path;
use std::time::Duration;
use url::Url;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Offset between consecutive result pages
const RESULTS_PER_PAGE: u32 = 30;

/// Scrapes DuckDuckGo's HTML results
pub struct DuckDuckGoSearch {
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl DuckDuckGoSearch {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: user_agent.into(),
            timeout,
        }
    }

    /// Sends requests to `endpoint` instead of DuckDuckGo
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_client(&self, proxy: Option<&str>) -> Result<Client, SearchError> {
        let mut builder = Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| SearchError::Http(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| SearchError::Http(format!("failed to build client: {}", e)))
    }

    async fn fetch_page(
        &self,
        client: &Client,
        keyword: &str,
        page: u32,
    ) -> Result<String, SearchError> {
        let offset = (page * RESULTS_PER_PAGE).to_string();
        let mut params = vec![("q", keyword)];
        if page > 0 {
            params.push(("s", offset.as_str()));
        }

        let response = client
            .post(&self.endpoint)
            .form(&params)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("DuckDuckGo request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| SearchError::Http(format!("DuckDuckGo HTTP error: {}", e)))?;

        response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("DuckDuckGo response read failed: {}", e)))
    }

    async fn search_keyword(
        &self,
        client: &Client,
        keyword: &str,
        num_pages: u32,
    ) -> Result<Vec<ResultItem>, SearchError> {
        let mut items = Vec::new();
        for page in 0..num_pages {
            let html = self.fetch_page(client, keyword, page).await?;
            let results = parse_results_html(&html)?;
            tracing::trace!(keyword, page, count = results.len(), "DuckDuckGo page parsed");
            if results.is_empty() {
                break;
            }
            items.extend(results);
        }
        Ok(items)
    }
}

#[async_trait]
impl SearchCollaborator for DuckDuckGoSearch {
    async fn scrape(
        &self,
        config: &ScrapeConfig,
        callback: &dyn BatchCallback,
    ) -> Result<Box<dyn ResultHandle>, SearchError> {
        if config.scrape_method == ScrapeMethod::Browser {
            tracing::warn!(
                "Browser automation is not available for DuckDuckGo; requesting {} pages over HTTP",
                config.num_pages
            );
        }

        let proxy = match &config.proxy_file {
            Some(path) => read_first_proxy(path)?,
            None => None,
        };
        let client = self.build_client(proxy.as_deref())?;
        let mut store = SqliteStorage::new(&config.results_db)?;
        let mut used = Vec::new();

        for keyword in &config.keywords {
            if config.caching {
                let earlier = store.search_ids(keyword)?;
                let cached = store.load_results(&earlier)?;
                if !cached.is_empty() {
                    tracing::debug!("Replaying {} stored results for '{}'", cached.len(), keyword);
                    used.extend(earlier);
                    callback.on_batch(keyword, cached).await;
                    continue;
                }
            }

            let search_id = store.begin_search(keyword)?;
            let items = self
                .search_keyword(&client, keyword, config.num_pages)
                .await?;
            store.record_results(search_id, &items)?;
            used.push(search_id);
            callback.on_batch(keyword, items).await;
        }

        Ok(Box::new(StoredResults::new(store, used)))
    }
}

/// Returns the first proxy listed in `path`
///
/// Blank lines and lines starting with `#` are ignored.
fn read_first_proxy(path: &Path) -> Result<Option<String>, SearchError> {
    let content = std::fs::read_to_string(path).map_err(|source| SearchError::ProxyList {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string))
}

/// Extracts the target URL from DuckDuckGo's redirect wrapper
///
/// DDG wraps URLs like: `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`
fn unwrap_redirect(href: &str) -> Option<String> {
    let full_href = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&full_href).ok()?;

    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full_href)
    }
}

/// Parses a DuckDuckGo HTML results page
///
/// Ads are skipped. A result whose link cannot be decoded is kept with an
/// absent URL so its title and snippet are still parsed.
pub fn parse_results_html(html: &str) -> Result<Vec<ResultItem>, SearchError> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse(
        ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    )
    .map_err(|e| SearchError::Parse(format!("invalid result selector: {:?}", e)))?;
    let title_sel = Selector::parse(".result__a")
        .map_err(|e| SearchError::Parse(format!("invalid title selector: {:?}", e)))?;
    let snippet_sel = Selector::parse(".result__snippet")
        .map_err(|e| SearchError::Parse(format!("invalid snippet selector: {:?}", e)))?;

    let mut results = Vec::new();

    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };

        let title = title_el.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        let url = title_el
            .value()
            .attr("href")
            .and_then(unwrap_redirect)
            .unwrap_or_default();

        let description = element
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        results.push(ResultItem::new(title, url, description));
    }

    Ok(results)
}
