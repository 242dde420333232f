use std::collections::HashSet;

use log::{info, warn};
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{HarvestError, Result};
use crate::fetcher::Fetcher;

const PROJECT_PATTERN: &str =
    r"^https?://(?:www\.)?devpost\.com/software/([A-Za-z0-9][A-Za-z0-9_-]*)$";

/// Listing paths that live under `/software/` but are not projects.
const RESERVED_SLUGS: &[&str] = &["search", "popular", "trending", "newest"];

/// Walks the paginated listing and collects unique project URLs in first-seen order.
pub struct LinkDiscoverer<'a> {
    fetcher: &'a dyn Fetcher,
    listing_url: Url,
    project_re: Regex,
    anchor: Selector,
}

impl<'a> LinkDiscoverer<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, listing_url: &str) -> Result<Self> {
        let listing_url = Url::parse(listing_url)
            .map_err(|e| HarvestError::Config(format!("invalid listing URL '{}': {}", listing_url, e)))?;

        Ok(LinkDiscoverer {
            fetcher,
            listing_url,
            project_re: Regex::new(PROJECT_PATTERN).unwrap(),
            anchor: Selector::parse("a[href]").unwrap(),
        })
    }

    /// URL of listing page `page`, replacing any `page` query parameter already present.
    pub fn page_url(&self, page: usize) -> Url {
        let mut url = self.listing_url.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "page")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("page", &page.to_string());
        url
    }

    /// Fetch pages `1..=max_pages`, stopping early at the first page that adds nothing new.
    /// A page that cannot be fetched is logged and skipped.
    pub fn discover(&self, max_pages: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for page in 1..=max_pages {
            let url = self.page_url(page);
            info!("Fetching listing page {} / {}: {}", page, max_pages, url);

            let body = match self.fetcher.get(url.as_str()) {
                Ok(resp) if resp.is_success() => resp.body,
                Ok(resp) => {
                    warn!("Listing page {} returned status {}; skipping", page, resp.status);
                    continue;
                }
                Err(e) => {
                    warn!("Failed to fetch listing page {}: {}", page, e);
                    continue;
                }
            };

            let candidates = self.extract_links(&body, &url);
            let mut added = 0;
            for link in candidates {
                if seen.insert(link.clone()) {
                    links.push(link);
                    added += 1;
                }
            }
            info!("Listing page {}: {} new project links ({} total)", page, added, links.len());

            if added == 0 {
                info!("No new links on page {}; end of listing.", page);
                break;
            }
        }

        links
    }

    /// All project links on one listing page, normalized, in document order (may repeat).
    pub fn extract_links(&self, html: &str, base: &Url) -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.anchor)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| self.normalize(href, base))
            .collect()
    }

    fn normalize(&self, href: &str, base: &Url) -> Option<String> {
        let mut url = base.join(href.trim()).ok()?;
        url.set_query(None);
        url.set_fragment(None);

        let link = url.as_str().trim_end_matches('/').to_string();
        let slug = self.project_re.captures(&link)?.get(1)?.as_str();
        if RESERVED_SLUGS.contains(&slug) {
            return None;
        }
        Some(link)
    }
}
