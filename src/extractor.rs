use log::{info, warn};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::fetcher::Fetcher;

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_AWARD: &str = "No Award";
pub const NO_IMAGE: &str = "No Image";

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// Fields scraped from one project detail page. Every field is populated,
/// either with page content or its sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub winner_label: String,
    pub image_url: String,
    pub source_url: String,
}

impl ProjectRecord {
    /// Technologies as a single cell; empty list gives an empty string.
    pub fn technologies_joined(&self) -> String {
        self.technologies.join(", ")
    }
}

pub struct PageExtractor<'a> {
    fetcher: &'a dyn Fetcher,
    title: Selector,
    description: Selector,
    tech_tag: Selector,
    award: Selector,
    gallery_image: Selector,
}

impl<'a> PageExtractor<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        PageExtractor {
            fetcher,
            title: Selector::parse("h1#app-title").unwrap(),
            description: Selector::parse("p.large").unwrap(),
            tech_tag: Selector::parse("span.cp-tag").unwrap(),
            award: Selector::parse("div.software-list-content ul.no-bullet span").unwrap(),
            gallery_image: Selector::parse("div#gallery img.software_photo_image.image-replacement").unwrap(),
        }
    }

    /// Fetch `url` once and extract its record. Any fetch failure or
    /// non-success status yields `None`; nothing is retried.
    pub fn extract(&self, url: &str) -> Option<ProjectRecord> {
        match self.fetcher.get(url) {
            Ok(page) if page.is_success() => Some(self.parse(&page.body, url)),
            Ok(page) => {
                warn!("Failed to retrieve the page: {} (status {})", url, page.status);
                None
            }
            Err(e) => {
                warn!("Failed to retrieve the page: {} ({})", url, e);
                None
            }
        }
    }

    /// Field-local extraction: each missing element falls back to its own sentinel.
    pub fn parse(&self, html: &str, source_url: &str) -> ProjectRecord {
        let document = Html::parse_document(html);

        let title = first_text(&document, &self.title).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let description =
            first_text(&document, &self.description).unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let technologies: Vec<String> = document
            .select(&self.tech_tag)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();

        let winner_label = first_text(&document, &self.award).unwrap_or_else(|| NO_AWARD.to_string());

        let image_url = document
            .select(&self.gallery_image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::trim)
            .filter(|src| has_image_extension(src))
            .map(str::to_string)
            .unwrap_or_else(|| NO_IMAGE.to_string());

        info!("Extracted '{}' ({} technologies) from {}", title, technologies.len(), source_url);

        ProjectRecord {
            title,
            description,
            technologies,
            winner_label,
            image_url,
            source_url: source_url.to_string(),
        }
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

pub fn has_image_extension(src: &str) -> bool {
    let lower = src.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::MapFetcher;

    const URL: &str = "https://devpost.com/software/alpha";

    const FULL_PAGE: &str = r#"
        <html><body>
          <h1 id="app-title">  Alpha Bot </h1>
          <p class="large">A chat assistant for hackers.</p>
          <div id="built-with">
            <span class="cp-tag">rust</span>
            <span class="cp-tag"> openai </span>
          </div>
          <div class="software-list-content">
            <ul class="no-bullet"><li><span>Winner: Best Use of AI</span></li></ul>
          </div>
          <div id="gallery">
            <img class="software_photo_image image-replacement" src="https://cdn.example.com/alpha.PNG">
          </div>
        </body></html>
    "#;

    fn extractor(fetcher: &MapFetcher) -> PageExtractor<'_> {
        PageExtractor::new(fetcher)
    }

    #[test]
    fn extracts_every_field() {
        let fetcher = MapFetcher::default();
        let record = extractor(&fetcher).parse(FULL_PAGE, URL);
        assert_eq!(
            record,
            ProjectRecord {
                title: "Alpha Bot".into(),
                description: "A chat assistant for hackers.".into(),
                technologies: vec!["rust".into(), "openai".into()],
                winner_label: "Winner: Best Use of AI".into(),
                image_url: "https://cdn.example.com/alpha.PNG".into(),
                source_url: URL.into(),
            }
        );
        assert_eq!(record.technologies_joined(), "rust, openai");
    }

    #[test]
    fn missing_elements_fall_back_independently() {
        let fetcher = MapFetcher::default();
        let html = r#"<html><body>
            <h1 id="app-title">Only Title</h1>
            <p class="large">   </p>
            <div id="gallery"><img class="software_photo_image image-replacement" src="/a.webp"></div>
        </body></html>"#;
        let record = extractor(&fetcher).parse(html, URL);

        assert_eq!(record.title, "Only Title");
        // present but whitespace-only
        assert_eq!(record.description, NOT_AVAILABLE);
        assert!(record.technologies.is_empty());
        assert_eq!(record.technologies_joined(), "");
        assert_eq!(record.winner_label, NO_AWARD);
        assert_eq!(record.image_url, "/a.webp");
    }

    #[test]
    fn empty_page_is_all_sentinels() {
        let fetcher = MapFetcher::default();
        let record = extractor(&fetcher).parse("<html></html>", URL);
        assert_eq!(record.title, NOT_AVAILABLE);
        assert_eq!(record.description, NOT_AVAILABLE);
        assert_eq!(record.winner_label, NO_AWARD);
        assert_eq!(record.image_url, NO_IMAGE);
        assert_eq!(record.source_url, URL);
    }

    #[test]
    fn unsupported_or_misplaced_image_is_rejected() {
        let fetcher = MapFetcher::default();
        let svg = r#"<div id="gallery"><img class="software_photo_image image-replacement" src="logo.svg"></div>"#;
        assert_eq!(extractor(&fetcher).parse(svg, URL).image_url, NO_IMAGE);

        let outside = r#"<img class="software_photo_image image-replacement" src="logo.png">"#;
        assert_eq!(extractor(&fetcher).parse(outside, URL).image_url, NO_IMAGE);

        let no_src = r#"<div id="gallery"><img class="software_photo_image image-replacement"></div>"#;
        assert_eq!(extractor(&fetcher).parse(no_src, URL).image_url, NO_IMAGE);
    }

    #[test]
    fn image_extension_check_is_case_insensitive() {
        assert!(has_image_extension("a.JPEG"));
        assert!(has_image_extension("a.gif"));
        assert!(!has_image_extension("a.png?v=2"));
        assert!(!has_image_extension(""));
    }

    #[test]
    fn non_success_status_yields_no_record() {
        let fetcher = MapFetcher::default().with(URL, 404, "gone");
        assert!(extractor(&fetcher).extract(URL).is_none());
        assert!(extractor(&fetcher).extract("https://devpost.com/software/missing").is_none());
    }

    #[test]
    fn successful_fetch_yields_record() {
        let fetcher = MapFetcher::default().with(URL, 200, FULL_PAGE);
        let record = extractor(&fetcher).extract(URL).unwrap();
        assert_eq!(record.title, "Alpha Bot");
        assert_eq!(fetcher.requested.borrow().len(), 1);
    }
}
