use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::cache::PageCache;
use crate::error::FetchError;
use crate::parser::{dates, dom};
use crate::settings::Settings;

const BASE_BACKOFF_MS: u64 = 2000;

static CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#perso, #content").unwrap());
static PERSO: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#perso").unwrap());
static META_AUTHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="author"]"#).unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

static TITLE_AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)arbre (?:généalogique|en ligne) (?:de|d')\s*(.+?)\s*(?:[-|(]|$)").unwrap()
});
static PERSONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d\s\u{a0}.]*)\s*(?:individus|personnes)").unwrap()
});
static CHANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:dernière modification|mis à jour|mise à jour)\s*(?:le|:)?\s*:?\s*(\d{1,2}/\d{1,2}/\d{4}|\d{1,2}(?:er)?\s+\p{L}+\s+\d{4})",
    )
    .unwrap()
});

/// Metadata about the tree being crawled, read from its owner's home page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeInfo {
    pub author: Option<String>,
    pub persons_count: Option<u64>,
    /// Already in GEDCOM date form.
    pub last_change_date: Option<String>,
    pub url: String,
}

/// Source of person pages. The crawler only ever talks to this trait.
pub trait PageFetcher {
    /// Person-container HTML of the page at `url`. `force` skips any cached copy.
    async fn fetch(&self, url: &Url, force: bool) -> Result<String, FetchError>;

    async fn informations(&self, base_url: &Url, force: bool) -> Result<TreeInfo, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    cache: Option<Mutex<PageCache>>,
    delay: Duration,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(settings: &Settings, cache: Option<PageCache>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout())
            .build()?;
        Ok(HttpFetcher {
            client,
            cache: cache.map(Mutex::new),
            delay: settings.request_delay(),
            max_retries: settings.max_retries,
        })
    }

    /// Cached copy of `url`, unless `force` asks for a fresh download.
    fn cached(&self, url: &Url, force: bool) -> Result<Option<String>, FetchError> {
        let Some(cache) = self.cache.as_ref().filter(|_| !force) else {
            return Ok(None);
        };
        let html = cache.lock().unwrap_or_else(|e| e.into_inner()).get(url.as_str())?;
        if html.is_some() {
            debug!("Cache hit for {}", url);
        }
        Ok(html)
    }

    fn store(&self, url: &Url, html: &str) -> Result<(), FetchError> {
        if let Some(cache) = &self.cache {
            cache.lock().unwrap_or_else(|e| e.into_inner()).put(url.as_str(), html)?;
        }
        Ok(())
    }

    async fn download_with_retry(&self, url: &Url) -> Result<String, FetchError> {
        for attempt in 0..self.max_retries {
            match self.download(url).await {
                Err(e) if e.is_retryable() => {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        "{} (attempt {}/{}), backing off {:.1}s",
                        e,
                        attempt + 1,
                        self.max_retries,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }

        self.download(url).await
    }

    async fn download(&self, url: &Url) -> Result<String, FetchError> {
        tokio::time::sleep(self.delay).await;

        let start = Instant::now();
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(transport)?;
        debug!("Fetched {} in {}ms", url, start.elapsed().as_millis());
        Ok(body)
    }
}

impl PageFetcher for HttpFetcher {
    /// Only pages holding a person container are cached, so a captcha or
    /// rate-limit page is downloaded again on the next run.
    async fn fetch(&self, url: &Url, force: bool) -> Result<String, FetchError> {
        if let Some(page) = self.cached(url, force)? {
            match person_container(&page) {
                Some(container) => return Ok(container),
                None => debug!("Cached copy of {} has no person container", url),
            }
        }

        let page = self.download_with_retry(url).await?;
        let container =
            person_container(&page).ok_or_else(|| FetchError::MissingContainer(url.to_string()))?;
        self.store(url, &page)?;
        Ok(container)
    }

    async fn informations(&self, base_url: &Url, force: bool) -> Result<TreeInfo, FetchError> {
        let page = match self.cached(base_url, force)? {
            Some(page) => page,
            None => {
                let page = self.download_with_retry(base_url).await?;
                self.store(base_url, &page)?;
                page
            }
        };
        Ok(parse_informations(&page, base_url))
    }
}

/// Outer HTML of `#perso`, or of `#content` when the page has no `#perso`.
pub fn person_container(page: &str) -> Option<String> {
    let doc = Html::parse_document(page);
    doc.select(&PERSO)
        .next()
        .or_else(|| doc.select(&CONTAINER).next())
        .map(|el| el.html())
}

/// Best-effort read of the tree owner's home page. Anything not found stays `None`.
pub fn parse_informations(page: &str, base_url: &Url) -> TreeInfo {
    let doc = Html::parse_document(page);

    let author = doc
        .select(&META_AUTHOR)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(dom::collapse_ws)
        .filter(|a| !a.is_empty())
        .or_else(|| {
            let title = doc.select(&TITLE).next().map(dom::text_of)?;
            let caps = TITLE_AUTHOR_RE.captures(&title)?;
            Some(caps[1].trim().to_string()).filter(|a| !a.is_empty())
        });

    let body = doc.select(&BODY).next().map(dom::text_of).unwrap_or_default();

    let persons_count = PERSONS_RE.captures(&body).and_then(|caps| {
        let digits: String = caps[1].chars().filter(char::is_ascii_digit).collect();
        digits.parse().ok()
    });

    let last_change_date = CHANGE_RE
        .captures(&body)
        .and_then(|caps| dates::parse_phrase(&caps[1]));

    TreeInfo {
        author,
        persons_count,
        last_change_date,
        url: base_url.to_string(),
    }
}
