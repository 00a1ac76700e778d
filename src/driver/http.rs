use super::Driver;
use crate::error::DriverError;
use crate::utils::normalize_whitespace;

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) job-posting-crawler/0.1".to_string(),
        }
    }
}

/// Static-HTML session: fetches documents with `reqwest` and queries them
/// with `scraper`. No scripts run, so it only suits server-rendered listings.
pub struct HttpDriver {
    client: reqwest::Client,
    source: Option<Arc<str>>,
    generation: u64,
}

/// Handle to one element of a loaded document, addressed by its position in
/// the parsed tree. Parsing is deterministic, so the position is stable for
/// as long as the document is. Text and attributes are captured when the
/// handle is created.
#[derive(Debug, Clone)]
pub struct HtmlElement {
    generation: u64,
    source: Arc<str>,
    node: usize,
    text: String,
    attrs: Vec<(String, String)>,
}

impl HttpDriver {
    pub fn new(settings: HttpSettings) -> Result<HttpDriver, DriverError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent)
            .build()
            .map_err(|err| DriverError::Connection(err.to_string()))?;
        Ok(HttpDriver {
            client,
            source: None,
            generation: 0,
        })
    }

    /// Replaces the current document without touching the network.
    pub fn load_html(&mut self, url: &str, html: &str) {
        self.generation += 1;
        self.source = Some(Arc::from(html));
        debug!("Loaded {} ({} bytes)", url, html.len());
    }

    fn handles(&self, source: &Arc<str>, found: Vec<Found>) -> Vec<HtmlElement> {
        found
            .into_iter()
            .map(|found| HtmlElement {
                generation: self.generation,
                source: Arc::clone(source),
                node: found.node,
                text: found.text,
                attrs: found.attrs,
            })
            .collect()
    }

    fn check(&self, element: &HtmlElement) -> Result<(), DriverError> {
        if element.generation != self.generation {
            return Err(DriverError::Stale);
        }
        Ok(())
    }
}

struct Found {
    node: usize,
    text: String,
    attrs: Vec<(String, String)>,
}

fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    Selector::parse(selector)
        .map_err(|err| DriverError::Protocol(format!("invalid selector `{}`: {:?}", selector, err)))
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().map(str::trim).filter(|s| !s.is_empty()).join(" "))
}

/// Elements matching `selector`, searched from the document root or below
/// the element at `scope`. One parse per call.
fn select_nodes(source: &str, scope: Option<usize>, selector: &Selector) -> Vec<Found> {
    let doc = Html::parse_document(source);
    let matched = match scope {
        None => doc.select(selector).collect::<Vec<_>>(),
        Some(scope) => match doc.tree.nodes().nth(scope).and_then(ElementRef::wrap) {
            Some(parent) => parent
                .select(selector)
                .filter(|el| el.id() != parent.id())
                .collect(),
            None => vec![],
        },
    };
    if matched.is_empty() {
        return vec![];
    }

    let wanted: HashSet<_> = matched.iter().map(|el| el.id()).collect();
    let positions: HashMap<_, usize> = doc
        .tree
        .nodes()
        .enumerate()
        .filter(|(_, node)| wanted.contains(&node.id()))
        .map(|(i, node)| (node.id(), i))
        .collect();

    matched
        .into_iter()
        .filter_map(|el| {
            positions.get(&el.id()).map(|&node| Found {
                node,
                text: element_text(el),
                attrs: el
                    .value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            })
        })
        .collect()
}

fn map_reqwest_error(err: reqwest::Error) -> DriverError {
    if err.is_timeout() {
        DriverError::Timeout(err.to_string())
    } else {
        DriverError::Connection(err.to_string())
    }
}

#[async_trait::async_trait]
impl Driver for HttpDriver {
    type Element = HtmlElement;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        // Old handles go stale as soon as navigation starts.
        self.generation += 1;
        self.source = None;

        debug!("Visit {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            warn!("{} answered {}", url, status);
        }
        let html = response.text().await.map_err(map_reqwest_error)?;
        self.load_html(url, &html);
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool, DriverError> {
        let selector = parse_selector(selector)?;
        match self.source.as_ref() {
            Some(source) => Ok(Html::parse_document(source)
                .select(&selector)
                .next()
                .is_some()),
            None => Ok(false),
        }
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<HtmlElement>, DriverError> {
        let selector = parse_selector(selector)?;
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| DriverError::Protocol("no document loaded".to_string()))?;
        let found = select_nodes(source, None, &selector);
        Ok(self.handles(source, found))
    }

    async fn find_within(
        &self,
        parent: &HtmlElement,
        selector: &str,
    ) -> Result<Vec<HtmlElement>, DriverError> {
        let selector = parse_selector(selector)?;
        self.check(parent)?;
        let found = select_nodes(&parent.source, Some(parent.node), &selector);
        Ok(self.handles(&parent.source, found))
    }

    async fn text(&self, element: &HtmlElement) -> Result<String, DriverError> {
        self.check(element)?;
        Ok(element.text.clone())
    }

    async fn attribute(
        &self,
        element: &HtmlElement,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.check(element)?;
        Ok(element
            .attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.clone()))
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        self.generation += 1;
        self.source = None;
        Ok(())
    }
}
