//! In-memory driver for exercising the crawl loop without a browser.

use super::Driver;
use crate::error::DriverError;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A node of a scripted document. Children are keyed by the exact selector
/// string that finds them; there is no CSS matching.
#[derive(Debug, Default, Clone)]
pub struct Node {
    pub text: String,
    pub attrs: HashMap<String, String>,
    pub children: Vec<(String, Node)>,
    /// Lookups reaching this node fail as stale this many times first.
    pub stale_failures: Arc<AtomicU32>,
    /// Lookups reaching this node fail as if the browser went away.
    pub disconnects: bool,
}

impl Node {
    pub fn new() -> Node {
        Node::default()
    }

    pub fn text(mut self, text: &str) -> Node {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Node {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, selector: &str, node: Node) -> Node {
        self.children.push((selector.to_string(), node));
        self
    }

    pub fn stale(self, failures: u32) -> Node {
        self.stale_failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn disconnect(mut self) -> Node {
        self.disconnects = true;
        self
    }
}

#[derive(Debug, Clone)]
pub enum Script {
    Page(Node),
    Disconnect,
}

#[derive(Debug, Clone)]
pub struct ScriptedElement {
    generation: u64,
    path: Vec<usize>,
}

/// Each URL plays its scripts in order; the last one repeats.
#[derive(Default)]
pub struct ScriptedDriver {
    scripts: HashMap<String, Vec<Script>>,
    current: Option<Node>,
    generation: u64,
    delay: Option<Duration>,
    cancel_at: Option<(String, CancellationToken)>,
    pub visits: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl ScriptedDriver {
    pub fn new() -> ScriptedDriver {
        ScriptedDriver::default()
    }

    pub fn page(self, url: &str, root: Node) -> ScriptedDriver {
        self.script(url, Script::Page(root))
    }

    pub fn disconnect_at(self, url: &str) -> ScriptedDriver {
        self.script(url, Script::Disconnect)
    }

    /// Every navigation takes this long before the page is there.
    pub fn navigation_delay(mut self, delay: Duration) -> ScriptedDriver {
        self.delay = Some(delay);
        self
    }

    /// Cancels `token` once `url` has been loaded.
    pub fn cancel_after(mut self, url: &str, token: CancellationToken) -> ScriptedDriver {
        self.cancel_at = Some((url.to_string(), token));
        self
    }

    fn script(mut self, url: &str, script: Script) -> ScriptedDriver {
        self.scripts.entry(url.to_string()).or_default().push(script);
        self
    }

    fn next_script(&self, url: &str, visit: usize) -> Option<&Script> {
        let scripts = self.scripts.get(url)?;
        scripts.get(visit).or_else(|| scripts.last())
    }

    fn resolve(&self, element: &ScriptedElement) -> Result<&Node, DriverError> {
        if element.generation != self.generation {
            return Err(DriverError::Stale);
        }
        let mut node = self.current.as_ref().ok_or(DriverError::Stale)?;
        for &idx in &element.path {
            node = &node.children.get(idx).ok_or(DriverError::Stale)?.1;
        }
        Ok(node)
    }

    fn children_matching(
        &self,
        parent: &Node,
        path: &[usize],
        selector: &str,
    ) -> Result<Vec<ScriptedElement>, DriverError> {
        let mut found = vec![];
        for (idx, (key, child)) in parent.children.iter().enumerate() {
            if key != selector {
                continue;
            }
            if child.disconnects {
                return Err(DriverError::Connection("browser went away".to_string()));
            }
            let remaining = child.stale_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                child.stale_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(DriverError::Stale);
            }
            let mut path = path.to_vec();
            path.push(idx);
            found.push(ScriptedElement {
                generation: self.generation,
                path,
            });
        }
        Ok(found)
    }
}

#[async_trait::async_trait]
impl Driver for ScriptedDriver {
    type Element = ScriptedElement;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.generation += 1;
        self.current = None;
        let visit = {
            let mut visits = self.visits.lock().unwrap();
            let earlier = visits.iter().filter(|v| v.as_str() == url).count();
            visits.push(url.to_string());
            earlier
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((at, token)) = self.cancel_at.as_ref() {
            if at == url {
                token.cancel();
            }
        }
        match self.next_script(url, visit) {
            Some(Script::Page(root)) => {
                self.current = Some(root.clone());
                Ok(())
            }
            Some(Script::Disconnect) => {
                Err(DriverError::Connection(format!("browser went away at {}", url)))
            }
            None => {
                self.current = Some(Node::new());
                Ok(())
            }
        }
    }

    async fn exists(&self, selector: &str) -> Result<bool, DriverError> {
        Ok(self
            .current
            .as_ref()
            .map(|root| root.children.iter().any(|(key, _)| key == selector))
            .unwrap_or(false))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ScriptedElement>, DriverError> {
        match self.current.as_ref() {
            Some(root) => self.children_matching(root, &[], selector),
            None => Ok(vec![]),
        }
    }

    async fn find_within(
        &self,
        parent: &ScriptedElement,
        selector: &str,
    ) -> Result<Vec<ScriptedElement>, DriverError> {
        let node = self.resolve(parent)?;
        self.children_matching(node, &parent.path, selector)
    }

    async fn text(&self, element: &ScriptedElement) -> Result<String, DriverError> {
        Ok(self.resolve(element)?.text.clone())
    }

    async fn attribute(
        &self,
        element: &ScriptedElement,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        Ok(self.resolve(element)?.attrs.get(name).cloned())
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        self.current = None;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
