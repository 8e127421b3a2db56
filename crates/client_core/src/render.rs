//! Named view regions and the write contract jobs and forms render through.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

/// What a region displays: plain text, or markup injected as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Markup(String),
}

impl Content {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn markup(value: impl Into<String>) -> Self {
        Self::Markup(value.into())
    }

    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(value) | Self::Markup(value) => value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::empty()
    }
}

/// A writable view region. Every write replaces the previous content.
pub trait RenderTarget: Send + Sync {
    fn render(&self, content: Content);
}

impl<T: RenderTarget + ?Sized> RenderTarget for Arc<T> {
    fn render(&self, content: Content) {
        (**self).render(content);
    }
}

#[derive(Debug, Default)]
struct RegionState {
    content: Content,
    visible: bool,
    writes: u64,
}

/// In-memory region standing in for one addressable element of the page.
#[derive(Debug)]
pub struct Region {
    name: String,
    state: Mutex<RegionState>,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(RegionState {
                visible: true,
                ..RegionState::default()
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> Content {
        self.lock().content.clone()
    }

    pub fn text(&self) -> String {
        self.lock().content.as_str().to_string()
    }

    /// Number of writes since creation, including clears.
    pub fn writes(&self) -> u64 {
        self.lock().writes
    }

    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.lock().visible = visible;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderTarget for Region {
    fn render(&self, content: Content) {
        let mut state = self.lock();
        state.content = content;
        state.writes += 1;
    }
}

/// Registry of named regions. Handles are resolved once and then owned by
/// whoever writes to them.
#[derive(Debug, Default)]
pub struct Surface {
    regions: Mutex<HashMap<String, Arc<Region>>>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the region called `name`, creating it on first use.
    pub fn region(&self, name: &str) -> Arc<Region> {
        let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            regions
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Region::new(name))),
        )
    }

    pub fn get(&self, name: &str) -> Option<Arc<Region>> {
        self.regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Current content of every region, ordered by name.
    pub fn snapshot(&self) -> BTreeMap<String, Content> {
        self.regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, region)| (name.clone(), region.content()))
            .collect()
    }
}

/// Escapes text for interpolation into injected markup.
pub fn escape_markup(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
