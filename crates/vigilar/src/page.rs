//! Modeled console document.
//!
//! `PageModel` is the query root every waiter, monitor, and page object
//! polls. It models the device console's live DOM in-process: element
//! presence, visibility, enablement, text, and attributes, plus named child
//! frame documents for iframes. A real browser bridge would sit behind the
//! same surface; the model keeps the entire polling protocol deterministic.
//!
//! Two scripted dynamics make asynchronous UI behavior reproducible:
//!
//! - **Attribute sequences**: an attribute read advances through a scripted
//!   value list and then holds the last value, modeling a progress bar that
//!   moves between polls.
//! - **Deferred visibility**: an element can become visible only after it
//!   has been observed N times, modeling a popup that appears a few retries
//!   after the operation completes.
//!
//! ## Toyota Way Application
//!
//! - **Jidoka**: interactions fail loudly on hidden or disabled controls
//! - **Genchi Genbutsu**: assertions read recorded clicks/fills, not flags

use crate::result::{VigilarError, VigilarResult};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Read-only view of one modeled element at query time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Canonical selector the element was installed under
    pub selector: String,
    /// Whether the element is currently rendered
    pub visible: bool,
    /// Whether the element accepts interaction
    pub enabled: bool,
    /// Text content
    pub text: String,
    /// Attribute values at observation time
    pub attributes: HashMap<String, String>,
}

/// Scripted attribute values, advanced one step per read and holding the
/// final value afterwards.
#[derive(Debug, Clone)]
struct ValueScript {
    values: Vec<String>,
    cursor: usize,
}

impl ValueScript {
    fn next(&mut self) -> Option<String> {
        let value = self.values.get(self.cursor).cloned();
        if self.cursor + 1 < self.values.len() {
            self.cursor += 1;
        }
        value
    }

    fn current(&self) -> Option<String> {
        self.values.get(self.cursor).cloned()
    }
}

/// One modeled element
#[derive(Debug, Clone)]
struct ModeledElement {
    selector: String,
    text: String,
    visible: bool,
    enabled: bool,
    attributes: HashMap<String, String>,
    attribute_scripts: HashMap<String, ValueScript>,
    /// Becomes visible once observed this many times
    reveal_after: Option<u32>,
    observations: u32,
}

impl ModeledElement {
    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Css(css) => self.selector == *css,
            Selector::Text(text) => self.text == *text,
            Selector::CssWithText { css, text } => {
                self.selector == *css && self.text.contains(text.as_str())
            }
        }
    }

    fn observe(&mut self) {
        self.observations += 1;
        if let Some(threshold) = self.reveal_after {
            if self.observations >= threshold {
                self.visible = true;
                self.reveal_after = None;
            }
        }
    }

    fn snapshot(&self) -> ElementSnapshot {
        let mut attributes = self.attributes.clone();
        for (name, script) in &self.attribute_scripts {
            if let Some(value) = script.current() {
                attributes.insert(name.clone(), value);
            }
        }
        ElementSnapshot {
            selector: self.selector.clone(),
            visible: self.visible,
            enabled: self.enabled,
            text: self.text.clone(),
            attributes,
        }
    }
}

/// Builder for installing a modeled element
#[derive(Debug, Clone)]
pub struct ElementSpec {
    selector: String,
    text: String,
    visible: bool,
    enabled: bool,
    attributes: HashMap<String, String>,
    attribute_scripts: HashMap<String, Vec<String>>,
    reveal_after: Option<u32>,
}

impl ElementSpec {
    /// Create a spec for the given canonical CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: String::new(),
            visible: true,
            enabled: true,
            attributes: HashMap::new(),
            attribute_scripts: HashMap::new(),
            reveal_after: None,
        }
    }

    /// Set text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set initial visibility
    #[must_use]
    pub const fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set enablement
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set a static attribute value
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Script an attribute through a value sequence; reads advance one step
    /// at a time and hold the last value
    #[must_use]
    pub fn attribute_sequence<V: Into<String>>(
        mut self,
        name: impl Into<String>,
        values: Vec<V>,
    ) -> Self {
        self.attribute_scripts
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Start hidden, then become visible on the Nth observation
    #[must_use]
    pub const fn reveal_after(mut self, observations: u32) -> Self {
        self.visible = false;
        self.reveal_after = Some(observations);
        self
    }

    fn build(self) -> ModeledElement {
        ModeledElement {
            selector: self.selector,
            text: self.text,
            visible: self.visible,
            enabled: self.enabled,
            attributes: self.attributes,
            attribute_scripts: self
                .attribute_scripts
                .into_iter()
                .map(|(name, values)| (name, ValueScript { values, cursor: 0 }))
                .collect(),
            reveal_after: self.reveal_after,
            observations: 0,
        }
    }
}

#[derive(Debug, Default)]
struct PageInner {
    elements: Vec<ModeledElement>,
    frames: HashMap<String, PageModel>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
}

/// The modeled document.
///
/// Cheap to clone; clones share state, mirroring how multiple locators
/// address one live page.
#[derive(Debug, Clone, Default)]
pub struct PageModel {
    inner: Arc<Mutex<PageInner>>,
}

impl PageModel {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a modeled element
    pub fn install(&self, spec: ElementSpec) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.elements.push(spec.build());
        }
    }

    /// Attach a named child frame document
    pub fn attach_frame(&self, name: impl Into<String>, document: PageModel) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.frames.insert(name.into(), document);
        }
    }

    /// Detach a named child frame document
    pub fn detach_frame(&self, name: &str) -> bool {
        self.inner
            .lock()
            .map(|mut inner| inner.frames.remove(name).is_some())
            .unwrap_or(false)
    }

    /// Get the document attached under a frame name
    #[must_use]
    pub fn frame_document(&self, name: &str) -> Option<PageModel> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.frames.get(name).cloned())
    }

    /// Observe the first element matching the selector.
    ///
    /// Observation is what advances deferred visibility: a poll that does
    /// not find the element yet still counts toward `reveal_after`.
    #[must_use]
    pub fn query(&self, selector: &Selector) -> Option<ElementSnapshot> {
        let mut inner = self.inner.lock().ok()?;
        let element = inner.elements.iter_mut().find(|e| e.matches(selector))?;
        element.observe();
        Some(element.snapshot())
    }

    /// Read an attribute, advancing its scripted sequence if one is set
    #[must_use]
    pub fn attribute(&self, selector: &Selector, name: &str) -> Option<String> {
        let mut inner = self.inner.lock().ok()?;
        let element = inner.elements.iter_mut().find(|e| e.matches(selector))?;
        if let Some(script) = element.attribute_scripts.get_mut(name) {
            return script.next();
        }
        element.attributes.get(name).cloned()
    }

    /// Click the first matching element.
    ///
    /// Hidden or absent elements are `ElementNotFound`; a visible but
    /// disabled element is `ControlNotReady`.
    pub fn click(&self, selector: &Selector) -> VigilarResult<()> {
        let mut inner = self.inner.lock().map_err(|_| VigilarError::ScaffoldMissing {
            message: "page model lock poisoned".to_string(),
        })?;
        let element = inner
            .elements
            .iter_mut()
            .find(|e| e.matches(selector))
            .ok_or_else(|| VigilarError::ElementNotFound {
                selector: selector.describe(),
            })?;
        element.observe();
        if !element.visible {
            return Err(VigilarError::ElementNotFound {
                selector: selector.describe(),
            });
        }
        if !element.enabled {
            return Err(VigilarError::ControlNotReady {
                control: selector.describe(),
            });
        }
        let canonical = element.selector.clone();
        inner.clicks.push(canonical);
        Ok(())
    }

    /// Fill the first matching element with text
    pub fn fill(&self, selector: &Selector, value: impl Into<String>) -> VigilarResult<()> {
        let mut inner = self.inner.lock().map_err(|_| VigilarError::ScaffoldMissing {
            message: "page model lock poisoned".to_string(),
        })?;
        let element = inner
            .elements
            .iter_mut()
            .find(|e| e.matches(selector))
            .ok_or_else(|| VigilarError::ElementNotFound {
                selector: selector.describe(),
            })?;
        element.observe();
        if !element.visible || !element.enabled {
            return Err(VigilarError::ControlNotReady {
                control: selector.describe(),
            });
        }
        let canonical = element.selector.clone();
        let value = value.into();
        element.text = value.clone();
        inner.fills.push((canonical, value));
        Ok(())
    }

    /// Change visibility of an installed element; returns false if absent
    pub fn set_visible(&self, css: &str, visible: bool) -> bool {
        self.mutate(css, |e| e.visible = visible)
    }

    /// Change enablement of an installed element; returns false if absent
    pub fn set_enabled(&self, css: &str, enabled: bool) -> bool {
        self.mutate(css, |e| e.enabled = enabled)
    }

    /// Replace the text of an installed element; returns false if absent
    pub fn set_text(&self, css: &str, text: impl Into<String>) -> bool {
        let text = text.into();
        self.mutate(css, move |e| e.text = text.clone())
    }

    /// Set a static attribute on an installed element; returns false if absent
    pub fn set_attribute(&self, css: &str, name: &str, value: impl Into<String>) -> bool {
        let name = name.to_string();
        let value = value.into();
        self.mutate(css, move |e| {
            e.attributes.insert(name.clone(), value.clone());
        })
    }

    /// Remove an installed element; returns false if absent
    pub fn remove(&self, css: &str) -> bool {
        self.inner
            .lock()
            .map(|mut inner| {
                let before = inner.elements.len();
                inner.elements.retain(|e| e.selector != css);
                inner.elements.len() != before
            })
            .unwrap_or(false)
    }

    /// All recorded clicks, in order, by canonical selector
    #[must_use]
    pub fn clicks(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.clicks.clone())
            .unwrap_or_default()
    }

    /// Whether the element installed under `css` was ever clicked
    #[must_use]
    pub fn clicked(&self, css: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.clicks.iter().any(|c| c == css))
            .unwrap_or(false)
    }

    /// All recorded fills, in order, as (canonical selector, value)
    #[must_use]
    pub fn fills(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .map(|inner| inner.fills.clone())
            .unwrap_or_default()
    }

    fn mutate<F: FnMut(&mut ModeledElement)>(&self, css: &str, mut f: F) -> bool {
        self.inner
            .lock()
            .map(|mut inner| {
                if let Some(element) = inner.elements.iter_mut().find(|e| e.selector == css) {
                    f(element);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false)
    }
}
