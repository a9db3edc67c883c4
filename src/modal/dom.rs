//! Host document model
//!
//! The document is the platform surface the modal core talks to: an element
//! tree whose `body` acts as the portal target, the element that currently
//! holds keyboard focus, and the page's scroll-overflow setting.

use super::types::{ModalError, ModalResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Document shared between the host page and mounted dialog chrome
pub type SharedDocument = Arc<Mutex<Document>>;

/// Lock a shared document, recovering the guard if a previous holder panicked
pub fn lock_document(document: &SharedDocument) -> MutexGuard<'_, Document> {
    document.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Arena index of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element categories relevant to keyboard interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// Generic grouping element
    Container,
    /// Static text, headings, descriptions
    Text,
    /// Hyperlink; only focusable with a destination
    Link { href: Option<String> },
    Button,
    Input,
    Select,
    TextArea,
}

/// Accessibility role exposed by an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Dialog,
    Presentation,
}

/// Page scroll-overflow setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    #[default]
    Visible,
    Auto,
    Scroll,
    /// Scrolling disabled; the value a modal locks the page to
    Hidden,
}

/// A single node in the element tree
#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    /// Document-level identifier used for label/description associations
    pub dom_id: Option<String>,
    pub text: Option<String>,
    pub disabled: bool,
    pub aria_hidden: bool,
    pub tab_index: Option<i32>,
    pub role: Option<Role>,
    pub aria_modal: bool,
    pub labelled_by: Option<String>,
    pub described_by: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            dom_id: None,
            text: None,
            disabled: false,
            aria_hidden: false,
            tab_index: None,
            role: None,
            aria_modal: false,
            labelled_by: None,
            described_by: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn container() -> Self {
        Self::new(ElementKind::Container)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Text).with_text(text)
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Button).with_text(label)
    }

    pub fn input() -> Self {
        Self::new(ElementKind::Input)
    }

    pub fn select() -> Self {
        Self::new(ElementKind::Select)
    }

    pub fn link(href: Option<&str>) -> Self {
        Self::new(ElementKind::Link {
            href: href.map(str::to_string),
        })
    }

    pub fn with_dom_id(mut self, dom_id: impl Into<String>) -> Self {
        self.dom_id = Some(dom_id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_tab_index(mut self, tab_index: i32) -> Self {
        self.tab_index = Some(tab_index);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn aria_hidden(mut self, hidden: bool) -> Self {
        self.aria_hidden = hidden;
        self
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }
}

/// Arena-backed element tree; removed slots are left empty
#[derive(Debug, Default)]
pub struct ElementTree {
    slots: Vec<Option<Element>>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parentless element
    pub fn insert_root(&mut self, mut element: Element) -> ElementId {
        let id = ElementId(self.slots.len());
        element.parent = None;
        element.children.clear();
        self.slots.push(Some(element));
        id
    }

    /// Append `element` as the last child of `parent`
    pub fn append_child(&mut self, parent: ElementId, element: Element) -> ModalResult<ElementId> {
        if self.get(parent).is_none() {
            return Err(ModalError::UnknownElement(parent));
        }
        let id = self.insert_root(element);
        if let Some(Some(child)) = self.slots.get_mut(id.0) {
            child.parent = Some(parent);
        }
        if let Some(Some(parent)) = self.slots.get_mut(parent.0) {
            parent.children.push(id);
        }
        Ok(id)
    }

    /// Detach `id` from its parent and drop it together with its descendants
    pub fn remove(&mut self, id: ElementId) {
        let Some(parent) = self.get(id).map(|element| element.parent) else {
            return;
        };
        if let Some(parent) = parent {
            if let Some(Some(parent)) = self.slots.get_mut(parent.0) {
                parent.children.retain(|child| *child != id);
            }
        }

        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(slot) = self.slots.get_mut(next.0) {
                if let Some(element) = slot.take() {
                    pending.extend(element.children);
                }
            }
        }
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Whether `node` is `ancestor` or lies somewhere below it
    pub fn is_inclusive_descendant(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(Element::parent);
        }
        false
    }

    /// Descendants of `root` in document order, `root` itself excluded
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut ordered = Vec::new();
        let mut stack: Vec<ElementId> = match self.get(root) {
            Some(element) => element.children.iter().rev().copied().collect(),
            None => return ordered,
        };
        while let Some(id) = stack.pop() {
            if let Some(element) = self.get(id) {
                ordered.push(id);
                stack.extend(element.children.iter().rev().copied());
            }
        }
        ordered
    }

    /// First element (in document order below `root`) carrying `dom_id`
    pub fn find_by_dom_id(&self, root: ElementId, dom_id: &str) -> Option<ElementId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.get(*id).and_then(|e| e.dom_id.as_deref()) == Some(dom_id))
    }
}

/// Scroll-lock bookkeeping shared by every lock holder
#[derive(Debug, Default)]
pub(crate) struct ScrollLockState {
    pub(crate) holders: usize,
    pub(crate) saved: Option<Overflow>,
}

/// The host page
#[derive(Debug)]
pub struct Document {
    tree: ElementTree,
    body: ElementId,
    active: Option<ElementId>,
    overflow: Overflow,
    pub(crate) scroll_lock: ScrollLockState,
}

impl Document {
    pub fn new() -> Self {
        let mut tree = ElementTree::new();
        let body = tree.insert_root(Element::container().with_dom_id("body"));
        Self {
            tree,
            body,
            active: None,
            overflow: Overflow::default(),
            scroll_lock: ScrollLockState::default(),
        }
    }

    pub fn shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    /// Root element and portal target
    pub fn body(&self) -> ElementId {
        self.body
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    pub fn overflow(&self) -> Overflow {
        self.overflow
    }

    pub fn set_overflow(&mut self, overflow: Overflow) {
        self.overflow = overflow;
    }

    /// Element holding keyboard focus, if it is still attached
    pub fn active_element(&self) -> Option<ElementId> {
        self.active.filter(|id| self.tree.contains(*id))
    }

    pub fn focus(&mut self, id: ElementId) -> ModalResult<()> {
        if !self.tree.contains(id) {
            return Err(ModalError::UnknownElement(id));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    /// Text of the element carrying `dom_id`, searched from the body
    pub fn text_of(&self, dom_id: &str) -> Option<&str> {
        self.tree
            .find_by_dom_id(self.body, dom_id)
            .and_then(|id| self.tree.get(id))
            .and_then(|element| element.text.as_deref())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
