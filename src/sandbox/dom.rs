//! Arena-backed document model.
//!
//! Nodes live in a [`Slab`]; parent and child links are stored as
//! [`NodeId`]s. Every structural, text or attribute change made through the
//! public mutators is recorded for the registered change observers.

use std::fmt;

use slab::Slab;

use crate::error::{Error, Result};
use crate::observer::{ChangeObserver, MutationKind, MutationRecord, ObserveOptions, ObserverId};
use crate::sandbox::ReadyState;
use crate::sandbox::css::Selector;
use crate::sandbox::parser;

/// Elements without content or end tag.
const VOID_ELEMENTS: [&str; 8] = ["area", "br", "col", "hr", "img", "input", "link", "meta"];

/// Elements whose text content is not entity-escaped.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["style", "script"];

/// Pending serializer work: open a node (inside a raw-text parent or not),
/// or close an element.
enum Step<'a> {
    Open(NodeId, bool),
    Close(&'a str),
}

/// Index of a node within its document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A name/value attribute pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element name and attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
        }
    }

    /// Case-insensitive tag comparison.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    /// Whitespace-separated class tokens.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    fn is_void(&self) -> bool {
        VOID_ELEMENTS.iter().any(|v| self.is(v))
    }

    fn is_raw_text(&self) -> bool {
        RAW_TEXT_ELEMENTS.iter().any(|v| self.is(v))
    }
}

/// Node payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// A node and its tree links.
#[derive(Clone, Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    #[must_use]
    pub fn element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// A surface's content document.
#[derive(Debug)]
pub struct Document {
    nodes: Slab<Node>,
    root: NodeId,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    ready_state: ReadyState,
    observers: Vec<ChangeObserver>,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A blank document: `<html><head></head><body></body></html>`, complete.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(Node::new(NodeData::Document)));
        let mut doc = Self {
            nodes,
            root,
            html: root,
            head: root,
            body: root,
            ready_state: ReadyState::Complete,
            observers: Vec::new(),
            revision: 0,
        };
        doc.html = doc.create_element("html");
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.attach(root, doc.html);
        doc.attach(doc.html, doc.head);
        doc.attach(doc.html, doc.body);
        doc
    }

    /// The document node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<html>` element.
    #[must_use]
    pub fn document_element(&self) -> NodeId {
        self.html
    }

    #[must_use]
    pub fn head(&self) -> NodeId {
        self.head
    }

    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub(crate) fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    /// Bumped on every mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.node(id).and_then(Node::element)
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_class(class))
    }

    /// Whether `id` is strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Whether the node is attached to this document's tree.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root || self.is_descendant_of(id, self.root)
    }

    /// Ancestor chain of `id`, nearest first (excluding `id`).
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// All descendants of `scope` in tree order (excluding `scope`).
    #[must_use]
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(name)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.alloc(NodeData::Text(data.to_string()))
    }

    pub(crate) fn alloc(&mut self, data: NodeData) -> NodeId {
        NodeId(self.nodes.insert(Node::new(data)))
    }

    /// Link `child` under `parent` without recording a mutation.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
    }

    pub(crate) fn push_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(Node {
            data: NodeData::Element(el),
            ..
        }) = self.nodes.get_mut(id.0)
        {
            if el.attr(name).is_none() {
                el.attrs.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    /// Append a detached node under `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.attach(parent, child);
        self.record(MutationKind::ChildList, parent);
    }

    /// Unlink `id` from its parent without recording a mutation.
    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id.0).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.retain(|&c| c != id);
        }
    }

    /// Link `node` just before `sibling`, moving it if already attached.
    pub(crate) fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        self.detach(node);
        let Some(parent) = self.parent(sibling) else {
            return;
        };
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.parent = Some(parent);
        }
        if let Some(p) = self.nodes.get_mut(parent.0) {
            let at = p.children.iter().position(|&c| c == sibling).unwrap_or(p.children.len());
            p.children.insert(at, node);
        }
    }

    /// Unlink and return every child of `id`.
    pub(crate) fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self
            .nodes
            .get_mut(id.0)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for &child in &children {
            if let Some(node) = self.nodes.get_mut(child.0) {
                node.parent = None;
            }
        }
        children
    }

    /// Sibling immediately before `id`.
    pub(crate) fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let at = siblings.iter().position(|&c| c == id)?;
        at.checked_sub(1).map(|i| siblings[i])
    }

    /// Extend a text node in place. Returns `false` when `id` is not text.
    pub(crate) fn append_text(&mut self, id: NodeId, text: &str) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(Node {
                data: NodeData::Text(t),
                ..
            }) => {
                t.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Number of live nodes, attached or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn release_subtree(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes.try_remove(n.0) {
                stack.extend(node.children);
            }
        }
    }

    fn clear_children(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        let children = std::mem::take(&mut node.children);
        let had_children = !children.is_empty();
        for child in children {
            self.release_subtree(child);
        }
        had_children
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Replace the children of `id` with the parsed `html` fragment.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        if self.node(id).is_none() {
            return;
        }
        let raw_text = self.element(id).is_some_and(ElementData::is_raw_text);
        self.clear_children(id);
        if raw_text {
            if !html.is_empty() {
                let text = self.create_text(html);
                self.attach(id, text);
            }
        } else {
            for child in parser::parse_fragment(self, html) {
                self.attach(id, child);
            }
        }
        self.record(MutationKind::ChildList, id);
    }

    /// Replace the children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if self.node(id).is_none() {
            return;
        }
        let had_children = self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.attach(id, node);
        }
        if had_children || !text.is_empty() {
            self.record(MutationKind::ChildList, id);
        }
    }

    /// Replace the data of a text node.
    pub fn set_character_data(&mut self, id: NodeId, data: &str) {
        if let Some(Node {
            data: NodeData::Text(t),
            ..
        }) = self.nodes.get_mut(id.0)
        {
            data.clone_into(t);
            self.record(MutationKind::CharacterData, id);
        }
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(Node {
            data: NodeData::Element(el),
            ..
        }) = self.nodes.get_mut(id.0)
        else {
            return;
        };
        match el.attrs.iter_mut().find(|a| a.name.eq_ignore_ascii_case(name)) {
            Some(attr) => value.clone_into(&mut attr.value),
            None => el.attrs.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
        self.revision += 1;
        self.notify(MutationRecord::attribute(id, name));
    }

    // ------------------------------------------------------------------
    // User editing
    // ------------------------------------------------------------------

    /// Whether `id` sits inside a `contenteditable` region.
    #[must_use]
    pub fn is_editable(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.attribute(n, "contenteditable"))
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "" | "true" | "plaintext-only"))
    }

    /// Replace the content of an editable node the way an editing surface
    /// would: plain text over a single text child edits that text node in
    /// place, anything else replaces the children.
    pub fn user_edit(&mut self, id: NodeId, html: &str) -> Result<()> {
        if !self.is_editable(id) {
            return Err(Error::NotEditable { node: id });
        }
        let plain = !html.contains(['<', '&']);
        let single_text = match self.children(id) {
            [only] if plain && self.node(*only).and_then(Node::text).is_some() => Some(*only),
            _ => None,
        };
        match single_text {
            Some(node) => self.set_character_data(node, html),
            None => self.set_inner_html(id, html),
        }
        Ok(())
    }

    /// Type plain text at the end of an editable node.
    pub fn insert_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        if !self.is_editable(id) {
            return Err(Error::NotEditable { node: id });
        }
        let last_text = self
            .children(id)
            .last()
            .copied()
            .and_then(|c| self.node(c).and_then(Node::text).map(|t| (c, t.to_string())));
        match last_text {
            Some((node, mut data)) => {
                data.push_str(text);
                self.set_character_data(node, &data);
            }
            None => {
                let node = self.create_text(text);
                self.append_child(id, node);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.node(id).and_then(Node::text) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.node(n).and_then(Node::text))
            .collect()
    }

    /// Serialized children of `id`.
    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.element(id).is_some_and(ElementData::is_raw_text);
        let steps = self.children(id).iter().rev().map(|&c| Step::Open(c, raw));
        self.serialize(steps.collect(), &mut out);
        out
    }

    /// Serialized node including its own tag.
    #[must_use]
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize(vec![Step::Open(id, false)], &mut out);
        out
    }

    /// Drain a serialization stack. Nesting depth only grows the stack.
    fn serialize<'a>(&'a self, mut stack: Vec<Step<'a>>, out: &mut String) {
        while let Some(step) = stack.pop() {
            let (id, raw_parent) = match step {
                Step::Open(id, raw_parent) => (id, raw_parent),
                Step::Close(name) => {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                    continue;
                }
            };
            let Some(node) = self.node(id) else {
                continue;
            };
            match &node.data {
                NodeData::Document => {
                    stack.extend(node.children.iter().rev().map(|&c| Step::Open(c, false)));
                }
                NodeData::Text(text) if raw_parent => out.push_str(text),
                NodeData::Text(text) => out.push_str(&html_escape::encode_text(text)),
                NodeData::Comment(text) => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
                NodeData::Element(el) => {
                    out.push('<');
                    out.push_str(&el.name);
                    for attr in &el.attrs {
                        out.push(' ');
                        out.push_str(&attr.name);
                        out.push_str("=\"");
                        out.push_str(&html_escape::encode_double_quoted_attribute(&attr.value));
                        out.push('"');
                    }
                    out.push('>');
                    if el.is_void() {
                        continue;
                    }
                    let raw = el.is_raw_text();
                    stack.push(Step::Close(&el.name));
                    stack.extend(node.children.iter().rev().map(|&c| Step::Open(c, raw)));
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// First descendant of `scope` matching a simple selector chain such as
    /// `.root`, `svg style` or `svg .icon`. Ancestor parts of the selector may
    /// match outside `scope`.
    #[must_use]
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        let chain = Selector::parse(selector)?;
        self.descendants(scope)
            .into_iter()
            .find(|&n| chain.matches(self, n))
    }

    /// All descendants of `scope` matching `selector`, in tree order.
    #[must_use]
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(chain) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants(scope)
            .into_iter()
            .filter(|&n| chain.matches(self, n))
            .collect()
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub(crate) fn observe(&mut self, id: ObserverId, node: NodeId, options: ObserveOptions) {
        self.observers.push(ChangeObserver::new(id, node, options));
    }

    pub(crate) fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id() != id);
        self.observers.len() != before
    }

    /// Number of attached observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Drain the first observer batch waiting for delivery.
    pub(crate) fn take_pending_batch(&mut self) -> Option<(ObserverId, Vec<MutationRecord>)> {
        self.observers
            .iter_mut()
            .find(|o| o.has_pending())
            .map(|o| (o.id(), o.take_records()))
    }

    #[must_use]
    pub fn has_pending_records(&self) -> bool {
        self.observers.iter().any(ChangeObserver::has_pending)
    }

    fn record(&mut self, kind: MutationKind, target: NodeId) {
        self.revision += 1;
        self.notify(MutationRecord::new(kind, target));
    }

    fn notify(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let mut interested = Vec::new();
        for (idx, observer) in self.observers.iter().enumerate() {
            if observer.wants(record.kind, record.target, || {
                self.is_descendant_of(record.target, observer.node())
            }) {
                interested.push(idx);
            }
        }
        for idx in interested {
            self.observers[idx].enqueue(record.clone());
        }
    }
}
