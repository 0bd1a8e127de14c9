//! Markup parsing into the sandbox document.
//!
//! [`parse_fragment`] runs the [`html5ever`] tree builder over a fragment and
//! builds the result in the target [`Document`]'s arena. The fragment is
//! parsed as the content of a scratch `<body>`, so malformed input recovers the
//! way a browser's `innerHTML` would: stray end tags are dropped, unclosed
//! elements are closed, misnested formatting elements are re-parented, and
//! `<svg>` content gets its foreign-element name adjustments
//! (`foreignobject` becomes `foreignObject`).
//!
//! Element nesting is capped at [`MAX_TREE_DEPTH`]. Elements opened below the
//! cap are attached as siblings of their would-be parent instead, so the tree
//! every later walk sees stays shallow whatever the input.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};

use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeBuilderOpts, TreeSink};
use html5ever::{Attribute, ExpandedName, LocalName, Namespace, ParseOpts, QualName};
use tracing::trace;

use crate::sandbox::dom::{Document, NodeData, NodeId};

/// Deepest element nesting a parsed fragment may produce.
pub const MAX_TREE_DEPTH: usize = 256;

/// Prefix that puts the tree builder straight into the body of a no-quirks
/// document.
const BODY_CONTEXT: &str = "<!DOCTYPE html><body>";

/// Parse `html` into detached nodes owned by `doc`, returning the top-level
/// nodes in order.
pub fn parse_fragment(doc: &mut Document, html: &str) -> Vec<NodeId> {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            drop_doctype: true,
            ..TreeBuilderOpts::default()
        },
        ..ParseOpts::default()
    };
    let mut input = String::with_capacity(BODY_CONTEXT.len() + html.len());
    input.push_str(BODY_CONTEXT);
    input.push_str(html);
    html5ever::parse_document(FragmentSink::new(doc), opts).one(input)
}

/// Tree builder handle: the arena id plus, for elements, the qualified name
/// the builder asks back for.
#[derive(Clone, Debug)]
struct SinkNode {
    id: NodeId,
    name: QualName,
}

/// [`TreeSink`] writing into a [`Document`] arena.
struct FragmentSink<'doc> {
    doc: RefCell<&'doc mut Document>,
    scratch: NodeId,
    errors: Cell<usize>,
}

impl<'doc> FragmentSink<'doc> {
    fn new(doc: &'doc mut Document) -> Self {
        let scratch = doc.alloc(NodeData::Document);
        Self {
            doc: RefCell::new(doc),
            scratch,
            errors: Cell::new(0),
        }
    }

    fn handle(&self, id: NodeId) -> SinkNode {
        SinkNode {
            id,
            name: blank_name(),
        }
    }

    /// Element depth below the scratch document.
    fn depth(&self, id: NodeId) -> usize {
        self.doc.borrow().ancestors(id).count()
    }

    /// Where an element appended under `parent` actually goes.
    fn capped_parent(&self, parent: NodeId) -> NodeId {
        if self.depth(parent) < MAX_TREE_DEPTH {
            return parent;
        }
        self.doc.borrow().parent(parent).unwrap_or(parent)
    }

    fn is_element(&self, id: NodeId) -> bool {
        self.doc.borrow().element(id).is_some()
    }

    fn text_node(&self, text: &str) -> NodeId {
        self.doc.borrow_mut().alloc(NodeData::Text(text.to_string()))
    }
}

fn blank_name() -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(""))
}

/// Attribute name as written in markup, keeping any namespace prefix.
fn attribute_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", &**prefix, &*name.local),
        None => name.local.to_string(),
    }
}

impl TreeSink for FragmentSink<'_> {
    type Handle = SinkNode;
    type Output = Vec<NodeId>;
    type ElemName<'a>
        = ExpandedName<'a>
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        let errors = self.errors.get();
        let scratch = self.scratch;
        let doc = self.doc.into_inner();
        let body = doc
            .children(scratch)
            .iter()
            .flat_map(|&html| doc.children(html).iter().copied())
            .find(|&n| doc.element(n).is_some_and(|el| el.is("body")));
        let roots = body.map(|body| doc.take_children(body)).unwrap_or_default();
        doc.release_subtree(scratch);
        trace!(nodes = roots.len(), errors, "markup fragment parsed");
        roots
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        self.errors.set(self.errors.get() + 1);
    }

    fn get_document(&self) -> Self::Handle {
        self.handle(self.scratch)
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        target.name.expanded()
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let mut doc = self.doc.borrow_mut();
        let id = doc.create_element(&name.local);
        for attr in &attrs {
            doc.push_attr(id, &attribute_name(&attr.name), &attr.value);
        }
        SinkNode { id, name }
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        let id = self.doc.borrow_mut().alloc(NodeData::Comment(text.to_string()));
        self.handle(id)
    }

    fn create_pi(&self, _target: StrTendril, data: StrTendril) -> Self::Handle {
        self.create_comment(data)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(node) => {
                let parent = if self.is_element(node.id) {
                    self.capped_parent(parent.id)
                } else {
                    parent.id
                };
                self.doc.borrow_mut().attach(parent, node.id);
            }
            NodeOrText::AppendText(text) => {
                let last = self.doc.borrow().children(parent.id).last().copied();
                let merged = last.is_some_and(|id| self.doc.borrow_mut().append_text(id, &text));
                if !merged {
                    let node = self.text_node(&text);
                    self.doc.borrow_mut().attach(parent.id, node);
                }
            }
        }
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        match new_node {
            NodeOrText::AppendNode(node) => self.doc.borrow_mut().insert_before(sibling.id, node.id),
            NodeOrText::AppendText(text) => {
                let previous = self.doc.borrow().previous_sibling(sibling.id);
                let merged =
                    previous.is_some_and(|id| self.doc.borrow_mut().append_text(id, &text));
                if !merged {
                    let node = self.text_node(&text);
                    self.doc.borrow_mut().insert_before(sibling.id, node);
                }
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if self.doc.borrow().parent(element.id).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut doc = self.doc.borrow_mut();
        for attr in &attrs {
            doc.push_attr(target.id, &attribute_name(&attr.name), &attr.value);
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.doc.borrow_mut().detach(target.id);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut doc = self.doc.borrow_mut();
        for child in doc.take_children(node.id) {
            doc.attach(new_parent.id, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let roots = parse_fragment(&mut doc, html);
        (doc, roots)
    }

    #[test]
    fn test_attributes_and_entities() {
        let (doc, roots) = parse(r#"<div class="a b" data-x='1' hidden id=z title="&lt;&amp;">"#);
        assert_eq!(roots.len(), 1);
        let div = roots[0];
        assert_eq!(doc.attribute(div, "class"), Some("a b"));
        assert_eq!(doc.attribute(div, "data-x"), Some("1"));
        assert_eq!(doc.attribute(div, "hidden"), Some(""));
        assert_eq!(doc.attribute(div, "id"), Some("z"));
        assert_eq!(doc.attribute(div, "title"), Some("<&"));
    }

    #[test]
    fn test_text_entities_decoded() {
        let (doc, roots) = parse("a &amp; b &lt;c&gt; 1 < 2");
        assert_eq!(roots.len(), 1);
        assert_eq!(doc.text_content(roots[0]), "a & b <c> 1 < 2");
    }

    #[test]
    fn test_style_content_is_raw() {
        let (doc, roots) = parse("<style>.a > .b { x: \"&amp;\" }</style>after");
        assert_eq!(roots.len(), 2);
        assert_eq!(doc.text_content(roots[0]), ".a > .b { x: \"&amp;\" }");
        assert_eq!(doc.text_content(roots[1]), "after");
    }

    #[test]
    fn test_comments_kept_and_doctype_dropped() {
        let (doc, roots) = parse("<!doctype html><!-- note -->x");
        assert_eq!(roots.len(), 2);
        assert_eq!(
            doc.node(roots[0]).map(|n| &n.data),
            Some(&NodeData::Comment(" note ".into()))
        );
        assert_eq!(doc.text_content(roots[1]), "x");
    }

    #[test]
    fn test_misnested_markup_recovers() {
        let (doc, roots) = parse("<p>a<b>b</i>c</b></p><br>d<span/>e");
        let p = roots[0];
        assert_eq!(doc.inner_html(p), "a<b>bc</b>");
        assert!(doc.element(roots[1]).is_some_and(|el| el.is("br")));
        // `<span/>` is not self-closing in HTML; it wraps the trailing text.
        let span = *roots.last().unwrap();
        assert_eq!(doc.inner_html(span), "e");
    }

    #[test]
    fn test_unterminated_input() {
        let (doc, roots) = parse("<div class=\"x\">open");
        assert_eq!(roots.len(), 1);
        assert_eq!(doc.attribute(roots[0], "class"), Some("x"));
        assert_eq!(doc.text_content(roots[0]), "open");
    }

    #[test]
    fn test_svg_names_adjusted() {
        let (doc, roots) = parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><foreignObject><div class="root">x</div></foreignObject></svg>"#,
        );
        let svg = roots[0];
        let fo = doc.children(svg)[0];
        assert_eq!(doc.element(fo).map(|el| el.name.as_str()), Some("foreignObject"));
        assert_eq!(doc.attribute(svg, "xmlns"), Some("http://www.w3.org/2000/svg"));
        assert!(doc.query_selector(svg, "svg .root").is_some());
    }

    #[test]
    fn test_scratch_nodes_are_released() {
        let mut doc = Document::new();
        let before = doc.node_count();
        let roots = parse_fragment(&mut doc, "<p>x</p>");
        // The `<p>` and its text survive; the scratch html/head/body do not.
        assert_eq!(doc.node_count(), before + 2);
        assert!(doc.parent(roots[0]).is_none());
    }

    #[test]
    fn test_nesting_is_capped() {
        let depth = MAX_TREE_DEPTH * 4;
        let html = format!("{}x{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let (doc, roots) = parse(&html);
        let deepest = doc
            .descendants(roots[0])
            .into_iter()
            .map(|n| doc.ancestors(n).count())
            .max()
            .unwrap();
        assert!(deepest <= MAX_TREE_DEPTH, "{deepest}");
        assert_eq!(doc.text_content(roots[0]), "x");
        assert_eq!(
            doc.descendants(roots[0])
                .into_iter()
                .filter(|&n| doc.element(n).is_some())
                .count(),
            depth - 1
        );
    }
}
