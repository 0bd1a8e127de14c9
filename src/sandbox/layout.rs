//! Box layout for sandbox documents.
//!
//! Block and flex formatting are delegated to [`taffy`]: every in-flow
//! block-level element becomes a taffy node, and each run of inline content
//! becomes a measured leaf. Inline formatting stays here: whitespace
//! collapsing and greedy word wrapping over glyph advances from
//! [`FontMetrics`], where each display column of a grapheme advances the pen
//! by `advance_em` times the font size.
//!
//! Words are never broken inside; a word wider than its line overflows. Every
//! walk over the document is iterative.

use std::collections::HashMap;

use taffy::style_helpers::{auto, length, percent, zero};
use taffy::{AvailableSpace, Size, TaffyError, TaffyTree};
use tracing::warn;

use crate::sandbox::css::{Cascade, ComputedStyle, Display, FlexDirection, Length};
use crate::sandbox::dom::{Document, NodeData, NodeId};
use crate::unicode::{WidthMethod, advance_columns, graphemes, is_wide};

/// Tolerance for line-fit comparisons. Widths round-trip through `f32`.
const FIT_EPSILON: f64 = 1e-3;

/// Text measurement parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontMetrics {
    /// Root font size in px.
    pub base_font_px: f64,
    /// Advance of one display column, in em.
    pub advance_em: f64,
    /// `line-height: normal` factor.
    pub normal_line_height: f64,
    /// Column width rule for ambiguous-width characters.
    pub width_method: WidthMethod,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            base_font_px: 16.0,
            advance_em: 0.5,
            normal_line_height: 1.2,
            width_method: WidthMethod::WcWidth,
        }
    }
}

impl FontMetrics {
    /// Width in px of `text` at `font_size`.
    #[must_use]
    pub fn advance(&self, text: &str, font_size: f64) -> f64 {
        advance_columns(text, self.width_method) as f64 * self.advance_em * font_size
    }
}

/// A laid-out box in surface coordinates (px).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Result of laying out a document.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    boxes: HashMap<NodeId, Rect>,
}

impl Layout {
    /// Padding box of an element that generated a block-level box.
    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<Rect> {
        self.boxes.get(&node).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Lay out `doc` in a viewport `viewport_width` px wide.
///
/// A layout failure is logged and yields an empty [`Layout`].
#[must_use]
pub fn layout(doc: &Document, viewport_width: f64, metrics: &FontMetrics) -> Layout {
    match try_layout(doc, viewport_width.max(0.0), metrics) {
        Ok(layout) => layout,
        Err(error) => {
            warn!(%error, "layout failed");
            Layout::default()
        }
    }
}

fn try_layout(doc: &Document, width: f64, metrics: &FontMetrics) -> Result<Layout, TaffyError> {
    let cascade = Cascade::for_document(doc, width, metrics.base_font_px);
    let mut engine = Engine {
        doc,
        metrics,
        styles: compute_styles(doc, &cascade, metrics),
        tree: TaffyTree::new(),
        nodes: HashMap::new(),
    };
    engine.tree.disable_rounding();

    let html = doc.document_element();
    let root = engine.build(html)?;
    let mut root_style = engine.tree.style(root)?.clone();
    root_style.size.width = length(width as f32);
    engine.tree.set_style(root, root_style)?;

    let available = Size {
        width: AvailableSpace::Definite(width as f32),
        height: AvailableSpace::MaxContent,
    };
    engine
        .tree
        .compute_layout_with_measure(root, available, |known, available, _, run, _| {
            run.map_or(Size::ZERO, |run| run.measure(known, available))
        })?;
    engine.boxes(html)
}

/// Computed styles of every rendered element, parents before children.
fn compute_styles(
    doc: &Document,
    cascade: &Cascade,
    metrics: &FontMetrics,
) -> HashMap<NodeId, ComputedStyle> {
    let mut styles = HashMap::new();
    let mut stack = vec![(doc.document_element(), ComputedStyle::root(metrics.base_font_px))];
    while let Some((id, parent)) = stack.pop() {
        let style = cascade.compute(doc, id, &parent);
        styles.insert(id, style);
        if style.display == Display::None {
            continue;
        }
        stack.extend(
            doc.children(id)
                .iter()
                .rev()
                .filter(|&&child| doc.element(child).is_some())
                .map(|&child| (child, style)),
        );
    }
    styles
}

// ----------------------------------------------------------------------
// Inline content
// ----------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
enum Item {
    Word { width: f64, line_height: f64 },
    Space { width: f64 },
    /// `<br>`: always ends the line, even an empty one.
    HardBreak { line_height: f64 },
    /// Block boundary inside inline content: ends a non-empty line.
    SoftBreak,
}

#[derive(Default)]
struct ItemBuilder {
    items: Vec<Item>,
    word: Option<(f64, f64)>,
    space_pending: Option<f64>,
}

impl ItemBuilder {
    fn flush_word(&mut self) {
        if let Some((width, line_height)) = self.word.take() {
            if let Some(space) = self.space_pending.take() {
                self.items.push(Item::Space { width: space });
            }
            self.items.push(Item::Word { width, line_height });
        }
    }

    fn extend_word(&mut self, width: f64, line_height: f64) {
        let word = self.word.get_or_insert((0.0, 0.0));
        word.0 += width;
        word.1 = word.1.max(line_height);
    }

    fn space(&mut self, width: f64) {
        self.flush_word();
        if self.space_pending.is_none() {
            self.space_pending = Some(width);
        }
    }

    fn hard_break(&mut self, line_height: f64) {
        self.flush_word();
        self.space_pending = None;
        self.items.push(Item::HardBreak { line_height });
    }

    fn soft_break(&mut self) {
        self.flush_word();
        self.space_pending = None;
        self.items.push(Item::SoftBreak);
    }

    fn finish(mut self) -> Vec<Item> {
        self.flush_word();
        self.items
    }
}

fn is_collapsible_space(g: &str) -> bool {
    g.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{c}'))
}

/// Line heights of greedily wrapped `items` at `available` width.
fn break_lines(items: &[Item], available: f64, strut: f64) -> Vec<f64> {
    let mut lines = Vec::new();
    let mut width = 0.0;
    let mut height = strut;
    let mut has_content = false;
    let mut pending_space = 0.0;

    for item in items {
        match *item {
            Item::Space { width: w } => {
                if has_content {
                    pending_space = w;
                }
            }
            Item::Word {
                width: w,
                line_height,
            } => {
                if has_content && width + pending_space + w > available + FIT_EPSILON {
                    lines.push(height);
                    width = w;
                    height = strut.max(line_height);
                } else {
                    width += if has_content { pending_space } else { 0.0 } + w;
                    height = height.max(line_height);
                }
                has_content = true;
                pending_space = 0.0;
            }
            Item::HardBreak { line_height } => {
                lines.push(height.max(line_height));
                width = 0.0;
                height = strut;
                has_content = false;
                pending_space = 0.0;
            }
            Item::SoftBreak => {
                if has_content {
                    lines.push(height);
                }
                width = 0.0;
                height = strut;
                has_content = false;
                pending_space = 0.0;
            }
        }
    }
    if has_content {
        lines.push(height);
    }
    lines
}

/// `(min-content, max-content)` widths of `items`.
fn intrinsic_widths(items: &[Item]) -> (f64, f64) {
    let mut min: f64 = 0.0;
    let mut max: f64 = 0.0;
    let mut line = 0.0;
    let mut has_content = false;
    let mut pending_space = 0.0;
    for item in items {
        match *item {
            Item::Word { width, .. } => {
                min = min.max(width);
                line += if has_content { pending_space } else { 0.0 } + width;
                has_content = true;
                pending_space = 0.0;
            }
            Item::Space { width } => pending_space = width,
            Item::HardBreak { .. } | Item::SoftBreak => {
                max = max.max(line);
                line = 0.0;
                has_content = false;
                pending_space = 0.0;
            }
        }
    }
    (min, max.max(line))
}

/// Inline content of one anonymous box, measured by taffy.
#[derive(Clone, Debug, Default)]
struct InlineRun {
    items: Vec<Item>,
    /// Line height of the containing block.
    strut: f64,
}

impl InlineRun {
    fn measure(&self, known: Size<Option<f32>>, available: Size<AvailableSpace>) -> Size<f32> {
        let width = known.width.unwrap_or_else(|| {
            let (min, max) = intrinsic_widths(&self.items);
            let width = match available.width {
                AvailableSpace::MinContent => min,
                AvailableSpace::MaxContent => max,
                AvailableSpace::Definite(limit) => max.min(f64::from(limit)).max(min),
            };
            width as f32
        });
        let height = known.height.unwrap_or_else(|| {
            break_lines(&self.items, f64::from(width), self.strut)
                .iter()
                .sum::<f64>() as f32
        });
        Size { width, height }
    }
}

// ----------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------

struct Engine<'a> {
    doc: &'a Document,
    metrics: &'a FontMetrics,
    styles: HashMap<NodeId, ComputedStyle>,
    tree: TaffyTree<InlineRun>,
    /// Taffy node of every element that generated a block-level box.
    nodes: HashMap<NodeId, taffy::NodeId>,
}

enum Child {
    Block(NodeId),
    Inline(Vec<NodeId>),
}

/// Pending work while flattening inline content.
enum Walk {
    Node(NodeId),
    /// End of an inline element: its right margin and padding.
    Close { right: f64, line_height: f64 },
    /// End of a block nested in inline content.
    Break,
}

fn length_percentage_auto(length_value: Length) -> taffy::LengthPercentageAuto {
    match length_value {
        Length::Px(px) => length(px as f32),
        Length::Percent(pct) => percent((pct / 100.0) as f32),
        Length::Auto => auto(),
    }
}

fn length_percentage(length_value: Length) -> taffy::LengthPercentage {
    match length_value {
        Length::Px(px) => length(px as f32),
        Length::Percent(pct) => percent((pct / 100.0) as f32),
        Length::Auto => zero(),
    }
}

impl Engine<'_> {
    fn style(&self, id: NodeId) -> ComputedStyle {
        self.styles
            .get(&id)
            .copied()
            .unwrap_or_else(|| ComputedStyle::root(self.metrics.base_font_px))
    }

    /// Style governing a node: its own for elements, its parent's for text.
    fn governing_style(&self, id: NodeId) -> ComputedStyle {
        match self.doc.element(id) {
            Some(_) => self.style(id),
            None => self
                .doc
                .parent(id)
                .map_or_else(|| self.style(id), |p| self.style(p)),
        }
    }

    fn is_block_level(&self, id: NodeId) -> bool {
        self.doc.element(id).is_some() && !self.style(id).display.is_inline_level()
    }

    fn is_skipped(&self, id: NodeId) -> bool {
        match self.doc.node(id).map(|n| &n.data) {
            Some(NodeData::Element(_)) => {
                let style = self.style(id);
                style.display == Display::None || style.position.is_out_of_flow()
            }
            Some(NodeData::Text(_)) => false,
            _ => true,
        }
    }

    /// In-flow children grouped into block boxes and inline runs.
    fn group_children(&self, id: NodeId) -> Vec<Child> {
        let mut out = Vec::new();
        let mut run = Vec::new();
        for &child in self.doc.children(id) {
            if self.is_skipped(child) {
                continue;
            }
            if self.is_block_level(child) {
                if !run.is_empty() {
                    out.push(Child::Inline(std::mem::take(&mut run)));
                }
                out.push(Child::Block(child));
            } else {
                run.push(child);
            }
        }
        if !run.is_empty() {
            out.push(Child::Inline(run));
        }
        out
    }

    fn box_style(&self, id: NodeId) -> taffy::Style {
        let style = self.style(id);
        let (display, flex_direction) = match (style.display, style.flex_direction) {
            (Display::Flex, FlexDirection::Row) => (taffy::Display::Flex, taffy::FlexDirection::Row),
            (Display::Flex, FlexDirection::Column) => {
                (taffy::Display::Flex, taffy::FlexDirection::Column)
            }
            _ => (taffy::Display::Block, taffy::FlexDirection::Row),
        };
        let [top, right, bottom, left] = style.margin;
        let margin = taffy::Rect {
            left: length_percentage_auto(left),
            right: length_percentage_auto(right),
            top: length_percentage_auto(top),
            bottom: length_percentage_auto(bottom),
        };
        let [top, right, bottom, left] = style.padding;
        let padding = taffy::Rect {
            left: length_percentage(left),
            right: length_percentage(right),
            top: length_percentage(top),
            bottom: length_percentage(bottom),
        };
        taffy::Style {
            display,
            flex_direction,
            margin,
            padding,
            ..taffy::Style::default()
        }
    }

    // ------------------------------------------------------------------
    // Inline items
    // ------------------------------------------------------------------

    fn inline_items(&self, nodes: &[NodeId]) -> Vec<Item> {
        let mut builder = ItemBuilder::default();
        let mut stack: Vec<Walk> = nodes.iter().rev().map(|&id| Walk::Node(id)).collect();
        while let Some(step) = stack.pop() {
            let id = match step {
                Walk::Node(id) => id,
                Walk::Close { right, line_height } => {
                    if right != 0.0 {
                        builder.extend_word(right, line_height);
                    }
                    continue;
                }
                Walk::Break => {
                    builder.soft_break();
                    continue;
                }
            };
            let Some(node) = self.doc.node(id) else {
                continue;
            };
            let el = match &node.data {
                NodeData::Text(text) => {
                    self.collect_text(id, text, &mut builder);
                    continue;
                }
                NodeData::Element(el) if !self.is_skipped(id) => el,
                _ => continue,
            };
            let style = self.style(id);
            let line_height = style.used_line_height(self.metrics.normal_line_height);
            if el.is("br") {
                builder.hard_break(line_height);
                continue;
            }
            if style.display.is_inline_level() {
                let left = style.margin[3].resolve(0.0) + style.padding[3].resolve(0.0);
                let right = style.margin[1].resolve(0.0) + style.padding[1].resolve(0.0);
                if left != 0.0 {
                    builder.extend_word(left, line_height);
                }
                stack.push(Walk::Close { right, line_height });
            } else {
                builder.soft_break();
                stack.push(Walk::Break);
            }
            stack.extend(node.children.iter().rev().map(|&c| Walk::Node(c)));
        }
        builder.finish()
    }

    fn collect_text(&self, id: NodeId, text: &str, builder: &mut ItemBuilder) {
        let style = self.governing_style(id);
        let font = style.font_size;
        let line_height = style.used_line_height(self.metrics.normal_line_height);
        for g in graphemes(text) {
            if is_collapsible_space(g) {
                builder.space(self.metrics.advance(" ", font));
            } else if is_wide(g, self.metrics.width_method) {
                builder.flush_word();
                builder.extend_word(self.metrics.advance(g, font), line_height);
                builder.flush_word();
            } else {
                builder.extend_word(self.metrics.advance(g, font), line_height);
            }
        }
    }

    // ------------------------------------------------------------------
    // Box tree
    // ------------------------------------------------------------------

    /// Build taffy nodes for `root` and every block-level box below it,
    /// children before parents.
    fn build(&mut self, root: NodeId) -> Result<taffy::NodeId, TaffyError> {
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if !expanded {
                stack.push((id, true));
                for &child in self.doc.children(id) {
                    if !self.is_skipped(child) && self.is_block_level(child) {
                        stack.push((child, false));
                    }
                }
                continue;
            }
            let strut = self
                .style(id)
                .used_line_height(self.metrics.normal_line_height);
            let mut children = Vec::new();
            for group in self.group_children(id) {
                match group {
                    Child::Block(child) => children.extend(self.nodes.get(&child).copied()),
                    Child::Inline(run) => {
                        let items = self.inline_items(&run);
                        if items.is_empty() {
                            continue;
                        }
                        let leaf = self
                            .tree
                            .new_leaf_with_context(taffy::Style::default(), InlineRun { items, strut })?;
                        children.push(leaf);
                    }
                }
            }
            let node = self.tree.new_with_children(self.box_style(id), &children)?;
            self.nodes.insert(id, node);
        }
        match self.nodes.get(&root) {
            Some(&node) => Ok(node),
            None => self.tree.new_leaf(self.box_style(root)),
        }
    }

    /// Absolute padding boxes of every built element, from `root` down.
    fn boxes(&self, root: NodeId) -> Result<Layout, TaffyError> {
        let mut boxes = HashMap::with_capacity(self.nodes.len());
        let mut stack = vec![(root, 0.0, 0.0)];
        while let Some((id, origin_x, origin_y)) = stack.pop() {
            let Some(&node) = self.nodes.get(&id) else {
                continue;
            };
            let placed = self.tree.layout(node)?;
            let x = origin_x + f64::from(placed.location.x);
            let y = origin_y + f64::from(placed.location.y);
            let rect = Rect::new(x, y, f64::from(placed.size.width), f64::from(placed.size.height));
            boxes.insert(id, rect);
            stack.extend(self.doc.children(id).iter().map(|&child| (child, x, y)));
        }
        Ok(Layout { boxes })
    }
}
