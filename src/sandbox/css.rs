//! Style cascade.
//!
//! Parses the rules the banner sheet and the sandbox head style use and
//! computes the handful of properties layout cares about. Rules with
//! pseudo-classes, pseudo-elements, attribute selectors or child
//! combinators are dropped; `@media (max-width|min-width: Npx)` blocks are
//! evaluated against the surface width.

use std::collections::HashMap;

use cssparser::{Delimiter, ParseError, Parser, ParserInput, Token};

use crate::sandbox::dom::{Document, ElementData, NodeId};

/// Default style applied before author sheets.
pub const USER_AGENT_SHEET: &str = "
head, style, script, title, meta, link { display: none; }
html, body, div, p, svg, foreignObject, section, header, footer, ul, ol, li, h1, h2, h3 { display: block; }
body { margin: 8px; }
p { margin-top: 1em; margin-bottom: 1em; }
code { font-family: monospace; }
";

// ----------------------------------------------------------------------
// Selectors
// ----------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, el: &ElementData) -> bool {
        self.tag.as_deref().is_none_or(|t| el.is(t))
            && self.id.as_deref().is_none_or(|id| el.attr("id") == Some(id))
            && self.classes.iter().all(|c| el.has_class(c))
    }
}

/// Accumulates one complex selector from tokens.
#[derive(Default)]
struct SelectorBuilder {
    parts: Vec<Compound>,
    current: Option<Compound>,
    space: bool,
    unsupported: bool,
}

impl SelectorBuilder {
    /// The compound the next simple selector belongs to. Type and universal
    /// selectors must open a compound.
    fn compound(&mut self, opens: bool) -> Option<&mut Compound> {
        if self.space {
            self.parts.extend(self.current.take());
            self.space = false;
        }
        if opens && self.current.is_some() {
            self.unsupported = true;
            return None;
        }
        Some(self.current.get_or_insert_with(Compound::default))
    }

    fn finish(mut self) -> Option<Selector> {
        self.parts.extend(self.current.take());
        (!self.unsupported && !self.parts.is_empty()).then_some(Selector { parts: self.parts })
    }
}

/// Comma-separated selectors up to the end of `p`. Selectors using
/// unsupported syntax are dropped individually.
fn parse_selector_list(p: &mut Parser<'_, '_>) -> Vec<Selector> {
    let mut selectors = Vec::new();
    let mut builder = SelectorBuilder::default();
    loop {
        let token = match p.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) => builder.space = builder.current.is_some(),
            Token::Comma => {
                selectors.extend(std::mem::take(&mut builder).finish());
            }
            Token::Ident(name) => {
                if let Some(c) = builder.compound(true) {
                    c.tag = Some(name.to_string());
                }
            }
            Token::Delim('*') => {
                builder.compound(true);
            }
            Token::IDHash(name) => {
                if let Some(c) = builder.compound(false) {
                    c.id = Some(name.to_string());
                }
            }
            Token::Delim('.') => {
                let class = p.try_parse(|p| match p.next_including_whitespace() {
                    Ok(Token::Ident(name)) => Ok(name.to_string()),
                    _ => Err(()),
                });
                match (class, builder.compound(false)) {
                    (Ok(class), Some(c)) => c.classes.push(class),
                    _ => builder.unsupported = true,
                }
            }
            _ => builder.unsupported = true,
        }
    }
    selectors.extend(builder.finish());
    selectors
}

/// A chain of compound selectors joined by descendant combinators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    parts: Vec<Compound>,
}

impl Selector {
    /// Parse a single selector. Unsupported syntax yields `None`.
    #[must_use]
    pub fn parse(selector: &str) -> Option<Self> {
        let mut input = ParserInput::new(selector);
        let mut parser = Parser::new(&mut input);
        let mut list = parse_selector_list(&mut parser);
        if list.len() == 1 { list.pop() } else { None }
    }

    /// Whether element `id` matches. Ancestor compounds may match anywhere
    /// up the tree.
    #[must_use]
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some((subject, rest)) = self.parts.split_last() else {
            return false;
        };
        if !doc.element(id).is_some_and(|el| subject.matches(el)) {
            return false;
        }
        let mut ancestors = doc.ancestors(id);
        rest.iter()
            .rev()
            .all(|part| ancestors.any(|a| doc.element(a).is_some_and(|el| part.matches(el))))
    }

    /// Ids weigh 100, classes 10, tags 1.
    #[must_use]
    pub fn specificity(&self) -> u32 {
        self.parts
            .iter()
            .map(|p| {
                u32::from(p.id.is_some()) * 100
                    + p.classes.len() as u32 * 10
                    + u32::from(p.tag.is_some())
            })
            .sum()
    }
}

// ----------------------------------------------------------------------
// Sheets
// ----------------------------------------------------------------------

/// Width condition of an `@media` block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaCondition {
    MaxWidth(f64),
    MinWidth(f64),
}

impl MediaCondition {
    /// `(max-width: Npx)` or `(min-width: Npx)`.
    fn parse<'i>(p: &mut Parser<'i, '_>) -> std::result::Result<Self, ParseError<'i, ()>> {
        p.expect_parenthesis_block()?;
        p.parse_nested_block(|p| {
            let feature = p.expect_ident()?.to_ascii_lowercase();
            p.expect_colon()?;
            let px = match p.next()? {
                Token::Dimension { value, unit, .. } if unit.eq_ignore_ascii_case("px") => {
                    Some(f64::from(*value))
                }
                _ => None,
            };
            match (feature.as_str(), px) {
                ("max-width", Some(px)) => Ok(Self::MaxWidth(px)),
                ("min-width", Some(px)) => Ok(Self::MinWidth(px)),
                _ => Err(p.new_custom_error(())),
            }
        })
    }

    #[must_use]
    pub fn applies(self, viewport_width: f64) -> bool {
        match self {
            Self::MaxWidth(w) => viewport_width <= w,
            Self::MinWidth(w) => viewport_width >= w,
        }
    }
}

/// One style rule.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<(String, String)>,
    pub media: Option<MediaCondition>,
}

/// A parsed style sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleSheet {
    pub rules: Vec<Rule>,
}

/// Consume everything up to `p`'s end.
fn skip_rest<'i>(p: &mut Parser<'i, '_>) -> std::result::Result<(), ParseError<'i, ()>> {
    while p.next().is_ok() {}
    Ok(())
}

fn without_important(value: &str) -> &str {
    let Some(split) = value.rfind('!') else {
        return value;
    };
    if value[split + 1..].trim().eq_ignore_ascii_case("important") {
        value[..split].trim_end()
    } else {
        value
    }
}

/// `name: value` pairs of a declaration block, lowercased names, values as
/// written minus any `!important`.
fn parse_declarations(p: &mut Parser<'_, '_>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    while !p.is_exhausted() {
        let declaration = p.parse_until_after(Delimiter::Semicolon, |p| {
            let name = p.expect_ident()?.to_ascii_lowercase();
            p.expect_colon()?;
            let start = p.position();
            skip_rest(p)?;
            let value = without_important(p.slice_from(start).trim()).to_string();
            Ok::<_, ParseError<'_, ()>>((name, value))
        });
        if let Ok((name, value)) = declaration {
            if !value.is_empty() {
                out.push((name, value));
            }
        }
    }
    out
}

/// Rules up to the end of `input`, appended to `rules`.
fn parse_rules(input: &mut Parser<'_, '_>, media: Option<MediaCondition>, rules: &mut Vec<Rule>) {
    loop {
        input.skip_whitespace();
        let start = input.state();
        let at_rule = match input.next() {
            Err(_) => return,
            Ok(Token::CDO | Token::CDC) => continue,
            Ok(Token::AtKeyword(name)) => Some(name.to_ascii_lowercase()),
            Ok(_) => None,
        };

        if let Some(name) = at_rule {
            let condition = if name == "media" && media.is_none() {
                input
                    .parse_until_before(
                        Delimiter::CurlyBracketBlock | Delimiter::Semicolon,
                        MediaCondition::parse,
                    )
                    .ok()
            } else {
                let _ = input.parse_until_before(
                    Delimiter::CurlyBracketBlock | Delimiter::Semicolon,
                    skip_rest,
                );
                None
            };
            let block = matches!(input.next(), Ok(Token::CurlyBracketBlock));
            if let (true, Some(condition)) = (block, condition) {
                let _ = input.parse_nested_block(|p| {
                    parse_rules(p, Some(condition), rules);
                    Ok::<_, ParseError<'_, ()>>(())
                });
            }
            continue;
        }

        input.reset(&start);
        let selectors = input
            .parse_until_before(Delimiter::CurlyBracketBlock, |p| {
                Ok::<_, ParseError<'_, ()>>(parse_selector_list(p))
            })
            .unwrap_or_default();
        if !matches!(input.next(), Ok(Token::CurlyBracketBlock)) {
            return;
        }
        let declarations = input
            .parse_nested_block(|p| Ok::<_, ParseError<'_, ()>>(parse_declarations(p)))
            .unwrap_or_default();
        if !selectors.is_empty() {
            rules.push(Rule {
                selectors,
                declarations,
                media,
            });
        }
    }
}

impl StyleSheet {
    /// Parse a sheet. Never fails; unknown constructs are skipped.
    #[must_use]
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rules = Vec::new();
        parse_rules(&mut parser, None, &mut rules);
        Self { rules }
    }
}

// ----------------------------------------------------------------------
// Computed values
// ----------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Display {
    None,
    Block,
    #[default]
    Inline,
    InlineBlock,
    Flex,
}

impl Display {
    /// Participates in inline formatting.
    #[must_use]
    pub fn is_inline_level(self) -> bool {
        matches!(self, Self::Inline | Self::InlineBlock)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
}

impl Position {
    /// Removed from normal flow.
    #[must_use]
    pub fn is_out_of_flow(self) -> bool {
        matches!(self, Self::Absolute | Self::Fixed)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
}

/// Resolved box length.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Length {
    Px(f64),
    Percent(f64),
    #[default]
    Auto,
}

impl Length {
    /// Pixels against a containing width; `auto` resolves to zero.
    #[must_use]
    pub fn resolve(self, containing: f64) -> f64 {
        match self {
            Self::Px(px) => px,
            Self::Percent(pct) => containing * pct / 100.0,
            Self::Auto => 0.0,
        }
    }
}

/// Computed `line-height`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum LineHeight {
    #[default]
    Normal,
    Number(f64),
    Px(f64),
}

/// Edge order: top, right, bottom, left.
pub type Edges = [Length; 4];

const ZERO_EDGES: Edges = [Length::Px(0.0); 4];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub position: Position,
    pub flex_direction: FlexDirection,
    /// Font size in px.
    pub font_size: f64,
    pub line_height: LineHeight,
    pub margin: Edges,
    pub padding: Edges,
}

impl ComputedStyle {
    /// Initial values for the root element.
    #[must_use]
    pub fn root(font_size: f64) -> Self {
        Self {
            display: Display::Block,
            position: Position::Static,
            flex_direction: FlexDirection::Row,
            font_size,
            line_height: LineHeight::Normal,
            margin: ZERO_EDGES,
            padding: ZERO_EDGES,
        }
    }

    /// Initial values for a child, inheriting the inherited properties.
    #[must_use]
    pub fn inherit(parent: &Self) -> Self {
        Self {
            display: Display::Inline,
            font_size: parent.font_size,
            line_height: parent.line_height,
            ..Self::root(parent.font_size)
        }
    }

    /// Used line height in px, given the `normal` factor.
    #[must_use]
    pub fn used_line_height(&self, normal: f64) -> f64 {
        match self.line_height {
            LineHeight::Normal => self.font_size * normal,
            LineHeight::Number(n) => self.font_size * n,
            LineHeight::Px(px) => px,
        }
    }
}

/// A single length token resolved against `em` (element font size) and
/// `rem`.
fn length_token(token: &Token<'_>, em: f64, rem: f64) -> Option<Length> {
    match token {
        Token::Ident(ident) if ident.eq_ignore_ascii_case("auto") => Some(Length::Auto),
        Token::Number { value, .. } if *value == 0.0 => Some(Length::Px(0.0)),
        Token::Percentage { unit_value, .. } => Some(Length::Percent(f64::from(*unit_value) * 100.0)),
        Token::Dimension { value, unit, .. } => {
            let value = f64::from(*value);
            match unit.to_ascii_lowercase().as_str() {
                "px" => Some(Length::Px(value)),
                "em" => Some(Length::Px(value * em)),
                "rem" => Some(Length::Px(value * rem)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Every token of `value` as a length, or `None` if any is not one.
fn parse_lengths(value: &str, em: f64, rem: f64) -> Option<Vec<Length>> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut lengths = Vec::new();
    while let Ok(token) = parser.next() {
        lengths.push(length_token(token, em, rem)?);
    }
    Some(lengths)
}

fn parse_length(value: &str, em: f64, rem: f64) -> Option<Length> {
    match parse_lengths(value, em, rem)?.as_slice() {
        [length] => Some(*length),
        _ => None,
    }
}

fn parse_edges(value: &str, em: f64, rem: f64) -> Option<Edges> {
    match parse_lengths(value, em, rem)?.as_slice() {
        [a] => Some([*a; 4]),
        [v, h] => Some([*v, *h, *v, *h]),
        [t, h, b] => Some([*t, *h, *b, *h]),
        [t, r, b, l] => Some([*t, *r, *b, *l]),
        _ => None,
    }
}

fn parse_line_height(value: &str, em: f64, rem: f64) -> Option<LineHeight> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let line_height = match parser.next().ok()? {
        Token::Ident(ident) if ident.eq_ignore_ascii_case("normal") => LineHeight::Normal,
        Token::Number { value, .. } => LineHeight::Number(f64::from(*value)),
        token => match length_token(token, em, rem)? {
            Length::Px(px) => LineHeight::Px(px),
            Length::Percent(pct) => LineHeight::Px(em * pct / 100.0),
            Length::Auto => return None,
        },
    };
    parser.is_exhausted().then_some(line_height)
}

fn edge_index(side: &str) -> Option<usize> {
    match side {
        "top" => Some(0),
        "right" => Some(1),
        "bottom" => Some(2),
        "left" => Some(3),
        _ => None,
    }
}

/// Cascade over a document: user agent sheet, then every `<style>` element in
/// document order.
#[derive(Clone, Debug)]
pub struct Cascade {
    sheets: Vec<StyleSheet>,
    viewport_width: f64,
    root_font_size: f64,
}

impl Cascade {
    #[must_use]
    pub fn for_document(doc: &Document, viewport_width: f64, root_font_size: f64) -> Self {
        let mut sheets = vec![StyleSheet::parse(USER_AGENT_SHEET)];
        for style in doc.query_selector_all(doc.root(), "style") {
            sheets.push(StyleSheet::parse(&doc.text_content(style)));
        }
        Self {
            sheets,
            viewport_width,
            root_font_size,
        }
    }

    /// Winning declarations for an element, by property name.
    fn declared(&self, doc: &Document, id: NodeId) -> HashMap<String, String> {
        let mut matched: Vec<(usize, u32, usize, &(String, String))> = Vec::new();
        let mut order = 0usize;
        for (origin, sheet) in self.sheets.iter().enumerate() {
            let origin = origin.min(1);
            for rule in &sheet.rules {
                order += 1;
                if rule.media.is_some_and(|m| !m.applies(self.viewport_width)) {
                    continue;
                }
                let Some(specificity) = rule
                    .selectors
                    .iter()
                    .filter(|s| s.matches(doc, id))
                    .map(Selector::specificity)
                    .max()
                else {
                    continue;
                };
                for decl in &rule.declarations {
                    matched.push((origin, specificity, order, decl));
                }
            }
        }
        matched.sort_by_key(|&(origin, specificity, order, _)| (origin, specificity, order));
        matched
            .into_iter()
            .map(|(_, _, _, (name, value))| (name.clone(), value.clone()))
            .collect()
    }

    /// Compute the style of element `id` given its parent's computed style.
    #[must_use]
    pub fn compute(&self, doc: &Document, id: NodeId, parent: &ComputedStyle) -> ComputedStyle {
        let declared = self.declared(doc, id);
        let mut style = ComputedStyle::inherit(parent);
        let rem = self.root_font_size;

        if let Some(value) = declared.get("font-size") {
            match parse_length(value, parent.font_size, rem) {
                Some(Length::Px(px)) => style.font_size = px,
                Some(Length::Percent(pct)) => style.font_size = parent.font_size * pct / 100.0,
                _ => {}
            }
        }
        let em = style.font_size;

        let mut names: Vec<&String> = declared.keys().collect();
        // Shorthands first so longhands override them.
        names.sort_by_key(|n| (n.contains('-') && (n.starts_with("margin") || n.starts_with("padding")), n.as_str()));
        for name in names {
            let value = declared[name].as_str();
            match name.as_str() {
                "display" => {
                    style.display = match value {
                        "none" => Display::None,
                        "block" => Display::Block,
                        "inline" => Display::Inline,
                        "inline-block" => Display::InlineBlock,
                        "flex" => Display::Flex,
                        _ => style.display,
                    };
                }
                "position" => {
                    style.position = match value {
                        "relative" => Position::Relative,
                        "absolute" => Position::Absolute,
                        "fixed" => Position::Fixed,
                        "static" => Position::Static,
                        _ => style.position,
                    };
                }
                "flex-direction" => {
                    style.flex_direction = if value.starts_with("column") {
                        FlexDirection::Column
                    } else {
                        FlexDirection::Row
                    };
                }
                "line-height" => {
                    if let Some(line_height) = parse_line_height(value, em, rem) {
                        style.line_height = line_height;
                    }
                }
                "margin" => {
                    if let Some(edges) = parse_edges(value, em, rem) {
                        style.margin = edges;
                    }
                }
                "padding" => {
                    if let Some(edges) = parse_edges(value, em, rem) {
                        style.padding = edges;
                    }
                }
                other => {
                    let (target, side) = if let Some(side) = other.strip_prefix("margin-") {
                        (&mut style.margin, side)
                    } else if let Some(side) = other.strip_prefix("padding-") {
                        (&mut style.padding, side)
                    } else {
                        continue;
                    };
                    if let (Some(idx), Some(len)) = (edge_index(side), parse_length(value, em, rem)) {
                        target[idx] = len;
                    }
                }
            }
        }
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_specificity() {
        assert_eq!(Selector::parse(".text").unwrap().specificity(), 10);
        assert_eq!(Selector::parse("svg .icon").unwrap().specificity(), 11);
        assert_eq!(Selector::parse("p#x.a.b").unwrap().specificity(), 121);
        assert!(Selector::parse(".").is_none());
        assert!(Selector::parse("a[b]").is_none());
    }

    #[test]
    fn test_parse_media_and_pseudo() {
        let sheet = StyleSheet::parse(
            "/* c */ .a { color: red; } .a::before { content: \"\"; }\n\
             @media (max-width: 350px) { .icon { display: none; } }\n\
             ::selection { color: inherit; } [contenteditable=\"true\"]:focus { outline: none; }",
        );
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[1].media, Some(MediaCondition::MaxWidth(350.0)));
        assert!(MediaCondition::MaxWidth(350.0).applies(300.0));
        assert!(!MediaCondition::MaxWidth(350.0).applies(351.0));
    }

    #[test]
    fn test_edges_shorthand() {
        let edges = parse_edges("0 0.4em 0 0.5em", 32.0, 16.0).unwrap();
        let Length::Px(right) = edges[1] else {
            panic!("{edges:?}");
        };
        assert!((right - 12.8).abs() < 1e-5);
        assert_eq!(edges[3], Length::Px(16.0));
        assert_eq!(parse_edges("1px 2px", 16.0, 16.0).unwrap()[2], Length::Px(1.0));
    }

    #[test]
    fn test_cascade_breakpoint_and_longhand() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_inner_html(
            body,
            "<style>.text { font-size: 1em; margin-right: 0.75em; line-height: 1.3; }\
             @media (max-width: 544px) { .text { font-size: 0.8em; } }</style>\
             <p class=\"text\">x</p>",
        );
        let p = doc.query_selector(body, ".text").unwrap();
        let root = ComputedStyle::root(16.0);

        let wide = Cascade::for_document(&doc, 600.0, 16.0).compute(&doc, p, &root);
        assert_eq!(wide.display, Display::Block);
        assert_eq!(wide.font_size, 16.0);
        assert_eq!(wide.margin[0], Length::Px(16.0));
        assert_eq!(wide.margin[1], Length::Px(12.0));
        assert!(matches!(wide.line_height, LineHeight::Number(n) if (n - 1.3).abs() < 1e-6));

        let narrow = Cascade::for_document(&doc, 300.0, 16.0).compute(&doc, p, &root);
        assert!((narrow.font_size - 12.8).abs() < 1e-5);
        assert!((narrow.used_line_height(1.2) - 16.64).abs() < 1e-5);
    }

    #[test]
    fn test_declarations_skip_important_and_junk() {
        let sheet = StyleSheet::parse(
            "@import url(x.css); .a { margin: 0 !important; ; bogus; color: rgb(1, 2, 3) } \
             .b, p > q, .c { display: none }",
        );
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(
            sheet.rules[0].declarations,
            vec![
                ("margin".to_string(), "0".to_string()),
                ("color".to_string(), "rgb(1, 2, 3)".to_string()),
            ]
        );
        // The child combinator drops only its own selector.
        assert_eq!(sheet.rules[1].selectors.len(), 2);
        assert_eq!(parse_length("1.5rem", 10.0, 20.0), Some(Length::Px(30.0)));
        assert_eq!(parse_length("50%", 10.0, 20.0), Some(Length::Percent(50.0)));
        assert_eq!(parse_length("2vw", 10.0, 20.0), None);
        assert_eq!(parse_line_height("normal", 16.0, 16.0), Some(LineHeight::Normal));
    }

    #[test]
    fn test_unknown_elements_are_inline() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_inner_html(body, "<span>x</span>");
        let span = doc.query_selector(body, "span").unwrap();
        let cascade = Cascade::for_document(&doc, 300.0, 16.0);
        let style = cascade.compute(&doc, span, &ComputedStyle::root(16.0));
        assert_eq!(style.display, Display::Inline);
    }
}
