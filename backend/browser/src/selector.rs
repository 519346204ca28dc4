//! CSS Selector Queries
//!
//! A small selector engine covering what overlay detection and delegated click
//! matching need: type/universal, `#id`, `.class`, attribute operators,
//! descendant and child combinators, and comma-separated lists.

use std::fmt;
use std::str::FromStr;

use crate::dom::{Document, NodeId};
use crate::error::SelectorError;

/// A parsed, comma-separated selector list. Matches if any member matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    /// `parts[i].0` links `parts[i - 1]` to `parts[i]`; the first combinator is unused.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: Option<(AttrOp, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Prefix,
    Suffix,
    Substring,
    Includes,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let selectors = split_list(trimmed)
            .into_iter()
            .map(|part| Parser::new(input, part).parse_complex())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: trimmed.to_string(),
            selectors,
        })
    }

    /// The selector text as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the element `node` matches any selector in the list.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if doc.element(node).is_none() {
            return false;
        }
        self.selectors
            .iter()
            .any(|s| s.matches_at(doc, s.parts.len() - 1, node))
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl ComplexSelector {
    fn matches_at(&self, doc: &Document, index: usize, node: NodeId) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent_element(node)
                .is_some_and(|parent| self.matches_at(doc, index - 1, parent)),
            Combinator::Descendant => {
                let mut current = doc.parent_element(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, index - 1, ancestor) {
                        return true;
                    }
                    current = doc.parent_element(ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if tag != "*" && tag != el.tag() {
                return false;
            }
        }
        if !self.ids.iter().all(|id| el.attr("id") == Some(id.as_str())) {
            return false;
        }
        if !self.classes.iter().all(|class| el.has_class(class)) {
            return false;
        }
        self.attrs.iter().all(|attr| attr.matches(el.attr(&attr.name)))
    }
}

impl AttrSelector {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let Some((op, expected)) = &self.op else {
            return true;
        };
        match op {
            AttrOp::Equals => actual == expected,
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected.as_str()),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected.as_str()),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected.as_str()),
            AttrOp::Includes => actual.split_whitespace().any(|word| word == expected),
        }
    }
}

/// Split on top-level commas, ignoring commas inside brackets or quotes.
fn split_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

struct Parser<'a> {
    full: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(full: &'a str, part: &str) -> Self {
        Self {
            full,
            chars: part.trim().chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            found,
            position: self.pos,
            selector: self.full.to_string(),
        }
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        if self.chars.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            let compound = self.parse_compound()?;
            parts.push((combinator, compound));

            let saw_ws = self.skip_ws();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    combinator = Combinator::Child;
                }
                Some(_) if saw_ws => combinator = Combinator::Descendant,
                Some(c) => return Err(self.unexpected(c)),
            }
        }
        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => {
                self.bump();
                compound.tag = Some("*".into());
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => return Err(SelectorError::Unsupported(self.full.to_string())),
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::Empty,
            });
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::Empty,
            });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match self.bump() {
            Some(']') => return Ok(AttrSelector { name, op: None }),
            Some('=') => AttrOp::Equals,
            Some(c @ ('^' | '$' | '*' | '~')) => {
                if self.bump() != Some('=') {
                    return Err(self.unexpected(c));
                }
                match c {
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    _ => AttrOp::Includes,
                }
            }
            Some(c) => return Err(self.unexpected(c)),
            None => return Err(SelectorError::UnterminatedAttribute(self.full.to_string())),
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while self.peek().is_some_and(|c| c != q) {
                    self.pos += 1;
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                if self.bump() != Some(q) {
                    return Err(SelectorError::UnterminatedAttribute(self.full.to_string()));
                }
                value
            }
            _ => self.parse_ident()?,
        };

        self.skip_ws();
        if self.bump() != Some(']') {
            return Err(SelectorError::UnterminatedAttribute(self.full.to_string()));
        }
        Ok(AttrSelector {
            name,
            op: Some((op, value)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeSpec;

    fn doc() -> Document {
        let root = NodeSpec::element(1, "html").child(
            NodeSpec::element(2, "body")
                .child(
                    NodeSpec::element(3, "div")
                        .attr("class", "modal fade show")
                        .attr("role", "dialog")
                        .child(
                            NodeSpec::element(4, "div")
                                .attr("id", "pnlHeading")
                                .child(NodeSpec::element(5, "h1").child(NodeSpec::text(6, "Doc"))),
                        ),
                )
                .child(
                    NodeSpec::element(7, "a")
                        .attr("href", "#rpShowDynamicModalDocument-42")
                        .attr("class", "rp-search-result-heading"),
                ),
        );
        Document::new("https://a.test/", root).unwrap()
    }

    #[test]
    fn matches_compound_selectors() {
        let doc = doc();
        let sel = SelectorList::parse(".modal.show").unwrap();
        assert!(sel.matches(&doc, 3));
        assert!(!sel.matches(&doc, 4));

        assert!(SelectorList::parse("div[role=\"dialog\"]").unwrap().matches(&doc, 3));
        assert!(SelectorList::parse("[role=dialog]").unwrap().matches(&doc, 3));
        assert!(SelectorList::parse("*").unwrap().matches(&doc, 2));
    }

    #[test]
    fn matches_descendant_and_child_combinators() {
        let doc = doc();
        assert!(SelectorList::parse("#pnlHeading h1").unwrap().matches(&doc, 5));
        assert!(SelectorList::parse(".modal h1").unwrap().matches(&doc, 5));
        assert!(SelectorList::parse("#pnlHeading > h1").unwrap().matches(&doc, 5));
        assert!(!SelectorList::parse(".modal > h1").unwrap().matches(&doc, 5));
    }

    #[test]
    fn matches_attribute_operators() {
        let doc = doc();
        let list = SelectorList::parse(
            "a[href^=\"#rpShowDynamicModalDocument-\"] , a.rp-search-result-heading",
        )
        .unwrap();
        assert!(list.matches(&doc, 7));
        assert!(SelectorList::parse("a[href$='-42']").unwrap().matches(&doc, 7));
        assert!(SelectorList::parse("a[href*=Dynamic]").unwrap().matches(&doc, 7));
        assert!(SelectorList::parse("div[class~=fade]").unwrap().matches(&doc, 3));
        assert!(!SelectorList::parse("div[class~=fad]").unwrap().matches(&doc, 3));
    }

    #[test]
    fn text_nodes_never_match() {
        let doc = doc();
        assert!(!SelectorList::parse("*").unwrap().matches(&doc, 6));
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!(matches!(SelectorList::parse("  "), Err(SelectorError::Empty)));
        assert!(matches!(
            SelectorList::parse("a[href"),
            Err(SelectorError::UnterminatedAttribute(_))
        ));
        assert!(matches!(
            SelectorList::parse("a:hover"),
            Err(SelectorError::Unsupported(_))
        ));
        assert!(SelectorList::parse(".modal,").is_err());
        assert!(SelectorList::parse("div >").is_err());
    }
}
