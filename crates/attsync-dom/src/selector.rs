//! Minimal CSS selector support.
//!
//! Supports compound selectors (`tag`, `*`, `.class`, `[attr]`, `[attr=value]`,
//! `[attr^=value]`) joined by descendant (whitespace) and child (`>`)
//! combinators. This covers every lookup the widget markup needs.

use std::iter::Peekable;
use std::str::Chars;

use crate::document::{Document, NodeId};
use crate::error::DomError;

/// Relationship between a compound selector and the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrMatch {
    Exists,
    Equals(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrMatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(tag) = doc.tag(id) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(id, c)) {
            return false;
        }
        self.attrs.iter().all(|a| {
            let value = doc.attr(id, &a.name);
            match &a.op {
                AttrMatch::Exists => value.is_some(),
                AttrMatch::Equals(expected) => value == Some(expected.as_str()),
                AttrMatch::Prefix(prefix) => value.is_some_and(|v| v.starts_with(prefix.as_str())),
            }
        })
    }
}

/// Parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Compound selectors with the combinator that links each to its predecessor.
    steps: Vec<(Combinator, Compound)>,
}

impl Selector {
    /// Parse a selector.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::Selector`] on empty input, dangling combinators or
    /// malformed attribute selectors.
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let error = |message: &'static str| DomError::Selector {
            selector: input.to_owned(),
            message,
        };

        let mut chars = input.chars().peekable();
        let mut steps = Vec::new();
        let mut pending: Option<Combinator> = None;

        loop {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            match chars.peek() {
                None => break,
                Some('>') => {
                    if steps.is_empty() || pending.is_some() {
                        return Err(error("unexpected '>'"));
                    }
                    chars.next();
                    pending = Some(Combinator::Child);
                }
                Some(_) => {
                    let compound = parse_compound(&mut chars).map_err(error)?;
                    steps.push((pending.take().unwrap_or(Combinator::Descendant), compound));
                }
            }
        }

        if steps.is_empty() {
            return Err(error("empty selector"));
        }
        if pending.is_some() {
            return Err(error("dangling '>'"));
        }
        Ok(Self { steps })
    }

    /// Whether the element matches this selector.
    #[must_use]
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        matches_steps(doc, id, &self.steps)
    }
}

fn matches_steps(doc: &Document, id: NodeId, steps: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), rest)) = steps.split_last() else {
        return true;
    };
    if !compound.matches(doc, id) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match combinator {
        Combinator::Child => doc
            .parent_element(id)
            .is_some_and(|parent| matches_steps(doc, parent, rest)),
        Combinator::Descendant => {
            let mut ancestor = doc.parent_element(id);
            while let Some(candidate) = ancestor {
                if matches_steps(doc, candidate, rest) {
                    return true;
                }
                ancestor = doc.parent_element(candidate);
            }
            false
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn parse_compound(chars: &mut Peekable<Chars<'_>>) -> Result<Compound, &'static str> {
    let mut compound = Compound::default();

    if chars.peek() == Some(&'*') {
        chars.next();
    } else {
        let tag = parse_ident(chars);
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
    }

    loop {
        match chars.peek() {
            Some('.') => {
                chars.next();
                let class = parse_ident(chars);
                if class.is_empty() {
                    return Err("empty class name");
                }
                compound.classes.push(class);
            }
            Some('[') => {
                chars.next();
                compound.attrs.push(parse_attr(chars)?);
            }
            _ => break,
        }
    }

    // A lone '*' is valid and matches every element
    if compound.is_empty() && chars.peek().is_some_and(|c| !c.is_whitespace() && *c != '>') {
        return Err("unexpected character");
    }
    Ok(compound)
}

fn parse_attr(chars: &mut Peekable<Chars<'_>>) -> Result<AttrSelector, &'static str> {
    let name = parse_ident(chars).to_ascii_lowercase();
    if name.is_empty() {
        return Err("empty attribute name");
    }

    let op = match chars.next() {
        Some(']') => return Ok(AttrSelector { name, op: AttrMatch::Exists }),
        Some('=') => AttrMatch::Equals(parse_attr_value(chars)?),
        Some('^') if chars.next() == Some('=') => AttrMatch::Prefix(parse_attr_value(chars)?),
        _ => return Err("malformed attribute selector"),
    };

    if chars.next() != Some(']') {
        return Err("unterminated attribute selector");
    }
    Ok(AttrSelector { name, op })
}

fn parse_attr_value(chars: &mut Peekable<Chars<'_>>) -> Result<String, &'static str> {
    match chars.peek().copied() {
        Some(quote @ ('\'' | '"')) => {
            chars.next();
            let mut value = String::new();
            for c in chars.by_ref() {
                if c == quote {
                    return Ok(value);
                }
                value.push(c);
            }
            Err("unterminated string")
        }
        _ => Ok(parse_ident(chars)),
    }
}
