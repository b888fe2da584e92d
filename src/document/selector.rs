//! Structural selectors
//!
//! A small CSS subset, parsed and validated before anything reaches the
//! document provider:
//!
//! ```text
//! selector  := compound (combinator compound)*
//! combinator:= whitespace | '>'
//! compound  := (ident | '*')? (#id | .class | [attr] | [attr=value])*
//! ```
//!
//! Attribute values may be unquoted identifiers or single/double quoted
//! strings with backslash escapes. Selector lists, pseudo-classes and the
//! sibling combinators are rejected with an `InvalidSelector` error.

use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};

/// A parsed structural selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// One compound selector: optional type plus simple selectors
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    /// Lowercased tag name; None is the universal selector
    pub tag: Option<String>,
    pub filters: Vec<SimpleSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Id(String),
    Class(String),
    AttrExists(String),
    AttrEquals(String, String),
}

/// Minimal element view needed to evaluate a selector
pub trait ElementLike {
    fn tag_name(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Self> {
        Parser::new(input).parse()
    }

    /// The universal selector `*`
    pub fn universal() -> Self {
        Self {
            source: "*".to_string(),
            compounds: vec![Compound::default()],
            combinators: Vec::new(),
        }
    }

    /// The selector text as written by the user
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    /// Scope this selector to descendants of `scope`
    pub fn within(&self, scope: &Selector) -> Selector {
        let mut compounds = scope.compounds.clone();
        compounds.extend(self.compounds.iter().cloned());

        let mut combinators = scope.combinators.clone();
        combinators.push(Combinator::Descendant);
        combinators.extend(self.combinators.iter().copied());

        Selector {
            source: format!("{} {}", scope.source, self.source),
            compounds,
            combinators,
        }
    }

    /// Match against an element given with its ancestors
    ///
    /// `chain[0]` is the candidate element, `chain[1]` its parent, and so on
    /// up to the root.
    pub fn matches_chain<E: ElementLike>(&self, chain: &[&E]) -> bool {
        if chain.is_empty() || self.compounds.is_empty() {
            return false;
        }
        self.match_from(self.compounds.len() - 1, chain, 0)
    }

    fn match_from<E: ElementLike>(&self, compound: usize, chain: &[&E], pos: usize) -> bool {
        if !self.compounds[compound].matches(chain[pos]) {
            return false;
        }
        if compound == 0 {
            return true;
        }
        match self.combinators[compound - 1] {
            Combinator::Child => {
                pos + 1 < chain.len() && self.match_from(compound - 1, chain, pos + 1)
            }
            Combinator::Descendant => {
                (pos + 1..chain.len()).any(|p| self.match_from(compound - 1, chain, p))
            }
        }
    }
}

impl Compound {
    pub fn matches<E: ElementLike + ?Sized>(&self, element: &E) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.filters.iter().all(|filter| match filter {
            SimpleSelector::Id(id) => element.attr("id") == Some(id.as_str()),
            SimpleSelector::Class(class) => element
                .attr("class")
                .map(|classes| classes.split_whitespace().any(|c| c == class))
                .unwrap_or(false),
            SimpleSelector::AttrExists(name) => element.attr(name).is_some(),
            SimpleSelector::AttrEquals(name, value) => element.attr(name) == Some(value.as_str()),
        })
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Canonical CSS form, safe to hand to `querySelectorAll`
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.compounds.iter().enumerate() {
            if i > 0 {
                match self.combinators[i - 1] {
                    Combinator::Descendant => f.write_str(" ")?,
                    Combinator::Child => f.write_str(" > ")?,
                }
            }
            write!(f, "{}", compound)?;
        }
        Ok(())
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => f.write_str(tag)?,
            None if self.filters.is_empty() => f.write_str("*")?,
            None => {}
        }
        for filter in &self.filters {
            match filter {
                SimpleSelector::Id(id) => write!(f, "#{}", id)?,
                SimpleSelector::Class(class) => write!(f, ".{}", class)?,
                SimpleSelector::AttrExists(name) => write!(f, "[{}]", name)?,
                SimpleSelector::AttrEquals(name, value) => {
                    write!(f, "[{}=\"", name)?;
                    for c in value.chars() {
                        match c {
                            '"' => f.write_str("\\\"")?,
                            '\\' => f.write_str("\\\\")?,
                            '\n' => f.write_str("\\a ")?,
                            c => write!(f, "{}", c)?,
                        }
                    }
                    f.write_str("\"]")?;
                }
            }
        }
        Ok(())
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: &str) -> Error {
        let offset = self
            .chars
            .get(self.pos)
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len());
        Error::invalid_selector(self.input, offset, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse(mut self) -> Result<Selector> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(self.error("empty selector"));
        }

        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                }
                Some('+') | Some('~') => {
                    return Err(self.error("sibling combinators are not supported"));
                }
                Some(',') => return Err(self.error("selector lists are not supported")),
                Some(_) if had_space => combinators.push(Combinator::Descendant),
                Some(c) => return Err(self.error(&format!("unexpected character '{}'", c))),
            }
            if self.peek().is_none() {
                return Err(self.error("combinator must be followed by a selector"));
            }
            compounds.push(self.parse_compound()?);
        }

        Ok(Selector {
            source: self.input.trim().to_string(),
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        let start = self.pos;

        match self.peek() {
            Some('*') => {
                self.bump();
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.parse_ident("tag name")?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound
                        .filters
                        .push(SimpleSelector::Id(self.parse_ident("id")?));
                }
                Some('.') => {
                    self.bump();
                    compound
                        .filters
                        .push(SimpleSelector::Class(self.parse_ident("class name")?));
                }
                Some('[') => {
                    self.bump();
                    compound.filters.push(self.parse_attribute()?);
                }
                Some(':') => return Err(self.error("pseudo-classes are not supported")),
                _ => break,
            }
        }

        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => self.error(&format!("expected a selector, found '{}'", c)),
                None => self.error("expected a selector"),
            });
        }
        Ok(compound)
    }

    /// A CSS identifier: no leading digit, nor a hyphen followed by one
    fn parse_ident(&mut self, what: &str) -> Result<String> {
        let start = self.pos;
        let ident = self.parse_word(what)?;
        let mut chars = ident.chars();
        let leading_digit = match (chars.next(), chars.next()) {
            (Some(c), _) if c.is_ascii_digit() => true,
            (Some('-'), Some(c)) if c.is_ascii_digit() => true,
            _ => false,
        };
        if leading_digit {
            self.pos = start;
            return Err(self.error(&format!("{} cannot start with a digit", what)));
        }
        Ok(ident)
    }

    fn parse_word(&mut self, what: &str) -> Result<String> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.error(&format!("expected {}", what)));
        }
        Ok(ident)
    }

    fn parse_attribute(&mut self) -> Result<SimpleSelector> {
        self.skip_whitespace();
        let name = self.parse_ident("attribute name")?;
        self.skip_whitespace();

        match self.bump() {
            Some(']') => Ok(SimpleSelector::AttrExists(name)),
            Some('=') => {
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(q @ '"') | Some(q @ '\'') => {
                        self.bump();
                        self.parse_quoted(q)?
                    }
                    Some(_) => self.parse_word("attribute value")?,
                    None => return Err(self.error("unterminated attribute selector")),
                };
                self.skip_whitespace();
                match self.bump() {
                    Some(']') => Ok(SimpleSelector::AttrEquals(name, value)),
                    Some(_) => {
                        self.pos -= 1;
                        Err(self.error("expected ']'"))
                    }
                    None => Err(self.error("unterminated attribute selector")),
                }
            }
            Some(c @ ('^' | '$' | '*' | '~' | '|')) => {
                self.pos -= 1;
                Err(self.error(&format!("attribute operator '{}=' is not supported", c)))
            }
            Some(_) => {
                self.pos -= 1;
                Err(self.error("expected ']' or '='"))
            }
            None => Err(self.error("unterminated attribute selector")),
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(value),
                Some('\\') => match self.bump() {
                    Some(c) => value.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }
}
