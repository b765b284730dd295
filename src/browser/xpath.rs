//! XPath location paths evaluated over a parsed snapshot document.
//!
//! Covers the forms selector catalogs use: `/` and `//` steps with an
//! optional leading `.`, element names or `*`, and predicates
//! `[n]`, `[@attr]`, `[@attr='v']`, `[contains(@attr,'v')]`,
//! `[text()='v']` and `[contains(text(),'v')]` (`.` works as `text()`).
//! Text tests compare whitespace-collapsed element text. Anything else is
//! rejected at parse time.

use anyhow::{Result, bail};
use scraper::ElementRef;

use crate::normalize::collapse_whitespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    /// `//`: any depth below the context node
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    /// 1-based position among the candidates left by earlier predicates
    Position(usize),
    HasAttr(String),
    AttrEquals(String, String),
    AttrContains(String, String),
    TextEquals(String),
    TextContains(String),
}

impl Predicate {
    fn holds(&self, element: &ElementRef<'_>) -> bool {
        let attr = |name: &str| element.value().attr(name);
        match self {
            Self::Position(_) => true,
            Self::HasAttr(name) => attr(name).is_some(),
            Self::AttrEquals(name, value) => attr(name) == Some(value.as_str()),
            Self::AttrContains(name, value) => attr(name).is_some_and(|v| v.contains(value.as_str())),
            Self::TextEquals(value) => text_of(element) == *value,
            Self::TextContains(value) => text_of(element).contains(value.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    /// `None` for `*`
    name: Option<String>,
    predicates: Vec<Predicate>,
}

impl Step {
    fn matches_name(&self, element: &ElementRef<'_>) -> bool {
        self.name
            .as_deref()
            .is_none_or(|name| name.eq_ignore_ascii_case(element.value().name()))
    }

    fn filter<'a>(&self, candidates: Vec<ElementRef<'a>>) -> Vec<ElementRef<'a>> {
        let mut candidates: Vec<ElementRef<'a>> = candidates
            .into_iter()
            .filter(|el| self.matches_name(el))
            .collect();
        for predicate in &self.predicates {
            candidates = match predicate {
                Predicate::Position(n) => candidates.get(n - 1).copied().into_iter().collect(),
                other => candidates.into_iter().filter(|el| other.holds(el)).collect(),
            };
        }
        candidates
    }
}

/// Node a step is evaluated from
#[derive(Clone, Copy)]
enum Context<'a> {
    Document,
    Element(ElementRef<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    absolute: bool,
    steps: Vec<Step>,
}

impl XPath {
    pub fn parse(expression: &str) -> Result<Self> {
        let mut cursor = Cursor {
            rest: expression.trim(),
        };

        let (absolute, mut axis) = if cursor.eat(".//") {
            (false, Axis::Descendant)
        } else if cursor.eat("./") {
            (false, Axis::Child)
        } else if cursor.eat("//") {
            (true, Axis::Descendant)
        } else if cursor.eat("/") {
            (true, Axis::Child)
        } else {
            (false, Axis::Child)
        };

        let mut steps = Vec::new();
        loop {
            steps.push(cursor.step(axis)?);
            cursor.skip_ws();
            if cursor.rest.is_empty() {
                break;
            } else if cursor.eat("//") {
                axis = Axis::Descendant;
            } else if cursor.eat("/") {
                axis = Axis::Child;
            } else {
                bail!("unsupported XPath near {:?}", cursor.rest);
            }
        }

        Ok(Self { absolute, steps })
    }

    /// Document-order indices into `elements` of every node the path selects.
    ///
    /// Relative paths start at `scope` (the document when `None`); absolute
    /// paths always start at the document.
    pub fn select<'a>(&self, elements: &[ElementRef<'a>], scope: Option<ElementRef<'a>>) -> Vec<usize> {
        let mut contexts = match (self.absolute, scope) {
            (false, Some(element)) => vec![Context::Element(element)],
            _ => vec![Context::Document],
        };
        let mut matched = Vec::new();

        for step in &self.steps {
            let mut found = Vec::new();
            for context in &contexts {
                let parents = match step.axis {
                    Axis::Child => vec![*context],
                    Axis::Descendant => descendant_or_self(elements, *context),
                };
                for parent in parents {
                    found.extend(
                        step.filter(children(elements, parent))
                            .iter()
                            .filter_map(|el| elements.iter().position(|other| other == el)),
                    );
                }
            }
            found.sort_unstable();
            found.dedup();

            contexts = found.iter().map(|&i| Context::Element(elements[i])).collect();
            matched = found;
        }
        matched
    }
}

fn children<'a>(elements: &[ElementRef<'a>], context: Context<'a>) -> Vec<ElementRef<'a>> {
    match context {
        Context::Document => elements
            .iter()
            .copied()
            .filter(|el| el.parent().is_some_and(|parent| parent.value().is_document()))
            .collect(),
        Context::Element(element) => element.children().filter_map(ElementRef::wrap).collect(),
    }
}

fn descendant_or_self<'a>(elements: &[ElementRef<'a>], context: Context<'a>) -> Vec<Context<'a>> {
    match context {
        Context::Document => std::iter::once(Context::Document)
            .chain(elements.iter().copied().map(Context::Element))
            .collect(),
        // `descendants` starts with the element itself
        Context::Element(element) => element
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(Context::Element)
            .collect(),
    }
}

fn text_of(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

struct Cursor<'s> {
    rest: &'s str,
}

impl<'s> Cursor<'s> {
    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        self.skip_ws();
        if !self.eat(token) {
            bail!("expected {token:?} in XPath near {:?}", self.rest);
        }
        Ok(())
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'s str {
        let end = self.rest.find(|c: char| !keep(c)).unwrap_or(self.rest.len());
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        taken
    }

    fn name(&mut self) -> Result<String> {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if name.is_empty() {
            bail!("expected a name in XPath near {:?}", self.rest);
        }
        Ok(name.to_string())
    }

    fn literal(&mut self) -> Result<String> {
        self.skip_ws();
        let Some(quote) = self.rest.chars().next().filter(|c| matches!(c, '\'' | '"')) else {
            bail!("expected a quoted string in XPath near {:?}", self.rest);
        };
        let body = &self.rest[1..];
        let Some(end) = body.find(quote) else {
            bail!("unterminated string in XPath");
        };
        self.rest = &body[end + 1..];
        Ok(body[..end].to_string())
    }

    fn step(&mut self, axis: Axis) -> Result<Step> {
        self.skip_ws();
        let name = if self.eat("*") { None } else { Some(self.name()?) };

        let mut predicates = Vec::new();
        loop {
            self.skip_ws();
            if !self.eat("[") {
                break;
            }
            predicates.push(self.predicate()?);
            self.expect("]")?;
        }

        Ok(Step {
            axis,
            name,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<Predicate> {
        self.skip_ws();

        let digits = self.take_while(|c| c.is_ascii_digit());
        if !digits.is_empty() {
            return match digits.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Predicate::Position(n)),
                _ => bail!("invalid XPath position {digits}"),
            };
        }

        if self.eat("contains(") {
            self.skip_ws();
            let attr = self.text_or_attr()?;
            self.expect(",")?;
            let value = self.literal()?;
            self.expect(")")?;
            return Ok(match attr {
                Some(name) => Predicate::AttrContains(name, value),
                None => Predicate::TextContains(value),
            });
        }

        let attr = self.text_or_attr()?;
        self.skip_ws();
        if !self.eat("=") {
            return match attr {
                Some(name) => Ok(Predicate::HasAttr(name)),
                None => bail!("text() needs a comparison in XPath"),
            };
        }
        let value = self.literal()?;
        Ok(match attr {
            Some(name) => Predicate::AttrEquals(name, value),
            None => Predicate::TextEquals(value),
        })
    }

    /// `Some(name)` for `@name`, `None` for `text()` or `.`
    fn text_or_attr(&mut self) -> Result<Option<String>> {
        if self.eat("@") {
            Ok(Some(self.name()?))
        } else if self.eat("text()") || self.eat(".") {
            Ok(None)
        } else {
            bail!("unsupported XPath predicate near {:?}", self.rest)
        }
    }
}
