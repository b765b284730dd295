//! Tagged selector expressions resolved against a rendered document

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Query language a selector expression is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorEngine {
    Css,
    XPath,
}

/// An immutable selector: engine plus query string.
///
/// Parsed from the prefixed form used in catalogs (`"css:..."`, `"xpath:..."`).
/// An unprefixed string is treated as CSS.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorSpec {
    engine: SelectorEngine,
    expression: String,
}

impl SelectorSpec {
    pub fn parse(raw: &str) -> Self {
        if let Some(expr) = raw.strip_prefix("css:") {
            Self::css(expr)
        } else if let Some(expr) = raw.strip_prefix("xpath:") {
            Self::xpath(expr)
        } else {
            Self::css(raw)
        }
    }

    pub fn css(expression: impl Into<String>) -> Self {
        Self {
            engine: SelectorEngine::Css,
            expression: expression.into(),
        }
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self {
            engine: SelectorEngine::XPath,
            expression: expression.into(),
        }
    }

    pub fn engine(&self) -> SelectorEngine {
        self.engine
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.engine {
            SelectorEngine::Css => write!(f, "css:{}", self.expression),
            SelectorEngine::XPath => write!(f, "xpath:{}", self.expression),
        }
    }
}

impl Serialize for SelectorSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SelectorSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Parse a list of prefixed selector strings, preserving order
pub fn chain(raw: &[&str]) -> Vec<SelectorSpec> {
    raw.iter().map(|s| SelectorSpec::parse(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_prefixes() {
        let css = SelectorSpec::parse("css:div.title-content h1");
        assert_eq!(css.engine(), SelectorEngine::Css);
        assert_eq!(css.expression(), "div.title-content h1");

        let xpath = SelectorSpec::parse("xpath://h1[@class='d-title']");
        assert_eq!(xpath.engine(), SelectorEngine::XPath);
        assert_eq!(xpath.expression(), "//h1[@class='d-title']");
    }

    #[test]
    fn unprefixed_defaults_to_css() {
        let spec = SelectorSpec::parse(".price-text");
        assert_eq!(spec.engine(), SelectorEngine::Css);
        assert_eq!(spec.expression(), ".price-text");
    }

    #[test]
    fn serde_uses_prefixed_string_form() {
        let spec: SelectorSpec = serde_json::from_str(r#""xpath://table""#).unwrap();
        assert_eq!(spec, SelectorSpec::xpath("//table"));
        assert_eq!(
            serde_json::to_string(&SelectorSpec::css("span.price")).unwrap(),
            r#""css:span.price""#
        );
    }
}
