//! Element locators
//!
//! A locator is a strategy plus an index into the match list. Scenario files
//! write them either in short form (`"text=Admin"`, `"css=input[type=email]"`,
//! `'text="Sign In"' >> nth=1`) or as a map (`{ text: Admin, nth: 1 }`).

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::common::{Error, Result};

/// How an element is resolved on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    /// XPath expression, evaluated from the document root
    XPath(String),
    /// CSS selector
    Css(String),
    /// Case-insensitive, whitespace-normalized substring of the element text
    Text(String),
    /// Whitespace-normalized text equal to the given string
    ExactText(String),
    /// `data-testid` attribute value
    TestId(String),
}

/// A reference to one element: the `nth` match of `by` (0 = first)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "LocatorSpec")]
pub struct Locator {
    pub by: By,
    pub nth: usize,
}

impl Locator {
    pub fn new(by: By) -> Self {
        Self { by, nth: 0 }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(By::Text(text.into()))
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::new(By::XPath(xpath.into()))
    }

    pub fn css(css: impl Into<String>) -> Self {
        Self::new(By::Css(css.into()))
    }

    pub fn nth(mut self, nth: usize) -> Self {
        self.nth = nth;
        self
    }

    /// Express the locator as a WebDriver-native query
    ///
    /// Text strategies become XPath that selects the innermost element whose
    /// normalized text matches, so ancestors like `<body>` are not returned.
    /// Only the document body is searched, and elements that are never
    /// rendered (scripts, styles, `<noscript>`, `<template>`) are skipped.
    pub fn to_query(&self) -> Query {
        match &self.by {
            By::XPath(xpath) => Query::XPath(xpath.clone()),
            By::Css(css) => Query::Css(css.clone()),
            By::TestId(id) => Query::Css(format!("[data-testid={}]", css_string(id))),
            By::Text(text) => {
                let needle = xpath_literal(&fold_case(&normalize_space(text)));
                text_query(&format!("contains({}, {})", folded_text(), needle))
            }
            By::ExactText(text) => {
                let needle = xpath_literal(&normalize_space(text));
                text_query(&format!("normalize-space(.)={}", needle))
            }
        }
    }
}

/// Elements inside the body that are never rendered
const UNRENDERED: &str =
    "ancestor-or-self::*[self::script or self::style or self::noscript or self::template]";

/// Innermost rendered elements satisfying `cond`
fn text_query(cond: &str) -> Query {
    Query::XPath(format!(
        "//body/descendant-or-self::*[not({UNRENDERED})][{cond}][not(*[not({UNRENDERED})][{cond}])]"
    ))
}

/// Letters folded by case-insensitive text matching. XPath 1.0 has no
/// `lower-case()`, so the page side goes through `translate()` with these
/// tables and the needle through [`fold_case`].
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZÀÁÂÃÄÅÆÇÈÉÊËÌÍÎÏÐÑÒÓÔÕÖØÙÚÛÜÝÞ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyzàáâãäåæçèéêëìíîïðñòóôõöøùúûüýþ";

/// Case-folded normalized text of the context node
fn folded_text() -> String {
    format!("translate(normalize-space(.), '{UPPER}', '{LOWER}')")
}

/// Fold case exactly as [`folded_text`] does
fn fold_case(s: &str) -> String {
    s.chars()
        .map(|c| {
            UPPER
                .chars()
                .zip(LOWER.chars())
                .find_map(|(upper, lower)| (upper == c).then_some(lower))
                .unwrap_or(c)
        })
        .collect()
}

/// Collapse whitespace runs and trim, like XPath `normalize-space()`
fn normalize_space(s: &str) -> String {
    s.split([' ', '\t', '\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// WebDriver-native element query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    XPath(String),
    Css(String),
}

/// Quote a string as an XPath 1.0 literal
///
/// XPath has no escape sequences, so strings containing both quote kinds are
/// assembled with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Quote a string as a CSS attribute value
fn css_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (selector, nth) = match trimmed.rsplit_once(">> nth=") {
            Some((selector, nth)) => {
                let nth = nth
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| Error::invalid_locator(input, "nth must be a non-negative integer"))?;
                (selector.trim(), nth)
            }
            None => (trimmed, 0),
        };

        let by = if let Some(xpath) = selector.strip_prefix("xpath=") {
            By::XPath(xpath.to_string())
        } else if let Some(css) = selector.strip_prefix("css=") {
            By::Css(css.to_string())
        } else if let Some(text) = selector.strip_prefix("text=") {
            match unquote(text) {
                Some(exact) => By::ExactText(exact.to_string()),
                None => By::Text(text.to_string()),
            }
        } else if let Some(id) = selector.strip_prefix("test_id=") {
            By::TestId(id.to_string())
        } else if selector.starts_with("//") || selector.starts_with("html/") {
            By::XPath(selector.to_string())
        } else {
            By::Css(selector.to_string())
        };

        let value = match &by {
            By::XPath(v) | By::Css(v) | By::Text(v) | By::ExactText(v) | By::TestId(v) => v,
        };
        if value.trim().is_empty() {
            return Err(Error::invalid_locator(input, "selector is empty"));
        }

        Ok(Locator { by, nth })
    }
}

fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.by {
            By::XPath(v) => write!(f, "xpath={}", v)?,
            By::Css(v) => write!(f, "css={}", v)?,
            By::Text(v) => write!(f, "text={}", v)?,
            By::ExactText(v) => write!(f, "text=\"{}\"", v)?,
            By::TestId(v) => write!(f, "test_id={}", v)?,
        }
        if self.nth > 0 {
            write!(f, " >> nth={}", self.nth)?;
        }
        Ok(())
    }
}

/// Wire form of a locator in scenario files
#[derive(Deserialize)]
#[serde(untagged)]
enum LocatorSpec {
    Short(String),
    Full {
        xpath: Option<String>,
        css: Option<String>,
        text: Option<String>,
        exact_text: Option<String>,
        test_id: Option<String>,
        #[serde(default)]
        nth: usize,
    },
}

impl TryFrom<LocatorSpec> for Locator {
    type Error = Error;

    fn try_from(spec: LocatorSpec) -> Result<Self> {
        match spec {
            LocatorSpec::Short(s) => s.parse(),
            LocatorSpec::Full {
                xpath,
                css,
                text,
                exact_text,
                test_id,
                nth,
            } => {
                let mut strategies = [
                    xpath.map(By::XPath),
                    css.map(By::Css),
                    text.map(By::Text),
                    exact_text.map(By::ExactText),
                    test_id.map(By::TestId),
                ]
                .into_iter()
                .flatten();

                let by = strategies.next().ok_or_else(|| {
                    Error::invalid_locator(
                        "{..}",
                        "expected one of xpath, css, text, exact_text, test_id",
                    )
                })?;
                if strategies.next().is_some() {
                    return Err(Error::invalid_locator(
                        "{..}",
                        "only one of xpath, css, text, exact_text, test_id may be set",
                    ));
                }
                Ok(Locator { by, nth })
            }
        }
    }
}
