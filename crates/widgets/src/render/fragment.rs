//! Extraction of elements from server-rendered section HTML.
//!
//! The storefront returns re-rendered sections as HTML strings; widgets pick
//! individual elements out of them by selector. Supported selectors are the
//! subset the theme uses: a tag name, `#id`, `.class`, `[attr]`,
//! `[attr='value']` and `[attr*='value']` compounds, joined by whitespace
//! into descendant chains.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// An opening tag with its attribute text.
static START_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([a-zA-Z][a-zA-Z0-9-]*)((?:\s[^>]*)?)>").expect("Invalid regex")
});

/// One attribute inside a start tag.
static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+)))?"#)
        .expect("Invalid regex")
});

/// One part of a compound selector.
static SELECTOR_PART_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:#([\w-]+)|\.([\w-]+)|\[\s*([\w:-]+)\s*(?:(\*?=)\s*(?:'([^']*)'|"([^"]*)"|([^\]\s]*))\s*)?\]|([a-zA-Z][\w-]*))"#)
        .expect("Invalid regex")
});

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Outer HTML of the first element matching `selector`.
#[must_use]
pub fn outer_html(html: &str, selector: &str) -> Option<String> {
    find(html, selector).map(|el| html[el.outer].to_string())
}

/// Inner HTML of the first element matching `selector`.
#[must_use]
pub fn inner_html(html: &str, selector: &str) -> Option<String> {
    find(html, selector).map(|el| html[el.inner].to_string())
}

/// Text content of the first element matching `selector`, whitespace-collapsed.
#[must_use]
pub fn text(html: &str, selector: &str) -> Option<String> {
    find(html, selector).map(|el| text_content(&html[el.inner]))
}

/// Value of `attribute` on the first element matching `selector`.
#[must_use]
pub fn attribute(html: &str, selector: &str, attribute: &str) -> Option<String> {
    find(html, selector).and_then(|el| el.attributes.get(attribute).cloned())
}

/// Strip tags, decode common entities and collapse whitespace.
#[must_use]
pub fn text_content(html: &str) -> String {
    let stripped = TAG_REGEX.replace_all(html, " ");
    let decoded = decode_entities(&stripped);
    WHITESPACE_REGEX.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

// =============================================================================
// Matching
// =============================================================================

struct Element {
    outer: Range<usize>,
    inner: Range<usize>,
    attributes: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeTest>,
}

#[derive(Debug)]
enum AttributeTest {
    Present(String),
    Equals(String, String),
    Contains(String, String),
}

fn find(html: &str, selector: &str) -> Option<Element> {
    let chain = parse_selector(selector)?;
    let mut scope = 0..html.len();
    let mut found = None;

    for compound in &chain {
        let element = find_in(html, scope.clone(), compound)?;
        scope = element.inner.clone();
        found = Some(element);
    }
    found
}

fn find_in(html: &str, scope: Range<usize>, compound: &Compound) -> Option<Element> {
    let region = &html[scope.clone()];
    for caps in START_TAG_REGEX.captures_iter(region) {
        let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let tag = tag.as_str().to_ascii_lowercase();
        let attrs_text = caps.get(2).map_or("", |m| m.as_str());
        let attributes = parse_attributes(attrs_text);

        if !compound.matches(&tag, &attributes) {
            continue;
        }

        let start = scope.start + whole.start();
        let open_end = scope.start + whole.end();
        let self_closing = attrs_text.trim_end().ends_with('/');
        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            return Some(Element {
                outer: start..open_end,
                inner: open_end..open_end,
                attributes,
            });
        }

        let (inner_end, outer_end) = closing_tag(html, open_end, &tag)?;
        return Some(Element {
            outer: start..outer_end,
            inner: open_end..inner_end,
            attributes,
        });
    }
    None
}

/// Locate the matching `</tag>` after `from`, honoring nested same-name tags.
///
/// Returns the start and end offsets of the closing tag.
fn closing_tag(html: &str, from: usize, tag: &str) -> Option<(usize, usize)> {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}");
    let mut depth = 1_usize;
    let mut pos = from;

    while pos < lower.len() {
        let rest = &lower[pos..];
        let next_open = next_tag(rest, &open);
        let next_close = next_tag(rest, &close)?;

        match next_open {
            Some(o) if o < next_close => {
                depth += 1;
                pos += o + open.len();
            }
            _ => {
                depth -= 1;
                let close_start = pos + next_close;
                let close_end = lower[close_start..].find('>').map(|i| close_start + i + 1)?;
                if depth == 0 {
                    return Some((close_start, close_end));
                }
                pos = close_end;
            }
        }
    }
    None
}

/// Offset of `needle` in `haystack` where it is followed by a tag-name boundary.
fn next_tag(haystack: &str, needle: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(i) = haystack[offset..].find(needle) {
        let at = offset + i;
        let after = haystack[at + needle.len()..].chars().next();
        if matches!(after, Some(c) if c.is_whitespace() || c == '>' || c == '/') {
            return Some(at);
        }
        offset = at + needle.len();
    }
    None
}

fn parse_attributes(text: &str) -> HashMap<String, String> {
    ATTRIBUTE_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or_else(String::new, |m| decode_entities(m.as_str()));
            Some((name, value))
        })
        .collect()
}

impl Compound {
    fn matches(&self, tag: &str, attributes: &HashMap<String, String>) -> bool {
        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if let Some(id) = &self.id
            && attributes.get("id") != Some(id)
        {
            return false;
        }
        if !self.classes.is_empty() {
            let class_attr = attributes.get("class").map_or("", String::as_str);
            let classes: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
                return false;
            }
        }
        self.attributes.iter().all(|test| match test {
            AttributeTest::Present(name) => attributes.contains_key(name),
            AttributeTest::Equals(name, value) => attributes.get(name) == Some(value),
            AttributeTest::Contains(name, value) => attributes
                .get(name)
                .is_some_and(|actual| actual.contains(value.as_str())),
        })
    }
}

fn parse_selector(selector: &str) -> Option<Vec<Compound>> {
    let chain: Option<Vec<Compound>> = split_compounds(selector)
        .into_iter()
        .map(parse_compound)
        .collect();
    chain.filter(|c| !c.is_empty())
}

/// Split on whitespace outside attribute brackets.
fn split_compounds(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut start = None;

    for (i, c) in selector.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    parts.push(&selector[s..i]);
                }
                continue;
            }
            _ => {}
        }
        start.get_or_insert(i);
    }
    if let Some(s) = start {
        parts.push(&selector[s..]);
    }
    parts
}

fn parse_compound(text: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = text;

    while !rest.is_empty() {
        let caps = SELECTOR_PART_REGEX.captures(rest)?;
        let whole = caps.get(0)?;

        if let Some(id) = caps.get(1) {
            compound.id = Some(id.as_str().to_string());
        } else if let Some(class) = caps.get(2) {
            compound.classes.push(class.as_str().to_string());
        } else if let Some(name) = caps.get(3) {
            let name = name.as_str().to_ascii_lowercase();
            let value = caps
                .get(5)
                .or_else(|| caps.get(6))
                .or_else(|| caps.get(7))
                .map(|m| m.as_str().to_string());
            let test = match (caps.get(4).map(|m| m.as_str()), value) {
                (Some("*="), Some(value)) => AttributeTest::Contains(name, value),
                (Some(_), Some(value)) => AttributeTest::Equals(name, value),
                _ => AttributeTest::Present(name),
            };
            compound.attributes.push(test);
        } else if let Some(tag) = caps.get(8) {
            compound.tag = Some(tag.as_str().to_ascii_lowercase());
        }

        rest = &rest[whole.end()..];
    }
    Some(compound)
}
