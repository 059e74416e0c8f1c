use std::fmt;

/// Describes how to find one element within a page session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// A CSS selector.
    Css(String),
    /// An XPath expression.
    XPath(String),
    /// The first element matching `scope` whose trimmed text is exactly `text`.
    Text { scope: String, text: String },
    /// The `index`-th (zero-based) match of another locator.
    Nth { base: Box<Locator>, index: usize },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    pub fn text(scope: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::Text {
            scope: scope.into(),
            text: text.into(),
        }
    }

    pub fn nth(self, index: usize) -> Self {
        Locator::Nth {
            base: Box::new(self),
            index,
        }
    }

    /// Render as a JavaScript expression evaluating to an array of matching elements.
    pub fn to_js_array(&self) -> String {
        match self {
            Locator::Css(selector) => format!(
                "Array.from(document.querySelectorAll({}))",
                js_string(selector)
            ),
            Locator::XPath(expression) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
                 return out; }})()",
                js_string(expression)
            ),
            Locator::Text { scope, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => \
                 (el.innerText || el.textContent || '').trim() === {})",
                js_string(scope),
                js_string(text)
            ),
            Locator::Nth { base, index } => {
                format!(
                    "(() => {{ const all = {}; \
                     return all.length > {index} ? [all[{index}]] : []; }})()",
                    base.to_js_array()
                )
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css={selector}"),
            Locator::XPath(expression) => write!(f, "xpath={expression}"),
            Locator::Text { scope, text } => write!(f, "{scope} with text {text:?}"),
            Locator::Nth { base, index } => write!(f, "{base} [#{index}]"),
        }
    }
}

/// Quote a string as an XPath literal, falling back to `concat()` when it
/// contains both quote kinds.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

fn js_string(value: &str) -> String {
    // serde_json never fails on a plain &str
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".into())
}
