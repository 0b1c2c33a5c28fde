//! Minimal XML element tree in the layout Visual Studio writes.
//!
//! Attributes go on their own lines and the closing `>` of a start tag sits
//! on a line of its own, which keeps diffs of generated projects readable.

use std::fmt::{self, Display, Formatter};

const NEWLINE: &str = "\r\n";

/// An XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    /// Element without attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Add a child.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Add children.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Add a child in place.
    pub fn push(&mut self, child: Self) {
        self.children.push(child);
    }

    /// Attribute value by name.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn write(&self, f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "\t".repeat(depth);
        if self.attrs.is_empty() {
            write!(f, "{indent}<{}>{NEWLINE}", self.name)?;
        } else {
            write!(f, "{indent}<{}{NEWLINE}", self.name)?;
            for (name, value) in &self.attrs {
                write!(f, "{indent}\t{name}=\"{}\"{NEWLINE}", escape(value))?;
            }
            if self.children.is_empty() {
                return write!(f, "{indent}/>{NEWLINE}");
            }
            write!(f, "{indent}\t>{NEWLINE}")?;
        }
        for child in &self.children {
            child.write(f, depth + 1)?;
        }
        write!(f, "{indent}</{}>{NEWLINE}", self.name)
    }
}

/// A complete document with its XML declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    encoding: &'static str,
    root: Element,
}

impl Document {
    /// Document declaring `encoding`.
    #[must_use]
    pub const fn new(encoding: &'static str, root: Element) -> Self {
        Self { encoding, root }
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<?xml version=\"1.0\" encoding=\"{}\"?>{NEWLINE}", self.encoding)?;
        self.root.write(f, 0)
    }
}

/// Escape an attribute value.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#x0D;"),
            '\n' => out.push_str("&#x0A;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_visual_studio_layout() {
        let root = Element::new("VisualStudioProject")
            .attr("Name", "a")
            .child(Element::new("Platforms").child(Element::new("Platform").attr("Name", "Win32")))
            .child(Element::new("Globals"));
        let text = Document::new("Windows-1252", root).to_string();
        let expected = concat!(
            "<?xml version=\"1.0\" encoding=\"Windows-1252\"?>\r\n",
            "<VisualStudioProject\r\n",
            "\tName=\"a\"\r\n",
            "\t>\r\n",
            "\t<Platforms>\r\n",
            "\t\t<Platform\r\n",
            "\t\t\tName=\"Win32\"\r\n",
            "\t\t/>\r\n",
            "\t</Platforms>\r\n",
            "\t<Globals>\r\n",
            "\t</Globals>\r\n",
            "</VisualStudioProject>\r\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn escapes_attribute_values() {
        assert_eq!(escape("a<b>&\"c\"\n"), "a&lt;b&gt;&amp;&quot;c&quot;&#x0A;");
    }
}
