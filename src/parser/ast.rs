//! Element tree produced by the document reader
//!
//! The builder never looks at tokens; it consumes [`Element`]s, each carrying
//! its tag, attributes in document order, children and a [`Location`].

use std::fmt;
use std::rc::Rc;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Where an element starts: source name, 1-based line and column, byte span
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub source: Option<Rc<str>>,
    pub line: usize,
    pub column: usize,
    pub span: Span,
}

impl Location {
    /// A location known only by its byte span (line/column filled in later)
    pub fn from_span(span: Span) -> Self {
        Self {
            source: None,
            line: 0,
            column: 0,
            span,
        }
    }

    pub fn new(line: usize, column: usize) -> Self {
        Self {
            source: None,
            line,
            column,
            span: 0..0,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}:{}:{}", source, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// `name="value"` pair on an element
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Spanned<String>,
    pub value: Spanned<String>,
}

/// A named element with attributes and nested elements
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: Spanned<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    pub location: Location,
}

impl Element {
    /// Create a detached element, mostly useful for building trees in code
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Spanned::new(name.into(), 0..0),
            attributes: Vec::new(),
            children: Vec::new(),
            location: Location::default(),
        }
    }

    /// Add an attribute (builder style)
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: Spanned::new(name.into(), 0..0),
            value: Spanned::new(value.into(), 0..0),
        });
        self
    }

    /// Add a child element (builder style)
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.name.node
    }

    /// Value of the first attribute with the given name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.node == name)
            .map(|a| a.value.node.as_str())
    }
}

/// A parsed document: one or more top-level elements
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub elements: Vec<Element>,
    pub source: Option<Rc<str>>,
}

/// Maps byte offsets to 1-based line/column pairs
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    /// 1-based (line, column) of a byte offset
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }

    /// Fill in line/column and source name for an element subtree
    pub fn locate(&self, mut element: Element, source: &Option<Rc<str>>) -> Element {
        let (line, column) = self.line_col(element.location.span.start);
        element.location.line = line;
        element.location.column = column;
        element.location.source = source.clone();
        element.children = element
            .children
            .into_iter()
            .map(|child| self.locate(child, source))
            .collect();
        element
    }
}
