//! Error sink shared by every node of a load
//!
//! Nodes never propagate failures to their ancestors: each failure is
//! recorded here against the node's location and the pass carries on.

use std::error::Error as _;
use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};

use super::error::LoadError;
use crate::parser::{LineIndex, Location};
use crate::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub location: Location,
    pub severity: Severity,
    pub error: LoadError,
}

impl Diagnostic {
    /// Messages of the error's source chain, outermost first
    pub fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut next = self.error.source();
        while let Some(cause) = next {
            causes.push(cause.to_string());
            next = cause.source();
        }
        causes
    }

    /// Render with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = self.location.span.clone();
        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };
        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };
        let mut report = Report::build(kind, filename, span.start)
            .with_message(self.error.kind())
            .with_label(
                Label::new((filename, span))
                    .with_message(self.error.to_string())
                    .with_color(color),
            );
        for cause in self.causes() {
            report = report.with_note(format!("caused by: {}", cause));
        }

        let mut buf = Vec::new();
        if report
            .finish()
            .write((filename, Source::from(source)), &mut buf)
            .is_err()
        {
            return self.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.error)?;
        for cause in self.causes() {
            write!(f, "\n  caused by: {}", cause)?;
        }
        Ok(())
    }
}

/// Ordered diagnostics of one load call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, location: &Location, error: LoadError) {
        self.push(Diagnostic {
            location: location.clone(),
            severity: Severity::Error,
            error,
        });
    }

    pub fn warning(&mut self, location: &Location, error: LoadError) {
        self.push(Diagnostic {
            location: location.clone(),
            severity: Severity::Warning,
            error,
        });
    }

    /// Record reader failures as grammar errors
    pub fn extend_parse_errors(&mut self, errors: Vec<ParseError>, text: &str, source: Option<&str>) {
        let index = LineIndex::new(text);
        for err in errors {
            let mut location = Location::from_span(err.span().clone());
            (location.line, location.column) = index.line_col(err.span().start);
            location.source = source.map(Into::into);
            self.error(&location, LoadError::grammar(err.message()));
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics of one category
    pub fn of_kind(&self, kind: &str) -> impl Iterator<Item = &Diagnostic> + '_ {
        let kind = kind.to_string();
        self.items.iter().filter(move |d| d.error.kind() == kind)
    }

    /// Render every diagnostic with source context
    pub fn format(&self, source: &str, filename: &str) -> String {
        self.items
            .iter()
            .map(|d| d.format(source, filename))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
