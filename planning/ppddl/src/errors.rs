//! Diagnostics pointing into PPDDL sources.
//!
//! A [`Message`] carries a title, a set of [`Label`]s attached to regions of the inputs and
//! some trailing notes. It is rendered with `annotate-snippets` when displayed.

use std::fmt::{Debug, Display, Formatter};
use std::ops::Range;
use std::sync::Arc;

use annotate_snippets::{Annotation, AnnotationKind, Level, Renderer, Snippet};
use thiserror::Error;

use crate::input::Input;

/// Spans shorter than this are repeated in the title of the messages pointing at them.
const INLINE_LIMIT: usize = 40;

/// A region of an input text.
#[derive(Clone)]
pub struct Span {
    input: Arc<Input>,
    range: Range<usize>,
}

impl Span {
    /// Span of the bytes `first..=last` of the input.
    pub fn new(input: Arc<Input>, first: usize, last: usize) -> Self {
        Span {
            input,
            range: first..last + 1,
        }
    }

    /// Span covering a standalone text, for elements that were not read from any input.
    fn detached(text: String) -> Self {
        let range = 0..text.len();
        Span {
            input: Arc::new(Input::from_string(text)),
            range,
        }
    }

    pub fn text(&self) -> &str {
        &self.input.text()[self.range.clone()]
    }

    /// The last character of the span, typically the closing parenthesis of a list.
    pub fn last_char(&self) -> Span {
        let last = self.range.end.saturating_sub(1).max(self.range.start);
        Span {
            input: self.input.clone(),
            range: last..last + 1,
        }
    }

    pub fn label(&self, level: Level<'static>, message: impl ToString) -> Label {
        Label {
            level,
            span: self.clone(),
            message: message.to_string(),
        }
    }

    pub fn invalid(&self, msg: impl ToString) -> Message {
        let msg = msg.to_string();
        let title = if self.range.len() < INLINE_LIMIT {
            format!("{msg}: {}", self.text())
        } else {
            msg.clone()
        };
        Message::error(title).with_label(self.label(Level::ERROR, msg))
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.input.source() {
            Some(file) => write!(f, "{file}@{:?}", self.range),
            None => write!(f, "@{:?}", self.range),
        }
    }
}

/// An element that may know where it comes from.
pub trait Spanned: Display {
    fn span(&self) -> Option<&Span>;

    /// Location of the element. Elements without one are located in their own printed form.
    fn loc(&self) -> Span {
        match self.span() {
            Some(span) => span.clone(),
            None => Span::detached(self.to_string()),
        }
    }

    fn invalid(&self, msg: impl ToString) -> Message {
        self.loc().invalid(msg)
    }

    fn info(&self, msg: impl ToString) -> Label {
        self.loc().label(Level::INFO, msg)
    }
}

impl<T: Spanned> Spanned for &T {
    fn span(&self) -> Option<&Span> {
        T::span(self)
    }
}

/// A message attached to a span.
pub struct Label {
    level: Level<'static>,
    span: Span,
    message: String,
}

impl Label {
    fn snippet(&self) -> Snippet<'_, Annotation<'_>> {
        let kind = if self.level == Level::ERROR {
            AnnotationKind::Primary
        } else {
            AnnotationKind::Context
        };
        let snippet = Snippet::source(self.span.input.text())
            .line_start(1)
            .fold(true)
            .annotation(kind.span(self.span.range.clone()).label(&self.message));
        match self.span.input.source() {
            Some(file) => snippet.path(file),
            None => snippet,
        }
    }
}

#[derive(Error)]
pub struct Message {
    title: String,
    labels: Vec<Label>,
    notes: Vec<String>,
}

impl Message {
    pub fn error(title: impl ToString) -> Self {
        Message {
            title: title.to_string(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Points at `elem` with an informative message.
    pub fn info(self, elem: impl Spanned, msg: impl ToString) -> Self {
        self.with_label(elem.info(msg))
    }

    pub fn note(mut self, note: impl ToString) -> Self {
        self.notes.push(note.to_string());
        self
    }

    fn retitled(mut self, title: impl ToString) -> Self {
        let previous = std::mem::replace(&mut self.title, title.to_string());
        self.notes.insert(0, previous);
        self
    }
}

impl From<std::io::Error> for Message {
    fn from(e: std::io::Error) -> Self {
        Message::error(e)
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let group = Level::ERROR
            .primary_title(&self.title)
            .elements(self.labels.iter().map(Label::snippet));
        f.write_str(&Renderer::styled().render(&[group]))?;
        self.notes.iter().try_for_each(|note| write!(f, "\n  = note: {note}"))
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// Enrichment of the error side of a result.
pub trait ResultExt<T> {
    /// Gives a new title to the error, the previous one is kept as a note.
    fn title(self, title: impl Display) -> Result<T, Message>;

    fn note(self, note: impl Display) -> Result<T, Message>;

    /// Adds an informative label on `elem`.
    fn located(self, elem: impl Spanned, msg: impl ToString) -> Result<T, Message>;
}

impl<T> ResultExt<T> for Result<T, Message> {
    fn title(self, title: impl Display) -> Result<T, Message> {
        self.map_err(|e| e.retitled(title))
    }

    fn note(self, note: impl Display) -> Result<T, Message> {
        self.map_err(|e| e.note(note))
    }

    fn located(self, elem: impl Spanned, msg: impl ToString) -> Result<T, Message> {
        self.map_err(|e| e.info(elem, msg))
    }
}

/// Turns a missing value into an error.
pub trait OptionExt<T> {
    fn or_error(self, title: impl Display) -> Result<T, Message>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_error(self, title: impl Display) -> Result<T, Message> {
        self.ok_or_else(|| Message::error(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retitling_keeps_previous_title() {
        let res: Result<(), Message> = Err(Message::error("unexpected token"));
        let err = res.title("Invalid domain").unwrap_err();
        assert_eq!(err.title(), "Invalid domain");
        assert!(err.to_string().contains("note: unexpected token"));
    }

    #[test]
    fn short_spans_are_inlined() {
        let input = Arc::new(Input::from_string("(define (domain d))"));
        let span = Span::new(input, 9, 14);
        assert_eq!(span.text(), "domain");
        assert_eq!(span.invalid("bad keyword").title(), "bad keyword: domain");
        assert_eq!(span.last_char().text(), "n");
    }
}
