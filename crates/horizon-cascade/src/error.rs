//! Error types for the CSS processing pipeline.

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while processing a stylesheet.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A positional parse or validation error.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Classification of positional errors.
///
/// The kind is stable across releases; the human-readable message on
/// [`ParseError`] is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A pseudo selector colon with no name following it.
    MissingPseudoName,
    /// Selector content that the grammar could not consume.
    UnparsableSelector,
    /// A declaration without a `:` between property name and value.
    MissingColon,
    /// A declaration with a property name but no value.
    MissingValue,
    /// End of input inside a brace-delimited block.
    UnclosedBlock,
    /// End of input inside a quoted string.
    UnclosedString,
    /// End of input inside a parenthesized expression.
    UnclosedParen,
    /// A `#` color with the wrong number of hex digits.
    InvalidHexColor,
    /// A malformed numeric value.
    InvalidNumber,
    /// An at-rule with no registered refinement. Advisory only; unclaimed
    /// at-rules are written out verbatim and are not parse failures.
    UnknownAtRule,
    /// A declaration whose value grammar could not be consumed.
    MalformedDeclaration,
    /// Top-level content that is neither a rule nor an at-rule.
    UnparsableContent,
}

impl ErrorKind {
    /// Default message text for this kind.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::MissingPseudoName => "expected a pseudo selector name",
            ErrorKind::UnparsableSelector => "unable to parse remaining selector content",
            ErrorKind::MissingColon => "expected a colon after the property name",
            ErrorKind::MissingValue => "expected a property value",
            ErrorKind::UnclosedBlock => "unclosed block; expected to find a matching '}'",
            ErrorKind::UnclosedString => "unclosed string; expected to find a matching quote",
            ErrorKind::UnclosedParen => "unclosed expression; expected to find a matching ')'",
            ErrorKind::InvalidHexColor => "expected 3, 4, 6 or 8 hexadecimal digits",
            ErrorKind::InvalidNumber => "unable to parse numeric value",
            ErrorKind::UnknownAtRule => "no refinement registered for this at-rule",
            ErrorKind::MalformedDeclaration => "unable to parse remaining declaration content",
            ErrorKind::UnparsableContent => "unable to parse remaining content",
        }
    }
}

/// A parse or validation error anchored to a source position.
///
/// Line and column are 1-based and point at the offending character in the
/// original document, including inside refined fragments (refinement parsers
/// run over anchored sub-sources).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    /// Classification of the error.
    pub kind: ErrorKind,
    /// 1-based source line.
    pub line: i32,
    /// 1-based source column.
    pub column: i32,
    /// Human-readable description.
    pub message: String,
}

impl ParseError {
    /// Creates an error of the given kind with its default message.
    pub fn new(kind: ErrorKind, line: i32, column: i32) -> Self {
        Self { kind, line, column, message: kind.message().to_string() }
    }

    /// Creates an error with a custom message.
    pub fn with_message(kind: ErrorKind, line: i32, column: i32, message: impl Into<String>) -> Self {
        Self { kind, line, column, message: message.into() }
    }
}

/// Decides what happens when an error is reported during processing.
///
/// Raw parsers and refiners report every error they encounter through the
/// manager; the manager either aborts processing by returning `Err` or
/// records the error and lets processing continue.
pub trait ErrorManager {
    /// Handles a reported error. Returning `Err` aborts processing.
    fn report(&mut self, error: ParseError) -> Result<()>;

    /// Drains errors recorded so far. Managers that abort on first error
    /// have nothing to drain.
    fn take_errors(&mut self) -> Vec<ParseError> {
        Vec::new()
    }
}

/// Aborts processing on the first reported error. The default.
#[derive(Debug, Default)]
pub struct ThrowingErrorManager;

impl ErrorManager for ThrowingErrorManager {
    fn report(&mut self, error: ParseError) -> Result<()> {
        Err(error.into())
    }
}

/// Records every reported error and lets processing continue.
///
/// Statement-level parse failures recover by skipping to the next statement
/// boundary; refinement failures leave the unit unrefined.
#[derive(Debug, Default)]
pub struct CollectingErrorManager {
    errors: Vec<ParseError>,
}

impl ErrorManager for CollectingErrorManager {
    fn report(&mut self, error: ParseError) -> Result<()> {
        tracing::warn!(target: "horizon_cascade::error", %error, "recoverable parse error");
        self.errors.push(error);
        Ok(())
    }

    fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }
}
