use thiserror::Error;

/// Everything that can stop a formula from producing a number.
///
/// The messages are shown verbatim to template authors, so no variant adds a
/// prefix of its own.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    // Unexpected character, unterminated `[variable]` or a bad numeric literal
    #[error("{0}")]
    Lex(String),

    // The token stream does not match the grammar
    #[error("{0}")]
    Parse(String),

    // Input length or nesting depth guard tripped
    #[error("{0}")]
    Limit(String),

    #[error("empty expression")]
    Empty,

    // A context document could not be turned into variable values
    #[error("invalid context: {0}")]
    Context(String),
}

impl FormulaError {
    /// Short tag used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FormulaError::Lex(_) => "lex",
            FormulaError::Parse(_) => "parse",
            FormulaError::Limit(_) => "limit",
            FormulaError::Empty => "empty",
            FormulaError::Context(_) => "context",
        }
    }
}

pub type Result<T> = std::result::Result<T, FormulaError>;
