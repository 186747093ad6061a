use thiserror::Error;

/// Errors raised while compiling or evaluating a query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XPathError {
    /// Input contains a character sequence the lexer does not know
    #[error("unexpected input at offset {offset}: {found:?}")]
    Lex { offset: usize, found: String },

    /// Tokens do not form a valid expression
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown function: {0}()")]
    UnknownFunction(String),

    #[error("function {name}() expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    /// Result (or an operand that must be a node-set) is a string, number,
    /// boolean or attribute selection
    #[error("expression does not select tree elements: {0}")]
    NotANodeSet(String),

    /// Failure reported by a non-default query engine
    #[error("query engine failure: {0}")]
    Engine(String),
}
