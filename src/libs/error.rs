use std::fmt;

/// Everything that can go wrong in the alignment core.
#[derive(Debug, Clone, PartialEq)]
pub enum AlignError {
    /// Caller handed us something unusable (e.g. a zero-length cursor).
    InvalidInput(String),
    /// A genome name did not resolve in the alignment.
    MissingGenome(String),
    /// A write operation violated the alignment's structure
    /// (e.g. adding a root to a non-empty output).
    Structural(String),
    /// Malformed or unlabeled Newick input.
    Parse {
        /// A human-readable message explaining the error
        message: String,
        /// The line number (1-based)
        line: usize,
        /// The column number (1-based)
        column: usize,
        /// The snippet of input where the error occurred
        snippet: String,
    },
    /// The operation is not defined for this type
    /// (e.g. `slice` on a mapped segment).
    NotSupported(String),
    /// An internal invariant broke mid-operation; partial output is
    /// left for inspection but not promised to be consistent.
    Consistency(String),
}

impl fmt::Display for AlignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AlignError::MissingGenome(name) => {
                write!(f, "Genome [{}] not found in alignment", name)
            }
            AlignError::Structural(msg) => write!(f, "Structural error: {}", msg),
            AlignError::Parse {
                message,
                line,
                column,
                snippet,
            } => {
                write!(
                    f,
                    "Parse error at line {}, column {}:\n{}\nSnippet: \"{}\"",
                    line, column, message, snippet
                )
            }
            AlignError::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            AlignError::Consistency(msg) => write!(f, "Consistency error: {}", msg),
        }
    }
}

impl std::error::Error for AlignError {}
