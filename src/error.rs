/// Result alias for `phylonet`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by loading, graph construction and the experiment driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input was empty (no nodes, no strata, no results).
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// A required column is absent from a table header.
    #[error("missing required column '{column}' in {table}")]
    MissingColumn {
        /// Column that was looked up.
        column: String,
        /// Table being read.
        table: &'static str,
    },

    /// A row could not be interpreted.
    #[error("malformed row {line} in {table}: {message}")]
    MalformedRow {
        /// 1-based record number.
        line: usize,
        /// Table being read.
        table: &'static str,
        /// What went wrong.
        message: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Partition length does not match the graph.
    #[error("membership has {found} entries, graph has {expected} nodes")]
    DimensionMismatch {
        /// Node count of the graph.
        expected: usize,
        /// Length of the membership vector.
        found: usize,
    },

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A delimited table could not be parsed or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The JSON summary could not be serialised.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
