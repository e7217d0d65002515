use thiserror::Error; // Import the `Error` derive macro from the `thiserror` crate

// Everything that can stop a block from being evaluated. None of these abort a
// template render; the block adapter reports them and renders nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    // Neither bound was supplied
    #[error("At least one parameter of 'start' or 'end' must be provided")]
    MissingBounds,

    // A bound (or the `use_time` override) did not parse as a date/time
    #[error("Invalid value passed for parameter '{param}': {value}")]
    InvalidTimestamp { param: String, value: String },

    // Both bounds parsed but start is later than end
    #[error("'start' value may not exceed 'end' value")]
    InvertedRange,

    // The registry has no block function under this name
    #[error("unknown block function: {0}")]
    UnknownBlock(String),

    // Date text that the relative-expression grammar rejected
    #[error("parse error: {0}")]
    Parse(String),
}

impl BlockError {
    pub fn invalid_timestamp(param: impl Into<String>, value: impl Into<String>) -> Self {
        BlockError::InvalidTimestamp {
            param: param.into(),
            value: value.into(),
        }
    }
}

// Type alias for results that use `BlockError` as the error type
pub type Result<T> = std::result::Result<T, BlockError>;
