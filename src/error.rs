use thiserror::Error;

/// Errors returned by clustering algorithms in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// Number of points does not match the number of labels in a fit.
    #[error("length mismatch: expected {expected} points, found {found}")]
    LengthMismatch {
        /// Number of labeled points in the fit.
        expected: usize,
        /// Number of points supplied.
        found: usize,
    },

    /// A pluggable refiner or split test failed, or returned an unusable result.
    ///
    /// The fit call that observed it is aborted; no partial result is produced.
    #[error("{stage} failed: {source}")]
    Subroutine {
        /// Which step of the round produced the failure (`"refine"` or `"split_test"`).
        stage: &'static str,
        /// The strategy's own error.
        #[source]
        source: Box<Error>,
    },

    /// Other error, for use by user-supplied strategies.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error reports malformed input or out-of-range parameters.
    ///
    /// These are always detected before the first round runs.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::EmptyInput
                | Error::InvalidParameter { .. }
                | Error::InvalidClusterCount { .. }
                | Error::DimensionMismatch { .. }
                | Error::LengthMismatch { .. }
        )
    }

    /// Whether this error came from a pluggable strategy.
    pub fn is_subroutine(&self) -> bool {
        matches!(self, Error::Subroutine { .. })
    }

    pub(crate) fn subroutine(stage: &'static str, cause: Error) -> Self {
        Error::Subroutine {
            stage,
            source: Box::new(cause),
        }
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
