use alloc::string::String;
use core::{error, fmt};

/// Errors raised whilst estimating spectra.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Argument passed into a function was invalid.
    InvalidArg {
        /// The invalid arg.
        arg: String,
        /// Explaining why arg is invalid.
        reason: String,
    },
    /// Execution hit a state that validated inputs should never produce.
    ExecInvariantViolation {
        /// Why execution could not proceed.
        reason: String,
    },
}

impl Error {
    /// Shorthand for [`Error::InvalidArg`].
    pub fn invalid_arg(arg: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArg {
            arg: arg.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::ExecInvariantViolation`].
    pub fn invariant(reason: impl Into<String>) -> Self {
        Error::ExecInvariantViolation {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArg { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            Error::ExecInvariantViolation { reason } => {
                write!(f, "Execution invariant violation: {reason}")
            }
        }
    }
}

impl error::Error for Error {}

/// Result alias used throughout `sci-spectral`.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_names_argument_and_reason() {
        let err = Error::invalid_arg("noverlap", "noverlap must be less than nperseg.");
        assert_eq!(
            err.to_string(),
            "Invalid argument `noverlap`: noverlap must be less than nperseg."
        );
    }

    #[test]
    fn shorthand_matches_struct_literal() {
        assert_eq!(
            Error::invariant("segment stack lost its layout"),
            Error::ExecInvariantViolation {
                reason: "segment stack lost its layout".into()
            }
        );
    }
}
