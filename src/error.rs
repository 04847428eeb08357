use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! unsupported_error {
    ($msg:expr) => {
        crate::Error::UnsupportedConstruct {
            construct: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::UnsupportedConstruct {
            construct: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! resolution_error {
    ($msg:expr) => {
        crate::Error::ResolutionFailure {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::ResolutionFailure {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! lookup_miss {
    ($msg:expr) => {
        crate::Error::LookupMiss($msg.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::LookupMiss(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure in this crate is deterministic: each operation is a pure function of
/// already-resolved in-memory structures, so nothing is ever retried. All variants propagate
/// to the pipeline caller, which aborts processing of the module being transformed.
///
/// # Error Categories
///
/// ## Codec / Assembler Errors
/// - [`Error::UnsupportedConstruct`] - Opcode, instruction kind or feature that is
///   deliberately not implemented
/// - [`Error::StackConsistencyViolation`] - Control-flow edges disagree on operand stack depth
///
/// ## Resolution Errors
/// - [`Error::ResolutionFailure`] - A foreign handle whose scope cannot be mapped
/// - [`Error::LookupMiss`] - A missing parameter, local or generic-parameter position
///
/// ## Input Errors
/// - [`Error::Malformed`] - Inconsistent or corrupted foreign module data
///
/// # Examples
///
/// ```rust
/// use cilbridge::{Error, Result};
///
/// fn check(result: Result<()>) {
///     match result {
///         Ok(()) => println!("pass completed"),
///         Err(Error::UnsupportedConstruct { construct, .. }) => {
///             eprintln!("not implemented: {construct}");
///         }
///         Err(Error::StackConsistencyViolation { offset, expected, actual }) => {
///             eprintln!("bad merge at {offset}: {expected} vs {actual}");
///         }
///         Err(e) => eprintln!("error: {e}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An opcode, instruction kind or feature that this library deliberately does not implement.
    ///
    /// Typed-reference opcodes, alignment/volatility prefixes and the assembly of bodies with
    /// exception-protected regions fall into this category. Fatal and never retried. Note that
    /// *wholly unrecognized* decode input does not raise this error; it degrades to an
    /// offset-preserving placeholder instead, so that branch arithmetic stays valid.
    ///
    /// # Fields
    ///
    /// * `construct` - Description of the unimplemented construct
    /// * `file` - Source file where the gap was hit
    /// * `line` - Source line where the gap was hit
    #[error("Unsupported construct - {file}:{line}: {construct}")]
    UnsupportedConstruct {
        /// Description of the construct that is not implemented
        construct: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A foreign handle whose scope maps to neither a known external reference nor the
    /// current module.
    ///
    /// Indicates a malformed or unsupported input module. Fatal and non-recoverable.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what could not be resolved
    /// * `file` - Source file where the failure was detected
    /// * `line` - Source line where the failure was detected
    #[error("Resolution failure - {file}:{line}: {message}")]
    ResolutionFailure {
        /// The message describing the unresolvable handle
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Two control-flow edges into one block disagree on the operand stack depth.
    ///
    /// A valid three-address control-flow graph has exactly one consistent stack depth per
    /// block entry; the assembler verifies this invariant and never repairs a violation.
    /// Indicates invalid three-address input, not a recoverable runtime condition.
    #[error(
        "Stack consistency violation at statement {offset}: recorded entry depth {expected}, incoming edge carries {actual}"
    )]
    StackConsistencyViolation {
        /// Statement index of the block entry where the depths disagree
        offset: u32,
        /// The entry depth recorded by an earlier edge
        expected: usize,
        /// The depth carried by the conflicting edge
        actual: usize,
    },

    /// A missing parameter index, local index or generic-parameter position.
    ///
    /// This is a contract violation between pipeline stages, not a user-facing condition.
    #[error("Lookup miss - {0}")]
    LookupMiss(String),

    /// The foreign module data is damaged or internally inconsistent.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the malformation was detected
    /// * `line` - Source line where the malformation was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}
