use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// A write would overflow a fixed-size output, or a growable output's maximum size. Nothing
    /// of the failed primitive has been written.
    CapacityExceeded { needed: usize, available: usize },
    /// Fewer bytes remained in the input than the encoding requires.
    Underflow {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// The input bytes don't form a valid encoding: runaway varints, bad UTF-8, unknown markers,
    /// field spans whose content doesn't match their length prefix, and the like.
    MalformedEncoding(String),
    /// The type isn't in the registry, and registration is required (or the type can't be
    /// registered implicitly).
    UnregisteredType(String),
    /// The type was already registered.
    DuplicateRegistration(String),
    /// A backreference named an index that was never populated in this read.
    DanglingReference { index: usize },
    /// A value didn't fit the type declared for it.
    TypeMismatch { expected: String, actual: String },
    /// A field list that the bound strategy can't serve.
    InvalidDescriptor(String),
    /// Versioned data was written by a newer schema than the reader knows about.
    UnknownVersion { found: u32, supported: u32 },
    /// Objects nested deeper than [`MAX_DEPTH`][crate::MAX_DEPTH]. Usually an untracked cycle.
    DepthLimit(usize),
    /// The writer behind a streaming output failed.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::CapacityExceeded { needed, available } => write!(
                f,
                "Output capacity exceeded: needed {} more bytes, only {} available",
                needed, available
            ),
            Error::Underflow {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected {} bytes, but only {} remain on step [{}]",
                expected, actual, step
            ),
            Error::MalformedEncoding(ref err) => write!(f, "Malformed encoding: {}", err),
            Error::UnregisteredType(ref name) => write!(f, "Type is not registered: {}", name),
            Error::DuplicateRegistration(ref name) => {
                write!(f, "Type is already registered: {}", name)
            }
            Error::DanglingReference { index } => {
                write!(f, "Backreference to unpopulated index {}", index)
            }
            Error::TypeMismatch {
                ref expected,
                ref actual,
            } => write!(f, "Expected type {}, but got {}", expected, actual),
            Error::InvalidDescriptor(ref err) => write!(f, "Invalid field descriptor: {}", err),
            Error::UnknownVersion { found, supported } => write!(
                f,
                "Data written at version {}, but reader only supports up to version {}",
                found, supported
            ),
            Error::DepthLimit(depth) => write!(f, "Hit nesting depth limit of {}", depth),
            Error::Io(_) => write!(f, "Output stream failed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl Error {
    pub(crate) fn underflow(step: &'static str, actual: usize, expected: usize) -> Self {
        Error::Underflow {
            step,
            actual,
            expected,
        }
    }

    pub(crate) fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
