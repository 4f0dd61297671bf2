use std::{fmt, io, str::Utf8Error};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("input truncated while reading {field}: needed {needed} bytes at offset {offset}")]
    Truncated {
        field: &'static str,
        needed: usize,
        offset: usize,
    },

    #[error("unexpected value for {field}: expected {expected}, found {actual}")]
    FormatViolation {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("{field} is not valid utf-8: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: Utf8Error,
    },

    #[error("bone hierarchy is not a single rooted tree: {0}")]
    Structural(TreeViolation),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("an i/o error occurred: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse obj file: {0}")]
    ObjParse(#[from] tobj::LoadError),

    #[error("failed to read config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Payload-free classification of a [`MeshError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Truncated,
    FormatViolation,
    Decode,
    Structural,
    Argument,
    Io,
    ObjParse,
    Config,
}

impl MeshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::Truncated { .. } => ErrorKind::Truncated,
            MeshError::FormatViolation { .. } => ErrorKind::FormatViolation,
            MeshError::Decode { .. } => ErrorKind::Decode,
            MeshError::Structural(_) => ErrorKind::Structural,
            MeshError::Argument(_) => ErrorKind::Argument,
            MeshError::Io(_) => ErrorKind::Io,
            MeshError::ObjParse(_) => ErrorKind::ObjParse,
            MeshError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Reason a bone set failed tree validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeViolation {
    NoRoot,
    MultipleRoots { first: usize, second: usize },
    DanglingChildReference { bone: usize, child: u32 },
    ParentChildMismatch { parent: usize, child: usize, declared_parent: i32 },
    Disconnected { reachable: usize, total: usize },
    CycleDetected { bone: usize },
}

impl TreeViolation {
    pub fn name(&self) -> &'static str {
        match self {
            TreeViolation::NoRoot => "no-root",
            TreeViolation::MultipleRoots { .. } => "multiple-roots",
            TreeViolation::DanglingChildReference { .. } => "dangling-child-reference",
            TreeViolation::ParentChildMismatch { .. } => "parent-child-mismatch",
            TreeViolation::Disconnected { .. } => "disconnected",
            TreeViolation::CycleDetected { .. } => "cycle-detected",
        }
    }
}

impl fmt::Display for TreeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeViolation::NoRoot => write!(f, "{} (no bone has parent index -1)", self.name()),
            TreeViolation::MultipleRoots { first, second } => {
                write!(f, "{} (bones {} and {})", self.name(), first, second)
            }
            TreeViolation::DanglingChildReference { bone, child } => {
                write!(f, "{} (bone {} lists missing child {})", self.name(), bone, child)
            }
            TreeViolation::ParentChildMismatch { parent, child, declared_parent } => write!(
                f,
                "{} (bone {} lists child {}, whose parent index is {})",
                self.name(),
                parent,
                child,
                declared_parent
            ),
            TreeViolation::Disconnected { reachable, total } => write!(
                f,
                "{} ({} of {} bones reachable from the root)",
                self.name(),
                reachable,
                total
            ),
            TreeViolation::CycleDetected { bone } => {
                write!(f, "{} (bone {} is revisited)", self.name(), bone)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MeshError>;

pub(crate) fn argument_err(message: impl Into<String>) -> MeshError {
    MeshError::Argument(message.into())
}
