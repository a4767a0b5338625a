use thiserror::Error;

use crate::reference::Ref;

/// Errors reported by the [`Bdd`][crate::bdd::Bdd] manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BddError {
    #[error("variable {var} is out of range 0..{var_num}")]
    VariableOutOfRange { var: u32, var_num: u32 },

    #[error("cannot decrease the number of variables from {current} to {requested}")]
    DecreasingVarNum { current: u32, requested: u32 },

    #[error("node {0} is not a live node of this manager")]
    InvalidNode(Ref),

    #[error("terminal {0} has no variable and no children")]
    TerminalNode(Ref),

    #[error("polarity {0} is not a constant")]
    NonConstantPolarity(Ref),

    #[error("{0} does not encode a variable set")]
    NotAVariableSet(Ref),

    #[error("variable block {first}..={last} partially overlaps an existing block")]
    PartialBlockOverlap { first: u32, last: u32 },

    #[error("variables {first}..={last} do not form a block in the current order")]
    InvalidBlock { first: u32, last: u32 },

    #[error("variables cannot be swapped while variable blocks are declared")]
    SwapWithBlocks,

    #[error("node table cannot grow beyond {0} nodes")]
    NodeTableExhausted(usize),

    #[error("invalid kernel state: {0}")]
    InvalidState(String),

    #[error("computation canceled")]
    Canceled,
}

impl BddError {
    /// Cancellation is an outcome requested by a handler, not a failure of the kernel.
    pub fn is_canceled(&self) -> bool {
        matches!(self, BddError::Canceled)
    }
}

pub type Result<T> = std::result::Result<T, BddError>;

/// Early exit from a recursive kernel algorithm.
#[derive(Debug)]
pub(crate) enum Interrupt {
    /// The computation handler declined to continue.
    Canceled,
    /// The node table wants an automatic reordering before the operation is retried.
    Reorder,
    Failed(BddError),
}

impl From<BddError> for Interrupt {
    fn from(error: BddError) -> Self {
        Interrupt::Failed(error)
    }
}

impl Interrupt {
    /// Error reported to the caller of a top-level operation.
    pub(crate) fn into_error(self) -> BddError {
        match self {
            Interrupt::Canceled => BddError::Canceled,
            Interrupt::Reorder => BddError::InvalidState("reordering requested outside an operation".to_string()),
            Interrupt::Failed(error) => error,
        }
    }
}
