//! Errors reported by the assembly entry points.
//!
//! Errors are propagated as [`eyre::Report`]s. The report wraps an [`AssemblyError`] when a
//! precondition on the inputs was violated, a [`LaError`](fenris_la::LaError) when a container
//! rejected an operation, and whatever error a form reported from its element kernel.
use std::error::Error;
use std::fmt;

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// Two lists that must have one entry per block have different lengths.
    BlockCountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A restriction was paired with a dofmap other than the one it restricts.
    RestrictionDofMapMismatch { block: usize },
    /// A block of a block form does not use the function space shared by its block row or column.
    InconsistentBlockForm { row: usize, col: usize },
    /// Every form in a block row is absent, so the row has no function space.
    EmptyBlockRow { row: usize },
    /// Every form in a block column is absent, so the column has no function space.
    EmptyBlockColumn { col: usize },
    /// A container does not have the layout expected by the forms or restrictions.
    ContainerMismatch { expected: usize, actual: usize },
    /// The test and trial spaces of a form live on meshes with different numbers of cells.
    CellCountMismatch { expected: usize, actual: usize },
    /// A degree of freedom is outside the local range of its dofmap.
    DofOutOfBounds { dof: usize, len: usize },
    /// The same degree of freedom was listed twice in the active dofs of a restriction.
    DuplicateActiveDof { dof: usize },
    /// A restriction was constructed without the data needed to number its dofs globally.
    MissingRestrictionPartition,
    /// The partition or ghosts provided for a restriction do not match its active dofs.
    InvalidRestrictionLayout { reason: String },
    /// The block sizes of a matrix do not match the block sizes of a form.
    BlockSizeMismatch { expected: [usize; 2], actual: [usize; 2] },
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockCountMismatch { what, expected, actual } => {
                write!(f, "Expected {} entries in {}, got {}", expected, what, actual)
            }
            Self::RestrictionDofMapMismatch { block } => write!(
                f,
                "Restriction of block {} does not restrict the dofmap of the block",
                block
            ),
            Self::InconsistentBlockForm { row, col } => write!(
                f,
                "Form in block ({}, {}) does not share the function spaces of its block row and column",
                row, col
            ),
            Self::EmptyBlockRow { row } => write!(f, "Block row {} contains no forms", row),
            Self::EmptyBlockColumn { col } => write!(f, "Block column {} contains no forms", col),
            Self::ContainerMismatch { expected, actual } => write!(
                f,
                "Container has local size {}, but at least {} is required",
                actual, expected
            ),
            Self::CellCountMismatch { expected, actual } => {
                write!(f, "Expected {} cells, got {}", expected, actual)
            }
            Self::DofOutOfBounds { dof, len } => {
                write!(f, "Dof {} out of bounds for local size {}", dof, len)
            }
            Self::DuplicateActiveDof { dof } => write!(f, "Active dof {} appears more than once", dof),
            Self::MissingRestrictionPartition => write!(
                f,
                "Restrictions of distributed dofmaps or with ghost dofs require an explicit partition"
            ),
            Self::InvalidRestrictionLayout { reason } => write!(f, "Invalid restriction layout: {}", reason),
            Self::BlockSizeMismatch { expected, actual } => write!(
                f,
                "Matrix has block sizes {:?}, but the form requires {:?}",
                actual, expected
            ),
        }
    }
}

impl Error for AssemblyError {}
