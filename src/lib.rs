//! Strided multidimensional tensors.
//!
//! This crate provides a shape/stride data model, a family of zero-copy view
//! transforms and an elementwise execution engine over shared, reference-counted
//! buffers.
//!
//! # Core Types
//!
//! - [`Shape`]: ordered sequence of dimension sizes (rank 0 denotes a scalar)
//! - [`StridedShape`]: a [`Shape`] plus signed per-axis element strides;
//!   carries all layout arithmetic (displacement, broadcasting, reshape
//!   feasibility) and every view-producing transform
//! - [`Tensor`]: an owning/viewing wrapper pairing a [`StridedShape`] with a
//!   shared [`Buffer`]; cloning a tensor aliases the same buffer
//!
//! # View Transforms
//!
//! `reshape`, `crop`, `slice`, `window`, `permute`, `swap_axes`, `flip`,
//! `split_axis`, `insert_axis`, `upshape` and friends all derive a new
//! [`StridedShape`] and return a wrapper sharing the same buffer — O(1), no
//! data movement. When a zero-copy reshape is infeasible
//! ([`Tensor::can_reshape_to`] returns `false`), materialize first with
//! [`Tensor::sequential`].
//!
//! # Elementwise Engine
//!
//! [`Tensor::apply`], [`Tensor::zip_apply`] and [`Tensor::zip_apply2`] run a
//! per-element operation over one to three shape-aligned operands, with a
//! contiguous fast path, rank-specialized loops for ranks 1–3 and outer-axis
//! recursion beyond that. The `par_*` variants split the outermost axis over a
//! bounded worker pool (blocking fork/join) and fall back to the serial path
//! for small arrays or a single worker.
//!
//! Broadcasting is the *caller's* job: align operand shapes with
//! [`Tensor::upshape`] before invoking the engine. The engine asserts shape
//! compatibility but never broadcasts on its own.
//!
//! # Example
//!
//! ```rust
//! use strided_tensor::Tensor;
//!
//! let a = Tensor::<i32>::arange(12).reshape(&[3, 4]).unwrap();
//! let col = a.crop_axis(1, 1, 2).unwrap();        // zero-copy column view
//! assert_eq!(col.at(&[2, 0]).unwrap(), 9);
//!
//! let b = Tensor::<i32>::arange(3);
//! let c = &a + &b;                                 // broadcast (3,) over (3,4)
//! assert_eq!(c.at(&[2, 1]).unwrap(), 9 + 2);
//! ```
//!
//! # Concurrency Model
//!
//! Parallel passes always partition the outermost axis of the *destination*
//! into disjoint, contiguous index ranges, so two workers never write
//! overlapping memory — provided that axis is not replicated (stride 0). The
//! engine debug-asserts this. Buffer lifetime is protected by atomic reference
//! counting; concurrent mutation through aliased views of the same region is
//! a caller obligation, exactly like any other shared-memory discipline.

mod buffer;
mod display;
mod kernel;
mod ops;
mod reduce;
mod resample;
mod shape;
mod strided;
mod tensor;
pub mod threading;

pub use buffer::{Buffer, RawArrayData};
pub use shape::{broadcast_shape, Shape};
pub use strided::{AxisSlice, StridedShape};
pub use tensor::{Element, Tensor};
pub use threading::{optimal_workers, run_partitioned, AUTO_WORKERS};

/// Minimum number of elements before a `par_*` entry point actually forks.
///
/// Below this the fork/join overhead dominates and the serial path is used.
pub const PARALLEL_MIN_ELEMENTS: usize = 1 << 15;

/// Errors raised by layout arithmetic and view transforms.
///
/// All of these represent invariant violations in the caller rather than
/// recoverable runtime conditions; the engine itself panics on precondition
/// violations (mis-broadcast operands) instead of returning one of these.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// Resolved index (after negative wraparound) outside `[0, size)`.
    #[error("index {index} out of range for axis {axis} of size {size}")]
    IndexOutOfRange {
        axis: usize,
        index: isize,
        size: usize,
    },

    /// Shapes incompatible for the operation (broadcast impossible,
    /// element-count mismatch, non-equal concatenation shapes, ...).
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// The view's strides do not admit a zero-copy reshape; materialize a
    /// sequential copy first.
    #[error("cannot reshape {0:?} into {1:?} without copying")]
    NonReshapable(Vec<usize>, Vec<usize>),

    /// `split_axis` with a part count that does not divide the axis size.
    #[error("axis of size {size} is not divisible into {parts} parts")]
    NonDivisible { size: usize, parts: usize },

    /// Slice bounds produced an axis of non-positive size.
    #[error("slice on axis {axis} produces non-positive size {size}")]
    DegenerateSlice { axis: usize, size: isize },

    /// Slice step of zero.
    #[error("slice step must be non-zero on axis {axis}")]
    ZeroStep { axis: usize },

    /// Axis index (after negative wraparound) outside the tensor's rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: isize, rank: usize },

    /// Axis order that is not a bijection over a prefix of the axes.
    #[error("invalid permutation {0:?}")]
    InvalidPermutation(Vec<usize>),

    /// Foreign memory reports an element size different from the wrapper's
    /// element type.
    #[error("element size mismatch: buffer reports {actual}, element type needs {expected}")]
    ElementSizeMismatch { expected: usize, actual: usize },

    /// Foreign memory is not in row-major order.
    #[error("imported data must be row-major")]
    UnsupportedOrder,

    /// Backing allocation size does not suit the requested shape.
    #[error("buffer of {got} elements cannot back shape {dims:?} ({needed} elements)")]
    BufferSizeMismatch {
        needed: usize,
        got: usize,
        dims: Vec<usize>,
    },
}

/// Result type for strided tensor operations.
pub type Result<T> = std::result::Result<T, TensorError>;
