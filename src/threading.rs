//! Blocking fork/join execution over a bounded worker pool.
//!
//! The only primitive is [`run_partitioned`]: split `[begin, end)` into
//! contiguous, non-overlapping ranges, hand each to a worker, run the final
//! range on the calling thread (saving one handoff) and return only once
//! every range completed. There is no cancellation, no timeout and no other
//! suspension point anywhere in the crate.
//!
//! The parallel engine entry points in this module split the *outermost* axis
//! of the destination operand. Two ranges of that axis never address
//! overlapping memory as long as the axis is not replicated (stride 0), which
//! is the invariant that makes concurrent writes safe; it is checked with a
//! debug assertion.

use smallvec::SmallVec;

use crate::kernel::{apply1, apply2, apply3, RawOperand};
use crate::PARALLEL_MIN_ELEMENTS;

/// Worker count meaning "let the executor decide".
pub const AUTO_WORKERS: usize = 0;

/// Scratch space for per-chunk dims; 8 axes cover any realistic rank.
type DimsVec = SmallVec<[usize; 8]>;

/// A raw pointer that may cross thread boundaries.
///
/// Safety rests on the partitioning discipline above: each worker only
/// touches the disjoint range it was handed.
struct SendPtr<T>(*mut T);

impl<T> Clone for SendPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SendPtr<T> {}

unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
    #[inline]
    fn get(self) -> *mut T {
        self.0
    }
}

/// Number of workers the platform considers optimal.
pub fn optimal_workers() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

/// Partition `[begin, end)` into at most `num_workers` contiguous ranges and
/// invoke `f(sub_begin, sub_end)` on each, blocking until all complete.
///
/// `num_workers == AUTO_WORKERS` asks the executor for its optimal count; the
/// count is always clamped to the range length. With one worker (or an empty
/// range) `f` runs inline on the calling thread. The final range always runs
/// on the calling thread rather than being dispatched.
pub fn run_partitioned<F>(num_workers: usize, begin: usize, end: usize, f: F)
where
    F: Fn(usize, usize) + Sync,
{
    debug_assert!(begin <= end);
    let len = end - begin;
    let mut n = if num_workers == AUTO_WORKERS {
        optimal_workers()
    } else {
        num_workers.min(optimal_workers())
    };
    n = n.min(len).max(1);
    if n <= 1 {
        f(begin, end);
        return;
    }

    #[cfg(feature = "parallel")]
    {
        let fref = &f;
        rayon::scope(|scope| {
            for i in 0..n {
                let sub_begin = begin + len * i / n;
                let sub_end = begin + len * (i + 1) / n;
                if i + 1 == n {
                    fref(sub_begin, sub_end);
                } else {
                    scope.spawn(move |_| fref(sub_begin, sub_end));
                }
            }
        });
    }
    #[cfg(not(feature = "parallel"))]
    f(begin, end);
}

#[inline]
fn serial_cutoff<T>(t: &RawOperand<T>) -> bool {
    t.rank() == 0 || t.len() < PARALLEL_MIN_ELEMENTS || optimal_workers() <= 1
}

#[inline]
fn assert_split_axis_writable<T>(t: &RawOperand<T>) {
    debug_assert!(
        t.strides[0] != 0 || t.dims[0] <= 1,
        "parallel split over a replicated outermost axis would race"
    );
}

/// Parallel unary pass: chunk the outermost axis of `t`.
///
/// # Safety
/// Same memory contract as [`apply1`]; additionally the chunks written by
/// different workers must be disjoint, which holds when `t`'s outermost axis
/// has non-zero stride.
pub(crate) unsafe fn apply1_parallel<T, F>(t: RawOperand<T>, f: &F)
where
    F: Fn(*mut T) + Sync,
{
    if serial_cutoff(&t) {
        return apply1(t, &mut |p| f(p));
    }
    assert_split_axis_writable(&t);
    let ptr = SendPtr(t.ptr);
    let (dims, strides) = (t.dims, t.strides);
    run_partitioned(AUTO_WORKERS, 0, dims[0], move |sub_begin, sub_end| {
        let mut sub_dims: DimsVec = SmallVec::from_slice(dims);
        sub_dims[0] = sub_end - sub_begin;
        let sub = RawOperand {
            ptr: unsafe { ptr.get().offset(sub_begin as isize * strides[0]) },
            dims: &sub_dims,
            strides,
        };
        unsafe { apply1(sub, &mut |p| f(p)) };
    });
}

/// Parallel binary pass: chunk the outermost axis of both operands.
///
/// # Safety
/// Same memory contract as [`apply2`] plus the write-disjointness condition
/// of [`apply1_parallel`].
pub(crate) unsafe fn apply2_parallel<T, A, F>(t: RawOperand<T>, a: RawOperand<A>, f: &F)
where
    F: Fn(*mut T, *const A) + Sync,
{
    if serial_cutoff(&t) {
        return apply2(t, a, &mut |p, q| f(p, q));
    }
    assert_split_axis_writable(&t);
    let tp = SendPtr(t.ptr);
    let ap = SendPtr(a.ptr);
    let (t_dims, t_strides) = (t.dims, t.strides);
    let (a_dims, a_strides) = (a.dims, a.strides);
    run_partitioned(AUTO_WORKERS, 0, t_dims[0], move |sub_begin, sub_end| {
        let mut t_sub: DimsVec = SmallVec::from_slice(t_dims);
        let mut a_sub: DimsVec = SmallVec::from_slice(a_dims);
        t_sub[0] = sub_end - sub_begin;
        a_sub[0] = sub_end - sub_begin;
        let t_chunk = RawOperand {
            ptr: unsafe { tp.get().offset(sub_begin as isize * t_strides[0]) },
            dims: &t_sub,
            strides: t_strides,
        };
        let a_chunk = RawOperand {
            ptr: unsafe { ap.get().offset(sub_begin as isize * a_strides[0]) },
            dims: &a_sub,
            strides: a_strides,
        };
        unsafe { apply2(t_chunk, a_chunk, &mut |p, q| f(p, q)) };
    });
}

/// Parallel ternary pass: chunk the outermost axis of all three operands.
///
/// # Safety
/// Same memory contract as [`apply3`] plus the write-disjointness condition
/// of [`apply1_parallel`].
pub(crate) unsafe fn apply3_parallel<T, A, B, F>(
    t: RawOperand<T>,
    a: RawOperand<A>,
    b: RawOperand<B>,
    f: &F,
) where
    F: Fn(*mut T, *const A, *const B) + Sync,
{
    if serial_cutoff(&t) {
        return apply3(t, a, b, &mut |p, q, r| f(p, q, r));
    }
    assert_split_axis_writable(&t);
    let tp = SendPtr(t.ptr);
    let ap = SendPtr(a.ptr);
    let bp = SendPtr(b.ptr);
    let (t_dims, t_strides) = (t.dims, t.strides);
    let (a_dims, a_strides) = (a.dims, a.strides);
    let (b_dims, b_strides) = (b.dims, b.strides);
    run_partitioned(AUTO_WORKERS, 0, t_dims[0], move |sub_begin, sub_end| {
        let mut t_sub: DimsVec = SmallVec::from_slice(t_dims);
        let mut a_sub: DimsVec = SmallVec::from_slice(a_dims);
        let mut b_sub: DimsVec = SmallVec::from_slice(b_dims);
        t_sub[0] = sub_end - sub_begin;
        a_sub[0] = sub_end - sub_begin;
        b_sub[0] = sub_end - sub_begin;
        let t_chunk = RawOperand {
            ptr: unsafe { tp.get().offset(sub_begin as isize * t_strides[0]) },
            dims: &t_sub,
            strides: t_strides,
        };
        let a_chunk = RawOperand {
            ptr: unsafe { ap.get().offset(sub_begin as isize * a_strides[0]) },
            dims: &a_sub,
            strides: a_strides,
        };
        let b_chunk = RawOperand {
            ptr: unsafe { bp.get().offset(sub_begin as isize * b_strides[0]) },
            dims: &b_sub,
            strides: b_strides,
        };
        unsafe { apply3(t_chunk, a_chunk, b_chunk, &mut |p, q, r| f(p, q, r)) };
    });
}
