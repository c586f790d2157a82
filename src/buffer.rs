//! Shared, reference-counted element buffers.
//!
//! A [`Buffer`] is a single contiguous allocation created exactly once (by an
//! owning tensor or a foreign loader) and never resized. Every derived view
//! clones the handle; the allocation is released when the last handle drops.
//!
//! Mutation happens through raw pointers handed out to the execution engine.
//! The buffer does not police aliasing — disjointness of concurrent writes is
//! the engine's partitioning invariant, and overlapping mutation through
//! aliased views is a caller obligation (see the crate-level docs).

use std::any::Any;
use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::{Result, TensorError};

/// Owned backing storage. The `UnsafeCell` legitimizes shared mutation of the
/// element data through the raw pointer the buffer hands out.
struct OwnedMem<T>(UnsafeCell<Vec<T>>);

// Safety: all access goes through Buffer's raw pointer; the engine guarantees
// disjoint concurrent writes and callers guarantee aliased views are not
// mutated concurrently.
unsafe impl<T: Send> Send for OwnedMem<T> {}
unsafe impl<T: Send> Sync for OwnedMem<T> {}

/// A shared handle to one contiguous element allocation.
///
/// Cloning is O(1) and only bumps the atomic reference count. The handle pair
/// `(ptr, owner)` also supports adopting foreign memory (e.g. a columnar-file
/// import): the `owner` keeps the foreign allocation alive for as long as any
/// tensor references it.
pub struct Buffer<T> {
    ptr: *mut T,
    len: usize,
    owner: Arc<dyn Any + Send + Sync>,
}

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Buffer {
            ptr: self.ptr,
            len: self.len,
            owner: Arc::clone(&self.owner),
        }
    }
}

// Safety: the pointer is valid for the owner's lifetime, which the Arc pins;
// cross-thread use follows the engine's write-disjointness discipline.
unsafe impl<T: Send + Sync> Send for Buffer<T> {}
unsafe impl<T: Send + Sync> Sync for Buffer<T> {}

impl<T: 'static + Send + Sync> Buffer<T> {
    /// Allocate `len` default-initialized elements.
    pub fn alloc(len: usize) -> Self
    where
        T: Default + Clone,
    {
        Buffer::from_vec(vec![T::default(); len])
    }

    /// Take ownership of an existing vector without copying.
    pub fn from_vec(values: Vec<T>) -> Self {
        let len = values.len();
        let owner = Arc::new(OwnedMem(UnsafeCell::new(values)));
        // Take the pointer only after the Vec reached its final home.
        let ptr = unsafe { (*owner.0.get()).as_mut_ptr() };
        Buffer { ptr, len, owner }
    }

    /// Adopt a foreign allocation.
    ///
    /// # Safety
    /// `ptr` must point to `len` initialized, properly aligned elements of
    /// `T` that stay valid and unmoved for as long as `owner` is alive, and
    /// nothing else may free them while `owner` lives.
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        len: usize,
        owner: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Buffer { ptr, len, owner }
    }

    /// Number of elements in the allocation.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base pointer of the allocation.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    /// The type-erased ownership handle (exposed for interop with loaders
    /// that track buffer lifetimes themselves).
    pub fn owner(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.owner)
    }

    /// Number of live handles to this allocation.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.owner)
    }

    /// True if both handles reference the same allocation.
    pub fn same_allocation(&self, other: &Buffer<T>) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner)
    }
}

/// Import record produced by an external array loader (the contract of a
/// columnar/array-file reader, without the reader itself).
///
/// The core adopts `data` without copying; it only verifies that the loader's
/// reported element size matches the wrapper's element type and that the data
/// is row-major.
pub struct RawArrayData {
    /// Element count per axis, outermost first.
    pub dims: Vec<usize>,
    /// Size of one element in bytes, as reported by the loader.
    pub elem_size: usize,
    /// Whether the data is laid out row-major (required).
    pub row_major: bool,
    /// Base pointer of the loaded allocation.
    pub ptr: *mut u8,
    /// Handle keeping the loaded allocation alive.
    pub owner: Arc<dyn Any + Send + Sync>,
}

impl RawArrayData {
    /// Validate the record against element type `T` and produce a typed
    /// buffer sharing the loader's allocation.
    ///
    /// # Safety
    /// The record must describe memory satisfying the contract of
    /// [`Buffer::from_raw_parts`] once reinterpreted as `T`.
    pub unsafe fn into_buffer<T: 'static + Send + Sync>(self) -> Result<Buffer<T>> {
        if self.elem_size != std::mem::size_of::<T>() {
            return Err(TensorError::ElementSizeMismatch {
                expected: std::mem::size_of::<T>(),
                actual: self.elem_size,
            });
        }
        if !self.row_major {
            return Err(TensorError::UnsupportedOrder);
        }
        let len: usize = self.dims.iter().product();
        Ok(Buffer::from_raw_parts(self.ptr as *mut T, len, self.owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_allocation() {
        let a = Buffer::<f64>::from_vec(vec![1.0, 2.0, 3.0]);
        let b = a.clone();
        assert!(a.same_allocation(&b));
        assert_eq!(a.handle_count(), 2);
        drop(b);
        assert_eq!(a.handle_count(), 1);
    }

    #[test]
    fn test_separate_allocations() {
        let a = Buffer::<f64>::from_vec(vec![1.0]);
        let b = Buffer::<f64>::from_vec(vec![1.0]);
        assert!(!a.same_allocation(&b));
    }

    #[test]
    fn test_raw_import_checks_elem_size() {
        let mut backing = vec![0u8; 12];
        let raw = RawArrayData {
            dims: vec![3],
            elem_size: 4,
            row_major: true,
            ptr: backing.as_mut_ptr(),
            owner: Arc::new(()),
        };
        let res = unsafe { raw.into_buffer::<f64>() };
        assert!(matches!(
            res,
            Err(TensorError::ElementSizeMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_raw_import_requires_row_major() {
        let mut backing = vec![0u8; 12];
        let raw = RawArrayData {
            dims: vec![3],
            elem_size: 4,
            row_major: false,
            ptr: backing.as_mut_ptr(),
            owner: Arc::new(()),
        };
        assert!(matches!(
            unsafe { raw.into_buffer::<f32>() },
            Err(TensorError::UnsupportedOrder)
        ));
    }

    #[test]
    fn test_raw_import_adopts_without_copy() {
        // Keep the allocation alive through the owner handle, the way a
        // loader would hand it over.
        let backing: Arc<OwnedMem<f32>> =
            Arc::new(OwnedMem(UnsafeCell::new(vec![1.0f32, 2.0, 3.0])));
        let ptr = unsafe { (*backing.0.get()).as_mut_ptr() };
        let raw = RawArrayData {
            dims: vec![3],
            elem_size: 4,
            row_major: true,
            ptr: ptr as *mut u8,
            owner: backing,
        };
        let buf = unsafe { raw.into_buffer::<f32>() }.unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.as_ptr(), ptr);
    }
}
