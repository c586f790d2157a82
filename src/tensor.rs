//! The owning/viewing tensor wrapper.
//!
//! A [`Tensor`] pairs a [`StridedShape`] with a shared [`Buffer`] handle and a
//! base displacement. Cloning a tensor is a reference-style rebinding: the
//! clone aliases the same buffer through a new handle. Value-style assignment
//! is explicit via [`Tensor::copy_values_from`], which writes the source's
//! elements through the existing footprint.
//!
//! Every transform method derives a new layout (and possibly a new base
//! displacement) and returns a wrapper sharing the same buffer — O(1), no
//! data movement. Computational methods route through the execution engine.

use num_traits::{AsPrimitive, Float, One, Zero};
use rand::distributions::uniform::SampleUniform;
use rand::Rng;

use crate::buffer::{Buffer, RawArrayData};
use crate::kernel::{self, RawOperand};
use crate::shape::resolve_index;
use crate::strided::AxisSlice;
use crate::threading;
use crate::{Result, Shape, StridedShape, TensorError};

/// Blanket bound for tensor element types.
///
/// `Default` provides the value fresh buffers are initialized with (zero for
/// the numeric primitives); `Send + Sync` lets the parallel engine move
/// chunks across workers.
pub trait Element: Copy + Default + Send + Sync + 'static {}

impl<T: Copy + Default + Send + Sync + 'static> Element for T {}

/// A strided multidimensional array over a shared buffer.
///
/// See the crate-level docs for the data model and aliasing rules.
pub struct Tensor<T> {
    layout: StridedShape,
    base: isize,
    buf: Buffer<T>,
}

impl<T> Clone for Tensor<T> {
    fn clone(&self) -> Self {
        Tensor {
            layout: self.layout.clone(),
            base: self.base,
            buf: self.buf.clone(),
        }
    }
}

impl<T: Element> Tensor<T> {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Allocate a new buffer for `shape`, default-initialized.
    pub fn new<S: Into<Shape>>(shape: S) -> Self {
        let shape = shape.into();
        let buf = Buffer::alloc(shape.num_elements());
        Tensor {
            layout: StridedShape::new(shape),
            base: 0,
            buf,
        }
    }

    /// Allocate and fill with `value`.
    pub fn from_elem<S: Into<Shape>>(shape: S, value: T) -> Self {
        let mut t = Tensor::new(shape);
        t.fill(value);
        t
    }

    pub fn zeros<S: Into<Shape>>(shape: S) -> Self
    where
        T: Zero,
    {
        Tensor::from_elem(shape, T::zero())
    }

    pub fn ones<S: Into<Shape>>(shape: S) -> Self
    where
        T: One,
    {
        Tensor::from_elem(shape, T::one())
    }

    /// Rank-0 tensor holding a single value.
    pub fn scalar(value: T) -> Self {
        let mut t = Tensor::new(Shape::scalar());
        t.fill(value);
        t
    }

    /// Wrap an existing vector without copying; its length must equal the
    /// shape's element count.
    pub fn from_vec<S: Into<Shape>>(shape: S, values: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        let needed = shape.num_elements();
        if values.len() != needed {
            return Err(TensorError::BufferSizeMismatch {
                needed,
                got: values.len(),
                dims: shape.dims().to_vec(),
            });
        }
        Ok(Tensor {
            layout: StridedShape::new(shape),
            base: 0,
            buf: Buffer::from_vec(values),
        })
    }

    /// 2-D tensor from row slices; all rows must share one length.
    pub fn from_rows(rows: &[&[T]]) -> Result<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, |r| r.len());
        let mut values = Vec::with_capacity(nrows * ncols);
        for row in rows {
            if row.len() != ncols {
                return Err(TensorError::ShapeMismatch(
                    vec![nrows, ncols],
                    vec![row.len()],
                ));
            }
            values.extend_from_slice(row);
        }
        Tensor::from_vec([nrows, ncols], values)
    }

    /// `[0, 1, ..., n-1]` as a rank-1 tensor.
    pub fn arange(n: usize) -> Self
    where
        usize: AsPrimitive<T>,
    {
        let values: Vec<T> = (0..n).map(|i| i.as_()).collect();
        Tensor {
            layout: StridedShape::new(Shape::from([n])),
            base: 0,
            buf: Buffer::from_vec(values),
        }
    }

    /// `n` evenly spaced values over `[min, max]` (both ends included).
    pub fn linspace(min: T, max: T, n: usize) -> Self
    where
        T: Float,
        usize: AsPrimitive<T>,
    {
        let values: Vec<T> = if n == 1 {
            vec![min]
        } else {
            let span: T = max - min;
            let denom: T = (n - 1).as_();
            (0..n).map(|i| min + span * i.as_() / denom).collect()
        };
        Tensor {
            layout: StridedShape::new(Shape::from([n])),
            base: 0,
            buf: Buffer::from_vec(values),
        }
    }

    /// Uniform random values in `[min, max)` from the thread-local generator.
    pub fn random<S: Into<Shape>>(shape: S, min: T, max: T) -> Self
    where
        T: SampleUniform + PartialOrd,
    {
        Tensor::random_with(&mut rand::thread_rng(), shape, min, max)
    }

    /// Uniform random values in `[min, max)` from a caller-supplied generator.
    pub fn random_with<R: Rng + ?Sized, S: Into<Shape>>(
        rng: &mut R,
        shape: S,
        min: T,
        max: T,
    ) -> Self
    where
        T: SampleUniform + PartialOrd,
    {
        let shape = shape.into();
        let values: Vec<T> = (0..shape.num_elements())
            .map(|_| rng.gen_range(min..max))
            .collect();
        Tensor {
            layout: StridedShape::new(shape),
            base: 0,
            buf: Buffer::from_vec(values),
        }
    }

    /// Grid of per-position indices: one trailing channel per axis of `shape`,
    /// so `index_grid([2, 2])` is `[[[0,0],[0,1]],[[1,0],[1,1]]]`.
    pub fn index_grid<S: Into<Shape>>(shape: S) -> Self
    where
        usize: AsPrimitive<T>,
    {
        let shape = shape.into();
        let nc = shape.ndim();
        let mut res_shape = shape.clone();
        res_shape.append_axis(nc);
        let cc = res_shape.cumulative_count();
        let mut res = Tensor::new(res_shape);
        // A fresh tensor is sequential, so the engine walks it in row-major
        // logical order and a running counter recovers the position.
        let mut i = 0usize;
        res.apply(|t| {
            let c = i % nc;
            *t = ((i / cc[c + 1]) % shape.dim(c)).as_();
            i += 1;
        });
        res
    }

    /// Wrap a shared buffer with a canonical row-major layout. The buffer
    /// must hold at least `shape.num_elements()` elements.
    pub fn from_buffer<S: Into<Shape>>(shape: S, buf: Buffer<T>) -> Result<Self> {
        let shape = shape.into();
        let needed = shape.num_elements();
        if buf.len() < needed {
            return Err(TensorError::BufferSizeMismatch {
                needed,
                got: buf.len(),
                dims: shape.dims().to_vec(),
            });
        }
        Ok(Tensor {
            layout: StridedShape::new(shape),
            base: 0,
            buf,
        })
    }

    /// Adopt foreign memory described by a loader's import record, without
    /// copying. The loader's element size must match `T` and the data must be
    /// row-major.
    ///
    /// # Safety
    /// The record must describe valid memory per [`RawArrayData::into_buffer`].
    pub unsafe fn adopt_raw(raw: RawArrayData) -> Result<Self> {
        let shape = Shape::from(raw.dims.clone());
        let buf = raw.into_buffer::<T>()?;
        Tensor::from_buffer(shape, buf)
    }

    /// View constructor: the same buffer seen through a derived layout and
    /// base displacement.
    #[inline]
    fn derive(&self, layout: StridedShape, base: isize) -> Tensor<T> {
        Tensor {
            layout,
            base,
            buf: self.buf.clone(),
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn shape(&self) -> &Shape {
        self.layout.shape()
    }

    pub fn layout(&self) -> &StridedShape {
        &self.layout
    }

    pub fn dims(&self) -> &[usize] {
        self.layout.dims()
    }

    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    pub fn num_elements(&self) -> usize {
        self.layout.num_elements()
    }

    pub fn dim(&self, axis: usize) -> usize {
        self.layout.dim(axis)
    }

    pub fn stride(&self, axis: usize) -> isize {
        self.layout.stride(axis)
    }

    /// True iff this view's strides are canonical row-major (size-1 axes
    /// ignored).
    pub fn is_sequential(&self) -> bool {
        self.layout.is_sequential()
    }

    /// Resolve a possibly-negative axis index against this tensor's rank.
    pub(crate) fn axis_index(&self, axis: isize) -> Result<usize> {
        let i = resolve_index(self.ndim(), axis);
        if i < 0 || i as usize >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis,
                rank: self.ndim(),
            });
        }
        Ok(i as usize)
    }

    pub fn buffer(&self) -> &Buffer<T> {
        &self.buf
    }

    /// True if both tensors alias the same allocation.
    pub fn shares_buffer<U>(&self, other: &Tensor<U>) -> bool
    where
        U: Element,
    {
        // Different element types cannot share an allocation in practice;
        // compare through the type-erased owner handles.
        std::sync::Arc::ptr_eq(&self.buf.owner(), &other.buf.owner())
    }

    /// Displacement of the view's element `(0, ..., 0)` from the buffer start.
    pub fn base_displacement(&self) -> isize {
        self.base
    }

    // ========================================================================
    // Element access
    // ========================================================================

    #[inline]
    pub(crate) fn base_ptr(&self) -> *mut T {
        unsafe { self.buf.as_ptr().offset(self.base) }
    }

    #[inline]
    pub(crate) fn raw(&self) -> RawOperand<'_, T> {
        RawOperand {
            ptr: self.base_ptr(),
            dims: self.layout.dims(),
            strides: self.layout.strides(),
        }
    }

    /// Read one element; negative indices resolve from the axis end.
    pub fn at(&self, index: &[isize]) -> Result<T> {
        if index.len() != self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: index.len() as isize,
                rank: self.ndim(),
            });
        }
        let d = self.layout.displace(index)?;
        Ok(unsafe { *self.base_ptr().offset(d) })
    }

    /// Write one element; negative indices resolve from the axis end.
    pub fn set_at(&mut self, index: &[isize], value: T) -> Result<()> {
        if index.len() != self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: index.len() as isize,
                rank: self.ndim(),
            });
        }
        let d = self.layout.displace(index)?;
        unsafe { *self.base_ptr().offset(d) = value };
        Ok(())
    }

    /// Recover the multi-axis index of an element reference obtained during a
    /// [`Tensor::visit`] pass. Diagnostics only.
    pub fn reference_to_index(&self, r: &T) -> Option<Vec<usize>> {
        let d = (r as *const T as isize - self.base_ptr() as isize)
            / std::mem::size_of::<T>() as isize;
        self.layout.displace_to_index(d)
    }

    /// All elements in row-major logical order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.num_elements());
        self.visit(|x| out.push(*x));
        out
    }

    // ========================================================================
    // Engine dispatch
    // ========================================================================

    /// Set every element of this view to `value`.
    pub fn fill(&mut self, value: T) {
        unsafe { kernel::fill(self.raw(), value) }
    }

    /// Mutate every element in place.
    pub fn apply<F: FnMut(&mut T)>(&mut self, mut f: F) {
        unsafe { kernel::apply1(self.raw(), &mut |p| f(&mut *p)) }
    }

    /// Read every element (row-major logical order).
    pub fn visit<F: FnMut(&T)>(&self, mut f: F) {
        unsafe { kernel::apply1(self.raw(), &mut |p| f(&*p)) }
    }

    /// Mutate every element of `self` while reading the matching element of
    /// `other`, which must be shape-prefix compatible (broadcast first with
    /// [`Tensor::upshape`]).
    pub fn zip_apply<A: Element, F: FnMut(&mut T, &A)>(&mut self, other: &Tensor<A>, mut f: F) {
        unsafe { kernel::apply2(self.raw(), other.raw(), &mut |p, q| f(&mut *p, &*q)) }
    }

    /// Read matching elements of `self` and `other`.
    pub fn zip_visit<A: Element, F: FnMut(&T, &A)>(&self, other: &Tensor<A>, mut f: F) {
        unsafe { kernel::apply2(self.raw(), other.raw(), &mut |p, q| f(&*p, &*q)) }
    }

    /// Three-operand pass: mutate `self` while reading `a` and `b`.
    pub fn zip_apply2<A: Element, B: Element, F: FnMut(&mut T, &A, &B)>(
        &mut self,
        a: &Tensor<A>,
        b: &Tensor<B>,
        mut f: F,
    ) {
        unsafe {
            kernel::apply3(self.raw(), a.raw(), b.raw(), &mut |p, q, r| {
                f(&mut *p, &*q, &*r)
            })
        }
    }

    /// Raw-pointer variant of [`Tensor::zip_apply`] for gather-style
    /// operations that address neighbours of the visited element.
    pub(crate) fn zip_apply_ptr<A: Element, F: FnMut(*mut T, *const A)>(
        &mut self,
        other: &Tensor<A>,
        mut f: F,
    ) {
        unsafe { kernel::apply2(self.raw(), other.raw(), &mut f) }
    }

    /// Parallel [`Tensor::fill`].
    pub fn par_fill(&mut self, value: T) {
        unsafe { threading::apply1_parallel(self.raw(), &|p| *p = value) }
    }

    /// Parallel [`Tensor::apply`]. Serial fallback below the element
    /// threshold, for rank 0 and for a single worker.
    pub fn par_apply<F: Fn(&mut T) + Sync>(&mut self, f: F) {
        unsafe { threading::apply1_parallel(self.raw(), &|p| f(&mut *p)) }
    }

    /// Parallel [`Tensor::zip_apply`].
    pub fn par_zip_apply<A: Element, F: Fn(&mut T, &A) + Sync>(&mut self, other: &Tensor<A>, f: F) {
        unsafe { threading::apply2_parallel(self.raw(), other.raw(), &|p, q| f(&mut *p, &*q)) }
    }

    /// Parallel [`Tensor::zip_apply2`].
    pub fn par_zip_apply2<A: Element, B: Element, F: Fn(&mut T, &A, &B) + Sync>(
        &mut self,
        a: &Tensor<A>,
        b: &Tensor<B>,
        f: F,
    ) {
        unsafe {
            threading::apply3_parallel(self.raw(), a.raw(), b.raw(), &|p, q, r| {
                f(&mut *p, &*q, &*r)
            })
        }
    }

    /// Raw-pointer variant of [`Tensor::par_zip_apply2`].
    pub(crate) fn par_zip_apply2_ptr<A, B, F>(&mut self, a: &Tensor<A>, b: &Tensor<B>, f: F)
    where
        A: Element,
        B: Element,
        F: Fn(*mut T, *const A, *const B) + Sync,
    {
        unsafe { threading::apply3_parallel(self.raw(), a.raw(), b.raw(), &f) }
    }

    // ========================================================================
    // Materialization and assignment
    // ========================================================================

    /// Write the broadcast-compatible `src` through this view's footprint
    /// (value-assignment semantics).
    pub fn copy_values_from(&mut self, src: &Tensor<T>) -> Result<()> {
        let s = src.upshape(self.shape())?;
        // upshape tolerates oversized source axes; the engine does not.
        if !self.shape().is_prefix_of(s.shape()) {
            return Err(TensorError::ShapeMismatch(
                self.dims().to_vec(),
                src.dims().to_vec(),
            ));
        }
        self.zip_apply(&s, |d, v| *d = *v);
        Ok(())
    }

    /// Materialize this view into a fresh buffer with canonical strides,
    /// preserving logical element order.
    pub fn copy(&self) -> Tensor<T> {
        let mut res = Tensor::new(self.shape().clone());
        res.zip_apply(self, |d, v| *d = *v);
        res
    }

    /// This view if already sequential, otherwise a materialized copy.
    /// The fallback whenever [`Tensor::can_reshape_to`] denies a zero-copy
    /// reshape.
    pub fn sequential(&self) -> Tensor<T> {
        if self.is_sequential() {
            self.clone()
        } else {
            self.copy()
        }
    }

    /// Element-converting copy.
    pub fn astype<U>(&self) -> Tensor<U>
    where
        U: Element,
        T: AsPrimitive<U>,
    {
        let mut res = Tensor::<U>::new(self.shape().clone());
        res.zip_apply(self, |d, v| *d = v.as_());
        res
    }

    /// Set elements where `cond` holds to `value`; `cond` broadcasts over
    /// this view's shape.
    pub fn masked_fill(&mut self, cond: &Tensor<bool>, value: T) -> Result<()> {
        let c = cond.upshape(self.shape())?;
        if !self.shape().is_prefix_of(c.shape()) {
            return Err(TensorError::ShapeMismatch(
                self.dims().to_vec(),
                cond.dims().to_vec(),
            ));
        }
        self.par_zip_apply(&c, move |v, &m| {
            if m {
                *v = value;
            }
        });
        Ok(())
    }

    // ========================================================================
    // View transforms (all O(1), sharing the buffer)
    // ========================================================================

    /// Whether this view can be reinterpreted as `dims` without copying.
    pub fn can_reshape_to(&self, dims: &[usize]) -> bool {
        self.layout.can_reshape_to(&Shape::from(dims))
    }

    /// Zero-copy reshape. Fails with [`TensorError::NonReshapable`] when the
    /// stride structure does not admit it; materialize with
    /// [`Tensor::sequential`] first in that case.
    pub fn reshape(&self, dims: &[usize]) -> Result<Tensor<T>> {
        let layout = StridedShape::reshaped_from(&self.layout, &Shape::from(dims))?;
        Ok(self.derive(layout, self.base))
    }

    /// Broadcast toward `target` by replicating missing and size-1 axes.
    /// Returns `self` unchanged when `target` is already a shape prefix.
    pub fn upshape(&self, target: &Shape) -> Result<Tensor<T>> {
        if target.is_prefix_of(self.shape()) {
            return Ok(self.clone());
        }
        let mut layout = self.layout.clone();
        layout.upshape(target)?;
        Ok(self.derive(layout, self.base))
    }

    /// Sub-view spanning `[begin[i], end[i])` on each leading axis.
    pub fn crop(&self, begin: &[isize], end: &[isize]) -> Result<Tensor<T>> {
        let d = self.layout.displace(begin)?;
        let mut layout = self.layout.clone();
        layout.crop(begin, end);
        Ok(self.derive(layout, self.base + d))
    }

    /// Sub-view of `len[i]` elements starting at `begin[i]` on each leading
    /// axis.
    pub fn crop_size(&self, begin: &[isize], len: &[isize]) -> Result<Tensor<T>> {
        let d = self.layout.displace(begin)?;
        let mut layout = self.layout.clone();
        layout.crop_size(begin, len);
        Ok(self.derive(layout, self.base + d))
    }

    /// Keep the leading `ends[i]` elements of each axis (clamped; negative
    /// counts resolve from the end).
    pub fn trim(&self, ends: &[isize]) -> Tensor<T> {
        let mut layout = self.layout.clone();
        layout.trim(ends);
        self.derive(layout, self.base)
    }

    /// Drop the trailing `counts[i]` elements of each axis.
    pub fn trim_tail(&self, counts: &[isize]) -> Tensor<T> {
        let mut layout = self.layout.clone();
        layout.trim_tail(counts);
        self.derive(layout, self.base)
    }

    /// Drop the leading `counts[i]` elements of each axis.
    pub fn trim_start(&self, counts: &[isize]) -> Result<Tensor<T>> {
        let d = self.layout.displace(counts)?;
        let mut layout = self.layout.clone();
        layout.trim_tail(counts);
        Ok(self.derive(layout, self.base + d))
    }

    /// Multi-axis Python-style slicing; see [`AxisSlice`].
    pub fn slice(&self, slices: &[AxisSlice]) -> Result<Tensor<T>> {
        let mut layout = self.layout.clone();
        let d = layout.slice(slices)?;
        Ok(self.derive(layout, self.base + d))
    }

    /// Single-axis slice with arbitrary non-zero step (negative reverses).
    pub fn slice_axis(&self, axis: usize, begin: isize, end: isize, step: isize) -> Result<Tensor<T>> {
        let mut layout = self.layout.clone();
        let d = layout.slice_axis(axis, begin, end, step)?;
        Ok(self.derive(layout, self.base + d))
    }

    /// Contiguous range `[begin, end)` of one axis.
    pub fn crop_axis(&self, axis: usize, begin: isize, end: isize) -> Result<Tensor<T>> {
        self.slice_axis(axis, begin, end, 1)
    }

    /// Divide one axis of size `S` into `(parts, S / parts)`.
    pub fn split_axis(&self, axis: isize, parts: usize) -> Result<Tensor<T>> {
        let mut layout = self.layout.clone();
        layout.split_axis(axis, parts)?;
        Ok(self.derive(layout, self.base))
    }

    /// Reorder the leading `order.len()` axes by a permutation.
    pub fn permute(&self, order: &[usize]) -> Result<Tensor<T>> {
        let mut layout = self.layout.clone();
        layout.permute_axes(order)?;
        Ok(self.derive(layout, self.base))
    }

    /// Exchange two axes (negative indices from the end).
    pub fn swap_axes(&self, a: isize, b: isize) -> Result<Tensor<T>> {
        let mut layout = self.layout.clone();
        layout.swap_axes(a, b)?;
        Ok(self.derive(layout, self.base))
    }

    /// Matrix transposition (rank 2 only).
    pub fn transpose(&self) -> Result<Tensor<T>> {
        if self.ndim() != 2 {
            return Err(TensorError::InvalidAxis {
                axis: self.ndim() as isize,
                rank: 2,
            });
        }
        self.swap_axes(0, 1)
    }

    /// Walk one axis backward. The base moves to the axis's last element so
    /// the first logical position stays addressed correctly.
    pub fn flip(&self, axis: usize) -> Result<Tensor<T>> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: axis as isize,
                rank: self.ndim(),
            });
        }
        let last = (self.dim(axis) as isize - 1).max(0);
        let d = self.stride(axis) * last;
        let mut layout = self.layout.clone();
        layout.flip(axis)?;
        Ok(self.derive(layout, self.base + d))
    }

    /// Sliding-window view; the primitive behind pooling.
    pub fn window(&self, axis: usize, step: usize, size: usize) -> Result<Tensor<T>> {
        let mut layout = self.layout.clone();
        layout.window(axis, step, size)?;
        Ok(self.derive(layout, self.base))
    }

    /// Insert one replicated (stride-0) axis before `before`.
    pub fn insert_axis(&self, before: usize, size: usize) -> Result<Tensor<T>> {
        let mut shape = Shape::scalar();
        shape.append_axis(size);
        self.insert_axes(before, &shape)
    }

    /// Insert replicated (stride-0) axes before `before`.
    pub fn insert_axes(&self, before: usize, sizes: &Shape) -> Result<Tensor<T>> {
        let mut layout = self.layout.clone();
        layout.insert_axes(before, sizes)?;
        Ok(self.derive(layout, self.base))
    }

    /// Append replicated trailing axes: every logical position along them
    /// references the same memory.
    pub fn replicate_values(&self, sizes: &Shape) -> Result<Tensor<T>> {
        self.insert_axes(self.ndim(), sizes)
    }

    /// Remove one axis, keeping its first hyperplane.
    pub fn destroy_axis(&self, axis: usize) -> Result<Tensor<T>> {
        self.destroy_axis_at(axis, 0)
    }

    /// Remove one axis, keeping the hyperplane at `select` (negative indices
    /// from the end).
    pub fn destroy_axis_at(&self, axis: usize, select: isize) -> Result<Tensor<T>> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: axis as isize,
                rank: self.ndim(),
            });
        }
        let size = self.dim(axis);
        let sel = resolve_index(size, select);
        if sel < 0 || sel as usize >= size.max(1) {
            return Err(TensorError::IndexOutOfRange {
                axis,
                index: select,
                size,
            });
        }
        let d = self.stride(axis) * sel;
        let mut layout = self.layout.clone();
        layout.destroy_axis(axis)?;
        Ok(self.derive(layout, self.base + d))
    }

    /// Sub-array at a partial index: fixing the leading `index.len()` axes
    /// yields a view over the trailing axes (rank 0 when fully indexed).
    pub fn subtensor(&self, index: &[isize]) -> Result<Tensor<T>> {
        if index.len() > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: index.len() as isize,
                rank: self.ndim(),
            });
        }
        let d = self.layout.displace(index)?;
        let layout = if index.len() == self.ndim() {
            StridedShape::new(Shape::scalar())
        } else {
            self.layout.strided_tail(self.ndim() - index.len())?
        };
        Ok(self.derive(layout, self.base + d))
    }
}

impl<T: std::fmt::Debug + Element> std::fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("dims", &self.layout.dims())
            .field("strides", &self.layout.strides())
            .field("base", &self.base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_default_initialized() {
        let t = Tensor::<i32>::new([2, 3]);
        assert_eq!(t.to_vec(), vec![0; 6]);
        assert!(t.is_sequential());
    }

    #[test]
    fn test_clone_aliases_buffer() {
        let a = Tensor::<i32>::arange(6);
        let mut b = a.clone();
        assert!(a.shares_buffer(&b));
        b.set_at(&[0], 42).unwrap();
        assert_eq!(a.at(&[0]).unwrap(), 42);
    }

    #[test]
    fn test_copy_detaches_buffer() {
        let a = Tensor::<i32>::arange(6);
        let mut b = a.copy();
        assert!(!a.shares_buffer(&b));
        b.set_at(&[0], 42).unwrap();
        assert_eq!(a.at(&[0]).unwrap(), 0);
    }

    #[test]
    fn test_at_negative_indices() {
        let t = Tensor::<i32>::arange(12).reshape(&[3, 4]).unwrap();
        assert_eq!(t.at(&[-1, -1]).unwrap(), 11);
        assert_eq!(t.at(&[-3, 0]).unwrap(), 0);
        assert!(t.at(&[3, 0]).is_err());
        assert!(t.at(&[0]).is_err());
    }

    #[test]
    fn test_subtensor_views() {
        let t = Tensor::<i32>::arange(24).reshape(&[2, 3, 4]).unwrap();
        let sub = t.subtensor(&[1, 2]).unwrap();
        assert_eq!(sub.dims(), &[4]);
        assert_eq!(sub.to_vec(), vec![20, 21, 22, 23]);
        let scalar = t.subtensor(&[1, 2, 3]).unwrap();
        assert_eq!(scalar.ndim(), 0);
        assert_eq!(scalar.at(&[]).unwrap(), 23);
    }

    #[test]
    fn test_trim_family() {
        let t = Tensor::<i32>::arange(10);
        assert_eq!(t.trim(&[5]).to_vec(), vec![0, 1, 2, 3, 4]);
        assert_eq!(t.trim(&[-5]).to_vec(), vec![0, 1, 2, 3, 4]);
        assert_eq!(t.trim_tail(&[5]).to_vec(), vec![0, 1, 2, 3, 4]);
        assert_eq!(t.trim_start(&[5]).unwrap().to_vec(), vec![5, 6, 7, 8, 9]);
        assert_eq!(t.trim_start(&[-5]).unwrap().to_vec(), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_flip_addresses_first_element() {
        let t = Tensor::<i32>::arange(4);
        let r = t.flip(0).unwrap();
        assert_eq!(r.to_vec(), vec![3, 2, 1, 0]);
        assert_eq!(r.at(&[0]).unwrap(), 3);
    }

    #[test]
    fn test_window_view() {
        let t = Tensor::<i32>::arange(7);
        let w = t.window(0, 2, 2).unwrap();
        assert_eq!(w.dims(), &[3, 2]);
        assert_eq!(w.to_vec(), vec![0, 1, 2, 3, 4, 5]);
        assert!(t.shares_buffer(&w));
    }

    #[test]
    fn test_replicate_values_shares_memory() {
        let t = Tensor::<i32>::arange(3);
        let r = t.replicate_values(&Shape::from([2])).unwrap();
        assert_eq!(r.dims(), &[3, 2]);
        assert_eq!(r.to_vec(), vec![0, 0, 1, 1, 2, 2]);
        assert_eq!(r.stride(1), 0);
    }

    #[test]
    fn test_masked_fill() {
        let mut t = Tensor::<i32>::arange(6);
        let mask = Tensor::<bool>::from_vec(
            [6],
            vec![true, false, true, false, true, false],
        )
        .unwrap();
        t.masked_fill(&mask, -1).unwrap();
        assert_eq!(t.to_vec(), vec![-1, 1, -1, 3, -1, 5]);
    }

    #[test]
    fn test_astype_converts() {
        let t = Tensor::<f64>::from_vec([3], vec![1.9, -2.2, 3.5]).unwrap();
        let i = t.astype::<i32>();
        assert_eq!(i.to_vec(), vec![1, -2, 3]);
    }

    #[test]
    fn test_sequential_returns_alias_when_possible() {
        let t = Tensor::<i32>::arange(6).reshape(&[2, 3]).unwrap();
        assert!(t.shares_buffer(&t.sequential()));
        let s = t.swap_axes(0, 1).unwrap();
        let m = s.sequential();
        assert!(!s.shares_buffer(&m));
        assert_eq!(m.to_vec(), vec![0, 3, 1, 4, 2, 5]);
        assert!(m.is_sequential());
    }

    #[test]
    fn test_copy_values_from_broadcasts() {
        let mut t = Tensor::<i32>::new([3, 2]);
        let src = Tensor::<i32>::arange(3);
        t.copy_values_from(&src).unwrap();
        assert_eq!(t.to_vec(), vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_index_grid() {
        let g = Tensor::<i32>::index_grid([2, 2]);
        assert_eq!(g.dims(), &[2, 2, 2]);
        assert_eq!(g.to_vec(), vec![0, 0, 0, 1, 1, 0, 1, 1]);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let ok = Tensor::<i32>::from_rows(&[&[1, 2], &[3, 4]]).unwrap();
        assert_eq!(ok.dims(), &[2, 2]);
        assert!(Tensor::<i32>::from_rows(&[&[1, 2], &[3]]).is_err());
    }

    #[test]
    fn test_linspace_endpoints() {
        let t = Tensor::<f64>::linspace(-1.0, 1.0, 5);
        assert_eq!(t.to_vec(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }
}
