//! Plain shapes: ordered dimension sizes without layout information.

use crate::{Result, TensorError};

/// Resolve a possibly-negative index against an axis size, Python style.
///
/// The result is *not* clamped or bounds-checked; callers decide whether an
/// out-of-range value is an error or gets clamped.
#[inline]
pub(crate) fn resolve_index(size: usize, index: isize) -> isize {
    if index < 0 {
        size as isize + index
    } else {
        index
    }
}

#[inline]
fn clamp(v: isize, lo: isize, hi: isize) -> isize {
    v.max(lo).min(hi)
}

/// An ordered sequence of non-negative dimension sizes.
///
/// Rank 0 denotes a scalar with exactly one element. A `Shape` carries no
/// stride information; see [`crate::StridedShape`] for the layout-aware
/// counterpart.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Rank-0 shape (scalar).
    pub fn scalar() -> Self {
        Shape { dims: Vec::new() }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total element count; 1 for a scalar.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn dim(&self, axis: usize) -> usize {
        self.dims[axis]
    }

    #[inline]
    pub(crate) fn set_dim(&mut self, axis: usize, size: usize) {
        self.dims[axis] = size;
    }

    /// Axis size with negative-index support, e.g. `dim_at(-1)` for the last.
    pub fn dim_at(&self, axis: isize) -> Result<usize> {
        let i = resolve_index(self.ndim(), axis);
        if i < 0 || i as usize >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis,
                rank: self.ndim(),
            });
        }
        Ok(self.dims[i as usize])
    }

    /// True if `self` equals the leading axes of `other`.
    pub fn is_prefix_of(&self, other: &Shape) -> bool {
        self.ndim() <= other.ndim() && self.dims == other.dims[..self.ndim()]
    }

    /// Sub-shape of the leading `n` axes; `n` must be in `[1, ndim]`.
    pub fn first(&self, n: usize) -> Result<Shape> {
        if n == 0 || n > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: n as isize,
                rank: self.ndim(),
            });
        }
        Ok(Shape::from(&self.dims[..n]))
    }

    /// Sub-shape of the trailing `n` axes; `n` must be in `[1, ndim]`.
    pub fn last(&self, n: usize) -> Result<Shape> {
        if n == 0 || n > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: n as isize,
                rank: self.ndim(),
            });
        }
        Ok(Shape::from(&self.dims[self.ndim() - n..]))
    }

    /// Per-axis running products from the tail: `out[i] = dims[i] * ... * dims[n-1]`.
    pub fn cumulative_count(&self) -> Vec<usize> {
        let mut res = vec![0usize; self.ndim()];
        let mut count = 1usize;
        for i in (0..self.ndim()).rev() {
            count *= self.dims[i];
            res[i] = count;
        }
        res
    }

    /// Canonical row-major strides for this shape (last axis varies fastest).
    pub fn row_major_strides(&self) -> Vec<isize> {
        let mut strides = vec![0isize; self.ndim()];
        let mut p = 1isize;
        for i in (0..self.ndim()).rev() {
            strides[i] = p;
            p *= self.dims[i] as isize;
        }
        strides
    }

    pub fn append_axis(&mut self, size: usize) -> &mut Self {
        self.dims.push(size);
        self
    }

    pub fn append_axes(&mut self, other: &Shape) -> &mut Self {
        self.dims.extend_from_slice(&other.dims);
        self
    }

    /// Insert one axis before position `before` (which may equal `ndim`).
    pub fn insert_axis(&mut self, before: usize, size: usize) -> Result<&mut Self> {
        if before > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: before as isize,
                rank: self.ndim(),
            });
        }
        self.dims.insert(before, size);
        Ok(self)
    }

    pub fn remove_axis(&mut self, axis: usize) -> Result<&mut Self> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: axis as isize,
                rank: self.ndim(),
            });
        }
        self.dims.remove(axis);
        Ok(self)
    }

    /// Grow the named axes by `add` elements each (used to build padded shapes).
    pub fn extend_axes(&mut self, axes: &[usize], add: usize) -> Result<&mut Self> {
        for &ax in axes {
            if ax >= self.ndim() {
                return Err(TensorError::InvalidAxis {
                    axis: ax as isize,
                    rank: self.ndim(),
                });
            }
            self.dims[ax] += add;
        }
        Ok(self)
    }

    /// Shrink leading extents: each axis keeps at most `ends[i]` elements,
    /// counted from the front; negative values count back from the end.
    /// Results are clamped into `[0, size]`.
    pub fn trim(&mut self, ends: &[isize]) {
        let n = ends.len().min(self.ndim());
        for i in 0..n {
            let size = self.dims[i] as isize;
            self.dims[i] = clamp(resolve_index(self.dims[i], ends[i]), 0, size) as usize;
        }
    }

    /// Like [`Shape::trim`] but drops `counts[i]` elements from the tail of
    /// each axis (negative values keep `-counts[i]` elements).
    pub fn trim_tail(&mut self, counts: &[isize]) {
        let n = counts.len().min(self.ndim());
        for i in 0..n {
            let size = self.dims[i] as isize;
            let keep = if counts[i] >= 0 {
                size - counts[i]
            } else {
                -counts[i]
            };
            self.dims[i] = clamp(keep, 0, size) as usize;
        }
    }

    /// Shrink each leading axis to the half-open range `[begin[i], end[i])`,
    /// with negative offsets resolved from the axis end and everything
    /// clamped into `[0, size]`.
    pub fn crop(&mut self, begin: &[isize], end: &[isize]) {
        debug_assert_eq!(begin.len(), end.len());
        let n = begin.len().min(self.ndim());
        for i in 0..n {
            let size = self.dims[i] as isize;
            let b = clamp(resolve_index(self.dims[i], begin[i]), 0, size);
            let e = clamp(resolve_index(self.dims[i], end[i]), b, size);
            self.dims[i] = (e - b) as usize;
        }
    }

    /// Like [`Shape::crop`] but the second argument is a per-axis length.
    pub fn crop_size(&mut self, begin: &[isize], len: &[isize]) {
        debug_assert_eq!(begin.len(), len.len());
        let n = begin.len().min(self.ndim());
        for i in 0..n {
            let size = self.dims[i] as isize;
            let b = clamp(resolve_index(self.dims[i], begin[i]), 0, size);
            let e = clamp(b + len[i], b, size);
            self.dims[i] = (e - b) as usize;
        }
    }

    /// Iterator over all index vectors in row-major order (last axis fastest).
    pub fn indices(&self) -> IndexIter {
        IndexIter {
            shape: self.dims.clone(),
            next: Some(vec![0; self.dims.len()]),
            empty: self.num_elements() == 0,
        }
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        &self.dims[axis]
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape { dims }
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }
}

impl<const N: usize> From<&[usize; N]> for Shape {
    fn from(dims: &[usize; N]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, ")")
    }
}

/// Row-major odometer over the index vectors of a [`Shape`].
pub struct IndexIter {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
    empty: bool,
}

impl Iterator for IndexIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.empty {
            return None;
        }
        let current = self.next.take()?;
        let mut next = current.clone();
        let mut done = true;
        for i in (0..self.shape.len()).rev() {
            next[i] += 1;
            if next[i] < self.shape[i] {
                done = false;
                break;
            }
            next[i] = 0;
        }
        // Rank 0 yields the single empty index once.
        if !done && !self.shape.is_empty() {
            self.next = Some(next);
        }
        Some(current)
    }
}

/// Combined shape of two broadcast-compatible operands.
///
/// Axes align from the *front*; the shorter operand is padded with trailing
/// size-1 axes. Each aligned pair must be equal or contain a 1.
pub fn broadcast_shape(a: &Shape, b: &Shape) -> Result<Shape> {
    let n = a.ndim().max(b.ndim());
    let mut dims = Vec::with_capacity(n);
    for i in 0..n {
        let da = if i < a.ndim() { a[i] } else { 1 };
        let db = if i < b.ndim() { b[i] } else { 1 };
        if da == db || db == 1 {
            dims.push(da);
        } else if da == 1 {
            dims.push(db);
        } else {
            return Err(TensorError::ShapeMismatch(
                a.dims().to_vec(),
                b.dims().to_vec(),
            ));
        }
    }
    Ok(Shape::from(dims))
}
