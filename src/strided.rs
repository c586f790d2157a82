//! Shape + stride layout descriptors and the view-producing transforms.

use crate::shape::resolve_index;
use crate::{Result, Shape, TensorError};

/// One axis of a multi-axis slice, Python style.
///
/// The default selects the whole axis. `begin`/`end` may be negative
/// (resolved from the axis end), `step` may be negative (axis reversal) and
/// `count` caps the number of taken elements. Setting `index` selects a
/// single position and shrinks the axis to size 1.
///
/// ```rust
/// use strided_tensor::{AxisSlice, Tensor};
///
/// let a = Tensor::<i32>::arange(10);
/// let s = a.slice(&[AxisSlice::start(7).take(2).step_by(-1)]).unwrap();
/// assert_eq!(s.at(&[0]).unwrap(), 7);
/// assert_eq!(s.at(&[1]).unwrap(), 6);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct AxisSlice {
    pub begin: isize,
    pub end: Option<isize>,
    pub step: isize,
    pub count: Option<usize>,
    pub index: Option<isize>,
}

impl Default for AxisSlice {
    fn default() -> Self {
        AxisSlice {
            begin: 0,
            end: None,
            step: 1,
            count: None,
            index: None,
        }
    }
}

impl AxisSlice {
    /// The whole axis.
    pub fn all() -> Self {
        AxisSlice::default()
    }

    /// From `begin` to the axis boundary.
    pub fn start(begin: isize) -> Self {
        AxisSlice {
            begin,
            ..AxisSlice::default()
        }
    }

    /// Select a single position; the axis keeps size 1.
    pub fn index(index: isize) -> Self {
        AxisSlice {
            index: Some(index),
            ..AxisSlice::default()
        }
    }

    /// Exclusive end bound.
    pub fn to(mut self, end: isize) -> Self {
        self.end = Some(end);
        self
    }

    /// Step between taken elements; negative walks the axis backward.
    pub fn step_by(mut self, step: isize) -> Self {
        self.step = step;
        self
    }

    /// Take at most `count` elements.
    pub fn take(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

/// A [`Shape`] paired with signed per-axis strides in element units.
///
/// For a valid index vector `idx` the element displacement is
/// `sum(idx[a] * stride[a])`. Strides of 0 replicate an axis (many logical
/// positions, one physical location); negative strides walk an axis backward.
///
/// `StridedShape` is a plain value type: it is copied and derived freely and
/// never owns or constrains the data it describes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StridedShape {
    shape: Shape,
    strides: Vec<isize>,
}

impl StridedShape {
    /// Canonical row-major layout for `shape`.
    pub fn new(shape: Shape) -> Self {
        let strides = shape.row_major_strides();
        StridedShape { shape, strides }
    }

    /// Layout from explicit dims and strides.
    pub fn from_parts(shape: Shape, strides: Vec<isize>) -> Self {
        debug_assert_eq!(shape.ndim(), strides.len());
        StridedShape { shape, strides }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    pub fn dim(&self, axis: usize) -> usize {
        self.shape.dim(axis)
    }

    pub fn stride(&self, axis: usize) -> isize {
        self.strides[axis]
    }

    /// True iff the strides equal the canonical row-major strides, ignoring
    /// size-1 axes (whose stride is irrelevant).
    pub fn is_sequential(&self) -> bool {
        let mut p = 1isize;
        for i in (0..self.ndim()).rev() {
            if self.shape[i] != 1 && self.strides[i] != p {
                return false;
            }
            p *= self.shape[i] as isize;
        }
        true
    }

    /// Layout of the trailing `n` axes; `n` must be in `[1, ndim]`.
    pub fn strided_tail(&self, n: usize) -> Result<StridedShape> {
        let shape = self.shape.last(n)?;
        let strides = self.strides[self.ndim() - n..].to_vec();
        Ok(StridedShape { shape, strides })
    }

    /// Layout of the leading `n` axes; `n` must be in `[1, ndim]`.
    pub fn strided_first(&self, n: usize) -> Result<StridedShape> {
        let shape = self.shape.first(n)?;
        let strides = self.strides[..n].to_vec();
        Ok(StridedShape { shape, strides })
    }

    /// Displacement of the given index vector (one entry per leading axis).
    ///
    /// Negative indices resolve from the axis end; a resolved index outside
    /// `[0, size)` is an error.
    pub fn displace(&self, index: &[isize]) -> Result<isize> {
        if index.len() > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: index.len() as isize,
                rank: self.ndim(),
            });
        }
        let mut d = 0isize;
        for (i, &raw) in index.iter().enumerate() {
            let size = self.shape[i];
            let idx = resolve_index(size, raw);
            if idx < 0 || idx as usize >= size {
                return Err(TensorError::IndexOutOfRange {
                    axis: i,
                    index: raw,
                    size,
                });
            }
            d += idx * self.strides[i];
        }
        Ok(d)
    }

    /// Recover a multi-axis index from a flat displacement.
    ///
    /// Diagnostics only: O(ndim²) worst case, and ambiguous layouts
    /// (replicated or overlapping axes) may not resolve, yielding `None`.
    pub fn displace_to_index(&self, displace: isize) -> Option<Vec<usize>> {
        let n = self.ndim();
        let mut index = vec![0usize; n];
        let mut d = displace;
        loop {
            let mut changed = false;
            for i in 0..n {
                let s = self.strides[i];
                if s > 0 && s <= d && d < s * self.shape[i] as isize {
                    index[i] = (d / s) as usize;
                    d -= index[i] as isize * s;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        if d == 0 {
            Some(index)
        } else {
            None
        }
    }

    pub fn trim(&mut self, ends: &[isize]) -> &mut Self {
        self.shape.trim(ends);
        self
    }

    pub fn trim_tail(&mut self, counts: &[isize]) -> &mut Self {
        self.shape.trim_tail(counts);
        self
    }

    pub fn crop(&mut self, begin: &[isize], end: &[isize]) -> &mut Self {
        self.shape.crop(begin, end);
        self
    }

    pub fn crop_size(&mut self, begin: &[isize], len: &[isize]) -> &mut Self {
        self.shape.crop_size(begin, len);
        self
    }

    /// Generalized single-axis slicing with Python-like negative indices and
    /// an arbitrary non-zero step. Returns the displacement of the view's new
    /// first element.
    pub fn slice_axis(
        &mut self,
        axis: usize,
        begin: isize,
        end: isize,
        step: isize,
    ) -> Result<isize> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: axis as isize,
                rank: self.ndim(),
            });
        }
        self.slice_one(
            axis,
            &AxisSlice {
                begin,
                end: Some(end),
                step,
                count: None,
                index: None,
            },
        )
    }

    /// Apply one [`AxisSlice`] per leading axis; trailing axes are untouched.
    /// Returns the displacement of the view's new first element.
    pub fn slice(&mut self, slices: &[AxisSlice]) -> Result<isize> {
        if slices.len() > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: slices.len() as isize,
                rank: self.ndim(),
            });
        }
        let mut d = 0isize;
        for (axis, s) in slices.iter().enumerate() {
            d += self.slice_one(axis, s)?;
        }
        Ok(d)
    }

    fn slice_one(&mut self, axis: usize, s: &AxisSlice) -> Result<isize> {
        let size = self.shape.dim(axis) as isize;

        if let Some(raw) = s.index {
            let idx = resolve_index(size as usize, raw);
            if idx < 0 || idx >= size {
                return Err(TensorError::IndexOutOfRange {
                    axis,
                    index: raw,
                    size: size as usize,
                });
            }
            let d = self.strides[axis] * idx;
            self.set_dim(axis, 1);
            return Ok(d);
        }

        if s.step == 0 {
            return Err(TensorError::ZeroStep { axis });
        }

        let begin = resolve_index(size as usize, s.begin).clamp(0, size);
        let end = if s.step > 0 {
            let mut e = match s.end {
                Some(raw) => resolve_index(size as usize, raw).clamp(0, size),
                None => size,
            };
            if let Some(n) = s.count {
                e = (begin + n as isize).clamp(0, e);
            }
            e
        } else {
            let mut e = match s.end {
                Some(raw) => resolve_index(size as usize, raw).clamp(0, size),
                None => -1,
            };
            if let Some(n) = s.count {
                e = e.max(begin - n as isize);
            }
            e
        };

        let sign = if s.step > 0 { 1 } else { -1 };
        let new_size = 1 + (end - begin - sign) / s.step;
        if new_size <= 0 {
            return Err(TensorError::DegenerateSlice {
                axis,
                size: new_size,
            });
        }

        let d = self.strides[axis] * begin;
        self.set_dim(axis, new_size as usize);
        self.strides[axis] *= s.step;
        Ok(d)
    }

    /// Divide one axis of size `S` into two axes `(parts, S / parts)`.
    pub fn split_axis(&mut self, axis: isize, parts: usize) -> Result<&mut Self> {
        let ax = self.resolve_axis(axis)?;
        let size = self.shape.dim(ax);
        if parts == 0 || size % parts != 0 {
            return Err(TensorError::NonDivisible { size, parts });
        }
        let inner = size / parts;
        self.set_dim(ax, inner);
        let outer_stride = self.strides[ax] * inner as isize;
        self.shape.insert_axis(ax, parts)?;
        self.strides.insert(ax, outer_stride);
        Ok(self)
    }

    /// Sliding-window view along `axis`: appends a trailing axis of length
    /// `size` sharing the axis's stride, shrinks the axis to
    /// `(S - size) / step + 1` and multiplies its stride by `step`.
    pub fn window(&mut self, axis: usize, step: usize, size: usize) -> Result<&mut Self> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: axis as isize,
                rank: self.ndim(),
            });
        }
        let extent = self.shape.dim(axis);
        if step == 0 || size == 0 || size > extent {
            return Err(TensorError::DegenerateSlice {
                axis,
                size: size as isize,
            });
        }
        self.shape.append_axis(size);
        self.strides.push(self.strides[axis]);
        self.set_dim(axis, (extent - size) / step + 1);
        self.strides[axis] *= step as isize;
        Ok(self)
    }

    /// Insert replicated (stride-0) axes before position `before`.
    pub fn insert_axes(&mut self, before: usize, sizes: &Shape) -> Result<&mut Self> {
        if before > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: before as isize,
                rank: self.ndim(),
            });
        }
        for (k, &size) in sizes.dims().iter().enumerate() {
            self.shape.insert_axis(before + k, size)?;
            self.strides.insert(before + k, 0);
        }
        Ok(self)
    }

    /// Delete one axis from the shape and stride sequences.
    pub fn destroy_axis(&mut self, axis: usize) -> Result<&mut Self> {
        self.shape.remove_axis(axis)?;
        self.strides.remove(axis);
        Ok(self)
    }

    /// Walk `axis` backward. The stride is negated; compensating the base
    /// displacement so the first logical element stays addressable is the
    /// wrapper's responsibility.
    pub fn flip(&mut self, axis: usize) -> Result<&mut Self> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: axis as isize,
                rank: self.ndim(),
            });
        }
        self.strides[axis] = -self.strides[axis];
        Ok(self)
    }

    /// Reorder the leading `order.len()` axes; `order` must be a bijection
    /// over `[0, order.len())`. Trailing axes are untouched.
    pub fn permute_axes(&mut self, order: &[usize]) -> Result<&mut Self> {
        let n = order.len();
        if n > self.ndim() {
            return Err(TensorError::InvalidPermutation(order.to_vec()));
        }
        let mut seen = vec![false; n];
        for &o in order {
            if o >= n || seen[o] {
                return Err(TensorError::InvalidPermutation(order.to_vec()));
            }
            seen[o] = true;
        }
        let old_dims: Vec<usize> = self.dims()[..n].to_vec();
        let old_strides: Vec<isize> = self.strides[..n].to_vec();
        for (i, &o) in order.iter().enumerate() {
            self.set_dim(i, old_dims[o]);
            self.strides[i] = old_strides[o];
        }
        Ok(self)
    }

    /// Exchange two axes (negative indices resolve from the end).
    pub fn swap_axes(&mut self, a: isize, b: isize) -> Result<&mut Self> {
        let a = self.resolve_axis(a)?;
        let b = self.resolve_axis(b)?;
        if a != b {
            let (da, db) = (self.shape.dim(a), self.shape.dim(b));
            self.set_dim(a, db);
            self.set_dim(b, da);
            self.strides.swap(a, b);
        }
        Ok(self)
    }

    /// Broadcast toward `target`: missing axes are appended as replicated
    /// (stride-0) axes sized from the target's tail, then every size-1 axis
    /// with a larger target size is replicated. An axis that is neither 1 nor
    /// at least the target size cannot be broadcast.
    pub fn upshape(&mut self, target: &Shape) -> Result<&mut Self> {
        if target.ndim() > self.ndim() {
            let extra = target.last(target.ndim() - self.ndim())?;
            self.insert_axes(self.ndim(), &extra)?;
        }
        for i in 0..target.ndim() {
            if self.shape[i] == 1 && target[i] > 1 {
                self.set_dim(i, target[i]);
                self.strides[i] = 0;
            }
            if self.shape[i] < target[i] {
                return Err(TensorError::ShapeMismatch(
                    self.dims().to_vec(),
                    target.dims().to_vec(),
                ));
            }
        }
        Ok(self)
    }

    /// Whether this layout can be reinterpreted as `target` without copying.
    ///
    /// Walks both axis lists front to back, accumulating a running size
    /// product on each side; whenever the products meet, the source axes just
    /// consumed must form a physically contiguous run (each stride equals the
    /// next axis's stride times its size, with size-1 axes as don't-care).
    pub fn can_reshape_to(&self, target: &Shape) -> bool {
        if self.num_elements() != target.num_elements() {
            return false;
        }
        // No elements, no addressing constraints.
        if self.num_elements() == 0 {
            return true;
        }
        let n1 = self.ndim();
        let n2 = target.ndim();
        let mut s1 = 1usize;
        let mut s2 = 1usize;
        let mut i1 = 0usize;
        let mut i2 = 0usize;
        let mut checked = 0usize;

        loop {
            if i1 == n1 && i2 == n2 {
                return s1 == s2;
            }
            if s1 < s2 {
                s1 *= if i1 >= n1 {
                    1
                } else {
                    let d = self.shape[i1];
                    i1 += 1;
                    d
                };
            } else if s1 > s2 {
                s2 *= if i2 >= n2 {
                    1
                } else {
                    let d = target[i2];
                    i2 += 1;
                    d
                };
            }
            if s1 == s2 {
                if !self.uniform_run(checked, i1) {
                    log::trace!(
                        "reshape {:?} -> {:?}: axes {}..{} not contiguous",
                        self.dims(),
                        target.dims(),
                        checked,
                        i1
                    );
                    return false;
                }
                checked = i1;
                s1 = if i1 >= n1 {
                    1
                } else {
                    let d = self.shape[i1];
                    i1 += 1;
                    d
                };
                s2 = if i2 >= n2 {
                    1
                } else {
                    let d = target[i2];
                    i2 += 1;
                    d
                };
            }
        }
    }

    /// Check that axes `[from, to)` form one contiguous run, skipping size-1
    /// axes whose stride carries no information.
    fn uniform_run(&self, from: usize, to: usize) -> bool {
        let mut prev: Option<usize> = None;
        for i in (from..to).rev() {
            if self.shape[i] == 1 {
                continue;
            }
            if let Some(j) = prev {
                if self.strides[i] != self.shape[j] as isize * self.strides[j] {
                    return false;
                }
            }
            prev = Some(i);
        }
        true
    }

    /// Reinterpret as `target`, deriving strides from `source`'s layout.
    ///
    /// Fails with [`TensorError::NonReshapable`] when the zero-copy merge is
    /// infeasible; callers branch to a materialized copy in that case.
    pub fn reshaped_from(source: &StridedShape, target: &Shape) -> Result<StridedShape> {
        if !source.can_reshape_to(target) {
            return Err(TensorError::NonReshapable(
                source.dims().to_vec(),
                target.dims().to_vec(),
            ));
        }
        if target.num_elements() == 0 {
            return Ok(StridedShape::new(target.clone()));
        }
        let mut out = StridedShape::new(target.clone());
        // Merge from the tail: matched runs copy the source stride, split
        // axes derive theirs from the axis to their right.
        let mut i1 = out.ndim() as isize - 1;
        let mut i2 = source.ndim() as isize - 1;
        let mut s1 = 1usize;
        let mut s2 = 1usize;
        while i1 >= 0 {
            let u1 = i1 as usize;
            if out.shape[u1] == 1 {
                out.strides[u1] = 1;
                i1 -= 1;
            } else if s1 == s2 {
                while i2 >= 0 && source.shape[i2 as usize] == 1 {
                    i2 -= 1;
                }
                debug_assert!(i2 >= 0, "reshape feasibility was checked");
                s1 *= out.shape[u1];
                s2 *= source.shape[i2 as usize];
                out.strides[u1] = source.strides[i2 as usize];
                i1 -= 1;
                i2 -= 1;
            } else if s1 < s2 {
                out.strides[u1] = out.strides[u1 + 1] * out.shape[u1 + 1] as isize;
                s1 *= out.shape[u1];
                i1 -= 1;
            } else {
                debug_assert!(i2 >= 0, "reshape feasibility was checked");
                s2 *= source.shape[i2 as usize];
                i2 -= 1;
            }
        }
        Ok(out)
    }

    fn resolve_axis(&self, axis: isize) -> Result<usize> {
        let i = resolve_index(self.ndim(), axis);
        if i < 0 || i as usize >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis,
                rank: self.ndim(),
            });
        }
        Ok(i as usize)
    }

    #[inline]
    fn set_dim(&mut self, axis: usize, size: usize) {
        self.shape.set_dim(axis, size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(dims: &[usize]) -> StridedShape {
        StridedShape::new(Shape::from(dims))
    }

    #[test]
    fn test_sequential_strides() {
        let s = seq(&[2, 3, 5]);
        assert_eq!(s.strides(), &[15, 5, 1]);
        assert!(s.is_sequential());
    }

    #[test]
    fn test_sequential_ignores_size1_axes() {
        let s = StridedShape::from_parts(Shape::from([2, 1, 3]), vec![3, 999, 1]);
        assert!(s.is_sequential());
    }

    #[test]
    fn test_displace_negative_index() {
        let s = seq(&[2, 5]);
        assert_eq!(s.displace(&[1, 1]).unwrap(), 6);
        assert_eq!(s.displace(&[-1, -1]).unwrap(), 9);
        assert!(s.displace(&[2, 0]).is_err());
        assert!(s.displace(&[0, -6]).is_err());
    }

    #[test]
    fn test_displace_to_index_roundtrip() {
        let s = seq(&[3, 4, 5]);
        for d in [0isize, 7, 23, 59] {
            let idx = s.displace_to_index(d).unwrap();
            let signed: Vec<isize> = idx.iter().map(|&v| v as isize).collect();
            assert_eq!(s.displace(&signed).unwrap(), d);
        }
    }

    #[test]
    fn test_slice_axis_negative_step() {
        let mut s = seq(&[10]);
        let d = s.slice_axis(0, 7, 2, -1).unwrap();
        assert_eq!(d, 7);
        assert_eq!(s.dims(), &[5]);
        assert_eq!(s.strides(), &[-1]);
    }

    #[test]
    fn test_slice_count_caps() {
        let mut s = seq(&[10]);
        let d = s.slice(&[AxisSlice::start(7).take(3).step_by(2)]).unwrap();
        assert_eq!(d, 7);
        assert_eq!(s.dims(), &[2]);
        assert_eq!(s.strides(), &[2]);
    }

    #[test]
    fn test_slice_single_index() {
        let mut s = seq(&[10]);
        let d = s.slice(&[AxisSlice::index(-1)]).unwrap();
        assert_eq!(d, 9);
        assert_eq!(s.dims(), &[1]);
    }

    #[test]
    fn test_slice_degenerate_is_error() {
        let mut s = seq(&[10]);
        assert!(matches!(
            s.slice(&[AxisSlice::start(5).to(5)]),
            Err(TensorError::DegenerateSlice { .. })
        ));
        let mut s = seq(&[10]);
        assert!(matches!(
            s.slice(&[AxisSlice::all().step_by(0)]),
            Err(TensorError::ZeroStep { .. })
        ));
    }

    #[test]
    fn test_split_axis() {
        let mut s = seq(&[3, 4]);
        s.split_axis(1, 2).unwrap();
        assert_eq!(s.dims(), &[3, 2, 2]);
        assert_eq!(s.strides(), &[4, 2, 1]);

        let mut s = seq(&[6]);
        assert!(matches!(
            s.split_axis(0, 4),
            Err(TensorError::NonDivisible { .. })
        ));
    }

    #[test]
    fn test_split_axis_negative_axis() {
        let mut s = seq(&[4, 6]);
        s.split_axis(-1, 3).unwrap();
        assert_eq!(s.dims(), &[4, 3, 2]);
    }

    #[test]
    fn test_window() {
        let mut s = seq(&[7]);
        s.window(0, 2, 2).unwrap();
        assert_eq!(s.dims(), &[3, 2]);
        assert_eq!(s.strides(), &[2, 1]);

        let mut s = seq(&[7]);
        s.window(0, 1, 3).unwrap();
        assert_eq!(s.dims(), &[5, 3]);
        assert_eq!(s.strides(), &[1, 1]);
    }

    #[test]
    fn test_upshape_appends_replicated_axes() {
        let mut s = seq(&[5]);
        s.upshape(&Shape::from([5, 2])).unwrap();
        assert_eq!(s.dims(), &[5, 2]);
        assert_eq!(s.strides(), &[1, 0]);
    }

    #[test]
    fn test_upshape_expands_size1() {
        let mut s = seq(&[1, 4]);
        s.upshape(&Shape::from([3, 4])).unwrap();
        assert_eq!(s.dims(), &[3, 4]);
        assert_eq!(s.strides(), &[0, 1]);
    }

    #[test]
    fn test_upshape_rejects_mismatch() {
        let mut s = seq(&[3]);
        assert!(s.upshape(&Shape::from([4])).is_err());
    }

    #[test]
    fn test_can_reshape_sequential() {
        assert!(seq(&[1, 1, 81]).can_reshape_to(&Shape::from([9, 9])));
        assert!(seq(&[1, 1, 1, 81, 1]).can_reshape_to(&Shape::from([9, 9])));
        assert!(seq(&[1, 81, 1, 1, 9]).can_reshape_to(&Shape::from([9, 9, 9])));
        assert!(seq(&[1, 81, 1, 1, 9]).can_reshape_to(&Shape::from([9, 3, 3, 9])));
        assert!(seq(&[1, 81, 1, 1, 9]).can_reshape_to(&Shape::from([9, 3, 27])));
        assert!(seq(&[2, 5, 6, 7, 8]).can_reshape_to(&Shape::from([10, 6, 7, 8])));
        assert!(seq(&[2, 5, 6, 7, 8]).can_reshape_to(&Shape::from([2, 5, 42, 8])));
        assert!(seq(&[2, 5, 6, 7, 8]).can_reshape_to(&Shape::from([2, 5, 6, 7, 8, 1, 1, 1])));
        assert!(!seq(&[2, 5, 6, 7, 8]).can_reshape_to(&Shape::from([2, 6, 6, 7, 8])));
        assert!(!seq(&[2, 5, 6, 7, 8]).can_reshape_to(&Shape::from([1, 1, 6, 6, 7, 8])));
    }

    #[test]
    fn test_can_reshape_transposed() {
        // A transposed matrix is not reshapable into a flat vector.
        let mut t = seq(&[3, 4]);
        t.swap_axes(0, 1).unwrap();
        assert!(!t.can_reshape_to(&Shape::from([12])));
        // Identity-shaped reinterpretation is always fine.
        assert!(t.can_reshape_to(&Shape::from([4, 3])));
    }

    #[test]
    fn test_reshaped_from_strides() {
        let s = seq(&[2, 6]);
        let r = StridedShape::reshaped_from(&s, &Shape::from([2, 2, 3])).unwrap();
        assert_eq!(r.dims(), &[2, 2, 3]);
        assert_eq!(r.strides(), &[6, 3, 1]);
    }

    #[test]
    fn test_reshaped_from_keeps_outer_stride() {
        // Crop the inner axis: rows remain contiguous runs of 3 but the row
        // pitch stays 4, so merging rows is impossible while splitting is fine.
        let mut s = seq(&[4, 4]);
        s.crop(&[0, 0], &[4, 3]);
        assert!(!s.can_reshape_to(&Shape::from([12])));
        let r = StridedShape::reshaped_from(&s, &Shape::from([2, 2, 3])).unwrap();
        assert_eq!(r.strides(), &[8, 4, 1]);
    }

    #[test]
    fn test_permute_axes() {
        let mut s = seq(&[2, 3, 5]);
        s.permute_axes(&[2, 0, 1]).unwrap();
        assert_eq!(s.dims(), &[5, 2, 3]);
        assert_eq!(s.strides(), &[1, 15, 5]);

        let mut s = seq(&[2, 3]);
        assert!(s.permute_axes(&[0, 0]).is_err());
        assert!(s.permute_axes(&[0, 2]).is_err());
    }

    #[test]
    fn test_flip_negates_stride() {
        let mut s = seq(&[4]);
        s.flip(0).unwrap();
        assert_eq!(s.strides(), &[-1]);
        s.flip(0).unwrap();
        assert_eq!(s.strides(), &[1]);
    }

    #[test]
    fn test_insert_axes_replicated() {
        let mut s = seq(&[4]);
        s.insert_axes(1, &Shape::from([2, 3])).unwrap();
        assert_eq!(s.dims(), &[4, 2, 3]);
        assert_eq!(s.strides(), &[1, 0, 0]);
    }

    #[test]
    fn test_destroy_axis() {
        let mut s = seq(&[2, 3, 5]);
        s.destroy_axis(1).unwrap();
        assert_eq!(s.dims(), &[2, 5]);
        assert_eq!(s.strides(), &[15, 1]);
    }
}
