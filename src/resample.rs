//! Structural algorithms: interpolation, sampling, padding and gathering.
//!
//! Everything here is a composition of view transforms and engine passes.
//! Nearest-neighbour interpolation is a pure stride trick whenever the sizes
//! divide; the general case and bilinear sampling gather neighbours by
//! pointer arithmetic relative to the visited element, the same addressing
//! scheme the engine itself uses.

use num_traits::{AsPrimitive, Float, Zero};

use crate::shape::resolve_index;
use crate::tensor::{Element, Tensor};
use crate::{Result, Shape, TensorError};

#[inline]
fn clamp_idx(v: isize, lo: isize, hi: isize) -> isize {
    v.max(lo).min(hi)
}

impl<T: Element> Tensor<T> {
    /// Nearest-neighbour resize of one axis to `new_size`.
    ///
    /// When the old size is a multiple of the new one this is a zero-copy
    /// strided slice through the window centers; otherwise each output
    /// position gathers the nearest source position by integer ratio mapping.
    pub fn interpolate_axis_nearest(&self, axis: usize, new_size: usize) -> Result<Tensor<T>> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: axis as isize,
                rank: self.ndim(),
            });
        }
        if new_size == 0 {
            return Err(TensorError::DegenerateSlice { axis, size: 0 });
        }
        let old_size = self.dim(axis);
        if old_size % new_size == 0 {
            let step = old_size / new_size;
            return self.slice_axis(
                axis,
                (step / 2) as isize,
                (step / 2 + step * new_size) as isize,
                step as isize,
            );
        }

        let src = self.crop_axis(axis, 0, 1)?;
        let mut res_shape = self.shape().clone();
        res_shape.set_dim(axis, new_size);
        let res = Tensor::<T>::new(res_shape);
        let old_stride = self.stride(axis);
        let new_stride = res.stride(axis);
        let mut dst = res.crop_axis(axis, 0, 1)?;
        dst.zip_apply_ptr(&src, |r, x| {
            for i in 0..new_size {
                let old_i = (2 * i + 1) * old_size / new_size / 2;
                unsafe {
                    *r.offset(new_stride * i as isize) = *x.offset(old_stride * old_i as isize);
                }
            }
        });
        Ok(res)
    }

    /// Nearest-neighbour resize to `new_dims`, one axis at a time.
    pub fn interpolate_nearest(&self, new_dims: &[usize]) -> Result<Tensor<T>> {
        if new_dims.len() != self.ndim() {
            return Err(TensorError::ShapeMismatch(
                self.dims().to_vec(),
                new_dims.to_vec(),
            ));
        }
        let mut res = self.clone();
        for (axis, &size) in new_dims.iter().enumerate() {
            if res.dim(axis) != size {
                res = res.interpolate_axis_nearest(axis, size)?;
            }
        }
        Ok(res)
    }

    /// Bilinear sampling over the two trailing axes with boundary clamping.
    ///
    /// `self` is `[batch..., h, w]`; `coords` is `[batch..., n, 2]` holding
    /// `(row, col)` positions. The result is `[batch..., n]`, each entry a
    /// fractional-weight blend of the four neighbours of its position.
    pub fn bilinear_sample(&self, coords: &Tensor<T>) -> Result<Tensor<T>>
    where
        T: Float + AsPrimitive<isize>,
    {
        let (res, src, stc) = self.sample_setup(coords)?;
        let nd = self.ndim();
        let sh0 = self.dim(nd - 2) as isize - 1;
        let sh1 = self.dim(nd - 1) as isize - 1;
        let st0 = self.stride(nd - 2);
        let st1 = self.stride(nd - 1);

        let mut res = res;
        res.par_zip_apply2_ptr(&src, coords, move |r, m, c| unsafe {
            let x = *c;
            let y = *c.offset(stc);
            let ix = x.floor();
            let iy = y.floor();
            let i0 = clamp_idx(ix.as_(), 0, sh0);
            let i1 = clamp_idx(ix.as_() + 1, 0, sh0);
            let j0 = clamp_idx(iy.as_(), 0, sh1);
            let j1 = clamp_idx(iy.as_() + 1, 0, sh1);
            let ai = x - ix;
            let aj = y - iy;
            let w = T::one();
            *r = *m.offset(i0 * st0 + j0 * st1) * (w - ai) * (w - aj)
                + *m.offset(i1 * st0 + j0 * st1) * ai * (w - aj)
                + *m.offset(i0 * st0 + j1 * st1) * (w - ai) * aj
                + *m.offset(i1 * st0 + j1 * st1) * ai * aj;
        });
        Ok(res)
    }

    /// Like [`Tensor::bilinear_sample`] but positions outside the source read
    /// as zero instead of clamping to the boundary.
    pub fn bilinear_sample_zero_pad(&self, coords: &Tensor<T>) -> Result<Tensor<T>>
    where
        T: Float + AsPrimitive<isize>,
    {
        let (res, src, stc) = self.sample_setup(coords)?;
        let nd = self.ndim();
        let sh0 = self.dim(nd - 2) as isize;
        let sh1 = self.dim(nd - 1) as isize;
        let st0 = self.stride(nd - 2);
        let st1 = self.stride(nd - 1);

        let mut res = res;
        res.par_zip_apply2_ptr(&src, coords, move |r, m, c| unsafe {
            let x = *c;
            let y = *c.offset(stc);
            let ix = x.floor();
            let iy = y.floor();
            let i0: isize = ix.as_();
            let i1 = i0 + 1;
            let j0: isize = iy.as_();
            let j1 = j0 + 1;

            let mi0 = 0 <= i0 && i0 < sh0;
            let mi1 = 0 <= i1 && i1 < sh0;
            let mj0 = 0 <= j0 && j0 < sh1;
            let mj1 = 0 <= j1 && j1 < sh1;

            let v00 = if mi0 && mj0 { *m.offset(i0 * st0 + j0 * st1) } else { T::zero() };
            let v10 = if mi1 && mj0 { *m.offset(i1 * st0 + j0 * st1) } else { T::zero() };
            let v01 = if mi0 && mj1 { *m.offset(i0 * st0 + j1 * st1) } else { T::zero() };
            let v11 = if mi1 && mj1 { *m.offset(i1 * st0 + j1 * st1) } else { T::zero() };

            let ai = x - ix;
            let aj = y - iy;
            let w = T::one();
            *r = v00 * (w - ai) * (w - aj) + v10 * ai * (w - aj) + v01 * (w - ai) * aj + v11 * ai * aj;
        });
        Ok(res)
    }

    /// Shared validation and operand construction for the sampling passes:
    /// result `[batch..., n]`, source replicated per coordinate, and the
    /// stride between the two coordinate channels.
    fn sample_setup(&self, coords: &Tensor<T>) -> Result<(Tensor<T>, Tensor<T>, isize)> {
        let nd = self.ndim();
        if nd < 2 || coords.ndim() != nd {
            return Err(TensorError::ShapeMismatch(
                self.dims().to_vec(),
                coords.dims().to_vec(),
            ));
        }
        if nd > 2 && self.dims()[..nd - 2] != coords.dims()[..nd - 2] {
            return Err(TensorError::ShapeMismatch(
                self.dims().to_vec(),
                coords.dims().to_vec(),
            ));
        }
        if coords.dim(nd - 1) < 2 || self.dim(nd - 2) == 0 || self.dim(nd - 1) == 0 {
            return Err(TensorError::ShapeMismatch(
                self.dims().to_vec(),
                coords.dims().to_vec(),
            ));
        }
        let num_coords = coords.dim(nd - 2);
        let mut res_shape = if nd == 2 {
            Shape::scalar()
        } else {
            self.shape().first(nd - 2)?
        };
        res_shape.append_axis(num_coords);
        let res = Tensor::<T>::new(res_shape);
        let src = self.insert_axis(nd - 2, num_coords)?;
        Ok((res, src, coords.stride(nd - 1)))
    }

    /// Surround the named axes with `before`/`after` elements of `value`.
    pub fn pad(&self, axes: &[usize], before: usize, after: usize, value: T) -> Result<Tensor<T>> {
        let mut res_shape = self.shape().clone();
        res_shape.extend_axes(axes, before + after)?;
        let mut res = Tensor::from_elem(res_shape, value);
        let mut beg = vec![0isize; self.ndim()];
        let mut end: Vec<isize> = self.dims().iter().map(|&d| d as isize).collect();
        for &ax in axes {
            beg[ax] += before as isize;
            end[ax] += before as isize;
        }
        let mut interior = res.crop(&beg, &end)?;
        interior.copy_values_from(self)?;
        Ok(res)
    }

    /// Gather whole hyperplanes of one axis by index (negative indices from
    /// the end), materializing the selection.
    pub fn index_select(&self, axis: usize, indices: &[isize]) -> Result<Tensor<T>> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: axis as isize,
                rank: self.ndim(),
            });
        }
        if indices.is_empty() {
            return Err(TensorError::DegenerateSlice { axis, size: 0 });
        }
        let axis_size = self.dim(axis);
        let mut res_shape = self.shape().clone();
        res_shape.set_dim(axis, indices.len());
        let res = Tensor::<T>::new(res_shape);
        for (i, &raw) in indices.iter().enumerate() {
            let p = resolve_index(axis_size, raw);
            if p < 0 || p as usize >= axis_size {
                return Err(TensorError::IndexOutOfRange {
                    axis,
                    index: raw,
                    size: axis_size,
                });
            }
            let mut dst = res.crop_axis(axis, i as isize, i as isize + 1)?;
            dst.copy_values_from(&self.crop_axis(axis, p, p + 1)?)?;
        }
        Ok(res)
    }

    /// Concatenate tensors along one axis; all other extents must agree.
    pub fn cat(tensors: &[Tensor<T>], axis: isize) -> Result<Tensor<T>> {
        let Some(first) = tensors.first() else {
            return Err(TensorError::InvalidAxis { axis, rank: 0 });
        };
        let ax = first.axis_index(axis)?;
        let mut base_shape = first.shape().clone();
        base_shape.remove_axis(ax)?;
        let mut total = 0usize;
        for t in tensors {
            if t.ndim() != first.ndim() {
                return Err(TensorError::ShapeMismatch(
                    first.dims().to_vec(),
                    t.dims().to_vec(),
                ));
            }
            let mut s = t.shape().clone();
            s.remove_axis(ax)?;
            if s != base_shape {
                return Err(TensorError::ShapeMismatch(
                    first.dims().to_vec(),
                    t.dims().to_vec(),
                ));
            }
            total += t.dim(ax);
        }
        let mut res_shape = base_shape;
        res_shape.insert_axis(ax, total)?;
        let res = Tensor::<T>::new(res_shape);
        let mut offset = 0isize;
        for t in tensors {
            if t.dim(ax) == 0 {
                continue;
            }
            let mut dst = res.crop_axis(ax, offset, offset + t.dim(ax) as isize)?;
            dst.copy_values_from(t)?;
            offset += t.dim(ax) as isize;
        }
        Ok(res)
    }
}
