//! Reductions and reduction-shaped algorithms.
//!
//! There is no specialized reduction kernel: every reduction is a composition
//! of view transforms and the generic engine. Folding the last `k` axes works
//! by replicating an accumulator tensor over those axes (stride-0 trailing
//! axes) and accumulating through the replicated view; reducing an interior
//! axis first swaps it to the trailing position. One extra transpose or copy
//! buys complete code reuse.

use num_traits::{AsPrimitive, Float, Zero};
use std::ops::{Add, Div, Mul};

use crate::tensor::{Element, Tensor};
use crate::{Result, Shape, TensorError};

impl<T: Element> Tensor<T> {
    /// Sum of all elements.
    pub fn sum(&self) -> T
    where
        T: Add<Output = T> + Zero,
    {
        let mut acc = T::zero();
        self.visit(|a| acc = acc + *a);
        acc
    }

    /// Fold the trailing `k` axes into a sum, keeping the leading axes.
    ///
    /// The accumulator is broadcast over the folded axes, so the pass runs in
    /// parallel whenever at least one kept axis remains to split on.
    pub fn sum_last_axes(&self, k: usize) -> Result<Tensor<T>>
    where
        T: Add<Output = T> + Zero,
    {
        if k > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: k as isize,
                rank: self.ndim(),
            });
        }
        if k == 0 {
            return Ok(self.copy());
        }
        let kept = if k == self.ndim() {
            Shape::scalar()
        } else {
            self.shape().first(self.ndim() - k)?
        };
        let res = Tensor::<T>::zeros(kept);
        let folded = self.shape().last(k)?;
        let mut acc = res.replicate_values(&folded)?;
        if k < self.ndim() {
            acc.par_zip_apply(self, |s, a| *s = *s + *a);
        } else {
            // Fully replicated accumulator: must stay serial.
            acc.zip_apply(self, |s, a| *s = *s + *a);
        }
        Ok(res)
    }

    /// Sum along one axis (negative indices from the end), removing it.
    pub fn sum_axis(&self, axis: isize) -> Result<Tensor<T>>
    where
        T: Add<Output = T> + Zero,
    {
        let ax = self.axis_index(axis)?;
        if ax == self.ndim() - 1 {
            self.sum_last_axes(1)
        } else {
            self.swap_axes(ax as isize, -1)?
                .sum_last_axes(1)?
                .swap_axes(ax as isize, -1)
        }
    }

    /// Arithmetic mean along one axis, removing it.
    pub fn mean_axis(&self, axis: isize) -> Result<Tensor<T>>
    where
        T: Add<Output = T> + Zero + Div<Output = T>,
        usize: AsPrimitive<T>,
    {
        let ax = self.axis_index(axis)?;
        let mut res = self.sum_axis(axis)?;
        res /= self.dim(ax).as_();
        Ok(res)
    }

    /// Largest element; panics on an empty tensor.
    pub fn max(&self) -> T
    where
        T: PartialOrd,
    {
        assert!(self.num_elements() > 0, "max of empty tensor");
        let mut best = unsafe { *self.base_ptr() };
        self.visit(|a| {
            if *a > best {
                best = *a;
            }
        });
        best
    }

    /// Smallest element; panics on an empty tensor.
    pub fn min(&self) -> T
    where
        T: PartialOrd,
    {
        assert!(self.num_elements() > 0, "min of empty tensor");
        let mut best = unsafe { *self.base_ptr() };
        self.visit(|a| {
            if *a < best {
                best = *a;
            }
        });
        best
    }

    /// Maximum along one axis, removing it.
    ///
    /// Seeds an accumulator with the axis's first hyperplane, re-inserts the
    /// axis replicated and folds through the generic engine.
    pub fn max_axis(&self, axis: isize) -> Result<Tensor<T>>
    where
        T: PartialOrd,
    {
        let ax = self.axis_index(axis)?;
        let res = self.destroy_axis(ax)?.copy();
        let mut acc = res.insert_axis(ax, self.dim(ax))?;
        acc.zip_apply(self, |m, a| {
            if *a > *m {
                *m = *a;
            }
        });
        acc.destroy_axis(ax)
    }

    /// Minimum along one axis, removing it.
    pub fn min_axis(&self, axis: isize) -> Result<Tensor<T>>
    where
        T: PartialOrd,
    {
        let ax = self.axis_index(axis)?;
        let res = self.destroy_axis(ax)?.copy();
        let mut acc = res.insert_axis(ax, self.dim(ax))?;
        acc.zip_apply(self, |m, a| {
            if *a < *m {
                *m = *a;
            }
        });
        acc.destroy_axis(ax)
    }

    /// Numerically stable softmax along one axis (max-shifted exponentials).
    pub fn softmax_axis(&self, axis: isize) -> Result<Tensor<T>>
    where
        T: Float,
    {
        let ax = self.axis_index(axis)?;
        let n = self.dim(ax);
        let max_values = self.max_axis(ax as isize)?;
        let max_ins = max_values.insert_axis(ax, n)?;

        let exp_sum = Tensor::<T>::zeros(max_values.shape().clone());
        let mut exp_acc = exp_sum.insert_axis(ax, n)?;
        exp_acc.zip_apply2(self, &max_ins, |acc, a, m| *acc = *acc + (*a - *m).exp());

        let mut res = self.copy();
        res.zip_apply2(&exp_acc, &max_ins, |r, e, m| *r = (*r - *m).exp() / *e);
        Ok(res)
    }

    /// Elementwise product with `other` folded over the trailing `k` axes;
    /// `k` must be in `[1, ndim)` and the shapes must match exactly.
    pub fn partial_product_sum(&self, other: &Tensor<T>, k: usize) -> Result<Tensor<T>>
    where
        T: Add<Output = T> + Mul<Output = T> + Zero,
    {
        if k == 0 || k >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: k as isize,
                rank: self.ndim(),
            });
        }
        if self.shape() != other.shape() {
            return Err(TensorError::ShapeMismatch(
                self.dims().to_vec(),
                other.dims().to_vec(),
            ));
        }
        let kept = self.shape().first(self.ndim() - k)?;
        let res = Tensor::<T>::zeros(kept);
        let mut acc = res.replicate_values(&self.shape().last(k)?)?;
        acc.par_zip_apply2(self, other, |s, a, b| *s = *s + *a * *b);
        Ok(res)
    }

    /// Matrix product of two rank-2 tensors, expressed through replicated
    /// axes and [`Tensor::partial_product_sum`].
    pub fn matmul(&self, other: &Tensor<T>) -> Result<Tensor<T>>
    where
        T: Add<Output = T> + Mul<Output = T> + Zero,
    {
        if self.ndim() != 2 || other.ndim() != 2 {
            return Err(TensorError::InvalidAxis {
                axis: self.ndim().max(other.ndim()) as isize,
                rank: 2,
            });
        }
        if self.dim(1) != other.dim(0) {
            return Err(TensorError::ShapeMismatch(
                self.dims().to_vec(),
                other.dims().to_vec(),
            ));
        }
        let lhs = self.insert_axis(1, other.dim(1))?;
        let rhs = other.transpose()?.insert_axis(0, self.dim(0))?;
        lhs.partial_product_sum(&rhs, 1)
    }

    /// Average pooling: one sliding window per named axis, then the window
    /// extents are folded into a sum and divided by the window volume.
    pub fn avg_pool(&self, axes: &[usize], step: &[usize], window: &[usize]) -> Result<Tensor<T>>
    where
        T: Add<Output = T> + Zero + Div<Output = T>,
        usize: AsPrimitive<T>,
    {
        if axes.is_empty() || axes.len() > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis: axes.len() as isize,
                rank: self.ndim(),
            });
        }
        if step.len() != axes.len() || window.len() != axes.len() {
            return Err(TensorError::ShapeMismatch(
                vec![axes.len()],
                vec![step.len(), window.len()],
            ));
        }
        for (i, &ax) in axes.iter().enumerate() {
            if ax >= self.ndim() {
                return Err(TensorError::InvalidAxis {
                    axis: ax as isize,
                    rank: self.ndim(),
                });
            }
            if axes[i + 1..].contains(&ax) {
                return Err(TensorError::InvalidPermutation(axes.to_vec()));
            }
        }
        let mut w = self.clone();
        for i in 0..axes.len() {
            w = w.window(axes[i], step[i], window[i])?;
        }
        let mut pooled = w.sum_last_axes(axes.len())?;
        let volume: usize = window.iter().product();
        pooled /= volume.as_();
        Ok(pooled)
    }
}
