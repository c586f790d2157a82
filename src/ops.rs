//! Arithmetic and comparison operations.
//!
//! Binary tensor arithmetic aligns both operands to the combined broadcast
//! shape (see [`broadcast_shape`]) and runs a ternary engine pass into a
//! freshly allocated result. The operator-trait impls delegate to
//! [`Tensor::broadcast_with`] and treat an impossible broadcast as the
//! programmer error it is, by panicking.

use num_traits::{Float, Zero};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use crate::shape::broadcast_shape;
use crate::tensor::{Element, Tensor};
use crate::Result;

impl<T: Element> Tensor<T> {
    /// Combine two tensors elementwise after aligning both to their combined
    /// broadcast shape.
    pub fn broadcast_with<A, R, F>(&self, other: &Tensor<A>, f: F) -> Result<Tensor<R>>
    where
        A: Element,
        R: Element,
        F: Fn(&T, &A) -> R,
    {
        let target = broadcast_shape(self.shape(), other.shape())?;
        let a = self.upshape(&target)?;
        let b = other.upshape(&target)?;
        let mut res = Tensor::<R>::new(target);
        res.zip_apply2(&a, &b, |r, x, y| *r = f(x, y));
        Ok(res)
    }

    /// Map every element into a fresh tensor of the same shape.
    pub fn map<R, F>(&self, f: F) -> Tensor<R>
    where
        R: Element,
        F: Fn(&T) -> R,
    {
        let mut res = Tensor::<R>::new(self.shape().clone());
        res.zip_apply(self, |r, x| *r = f(x));
        res
    }
}

macro_rules! tensor_binary_op {
    ($op_trait:ident, $method:ident) => {
        impl<T> $op_trait<&Tensor<T>> for &Tensor<T>
        where
            T: Element + $op_trait<Output = T>,
        {
            type Output = Tensor<T>;

            fn $method(self, rhs: &Tensor<T>) -> Tensor<T> {
                match self.broadcast_with(rhs, |a, b| $op_trait::$method(*a, *b)) {
                    Ok(res) => res,
                    Err(e) => panic!("tensor {}: {e}", stringify!($method)),
                }
            }
        }

        impl<T> $op_trait<T> for &Tensor<T>
        where
            T: Element + $op_trait<Output = T>,
        {
            type Output = Tensor<T>;

            fn $method(self, rhs: T) -> Tensor<T> {
                self.map(|a| $op_trait::$method(*a, rhs))
            }
        }
    };
}

tensor_binary_op!(Add, add);
tensor_binary_op!(Sub, sub);
tensor_binary_op!(Mul, mul);
tensor_binary_op!(Div, div);

macro_rules! tensor_compound_op {
    ($assign_trait:ident, $assign_method:ident, $op_trait:ident, $method:ident) => {
        impl<T> $assign_trait<&Tensor<T>> for Tensor<T>
        where
            T: Element + $op_trait<Output = T>,
        {
            fn $assign_method(&mut self, rhs: &Tensor<T>) {
                let r = match rhs.upshape(self.shape()) {
                    Ok(r) => r,
                    Err(e) => panic!("tensor {}: {e}", stringify!($assign_method)),
                };
                self.zip_apply(&r, |d, s| *d = $op_trait::$method(*d, *s));
            }
        }

        impl<T> $assign_trait<T> for Tensor<T>
        where
            T: Element + $op_trait<Output = T>,
        {
            fn $assign_method(&mut self, rhs: T) {
                self.apply(|d| *d = $op_trait::$method(*d, rhs));
            }
        }
    };
}

tensor_compound_op!(AddAssign, add_assign, Add, add);
tensor_compound_op!(SubAssign, sub_assign, Sub, sub);
tensor_compound_op!(MulAssign, mul_assign, Mul, mul);
tensor_compound_op!(DivAssign, div_assign, Div, div);

// ============================================================================
// Comparisons
// ============================================================================

impl<T: Element + PartialOrd> Tensor<T> {
    /// Elementwise `self < other` under broadcasting.
    pub fn lt(&self, other: &Tensor<T>) -> Result<Tensor<bool>> {
        self.broadcast_with(other, |a, b| a < b)
    }

    /// Elementwise `self <= other` under broadcasting.
    pub fn le(&self, other: &Tensor<T>) -> Result<Tensor<bool>> {
        self.broadcast_with(other, |a, b| a <= b)
    }

    /// Elementwise `self > other` under broadcasting.
    pub fn gt(&self, other: &Tensor<T>) -> Result<Tensor<bool>> {
        self.broadcast_with(other, |a, b| a > b)
    }

    /// Elementwise `self >= other` under broadcasting.
    pub fn ge(&self, other: &Tensor<T>) -> Result<Tensor<bool>> {
        self.broadcast_with(other, |a, b| a >= b)
    }

    pub fn lt_scalar(&self, v: T) -> Tensor<bool> {
        self.map(|a| *a < v)
    }

    pub fn le_scalar(&self, v: T) -> Tensor<bool> {
        self.map(|a| *a <= v)
    }

    pub fn gt_scalar(&self, v: T) -> Tensor<bool> {
        self.map(|a| *a > v)
    }

    pub fn ge_scalar(&self, v: T) -> Tensor<bool> {
        self.map(|a| *a >= v)
    }
}

impl<T: Element + PartialEq> Tensor<T> {
    pub fn eq_scalar(&self, v: T) -> Tensor<bool> {
        self.map(|a| *a == v)
    }

    pub fn ne_scalar(&self, v: T) -> Tensor<bool> {
        self.map(|a| *a != v)
    }
}

/// Whole-tensor equality: identical shape and identical elements.
impl<T: Element + PartialEq> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        let mut mismatches = 0usize;
        self.zip_visit(other, |a, b| {
            if a != b {
                mismatches += 1;
            }
        });
        mismatches == 0
    }
}

// ============================================================================
// Approximate comparison
// ============================================================================

impl<T: Element + Float> Tensor<T> {
    /// True when every element of `other` is within `epsilon` of the
    /// matching element. A lower-rank `other` is replicated over this
    /// tensor's trailing axes first.
    pub fn allclose(&self, other: &Tensor<T>, epsilon: T) -> bool {
        if self.ndim() > other.ndim() {
            let Ok(tail) = self.shape().last(self.ndim() - other.ndim()) else {
                return false;
            };
            let Ok(replicated) = other.replicate_values(&tail) else {
                return false;
            };
            return self.allclose(&replicated, epsilon);
        }
        if self.shape() != other.shape() {
            return false;
        }
        let mut close = true;
        self.zip_visit(other, |a, b| {
            if (*a - *b).abs() > epsilon {
                close = false;
            }
        });
        close
    }

    /// True when every element is within `epsilon` of `value`.
    pub fn allclose_value(&self, value: T, epsilon: T) -> bool {
        let mut close = true;
        self.visit(|a| {
            if (*a - value).abs() > epsilon {
                close = false;
            }
        });
        close
    }

    /// Like [`Tensor::allclose`], logging up to `max_report` mismatching
    /// indices and the maximum deviation.
    pub fn allclose_dump(&self, other: &Tensor<T>, epsilon: T, max_report: usize) -> bool
    where
        T: std::fmt::Display,
    {
        if self.ndim() > other.ndim() {
            return self.allclose(other, epsilon);
        }
        if self.shape() != other.shape() {
            log::warn!("shape mismatch {} vs {}", self.shape(), other.shape());
            return false;
        }
        let mut mismatches = 0usize;
        let mut max_deviation = T::zero();
        self.zip_visit(other, |a, b| {
            let d = (*a - *b).abs();
            if d > max_deviation {
                max_deviation = d;
            }
            if d > epsilon {
                mismatches += 1;
                if mismatches <= max_report {
                    match self.reference_to_index(a) {
                        Some(idx) => log::warn!("mismatch at {idx:?}: {a} != {b}"),
                        None => log::warn!("mismatch (index unresolved): {a} != {b}"),
                    }
                }
            }
        });
        if mismatches != 0 {
            log::warn!("total {mismatches} mismatches");
        }
        log::info!("max deviation {max_deviation}");
        mismatches == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_same_shape() {
        let a = Tensor::<i32>::arange(6).reshape(&[2, 3]).unwrap();
        let b = Tensor::<i32>::from_elem([2, 3], 10);
        let c = &a + &b;
        assert_eq!(c.to_vec(), vec![10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_broadcast_trailing_axis() {
        // (5,) against (5, 2): the vector replicates along the trailing axis.
        let a = Tensor::<i32>::zeros([5, 2]);
        let b = Tensor::<i32>::arange(5);
        let c = &b - &a;
        assert_eq!(c.dims(), &[5, 2]);
        for i in 0..5 {
            for j in 0..2 {
                assert_eq!(c.at(&[i, j]).unwrap(), b.at(&[i]).unwrap());
            }
        }
    }

    #[test]
    fn test_outer_product_via_size1_axes() {
        let a = Tensor::<f32>::arange(4).reshape(&[1, 4]).unwrap();
        let b = Tensor::<f32>::arange(4).reshape(&[4, 1]).unwrap();
        let prod = &a * &b;
        assert_eq!(prod.at(&[3, 3]).unwrap(), 9.0);
        let sum = &a + &b;
        assert_eq!(sum.at(&[3, 2]).unwrap(), 5.0);
        let diff = &a - &b;
        assert_eq!(diff.at(&[3, 2]).unwrap(), -1.0);
        let quot = &a / &(&b + 1.0f32);
        assert_eq!(quot.at(&[1, 2]).unwrap(), 1.0);
    }

    #[test]
    #[should_panic(expected = "tensor add")]
    fn test_incompatible_broadcast_panics() {
        let a = Tensor::<i32>::arange(3);
        let b = Tensor::<i32>::arange(4);
        let _ = &a + &b;
    }

    #[test]
    fn test_scalar_ops() {
        let a = Tensor::<i32>::arange(4);
        assert_eq!((&a * 3).to_vec(), vec![0, 3, 6, 9]);
        assert_eq!((&a + 1).to_vec(), vec![1, 2, 3, 4]);
        assert_eq!((&a - 1).to_vec(), vec![-1, 0, 1, 2]);
        let b = &a + 10;
        assert_eq!((&b / 2).to_vec(), vec![5, 5, 6, 6]);
    }

    #[test]
    fn test_compound_assign_tensor() {
        let mut a = Tensor::<i32>::arange(10).reshape(&[5, 2]).unwrap();
        let before = a.copy();
        let b = Tensor::<i32>::arange(5);
        a += &b;
        for i in 0..5 {
            for j in 0..2 {
                assert_eq!(
                    a.at(&[i, j]).unwrap(),
                    before.at(&[i, j]).unwrap() + b.at(&[i]).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_compound_assign_scalar() {
        let mut a = Tensor::<i32>::arange(5);
        a *= 5;
        assert_eq!(a.to_vec(), vec![0, 5, 10, 15, 20]);
        a -= 5;
        assert_eq!(a.to_vec(), vec![-5, 0, 5, 10, 15]);
        a /= 5;
        assert_eq!(a.to_vec(), vec![-1, 0, 1, 2, 3]);
    }

    #[test]
    fn test_comparisons_broadcast() {
        let a = Tensor::<i32>::arange(10).reshape(&[5, 2]).unwrap();
        let b = Tensor::<i32>::from_elem([5], 4);
        let c = a.lt(&b).unwrap();
        assert_eq!(c.dims(), &[5, 2]);
        for i in 0..5 {
            for j in 0..2 {
                assert_eq!(
                    c.at(&[i, j]).unwrap(),
                    a.at(&[i, j]).unwrap() < b.at(&[i]).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_scalar_comparisons() {
        let a = Tensor::<i32>::arange(4);
        assert_eq!(a.gt_scalar(1).to_vec(), vec![false, false, true, true]);
        assert_eq!(a.le_scalar(1).to_vec(), vec![true, true, false, false]);
        assert_eq!(a.eq_scalar(2).to_vec(), vec![false, false, true, false]);
        assert_eq!(a.ne_scalar(2).to_vec(), vec![true, true, false, true]);
    }

    #[test]
    fn test_equality_requires_same_shape() {
        let a = Tensor::<i32>::arange(6).reshape(&[2, 3]).unwrap();
        let b = Tensor::<i32>::arange(6).reshape(&[3, 2]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a.copy());
    }

    #[test]
    fn test_equality_sees_through_views() {
        let a = Tensor::<i32>::arange(6).reshape(&[2, 3]).unwrap();
        let flipped_twice = a.flip(1).unwrap().flip(1).unwrap();
        assert_eq!(a, flipped_twice);
    }

    #[test]
    fn test_allclose_replicates_lower_rank() {
        let ones = Tensor::<f64>::ones([3, 4]);
        assert!(ones.allclose(&Tensor::scalar(1.0), 1e-9));
        assert!(!ones.allclose(&Tensor::scalar(1.5), 1e-9));
        assert!(ones.allclose_value(1.0, 1e-9));
    }

    #[test]
    fn test_allclose_dump_counts() {
        let a = Tensor::<f64>::ones([4]);
        let mut b = Tensor::<f64>::ones([4]);
        b.set_at(&[2], 2.0).unwrap();
        assert!(!a.allclose_dump(&b, 1e-9, 5));
        assert!(a.allclose_dump(&a.copy(), 1e-9, 5));
    }

    #[test]
    fn test_map_preserves_shape() {
        let a = Tensor::<i32>::arange(6).reshape(&[2, 3]).unwrap();
        let m = a.map(|x| x * x);
        assert_eq!(m.dims(), &[2, 3]);
        assert_eq!(m.at(&[1, 2]).unwrap(), 25);
    }
}
