//! Debug text dump: shape header plus nested bracketed rows.
//!
//! The format exists for diagnostics and logging; nothing load-bearing
//! parses it. Rank-1 blocks print inline so small trailing extents stay
//! readable.

use std::fmt;

use crate::tensor::{Element, Tensor};

const INDENT: usize = 4;

fn write_block<T: Element + fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    t: &Tensor<T>,
    indent: usize,
) -> fmt::Result {
    let pad = " ".repeat(indent);
    if t.ndim() <= 1 {
        write!(f, "{pad}[ ")?;
        let mut first = true;
        let mut err = Ok(());
        t.visit(|v| {
            if !first {
                err = err.and_then(|()| write!(f, " "));
            }
            err = err.and_then(|()| write!(f, "{v}"));
            first = false;
        });
        err?;
        writeln!(f, " ]")
    } else {
        writeln!(f, "{pad}[")?;
        for i in 0..t.dim(0) {
            let sub = t.subtensor(&[i as isize]).map_err(|_| fmt::Error)?;
            write_block(f, &sub, indent + INDENT)?;
        }
        writeln!(f, "{pad}]")
    }
}

impl<T: Element + fmt::Display> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shape = {}", self.shape())?;
        if self.ndim() == 0 {
            let mut err = Ok(());
            self.visit(|v| err = err.and_then(|()| writeln!(f, "{v}")));
            return err;
        }
        write_block(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rank1() {
        let t = Tensor::<i32>::arange(4);
        let s = format!("{t}");
        assert_eq!(s, "shape = (4)\n[ 0 1 2 3 ]\n");
    }

    #[test]
    fn test_display_rank2_nests_rows() {
        let t = Tensor::<i32>::arange(6).reshape(&[2, 3]).unwrap();
        let s = format!("{t}");
        assert_eq!(s, "shape = (2, 3)\n[\n    [ 0 1 2 ]\n    [ 3 4 5 ]\n]\n");
    }

    #[test]
    fn test_display_scalar() {
        let t = Tensor::<f32>::scalar(2.5);
        let s = format!("{t}");
        assert_eq!(s, "shape = ()\n2.5\n");
    }

    #[test]
    fn test_display_respects_views() {
        let t = Tensor::<i32>::arange(6).reshape(&[2, 3]).unwrap();
        let flipped = t.flip(1).unwrap();
        let s = format!("{flipped}");
        assert!(s.contains("[ 2 1 0 ]"));
        assert!(s.contains("[ 5 4 3 ]"));
    }
}
