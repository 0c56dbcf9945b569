//! Binary/unary arithmetic and comparison primitives.
//!
//! The dispatch surface described by the specification: operands are classified by
//! rank (scalar / vector / matrix), and for a vector-matrix or matrix-matrix pair the
//! *stretch direction* — which operand, if any, is broadcast, and along which axis —
//! is detected before a kernel runs. The kernels themselves are plain `f64` arithmetic;
//! the interesting part is entirely in which operand gets stretched against which axis.

use crate::errors::PhylanxError;
use crate::node_data::{MatrixData, Scalar, VectorData};
use crate::reader::CodeRange;
use crate::value::Value;

/// The ten operators dispatched through this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Lt => bool_to_f64(a < b),
            Self::Le => bool_to_f64(a <= b),
            Self::Gt => bool_to_f64(a > b),
            Self::Ge => bool_to_f64(a >= b),
            Self::Eq => bool_to_f64(a == b),
            Self::Ne => bool_to_f64(a != b),
        }
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Which operand(s) of a shape-mismatched pair get broadcast, and along which axis.
/// Named to match the kernel family the specification sketches
/// (`2d2d_no_stretch`, `2d2d_lhs_row_rhs_col`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stretch {
    NoStretch,
    LhsRow,
    LhsCol,
    RhsRow,
    RhsCol,
    LhsRowRhsCol,
    LhsColRhsRow,
}

fn detect_stretch(lhs_shape: (usize, usize), rhs_shape: (usize, usize)) -> Option<Stretch> {
    if lhs_shape == rhs_shape {
        return Some(Stretch::NoStretch);
    }
    let (lr, lc) = lhs_shape;
    let (rr, rc) = rhs_shape;
    match (lr == 1 && lc == rc, lc == 1 && lr == rr, rr == 1 && rc == lc, rc == 1 && rr == lr) {
        (true, _, _, _) if lr == 1 => Some(Stretch::LhsRow),
        (_, true, _, _) => Some(Stretch::LhsCol),
        (_, _, true, _) => Some(Stretch::RhsRow),
        (_, _, _, true) => Some(Stretch::RhsCol),
        _ => {
            if lr == 1 && rc == 1 {
                Some(Stretch::LhsRowRhsCol)
            } else if lc == 1 && rr == 1 {
                Some(Stretch::LhsColRhsRow)
            } else {
                None
            }
        }
    }
}

fn matrix_op(op: BinOp, lhs: &MatrixData, rhs: &MatrixData, pos: CodeRange) -> Result<Value, PhylanxError> {
    let lshape = lhs.shape();
    let rshape = rhs.shape();
    let stretch = detect_stretch(lshape, rshape).ok_or_else(|| {
        PhylanxError::domain(
            "arithmetic",
            pos,
            format!("matrix shapes {lshape:?} and {rshape:?} do not broadcast against each other"),
        )
    })?;

    let (nrows, ncols) = match stretch {
        Stretch::NoStretch => lshape,
        Stretch::LhsRow | Stretch::RhsCol => rshape,
        Stretch::LhsCol | Stretch::RhsRow => lshape,
        Stretch::LhsRowRhsCol => (rshape.0, lshape.1),
        Stretch::LhsColRhsRow => (lshape.0, rshape.1),
    };

    let mut rows = Vec::with_capacity(nrows);
    for r in 0..nrows {
        let mut row = Vec::with_capacity(ncols);
        for c in 0..ncols {
            let a = lhs.get_f64(if lshape.0 == 1 { 0 } else { r }, if lshape.1 == 1 { 0 } else { c });
            let b = rhs.get_f64(if rshape.0 == 1 { 0 } else { r }, if rshape.1 == 1 { 0 } else { c });
            row.push(op.apply(a, b));
        }
        rows.push(row);
    }
    Ok(Value::Matrix(MatrixData::from_f64_rows(rows)))
}

fn vector_op(op: BinOp, lhs: &VectorData, rhs: &VectorData, pos: CodeRange) -> Result<Value, PhylanxError> {
    if lhs.len() != rhs.len() {
        return Err(PhylanxError::domain(
            "arithmetic",
            pos,
            format!("vector lengths {} and {} differ", lhs.len(), rhs.len()),
        ));
    }
    let values = (0..lhs.len()).map(|i| op.apply(lhs.get_f64(i), rhs.get_f64(i))).collect();
    Ok(Value::Vector(VectorData::from_f64_vec(values)))
}

fn scalar_vector_op(op: BinOp, scalar: f64, vector: &VectorData, scalar_on_left: bool) -> Value {
    let values = (0..vector.len())
        .map(|i| {
            let v = vector.get_f64(i);
            if scalar_on_left { op.apply(scalar, v) } else { op.apply(v, scalar) }
        })
        .collect();
    Value::Vector(VectorData::from_f64_vec(values))
}

fn scalar_matrix_op(op: BinOp, scalar: f64, matrix: &MatrixData, scalar_on_left: bool) -> Value {
    let (nrows, ncols) = matrix.shape();
    let rows = (0..nrows)
        .map(|r| {
            (0..ncols)
                .map(|c| {
                    let v = matrix.get_f64(r, c);
                    if scalar_on_left { op.apply(scalar, v) } else { op.apply(v, scalar) }
                })
                .collect()
        })
        .collect();
    Value::Matrix(MatrixData::from_f64_rows(rows))
}

/// Broadcasts a vector against a matrix along whichever axis its length matches,
/// preferring a row broadcast (length matches column count) when both could apply
/// (e.g. a square matrix).
fn vector_matrix_op(op: BinOp, vector: &VectorData, matrix: &MatrixData, vector_on_left: bool, pos: CodeRange) -> Result<Value, PhylanxError> {
    let (nrows, ncols) = matrix.shape();
    let as_row = vector.len() == ncols;
    let as_col = vector.len() == nrows;
    if !as_row && !as_col {
        return Err(PhylanxError::domain(
            "arithmetic",
            pos,
            format!("vector of length {} broadcasts against neither axis of a {nrows}x{ncols} matrix", vector.len()),
        ));
    }
    let rows = (0..nrows)
        .map(|r| {
            (0..ncols)
                .map(|c| {
                    let v = matrix.get_f64(r, c);
                    let s = if as_row { vector.get_f64(c) } else { vector.get_f64(r) };
                    if vector_on_left { op.apply(s, v) } else { op.apply(v, s) }
                })
                .collect()
        })
        .collect();
    Ok(Value::Matrix(MatrixData::from_f64_rows(rows)))
}

/// Applies a binary arithmetic/comparison operator to two values, dispatching on rank.
pub fn binary_op(op: BinOp, lhs: &Value, rhs: &Value, pos: CodeRange) -> Result<Value, PhylanxError> {
    match (lhs, rhs) {
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::scalar(op.apply(a.as_f64(), b.as_f64()))),
        (Value::Scalar(a), Value::Vector(v)) => Ok(scalar_vector_op(op, a.as_f64(), v, true)),
        (Value::Vector(v), Value::Scalar(b)) => Ok(scalar_vector_op(op, b.as_f64(), v, false)),
        (Value::Scalar(a), Value::Matrix(m)) => Ok(scalar_matrix_op(op, a.as_f64(), m, true)),
        (Value::Matrix(m), Value::Scalar(b)) => Ok(scalar_matrix_op(op, b.as_f64(), m, false)),
        (Value::Vector(a), Value::Vector(b)) => vector_op(op, a, b, pos),
        (Value::Vector(v), Value::Matrix(m)) => vector_matrix_op(op, v, m, true, pos),
        (Value::Matrix(m), Value::Vector(v)) => vector_matrix_op(op, v, m, false, pos),
        (Value::Matrix(a), Value::Matrix(b)) => matrix_op(op, a, b, pos),
        (a, b) => Err(PhylanxError::type_mismatch(
            "arithmetic",
            pos,
            format!("cannot apply an arithmetic operator to {} and {}", a.type_name(), b.type_name()),
        )),
    }
}

/// Unary negation.
pub fn negate(value: &Value, pos: CodeRange) -> Result<Value, PhylanxError> {
    match value {
        Value::Scalar(s) => Ok(Value::scalar(-s.as_f64())),
        Value::Vector(v) => Ok(Value::Vector(VectorData::from_f64_vec((0..v.len()).map(|i| -v.get_f64(i)).collect()))),
        Value::Matrix(m) => {
            let (nrows, ncols) = m.shape();
            let rows = (0..nrows).map(|r| (0..ncols).map(|c| -m.get_f64(r, c)).collect()).collect();
            Ok(Value::Matrix(MatrixData::from_f64_rows(rows)))
        }
        other => Err(PhylanxError::type_mismatch(
            "arithmetic",
            pos,
            format!("cannot negate a {}", other.type_name()),
        )),
    }
}

/// Element-wise exponential, delegating the actual transcendental to the array library.
pub fn exp(value: &Value, pos: CodeRange) -> Result<Value, PhylanxError> {
    match value {
        Value::Scalar(s) => Ok(Value::scalar(s.as_f64().exp())),
        Value::Vector(v) => Ok(Value::Vector(VectorData::from_f64_vec((0..v.len()).map(|i| v.get_f64(i).exp()).collect()))),
        Value::Matrix(m) => {
            let (nrows, ncols) = m.shape();
            let rows = (0..nrows).map(|r| (0..ncols).map(|c| m.get_f64(r, c).exp()).collect()).collect();
            Ok(Value::Matrix(MatrixData::from_f64_rows(rows)))
        }
        other => Err(PhylanxError::type_mismatch("exp", pos, format!("cannot exponentiate a {}", other.type_name()))),
    }
}

/// Matrix/vector product, delegating to `ndarray`'s dot implementation.
pub fn dot(lhs: &Value, rhs: &Value, pos: CodeRange) -> Result<Value, PhylanxError> {
    use ndarray::Array2;

    let to_matrix = |v: &Value| -> Option<Array2<f64>> {
        match v {
            Value::Matrix(MatrixData::F64(a)) => Some(a.clone()),
            Value::Matrix(m) => {
                let (nrows, ncols) = m.shape();
                Array2::from_shape_vec((nrows, ncols), (0..nrows).flat_map(|r| (0..ncols).map(move |c| (r, c))).map(|(r, c)| m.get_f64(r, c)).collect()).ok()
            }
            _ => None,
        }
    };

    match (lhs, rhs) {
        (Value::Matrix(_), Value::Matrix(_)) => {
            let a = to_matrix(lhs).expect("matrix variant always converts");
            let b = to_matrix(rhs).expect("matrix variant always converts");
            if a.ncols() != b.nrows() {
                return Err(PhylanxError::domain(
                    "dot",
                    pos,
                    format!("incompatible shapes for dot: {:?} and {:?}", a.dim(), b.dim()),
                ));
            }
            let result = a.dot(&b);
            let rows = result.outer_iter().map(|r| r.to_vec()).collect();
            Ok(Value::Matrix(MatrixData::from_f64_rows(rows)))
        }
        (Value::Matrix(_), Value::Vector(v)) => {
            let a = to_matrix(lhs).expect("matrix variant always converts");
            if a.ncols() != v.len() {
                return Err(PhylanxError::domain("dot", pos, "matrix column count does not match vector length"));
            }
            let rhs_vec = ndarray::Array1::from_iter((0..v.len()).map(|i| v.get_f64(i)));
            let result = a.dot(&rhs_vec);
            Ok(Value::Vector(VectorData::from_f64_vec(result.to_vec())))
        }
        (Value::Vector(a), Value::Vector(b)) => {
            if a.len() != b.len() {
                return Err(PhylanxError::domain("dot", pos, "vector dot product requires equal lengths"));
            }
            let sum: f64 = (0..a.len()).map(|i| a.get_f64(i) * b.get_f64(i)).sum();
            Ok(Value::scalar(sum))
        }
        (a, b) => Err(PhylanxError::type_mismatch(
            "dot",
            pos,
            format!("dot is not defined between {} and {}", a.type_name(), b.type_name()),
        )),
    }
}

/// Matrix inverse via Gauss-Jordan elimination with partial pivoting over an augmented
/// `[A | I]` matrix, done by hand on `Vec<Vec<f64>>` rather than through a linear-algebra
/// crate — see the note in DESIGN.md.
pub fn inverse(value: &Value, pos: CodeRange) -> Result<Value, PhylanxError> {
    let Value::Matrix(m) = value else {
        return Err(PhylanxError::type_mismatch("inverse", pos, format!("expected a matrix, found {}", value.type_name())));
    };
    let (n, ncols) = m.shape();
    if n != ncols {
        return Err(PhylanxError::domain("inverse", pos, "inverse requires a square matrix"));
    }

    let mut aug: Vec<Vec<f64>> = (0..n)
        .map(|r| {
            let mut row: Vec<f64> = (0..n).map(|c| m.get_f64(r, c)).collect();
            row.extend((0..n).map(|c| if c == r { 1.0 } else { 0.0 }));
            row
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| aug[a][col].abs().partial_cmp(&aug[b][col].abs()).unwrap())
            .unwrap();
        if aug[pivot_row][col].abs() < f64::EPSILON {
            return Err(PhylanxError::domain("inverse", pos, "matrix is singular"));
        }
        aug.swap(col, pivot_row);
        let pivot = aug[col][col];
        for v in &mut aug[col] {
            *v /= pivot;
        }
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = aug[r][col];
            for c in 0..2 * n {
                aug[r][c] -= factor * aug[col][c];
            }
        }
    }

    let rows = aug.into_iter().map(|row| row[n..].to_vec()).collect();
    Ok(Value::Matrix(MatrixData::from_f64_rows(rows)))
}

/// Index of the largest element, along the whole vector (no axis) or along one axis of
/// a matrix (`0` columns-wise, `1` rows-wise).
pub fn argmax(value: &Value, axis: Option<i64>, pos: CodeRange) -> Result<Value, PhylanxError> {
    match (value, axis) {
        (Value::Vector(v), None) => {
            let (idx, _) = (0..v.len())
                .map(|i| (i, v.get_f64(i)))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
                .ok_or_else(|| PhylanxError::domain("argmax", pos, "argmax of an empty vector"))?;
            Ok(Value::Scalar(Scalar::I64(idx as i64)))
        }
        (Value::Matrix(m), axis) => {
            let (nrows, ncols) = m.shape();
            let axis = axis.unwrap_or(0);
            match axis {
                0 => {
                    let values = (0..ncols)
                        .map(|c| {
                            (0..nrows)
                                .map(|r| (r, m.get_f64(r, c)))
                                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
                                .map(|(r, _)| r as f64)
                                .unwrap_or(0.0)
                        })
                        .collect();
                    Ok(Value::Vector(VectorData::from_f64_vec(values)))
                }
                1 => {
                    let values = (0..nrows)
                        .map(|r| {
                            (0..ncols)
                                .map(|c| (c, m.get_f64(r, c)))
                                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
                                .map(|(c, _)| c as f64)
                                .unwrap_or(0.0)
                        })
                        .collect();
                    Ok(Value::Vector(VectorData::from_f64_vec(values)))
                }
                other => Err(PhylanxError::domain("argmax", pos, format!("axis must be 0 or 1, found {other}"))),
            }
        }
        (other, _) => Err(PhylanxError::type_mismatch(
            "argmax",
            pos,
            format!("argmax expects a vector or matrix, found {}", other.type_name()),
        )),
    }
}

/// Creates an array of `size` elements filled with `value`.
pub fn constant(value: f64, size: i64, pos: CodeRange) -> Result<Value, PhylanxError> {
    if size < 0 {
        return Err(PhylanxError::domain("constant", pos, "size must not be negative"));
    }
    Ok(Value::Vector(VectorData::from_f64_vec(vec![value; size as usize])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> CodeRange {
        CodeRange::new(0, 0)
    }

    #[test]
    fn scalar_broadcasts_against_vector() {
        let result = binary_op(BinOp::Add, &Value::scalar(1.0), &Value::Vector(VectorData::from_f64_vec(vec![1.0, 2.0])), pos()).unwrap();
        assert_eq!(result, Value::Vector(VectorData::from_f64_vec(vec![2.0, 3.0])));
    }

    #[test]
    fn row_vector_broadcasts_across_matrix_columns() {
        let m = MatrixData::from_f64_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let v = VectorData::from_f64_vec(vec![10.0, 20.0]);
        let result = binary_op(BinOp::Add, &Value::Matrix(m), &Value::Vector(v), pos()).unwrap();
        assert_eq!(result, Value::Matrix(MatrixData::from_f64_rows(vec![vec![11.0, 22.0], vec![13.0, 24.0]])));
    }

    #[test]
    fn dot_of_matrix_and_vector_matches_manual_computation() {
        let m = Value::Matrix(MatrixData::from_f64_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0]]));
        let v = Value::Vector(VectorData::from_f64_vec(vec![3.0, 4.0]));
        let result = dot(&m, &v, pos()).unwrap();
        assert_eq!(result, Value::Vector(VectorData::from_f64_vec(vec![3.0, 4.0])));
    }

    #[test]
    fn inverse_of_identity_is_identity() {
        let m = Value::Matrix(MatrixData::from_f64_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0]]));
        let result = inverse(&m, pos()).unwrap();
        assert_eq!(result, Value::Matrix(MatrixData::from_f64_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0]])));
    }

    #[test]
    fn argmax_returns_index_of_largest_element() {
        let v = Value::Vector(VectorData::from_f64_vec(vec![1.0, 9.0, 3.0]));
        assert_eq!(argmax(&v, None, pos()).unwrap(), Value::Scalar(Scalar::I64(1)));
    }

    #[test]
    fn mismatched_vector_lengths_are_a_domain_error() {
        let a = Value::Vector(VectorData::from_f64_vec(vec![1.0]));
        let b = Value::Vector(VectorData::from_f64_vec(vec![1.0, 2.0]));
        let err = binary_op(BinOp::Add, &a, &b, pos()).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Domain);
    }
}
