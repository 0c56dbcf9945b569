//! NumPy-compatible slicing: basic ranges, advanced integer-array indices, and boolean
//! masks, over 0-, 1-, and 2-D values.
//!
//! This module only normalizes indices and dispatches by target rank and index shape;
//! the element access itself goes through [`crate::node_data`]. Every domain violation
//! (out-of-range index, zero step across more than one element, shape mismatch on
//! assignment) is surfaced as a [`crate::errors::PhylanxError`] of kind `Domain`, never
//! a panic.

use std::sync::Arc;

use crate::errors::PhylanxError;
use crate::node_data::{BasicSlice, MatrixData, VectorData};
use crate::reader::CodeRange;
use crate::value::Value;

/// One index position as written by the user, before normalization against a
/// concrete axis length.
#[derive(Debug, Clone)]
pub enum RawIndex {
    /// A single element position (may be negative).
    Single(i64),
    /// A `(start, stop, step)` range; any component may be omitted (`nil`-filled).
    Range {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    /// The whole axis (`nil` in source).
    Full,
    /// Advanced integer-array indexing: a 1-D list of positions.
    IntArray(Vec<i64>),
    /// Advanced integer-array indexing: a 2-D list of positions (row-major).
    IntMatrix(Vec<Vec<i64>>),
    /// Advanced boolean-mask indexing.
    BoolArray(Vec<bool>),
}

fn normalize_one(i: i64, size: usize, pos: CodeRange) -> Result<usize, PhylanxError> {
    let n = size as i64;
    let normalized = if i < 0 { i + n } else { i };
    if normalized < 0 || normalized >= n {
        return Err(PhylanxError::domain(
            "slice",
            pos,
            format!("index {i} out of range for axis of size {size}"),
        ));
    }
    Ok(normalized as usize)
}

/// Normalizes a basic range against an axis of length `size`, rewriting negative
/// bounds, defaulting omitted components, and rejecting a zero step across more than
/// one element or a `start` at/beyond `size` for anything but the empty/singleton span.
pub fn normalize_basic_slice(
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
    size: usize,
    pos: CodeRange,
) -> Result<BasicSlice, PhylanxError> {
    let n = size as i64;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(PhylanxError::domain("slice", pos, "slice step must not be zero"));
    }
    if step < 0 {
        return Err(PhylanxError::domain("slice", pos, "negative slice step is not supported"));
    }

    let norm_bound = |v: i64| -> i64 {
        if v < 0 {
            (v + n).max(0)
        } else {
            v.min(n)
        }
    };

    let start = norm_bound(start.unwrap_or(0));
    let stop = norm_bound(stop.unwrap_or(n));

    if start >= n && start != stop {
        return Err(PhylanxError::domain(
            "slice",
            pos,
            format!("start index {start} is at or beyond axis size {size}"),
        ));
    }

    Ok(BasicSlice {
        start: start as usize,
        stop: stop.max(start) as usize,
        step: step as usize,
    })
}

/// Turns a [`RawIndex`] into a normalized basic slice when it describes a basic index
/// (single element, range, or full axis); returns `None` for advanced indices.
fn as_basic(index: &RawIndex, size: usize, pos: CodeRange) -> Result<Option<BasicSlice>, PhylanxError> {
    match index {
        RawIndex::Single(i) => {
            let at = normalize_one(*i, size, pos)?;
            Ok(Some(BasicSlice {
                start: at,
                stop: at + 1,
                step: 1,
            }))
        }
        RawIndex::Range { start, stop, step } => Ok(Some(normalize_basic_slice(*start, *stop, *step, size, pos)?)),
        RawIndex::Full => Ok(Some(BasicSlice::whole(size))),
        RawIndex::IntArray(_) | RawIndex::IntMatrix(_) | RawIndex::BoolArray(_) => Ok(None),
    }
}

fn int_array_to_positions(indices: &[i64], size: usize, pos: CodeRange) -> Result<Vec<usize>, PhylanxError> {
    indices.iter().map(|&i| normalize_one(i, size, pos)).collect()
}

/// Converts a runtime [`Value`] written as a slice index into a [`RawIndex`].
/// `nil` is the whole axis; a scalar is a single position; a list of up to
/// three scalar/nil components is a `(start, stop, step)` range; a vector or
/// matrix is advanced indexing (a `u8` vector is treated as a boolean mask,
/// any other numeric vector/matrix as integer positions, truncating floats).
pub fn index_from_value(value: &Value, pos: CodeRange) -> Result<RawIndex, PhylanxError> {
    let range_bound = |item: &Value| -> Result<Option<i64>, PhylanxError> {
        match item {
            Value::Nil => Ok(None),
            Value::Scalar(s) => Ok(Some(s.as_f64() as i64)),
            other => Err(PhylanxError::type_mismatch(
                "slice-index",
                pos,
                format!("range component must be nil or scalar, found {}", other.type_name()),
            )),
        }
    };

    match value {
        Value::Nil => Ok(RawIndex::Full),
        Value::Scalar(s) => Ok(RawIndex::Single(s.as_f64() as i64)),
        Value::List(items) => match items.as_slice() {
            [] => Ok(RawIndex::Full),
            [s] => Ok(RawIndex::Range {
                start: range_bound(s)?,
                stop: None,
                step: None,
            }),
            [s, e] => Ok(RawIndex::Range {
                start: range_bound(s)?,
                stop: range_bound(e)?,
                step: None,
            }),
            [s, e, st] => Ok(RawIndex::Range {
                start: range_bound(s)?,
                stop: range_bound(e)?,
                step: range_bound(st)?,
            }),
            _ => Err(PhylanxError::domain("slice-index", pos, "a range list takes at most 3 components")),
        },
        Value::Vector(VectorData::U8(mask)) => Ok(RawIndex::BoolArray(mask.iter().map(|&b| b != 0).collect())),
        Value::Vector(VectorData::I64(v)) => Ok(RawIndex::IntArray(v.iter().copied().collect())),
        Value::Vector(VectorData::F64(v)) => Ok(RawIndex::IntArray(v.iter().map(|&f| f as i64).collect())),
        Value::Matrix(m) => {
            let (nrows, ncols) = match m {
                MatrixData::U8(a) => (a.nrows(), a.ncols()),
                MatrixData::I64(a) => (a.nrows(), a.ncols()),
                MatrixData::F64(a) => (a.nrows(), a.ncols()),
            };
            let rows = (0..nrows).map(|r| (0..ncols).map(|c| m.get_f64(r, c) as i64).collect()).collect();
            Ok(RawIndex::IntMatrix(rows))
        }
        other => Err(PhylanxError::type_mismatch(
            "slice-index",
            pos,
            format!("{} is not a valid slice index", other.type_name()),
        )),
    }
}

/// Extracts from a 1-D value. Basic single-element indices collapse to a scalar; a
/// contiguous (`step == 1`) basic range returns a reference view; any other basic
/// range or an integer/boolean array index gathers into a fresh owned vector.
pub fn extract_vector(data: &VectorData, index: &RawIndex, pos: CodeRange) -> Result<Value, PhylanxError> {
    let size = data.len();
    match index {
        RawIndex::BoolArray(mask) => {
            if mask.len() != size {
                return Err(PhylanxError::domain(
                    "slice",
                    pos,
                    format!("boolean mask length {} does not match vector length {size}", mask.len()),
                ));
            }
            let positions: Vec<usize> = mask.iter().enumerate().filter_map(|(i, &b)| b.then_some(i)).collect();
            Ok(Value::Vector(data.gather(&positions)))
        }
        RawIndex::IntArray(indices) => {
            let positions = int_array_to_positions(indices, size, pos)?;
            Ok(Value::Vector(data.gather(&positions)))
        }
        RawIndex::IntMatrix(rows) => {
            let mut gathered_rows = Vec::with_capacity(rows.len());
            for row in rows {
                let positions = int_array_to_positions(row, size, pos)?;
                gathered_rows.push((0..positions.len()).map(|i| data.get_f64(positions[i])).collect());
            }
            Ok(Value::Matrix(MatrixData::from_f64_rows(gathered_rows)))
        }
        _ => {
            let slice = as_basic(index, size, pos)?.expect("basic variants always resolve");
            if slice.len() == 1 {
                return Ok(Value::Scalar(data.get_scalar(slice.start)));
            }
            if slice.is_contiguous() {
                // Contiguous sub-ranges are returned as a reference view rather than
                // copied, as §4.5 calls out for the step-1 case.
                return Ok(Value::VectorRef(crate::node_data::VectorView {
                    owner: Arc::new(data.clone()),
                    slice,
                }));
            }
            let positions: Vec<usize> = (0..slice.len()).map(|i| slice.start + i * slice.step).collect();
            Ok(Value::Vector(data.gather(&positions)))
        }
    }
}

/// Extracts from a 2-D value given independent row/column indices. Single-row or
/// single-column selections collapse to a vector; doubly-single selections collapse to
/// a scalar; contiguous-step row and column ranges are returned as a reference view.
pub fn extract_matrix(
    data: &MatrixData,
    row_index: &RawIndex,
    col_index: &RawIndex,
    pos: CodeRange,
) -> Result<Value, PhylanxError> {
    let (nrows, ncols) = data.shape();
    let basic_rows = as_basic(row_index, nrows, pos)?;
    let basic_cols = as_basic(col_index, ncols, pos)?;

    if let (Some(rows), Some(cols)) = (basic_rows, basic_cols) {
        if rows.len() == 1 && cols.len() == 1 {
            return Ok(Value::Scalar(data.get_scalar(rows.start, cols.start)));
        }
        if rows.len() == 1 {
            let row = data.row(rows.start);
            return extract_vector(&row, col_index, pos);
        }
        if cols.len() == 1 {
            let col = data.column(cols.start);
            return extract_vector(&col, row_index, pos);
        }
        if rows.is_contiguous() && cols.is_contiguous() {
            return Ok(Value::MatrixRef(crate::node_data::MatrixView {
                owner: Arc::new(data.clone()),
                rows,
                cols,
            }));
        }
        let gathered: Vec<Vec<f64>> = (0..rows.len())
            .map(|r| {
                let abs_r = rows.start + r * rows.step;
                (0..cols.len())
                    .map(|c| data.get_f64(abs_r, cols.start + c * cols.step))
                    .collect()
            })
            .collect();
        return Ok(Value::Matrix(MatrixData::from_f64_rows(gathered)));
    }

    // One axis resolved to a single basic row/column even though the other is an
    // advanced (array or mask) index: collapse to that row/column and let
    // `extract_vector` apply the advanced index along it.
    if let Some(rows) = basic_rows {
        if rows.len() == 1 {
            let row = data.row(rows.start);
            return extract_vector(&row, col_index, pos);
        }
    }
    if let Some(cols) = basic_cols {
        if cols.len() == 1 {
            let col = data.column(cols.start);
            return extract_vector(&col, row_index, pos);
        }
    }

    Err(PhylanxError::domain(
        "slice",
        pos,
        "advanced indexing on a matrix requires both axes to resolve independently",
    ))
}

/// Assigns `rhs` into `lhs` at the position(s) described by `index`, materializing a
/// reference `lhs` into owned storage first. Broadcasts a scalar `rhs` against a
/// vector/matrix target, and a row/column vector `rhs` against a matching matrix span.
pub fn assign_vector(lhs: Value, index: &RawIndex, rhs: &Value, pos: CodeRange) -> Result<Value, PhylanxError> {
    let lhs = lhs.into_owned();
    let Value::Vector(mut data) = lhs else {
        return Err(PhylanxError::type_mismatch("slice-assign", pos, "expected a vector target"));
    };
    let size = data.len();
    let slice = as_basic(index, size, pos)?
        .ok_or_else(|| PhylanxError::domain("slice-assign", pos, "advanced-index assignment into a vector is not supported"))?;

    let values: Vec<f64> = match rhs {
        Value::Scalar(s) => vec![s.as_f64(); slice.len()],
        Value::Vector(v) if v.len() == slice.len() => (0..v.len()).map(|i| v.get_f64(i)).collect(),
        Value::Vector(v) => {
            return Err(PhylanxError::domain(
                "slice-assign",
                pos,
                format!("right-hand vector of length {} does not match slice of length {}", v.len(), slice.len()),
            ));
        }
        other => {
            return Err(PhylanxError::type_mismatch(
                "slice-assign",
                pos,
                format!("cannot assign {} into a vector slice", other.type_name()),
            ));
        }
    };

    let mut plain: Vec<f64> = (0..size).map(|i| data.get_f64(i)).collect();
    for (offset, value) in values.into_iter().enumerate() {
        plain[slice.start + offset * slice.step] = value;
    }
    data = VectorData::from_f64_vec(plain);
    Ok(Value::Vector(data))
}

/// Assigns `rhs` into a matrix `lhs` at the region described by `row_index`/`col_index`,
/// materializing a reference `lhs` first. Broadcasts a scalar, a matching matrix, or a
/// row/column vector against the selected region; advanced (non-basic) indices are
/// rejected, matching [`assign_vector`]'s restriction to basic ranges.
pub fn assign_matrix(lhs: Value, row_index: &RawIndex, col_index: &RawIndex, rhs: &Value, pos: CodeRange) -> Result<Value, PhylanxError> {
    let lhs = lhs.into_owned();
    let Value::Matrix(data) = lhs else {
        return Err(PhylanxError::type_mismatch("slice-assign", pos, "expected a matrix target"));
    };
    let (nrows, ncols) = data.shape();
    let rows = as_basic(row_index, nrows, pos)?
        .ok_or_else(|| PhylanxError::domain("slice-assign", pos, "advanced-index assignment into a matrix is not supported"))?;
    let cols = as_basic(col_index, ncols, pos)?
        .ok_or_else(|| PhylanxError::domain("slice-assign", pos, "advanced-index assignment into a matrix is not supported"))?;

    let mut plain: Vec<Vec<f64>> = (0..nrows).map(|r| (0..ncols).map(|c| data.get_f64(r, c)).collect()).collect();

    match rhs {
        Value::Scalar(s) => {
            let v = s.as_f64();
            for r in 0..rows.len() {
                for c in 0..cols.len() {
                    plain[rows.start + r * rows.step][cols.start + c * cols.step] = v;
                }
            }
        }
        Value::Matrix(m) if m.shape() == (rows.len(), cols.len()) => {
            for r in 0..rows.len() {
                for c in 0..cols.len() {
                    plain[rows.start + r * rows.step][cols.start + c * cols.step] = m.get_f64(r, c);
                }
            }
        }
        Value::Vector(v) if rows.len() == 1 && v.len() == cols.len() => {
            for c in 0..cols.len() {
                plain[rows.start][cols.start + c * cols.step] = v.get_f64(c);
            }
        }
        Value::Vector(v) if cols.len() == 1 && v.len() == rows.len() => {
            for r in 0..rows.len() {
                plain[rows.start + r * rows.step][cols.start] = v.get_f64(r);
            }
        }
        other => {
            return Err(PhylanxError::domain(
                "slice-assign",
                pos,
                format!("right-hand {} does not match the selected {}x{} region", other.type_name(), rows.len(), cols.len()),
            ));
        }
    }

    Ok(Value::Matrix(MatrixData::from_f64_rows(plain)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> CodeRange {
        CodeRange::new(0, 0)
    }

    #[test]
    fn negative_single_index_wraps_from_end() {
        let v = VectorData::from_f64_vec(vec![10.0, 20.0, 30.0]);
        let result = extract_vector(&v, &RawIndex::Single(-1), pos()).unwrap();
        assert_eq!(result, Value::Scalar(crate::node_data::Scalar::F64(30.0)));
    }

    #[test]
    fn zero_step_range_is_a_domain_error() {
        let err = normalize_basic_slice(Some(0), Some(3), Some(0), 5, pos()).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Domain);
    }

    #[test]
    fn out_of_range_index_is_a_domain_error() {
        let v = VectorData::from_f64_vec(vec![1.0, 2.0]);
        let err = extract_vector(&v, &RawIndex::Single(5), pos()).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Domain);
    }

    #[test]
    fn bool_mask_preserves_order_and_checks_length() {
        let v = VectorData::from_f64_vec(vec![1.0, 2.0, 3.0]);
        let result = extract_vector(&v, &RawIndex::BoolArray(vec![true, false, true]), pos()).unwrap();
        assert_eq!(result, Value::Vector(VectorData::from_f64_vec(vec![1.0, 3.0])));

        let err = extract_vector(&v, &RawIndex::BoolArray(vec![true, false]), pos()).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Domain);
    }

    #[test]
    fn scalar_broadcasts_into_vector_slice_assignment() {
        let v = Value::Vector(VectorData::from_f64_vec(vec![0.0, 0.0, 0.0, 0.0]));
        let result = assign_vector(
            v,
            &RawIndex::Single(1),
            &Value::Scalar(crate::node_data::Scalar::F64(5.0)),
            pos(),
        )
        .unwrap();
        assert_eq!(result, Value::Vector(VectorData::from_f64_vec(vec![0.0, 5.0, 0.0, 0.0])));
    }

    #[test]
    fn scalar_broadcasts_into_matrix_region_assignment() {
        let m = Value::Matrix(MatrixData::from_f64_rows(vec![vec![0.0, 0.0], vec![0.0, 0.0]]));
        let result = assign_matrix(
            m,
            &RawIndex::Single(0),
            &RawIndex::Full,
            &Value::Scalar(crate::node_data::Scalar::F64(9.0)),
            pos(),
        )
        .unwrap();
        assert_eq!(result, Value::Matrix(MatrixData::from_f64_rows(vec![vec![9.0, 9.0], vec![0.0, 0.0]])));
    }

    #[test]
    fn matrix_integer_array_gather_via_extract_matrix() {
        let m = MatrixData::from_f64_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let row_idx = RawIndex::Single(0);
        let col_idx = RawIndex::IntArray(vec![0, 2, 1]);
        // A basic single-row index with an advanced-gathered column index: extract_matrix
        // collapses to that row and delegates the column gather to extract_vector.
        let result = extract_matrix(&m, &row_idx, &col_idx, pos()).unwrap();
        assert_eq!(result, Value::Vector(VectorData::from_f64_vec(vec![1.0, 3.0, 2.0])));
    }

    #[test]
    fn single_row_extract_matrix_returns_that_row_in_full() {
        // Row 0, every column: `slice(matrix([[1,2,3],[4,5,6]]), 0, nil)` through the
        // real `extract_matrix` path. Note that `list(0, 2, 1)` / `list(0, 3, 1)` do
        // *not* reach this result: both decode as basic, contiguous, whole-axis ranges
        // (`index_from_value` never treats a list operand as an advanced index, matching
        // the original `is_list_operand_strict` dispatch), so that pair of indices
        // selects the entire matrix rather than a single row — see the decision recorded
        // in DESIGN.md.
        let m = MatrixData::from_f64_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let result = extract_matrix(&m, &RawIndex::Single(0), &RawIndex::Full, pos()).unwrap();
        // A full, contiguous axis comes back as a reference view rather than a copy
        // (see `extract_vector`'s contiguous-range branch), so compare by rendering.
        assert_eq!(result.to_string(), "[1, 2, 3]");
    }

    #[test]
    fn list_ranges_spanning_both_axes_select_the_whole_matrix() {
        // The literal scenario text `slice(m, list(0,2,1), list(0,3,1))` against a 2x3
        // matrix: both list operands decode as basic contiguous ranges covering the
        // full row and column axes, so the result is the whole matrix, not a single row.
        let m = MatrixData::from_f64_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let rows = RawIndex::Range { start: Some(0), stop: Some(2), step: Some(1) };
        let cols = RawIndex::Range { start: Some(0), stop: Some(3), step: Some(1) };
        let result = extract_matrix(&m, &rows, &cols, pos()).unwrap();
        assert_eq!(
            result,
            Value::MatrixRef(crate::node_data::MatrixView {
                owner: Arc::new(m.clone()),
                rows: BasicSlice { start: 0, stop: 2, step: 1 },
                cols: BasicSlice { start: 0, stop: 3, step: 1 },
            })
        );
    }
}
