//! Element-typed array storage backing the numeric [`crate::value::Value`] variants.
//!
//! Numeric data comes in three element types (`u8`, `i64`, `f64`) and five
//! shape/reference combinations (scalar, 1-D owned, 2-D owned, 1-D reference,
//! 2-D reference). The dense array kernels themselves (the element-wise math, `dot`,
//! `inverse`) are delegated to `ndarray`, the external linear-algebra library assumed
//! by the specification; this module only owns storage and shape bookkeeping.
//!
//! References (indices 3 and 4) are not Rust borrows: they are a reference-counted
//! handle onto the owning array plus a [`BasicSlice`] descriptor per axis. This keeps
//! [`crate::value::Value`] `'static` and freely movable across the scoped-thread
//! fan-out the executor uses for independent operands, while still letting a modifying
//! slice detect "this is a view" and materialize owned storage before writing (the
//! copy-on-write rule of §4.5).

use std::sync::Arc;

use ndarray::{Array1, Array2};

/// The element type carried by a numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemType {
    U8,
    I64,
    F64,
}

/// A single scalar numeric value (rank 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    U8(u8),
    I64(i64),
    F64(f64),
}

impl Scalar {
    #[must_use]
    pub fn elem_type(self) -> ElemType {
        match self {
            Self::U8(_) => ElemType::U8,
            Self::I64(_) => ElemType::I64,
            Self::F64(_) => ElemType::F64,
        }
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::U8(v) => f64::from(v),
            Self::I64(v) => v as f64,
            Self::F64(v) => v,
        }
    }

    #[must_use]
    pub fn as_bool(self) -> bool {
        self.as_f64() != 0.0
    }
}

/// Owned 1-D array storage, typed by element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorData {
    U8(Array1<u8>),
    I64(Array1<i64>),
    F64(Array1<f64>),
}

/// Owned 2-D array storage, typed by element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixData {
    U8(Array2<u8>),
    I64(Array2<i64>),
    F64(Array2<f64>),
}

/// A basic (start, stop, step) slice along one axis, already normalized to be
/// non-negative and in-range (see [`crate::slicing::normalize_basic_slice`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicSlice {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl BasicSlice {
    #[must_use]
    pub fn whole(len: usize) -> Self {
        Self {
            start: 0,
            stop: len,
            step: 1,
        }
    }

    /// Number of elements this slice selects.
    #[must_use]
    pub fn len(self) -> usize {
        if self.stop <= self.start {
            0
        } else {
            (self.stop - self.start).div_ceil(self.step)
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_contiguous(self) -> bool {
        self.step == 1
    }
}

/// A read-only view onto a shared owner vector: no data is copied until the view is
/// materialized or written through.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorView {
    pub owner: Arc<VectorData>,
    pub slice: BasicSlice,
}

/// A read-only view onto a shared owner matrix along both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixView {
    pub owner: Arc<MatrixData>,
    pub rows: BasicSlice,
    pub cols: BasicSlice,
}

impl VectorData {
    #[must_use]
    pub fn elem_type(&self) -> ElemType {
        match self {
            Self::U8(_) => ElemType::U8,
            Self::I64(_) => ElemType::I64,
            Self::F64(_) => ElemType::F64,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U8(a) => a.len(),
            Self::I64(a) => a.len(),
            Self::F64(a) => a.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get_f64(&self, idx: usize) -> f64 {
        match self {
            Self::U8(a) => f64::from(a[idx]),
            Self::I64(a) => a[idx] as f64,
            Self::F64(a) => a[idx],
        }
    }

    #[must_use]
    pub fn get_scalar(&self, idx: usize) -> Scalar {
        match self {
            Self::U8(a) => Scalar::U8(a[idx]),
            Self::I64(a) => Scalar::I64(a[idx]),
            Self::F64(a) => Scalar::F64(a[idx]),
        }
    }

    #[must_use]
    pub fn from_f64_vec(values: Vec<f64>) -> Self {
        Self::F64(Array1::from_vec(values))
    }

    /// Gathers the elements at `indices` into a fresh owned vector, in the given order.
    #[must_use]
    pub fn gather(&self, indices: &[usize]) -> Self {
        match self {
            Self::U8(a) => Self::U8(Array1::from_iter(indices.iter().map(|&i| a[i]))),
            Self::I64(a) => Self::I64(Array1::from_iter(indices.iter().map(|&i| a[i]))),
            Self::F64(a) => Self::F64(Array1::from_iter(indices.iter().map(|&i| a[i]))),
        }
    }
}

impl MatrixData {
    #[must_use]
    pub fn elem_type(&self) -> ElemType {
        match self {
            Self::U8(_) => ElemType::U8,
            Self::I64(_) => ElemType::I64,
            Self::F64(_) => ElemType::F64,
        }
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::U8(a) => (a.nrows(), a.ncols()),
            Self::I64(a) => (a.nrows(), a.ncols()),
            Self::F64(a) => (a.nrows(), a.ncols()),
        }
    }

    #[must_use]
    pub fn get_f64(&self, row: usize, col: usize) -> f64 {
        match self {
            Self::U8(a) => f64::from(a[[row, col]]),
            Self::I64(a) => a[[row, col]] as f64,
            Self::F64(a) => a[[row, col]],
        }
    }

    #[must_use]
    pub fn get_scalar(&self, row: usize, col: usize) -> Scalar {
        match self {
            Self::U8(a) => Scalar::U8(a[[row, col]]),
            Self::I64(a) => Scalar::I64(a[[row, col]]),
            Self::F64(a) => Scalar::F64(a[[row, col]]),
        }
    }

    #[must_use]
    pub fn from_f64_rows(rows: Vec<Vec<f64>>) -> Self {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Self::F64(Array2::from_shape_vec((nrows, ncols), flat).expect("row lengths already validated equal"))
    }

    #[must_use]
    pub fn row(&self, row: usize) -> VectorData {
        match self {
            Self::U8(a) => VectorData::U8(a.row(row).to_owned()),
            Self::I64(a) => VectorData::I64(a.row(row).to_owned()),
            Self::F64(a) => VectorData::F64(a.row(row).to_owned()),
        }
    }

    #[must_use]
    pub fn column(&self, col: usize) -> VectorData {
        match self {
            Self::U8(a) => VectorData::U8(a.column(col).to_owned()),
            Self::I64(a) => VectorData::I64(a.column(col).to_owned()),
            Self::F64(a) => VectorData::F64(a.column(col).to_owned()),
        }
    }
}

impl VectorView {
    #[must_use]
    pub fn len(&self) -> usize {
        self.slice.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materializes this view into an owned vector, copying through the slice descriptor.
    /// This is the copy-on-write step a modifying slice must perform before writing.
    #[must_use]
    pub fn to_owned_vector(&self) -> VectorData {
        let indices: Vec<usize> = (0..self.slice.len())
            .map(|i| self.slice.start + i * self.slice.step)
            .collect();
        self.owner.gather(&indices)
    }

    #[must_use]
    pub fn get_f64(&self, idx: usize) -> f64 {
        self.owner.get_f64(self.slice.start + idx * self.slice.step)
    }
}

impl MatrixView {
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    /// Materializes this view into an owned matrix, copying through both slice descriptors.
    #[must_use]
    pub fn to_owned_matrix(&self) -> MatrixData {
        let (nrows, ncols) = self.shape();
        let mut rows = Vec::with_capacity(nrows);
        for r in 0..nrows {
            let mut row = Vec::with_capacity(ncols);
            for c in 0..ncols {
                let abs_r = self.rows.start + r * self.rows.step;
                let abs_c = self.cols.start + c * self.cols.step;
                row.push(self.owner.get_f64(abs_r, abs_c));
            }
            rows.push(row);
        }
        MatrixData::from_f64_rows(rows)
    }
}

/// The five rank/reference-ness combinations numeric [`crate::value::Value`] variants
/// can take, with a fixed `index()` ordering matching the specification (0 scalar,
/// 1 owned 1-D, 2 owned 2-D, 3 reference 1-D, 4 reference 2-D) so slicing dispatch can
/// switch on it directly.
#[derive(Debug, Clone)]
pub enum NodeData {
    Scalar(Scalar),
    Vector(VectorData),
    Matrix(MatrixData),
    VectorRef(VectorView),
    MatrixRef(MatrixView),
}

impl NodeData {
    #[must_use]
    pub fn index(&self) -> u8 {
        match self {
            Self::Scalar(_) => 0,
            Self::Vector(_) => 1,
            Self::Matrix(_) => 2,
            Self::VectorRef(_) => 3,
            Self::MatrixRef(_) => 4,
        }
    }

    /// Converts a reference variant into the equivalent owned storage; a no-op on
    /// already-owned data. Used before any modifying slice writes through.
    #[must_use]
    pub fn into_owned(self) -> Self {
        match self {
            Self::VectorRef(view) => Self::Vector(view.to_owned_vector()),
            Self::MatrixRef(view) => Self::Matrix(view.to_owned_matrix()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_monotone_over_rank_and_refness() {
        let scalar = NodeData::Scalar(Scalar::F64(1.0));
        let vector = NodeData::Vector(VectorData::from_f64_vec(vec![1.0, 2.0]));
        let owner = Arc::new(VectorData::from_f64_vec(vec![1.0, 2.0, 3.0]));
        let view = NodeData::VectorRef(VectorView {
            owner,
            slice: BasicSlice::whole(3),
        });
        assert_eq!(scalar.index(), 0);
        assert_eq!(vector.index(), 1);
        assert_eq!(view.index(), 3);
    }

    #[test]
    fn view_materializes_through_step() {
        let owner = Arc::new(VectorData::from_f64_vec(vec![0.0, 1.0, 2.0, 3.0, 4.0]));
        let view = VectorView {
            owner,
            slice: BasicSlice {
                start: 1,
                stop: 5,
                step: 2,
            },
        };
        let owned = view.to_owned_vector();
        assert_eq!(owned.len(), 2);
        assert_eq!(owned.get_f64(0), 1.0);
        assert_eq!(owned.get_f64(1), 3.0);
    }
}
