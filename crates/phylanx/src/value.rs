//! The runtime value type flowing along primitive graph edges.
//!
//! `Value` is the closed tagged union named `primitive_argument` by the specification:
//! variant indices are fixed so slicing dispatch can switch on them directly (0 scalar,
//! 1 owned vector, 2 owned matrix, 3 vector reference, 4 matrix reference, 5 string,
//! 6 primitive handle, 7 list, 8 dictionary), with boolean and nil carried outside that
//! numbering. The numeric variants delegate their storage to [`crate::node_data`].

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::errors::PhylanxError;
use crate::node_data::{ElemType, MatrixData, MatrixView, Scalar, VectorData, VectorView};
use crate::reader::CodeRange;

/// A stable index into the compiled primitive graph's node arena.
pub type PrimitiveId = u32;

/// A dictionary key. Dictionaries are keyed on the scalar/string subset of [`Value`];
/// anything else is rejected with a type-mismatch error at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
}

impl fmt::Display for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// The runtime value type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Scalar(Scalar),
    Vector(VectorData),
    Matrix(MatrixData),
    VectorRef(VectorView),
    MatrixRef(MatrixView),
    Str(Arc<str>),
    Primitive(PrimitiveId),
    List(Arc<Vec<Value>>),
    Dict(Arc<IndexMap<DictKey, Value, ahash::RandomState>>),
}

impl Value {
    /// The fixed variant index from the specification's data model, used by slicing
    /// dispatch. Boolean and nil have no numbered slot.
    #[must_use]
    pub fn index(&self) -> Option<u8> {
        match self {
            Self::Scalar(_) => Some(0),
            Self::Vector(_) => Some(1),
            Self::Matrix(_) => Some(2),
            Self::VectorRef(_) => Some(3),
            Self::MatrixRef(_) => Some(4),
            Self::Str(_) => Some(5),
            Self::Primitive(_) => Some(6),
            Self::List(_) => Some(7),
            Self::Dict(_) => Some(8),
            Self::Nil | Self::Bool(_) => None,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Scalar(_) => "scalar",
            Self::Vector(_) | Self::VectorRef(_) => "vector",
            Self::Matrix(_) | Self::MatrixRef(_) => "matrix",
            Self::Str(_) => "string",
            Self::Primitive(_) => "primitive",
            Self::List(_) => "list",
            Self::Dict(_) => "dictionary",
        }
    }

    #[must_use]
    pub fn scalar(v: f64) -> Self {
        Self::Scalar(Scalar::F64(v))
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Coerces a value to a boolean per the runtime's truthiness rule: booleans are
    /// themselves, scalars are nonzero-true, everything else is a type mismatch.
    pub fn as_bool(&self, pos: CodeRange) -> Result<bool, PhylanxError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Scalar(s) => Ok(s.as_bool()),
            other => Err(PhylanxError::type_mismatch(
                "truthiness",
                pos,
                format!("expected boolean or scalar condition, found {}", other.type_name()),
            )),
        }
    }

    /// Coerces a value to an `f64` scalar, rejecting non-scalar shapes.
    pub fn as_f64(&self, pos: CodeRange) -> Result<f64, PhylanxError> {
        match self {
            Self::Scalar(s) => Ok(s.as_f64()),
            Self::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(PhylanxError::type_mismatch(
                "scalar-coercion",
                pos,
                format!("expected a scalar value, found {}", other.type_name()),
            )),
        }
    }

    #[must_use]
    pub fn elem_type(&self) -> Option<ElemType> {
        match self {
            Self::Scalar(s) => Some(s.elem_type()),
            Self::Vector(v) => Some(v.elem_type()),
            Self::Matrix(m) => Some(m.elem_type()),
            Self::VectorRef(v) => Some(v.owner.elem_type()),
            Self::MatrixRef(m) => Some(m.owner.elem_type()),
            _ => None,
        }
    }

    /// Materializes a reference variant into owned storage; a no-op on every other
    /// variant. This is the copy-on-write step a modifying slice must perform first.
    #[must_use]
    pub fn into_owned(self) -> Self {
        match self {
            Self::VectorRef(view) => Self::Vector(view.to_owned_vector()),
            Self::MatrixRef(view) => Self::Matrix(view.to_owned_matrix()),
            other => other,
        }
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::VectorRef(_) | Self::MatrixRef(_))
    }

    #[must_use]
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Arc::new(items))
    }

    #[must_use]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::Str(s.into())
    }

    /// Converts a value usable as a dictionary key (boolean, scalar, or string) to
    /// [`DictKey`]; any other shape is a type mismatch.
    pub fn as_dict_key(&self, pos: CodeRange) -> Result<DictKey, PhylanxError> {
        match self {
            Self::Bool(b) => Ok(DictKey::Bool(*b)),
            Self::Scalar(Scalar::I64(i)) => Ok(DictKey::Int(*i)),
            Self::Scalar(s) => Ok(DictKey::Int(s.as_f64() as i64)),
            Self::Str(s) => Ok(DictKey::Str(Arc::clone(s))),
            other => Err(PhylanxError::type_mismatch(
                "dict-key",
                pos,
                format!("expected a boolean, scalar, or string key, found {}", other.type_name()),
            )),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Scalar(s) => write!(f, "{}", s.as_f64()),
            Self::Vector(v) => {
                write!(f, "[")?;
                for i in 0..v.len() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v.get_f64(i))?;
                }
                write!(f, "]")
            }
            Self::Matrix(m) => {
                let (rows, cols) = m.shape();
                write!(f, "[")?;
                for r in 0..rows {
                    if r > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[")?;
                    for c in 0..cols {
                        if c > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", m.get_f64(r, c))?;
                    }
                    write!(f, "]")?;
                }
                write!(f, "]")
            }
            Self::VectorRef(v) => {
                write!(f, "[")?;
                for i in 0..v.len() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v.get_f64(i))?;
                }
                write!(f, "]")
            }
            Self::MatrixRef(v) => {
                let (rows, cols) = v.shape();
                write!(f, "[")?;
                for r in 0..rows {
                    if r > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[")?;
                    for c in 0..cols {
                        if c > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", v.owner.get_f64(v.rows.start + r * v.rows.step, v.cols.start + c * v.cols.step))?;
                    }
                    write!(f, "]")?;
                }
                write!(f, "]")
            }
            Self::Str(s) => write!(f, "{s}"),
            Self::Primitive(id) => write!(f, "<primitive #{id}>"),
            Self::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Dict(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_data::BasicSlice;

    #[test]
    fn fixed_variant_indices_match_specification() {
        assert_eq!(Value::Scalar(Scalar::F64(1.0)).index(), Some(0));
        assert_eq!(Value::Vector(VectorData::from_f64_vec(vec![])).index(), Some(1));
        assert_eq!(Value::list(vec![]).index(), Some(7));
        assert_eq!(Value::Dict(Arc::default()).index(), Some(8));
        assert_eq!(Value::Nil.index(), None);
        assert_eq!(Value::Bool(true).index(), None);
    }

    #[test]
    fn reference_materializes_to_owned_on_into_owned() {
        let owner = Arc::new(VectorData::from_f64_vec(vec![1.0, 2.0, 3.0]));
        let value = Value::VectorRef(VectorView {
            owner,
            slice: BasicSlice::whole(3),
        });
        assert!(value.is_reference());
        let owned = value.into_owned();
        assert!(matches!(owned, Value::Vector(_)));
    }

    #[test]
    fn display_renders_vector_as_bracketed_list() {
        let v = Value::Vector(VectorData::from_f64_vec(vec![1.0, 2.0]));
        assert_eq!(v.to_string(), "[1, 2]");
    }
}
