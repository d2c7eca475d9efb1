//! Core value types for argcast
//!
//! This module contains the runtime value model the cast pipelines operate
//! on. It mirrors the shapes an R-like host hands to a builtin: bare scalars,
//! attributed vectors, and the two sentinels `NULL` and "missing".
//!
//! # Main Types
//!
//! - [`SemanticType`] - The element type of a scalar or vector
//! - [`Logical`] - Three-valued logical scalar (`TRUE`, `FALSE`, `NA`)
//! - [`Complex`] - Complex scalar
//! - [`Value`] - Any runtime value (scalar, vector, sentinel or opaque object)
//! - [`Vector`] - Typed element storage plus names, dims and attributes
//!
//! # NA Representation
//!
//! - Integer: `i32::MIN` ([`INT_NA`])
//! - Double: a NaN with the R payload ([`DOUBLE_NA`]); any NaN tests as NA
//! - Logical: [`Logical::Na`]
//! - Character: `None`
//! - Complex: NA real or imaginary part

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integer NA marker.
pub const INT_NA: i32 = i32::MIN;

/// Bit pattern of the R double NA.
pub const DOUBLE_NA_BITS: u64 = 0x7FF0_0000_0000_07A2;

/// Double NA value.
pub const DOUBLE_NA: f64 = f64::from_bits(DOUBLE_NA_BITS);

/// Returns true if `value` is a double NA (or any NaN)
pub fn is_double_na(value: f64) -> bool {
    value.is_nan()
}

/// Element type of a scalar or vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Logical,
    Integer,
    Double,
    Complex,
    Character,
    Raw,
    List,
    /// Any vector type; only meaningful as a coercion target
    Any,
}

impl SemanticType {
    /// Returns true for the atomic element types
    pub fn is_atomic(&self) -> bool {
        !matches!(self, SemanticType::List | SemanticType::Any)
    }

    /// R name of the type
    pub fn name(&self) -> &'static str {
        match self {
            SemanticType::Logical => "logical",
            SemanticType::Integer => "integer",
            SemanticType::Double => "double",
            SemanticType::Complex => "complex",
            SemanticType::Character => "character",
            SemanticType::Raw => "raw",
            SemanticType::List => "list",
            SemanticType::Any => "any",
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Three-valued logical scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logical {
    False,
    True,
    Na,
}

impl Logical {
    pub fn is_na(&self) -> bool {
        matches!(self, Logical::Na)
    }
}

impl From<bool> for Logical {
    fn from(value: bool) -> Self {
        if value {
            Logical::True
        } else {
            Logical::False
        }
    }
}

/// Complex scalar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const NA: Complex = Complex {
        re: DOUBLE_NA,
        im: DOUBLE_NA,
    };

    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn is_na(&self) -> bool {
        is_double_na(self.re) || is_double_na(self.im)
    }

    fn identical(&self, other: &Complex) -> bool {
        self.re.to_bits() == other.re.to_bits() && self.im.to_bits() == other.im.to_bits()
    }
}

/// Typed element storage of a vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorData {
    Logical(Vec<Logical>),
    Integer(Vec<i32>),
    Double(Vec<f64>),
    Complex(Vec<Complex>),
    Character(Vec<Option<String>>),
    Raw(Vec<u8>),
    List(Vec<Value>),
}

impl VectorData {
    /// Empty storage for the given type (`Any` yields an empty list)
    pub fn empty(ty: SemanticType) -> Self {
        match ty {
            SemanticType::Logical => VectorData::Logical(Vec::new()),
            SemanticType::Integer => VectorData::Integer(Vec::new()),
            SemanticType::Double => VectorData::Double(Vec::new()),
            SemanticType::Complex => VectorData::Complex(Vec::new()),
            SemanticType::Character => VectorData::Character(Vec::new()),
            SemanticType::Raw => VectorData::Raw(Vec::new()),
            SemanticType::List | SemanticType::Any => VectorData::List(Vec::new()),
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            VectorData::Logical(_) => SemanticType::Logical,
            VectorData::Integer(_) => SemanticType::Integer,
            VectorData::Double(_) => SemanticType::Double,
            VectorData::Complex(_) => SemanticType::Complex,
            VectorData::Character(_) => SemanticType::Character,
            VectorData::Raw(_) => SemanticType::Raw,
            VectorData::List(_) => SemanticType::List,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorData::Logical(v) => v.len(),
            VectorData::Integer(v) => v.len(),
            VectorData::Double(v) => v.len(),
            VectorData::Complex(v) => v.len(),
            VectorData::Character(v) => v.len(),
            VectorData::Raw(v) => v.len(),
            VectorData::List(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index` as a standalone value
    pub fn get(&self, index: usize) -> Option<Value> {
        Some(match self {
            VectorData::Logical(v) => Value::Logical(*v.get(index)?),
            VectorData::Integer(v) => Value::Integer(*v.get(index)?),
            VectorData::Double(v) => Value::Double(*v.get(index)?),
            VectorData::Complex(v) => Value::Complex(*v.get(index)?),
            VectorData::Character(v) => Value::Str(v.get(index)?.clone()),
            VectorData::Raw(v) => Value::Raw(*v.get(index)?),
            VectorData::List(v) => v.get(index)?.clone(),
        })
    }

    /// Returns true if any element is NA (lists never contain NA themselves)
    pub fn any_na(&self) -> bool {
        match self {
            VectorData::Logical(v) => v.iter().any(Logical::is_na),
            VectorData::Integer(v) => v.iter().any(|x| *x == INT_NA),
            VectorData::Double(v) => v.iter().any(|x| is_double_na(*x)),
            VectorData::Complex(v) => v.iter().any(Complex::is_na),
            VectorData::Character(v) => v.iter().any(Option::is_none),
            VectorData::Raw(_) | VectorData::List(_) => false,
        }
    }

    fn identical(&self, other: &VectorData) -> bool {
        match (self, other) {
            (VectorData::Double(a), VectorData::Double(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (VectorData::Complex(a), VectorData::Complex(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
            }
            (VectorData::List(a), VectorData::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
            }
            _ => self == other,
        }
    }
}

/// An attributed vector
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub data: VectorData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dims: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl Default for VectorData {
    fn default() -> Self {
        VectorData::List(Vec::new())
    }
}

impl Vector {
    /// Create a vector without attributes
    pub fn new(data: VectorData) -> Self {
        Self {
            data,
            names: None,
            dims: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn with_dims(mut self, dims: Vec<usize>) -> Self {
        self.dims = Some(dims);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if the vector carries no names, dims or other attributes
    pub fn is_plain(&self) -> bool {
        self.names.is_none() && self.dims.is_none() && self.attributes.is_empty()
    }
}

/// A runtime value handed to a cast pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    /// The `NULL` object
    Null,
    /// An argument that was not supplied
    Missing,
    Logical(Logical),
    Integer(i32),
    Double(f64),
    Complex(Complex),
    /// Character scalar, `None` is `NA_character_`
    Str(Option<String>),
    Raw(u8),
    /// Host boolean, produced by `LogicalToBoolean`
    Boolean(bool),
    Vector(Vector),
    /// Object with no vector representation (functions, environments, ...)
    Opaque(String),
}

impl Value {
    /// Character scalar helper
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Some(s.into()))
    }

    /// Plain vector helper
    pub fn vector(data: VectorData) -> Self {
        Value::Vector(Vector::new(data))
    }

    /// NA scalar of the given atomic type
    pub fn na_of(ty: SemanticType) -> Option<Value> {
        Some(match ty {
            SemanticType::Logical => Value::Logical(Logical::Na),
            SemanticType::Integer => Value::Integer(INT_NA),
            SemanticType::Double => Value::Double(DOUBLE_NA),
            SemanticType::Complex => Value::Complex(Complex::NA),
            SemanticType::Character => Value::Str(None),
            _ => return None,
        })
    }

    /// Semantic type of a scalar or vector; `None` for sentinels, booleans and opaque values
    pub fn semantic_type(&self) -> Option<SemanticType> {
        match self {
            Value::Logical(_) => Some(SemanticType::Logical),
            Value::Integer(_) => Some(SemanticType::Integer),
            Value::Double(_) => Some(SemanticType::Double),
            Value::Complex(_) => Some(SemanticType::Complex),
            Value::Str(_) => Some(SemanticType::Character),
            Value::Raw(_) => Some(SemanticType::Raw),
            Value::Vector(v) => Some(v.data.semantic_type()),
            Value::Null | Value::Missing | Value::Boolean(_) | Value::Opaque(_) => None,
        }
    }

    /// Returns true for bare atomic scalars
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Logical(_)
                | Value::Integer(_)
                | Value::Double(_)
                | Value::Complex(_)
                | Value::Str(_)
                | Value::Raw(_)
        )
    }

    /// R length: `NULL` is 0, scalars are 1; `None` for values without a length
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Null => Some(0),
            Value::Vector(v) => Some(v.len()),
            Value::Missing | Value::Opaque(_) => None,
            _ => Some(1),
        }
    }

    /// Scalar view: the value itself if scalar, the element of a length-1 atomic vector
    pub fn as_scalar(&self) -> Option<Value> {
        match self {
            v if v.is_scalar() => Some(v.clone()),
            Value::Vector(v) if v.len() == 1 && v.data.semantic_type().is_atomic() => {
                v.data.get(0)
            }
            _ => None,
        }
    }

    /// First element of a scalar or vector; `None` when empty or not a vector
    pub fn first_element(&self) -> Option<Value> {
        match self {
            v if v.is_scalar() => Some(v.clone()),
            Value::Boolean(_) => Some(self.clone()),
            Value::Vector(v) => v.data.get(0),
            _ => None,
        }
    }

    /// Returns true if a scalar is NA or a vector contains NA
    pub fn is_na(&self) -> bool {
        match self {
            Value::Logical(l) => l.is_na(),
            Value::Integer(i) => *i == INT_NA,
            Value::Double(d) => is_double_na(*d),
            Value::Complex(c) => c.is_na(),
            Value::Str(s) => s.is_none(),
            Value::Vector(v) => v.data.any_na(),
            _ => false,
        }
    }

    /// Wraps a bare scalar into a length-1 vector; other values are returned as-is
    pub fn boxed(self) -> Value {
        let data = match self {
            Value::Logical(l) => VectorData::Logical(vec![l]),
            Value::Integer(i) => VectorData::Integer(vec![i]),
            Value::Double(d) => VectorData::Double(vec![d]),
            Value::Complex(c) => VectorData::Complex(vec![c]),
            Value::Str(s) => VectorData::Character(vec![s]),
            Value::Raw(r) => VectorData::Raw(vec![r]),
            other => return other,
        };
        Value::vector(data)
    }

    /// Dimensions of a vector, if any
    pub fn dims(&self) -> Option<&[usize]> {
        match self {
            Value::Vector(v) => v.dims.as_deref(),
            _ => None,
        }
    }

    /// R `identical`: structural equality comparing doubles by bit pattern
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Complex(a), Value::Complex(b)) => a.identical(b),
            (Value::Vector(a), Value::Vector(b)) => {
                a.names == b.names
                    && a.dims == b.dims
                    && a.data.identical(&b.data)
                    && a.attributes.len() == b.attributes.len()
                    && a
                        .attributes
                        .iter()
                        .zip(&b.attributes)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.identical(vb))
            }
            _ => self == other,
        }
    }

    /// Short type label used in messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Missing => "missing",
            Value::Boolean(_) => "boolean",
            Value::Opaque(_) => "object",
            other => other
                .semantic_type()
                .map(|t| t.name())
                .unwrap_or("unknown"),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Missing => write!(f, "<missing>"),
            Value::Logical(Logical::True) => write!(f, "TRUE"),
            Value::Logical(Logical::False) => write!(f, "FALSE"),
            Value::Logical(Logical::Na) => write!(f, "NA"),
            Value::Integer(i) if *i == INT_NA => write!(f, "NA"),
            Value::Integer(i) => write!(f, "{}L", i),
            Value::Double(d) if is_double_na(*d) => write!(f, "NA"),
            Value::Double(d) => write!(f, "{}", d),
            Value::Complex(c) if c.is_na() => write!(f, "NA"),
            Value::Complex(c) => write!(f, "{}+{}i", c.re, c.im),
            Value::Str(None) => write!(f, "NA"),
            Value::Str(Some(s)) => write!(f, "\"{}\"", s),
            Value::Raw(r) => write!(f, "{:02x}", r),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Vector(v) => {
                write!(f, "{}[", v.data.semantic_type())?;
                for i in 0..v.len() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(elem) = v.data.get(i) {
                        write!(f, "{}", elem)?;
                    }
                }
                write!(f, "]")
            }
            Value::Opaque(label) => write!(f, "<{}>", label),
        }
    }
}
