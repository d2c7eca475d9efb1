//! Executable predicates lowered from [`Filter`] descriptions.
//!
//! Lowering validates every operator/subject combination up front; anything
//! without a lowering is an internal configuration error at compile time.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::filter::{
    CompareOp, CompareSubject, DoubleKind, Filter, FilterKind, MatrixKind, Tristate, ValueClass,
};
use crate::types::{Complex, Logical, SemanticType, Value, INT_NA};

const STEP: &str = "filter";

/// A validated, directly executable predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Class {
        class: ValueClass,
        extra: Option<Box<Predicate>>,
    },
    Semantic(SemanticType),
    IsNull,
    IsMissing,
    ScalarNumeric { op: CompareOp, rhs: f64 },
    ScalarString(String),
    ScalarComplex(Complex),
    ScalarSame(Value),
    IsNa(SemanticType),
    StringLength { op: CompareOp, length: usize },
    VectorSize { op: CompareOp, size: usize },
    ElementEq { index: usize, value: Value },
    Dim { op: CompareOp, axis: usize, size: usize },
    Matrix(MatrixKind),
    Double(DoubleKind),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

/// Numeric view of a non-NA number-like scalar
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) if *i != INT_NA => Some(*i as f64),
        Value::Double(d) if !d.is_nan() => Some(*d),
        Value::Logical(Logical::True) => Some(1.0),
        Value::Logical(Logical::False) => Some(0.0),
        Value::Raw(r) => Some(*r as f64),
        _ => None,
    }
}

fn scalar_equals(lhs: &Value, rhs: &Value) -> bool {
    match (numeric(lhs), numeric(rhs)) {
        (Some(a), Some(b)) => a == b,
        _ => lhs.identical(rhs),
    }
}

fn unsupported(op: CompareOp, subject: &CompareSubject) -> PipelineError {
    PipelineError::configuration(
        STEP,
        format!("operator {:?} is not supported for subject {:?}", op, subject),
    )
}

impl Predicate {
    /// Lower a filter description, rejecting combinations without an implementation
    pub fn lower(filter: &Filter) -> PipelineResult<Predicate> {
        Ok(match filter.kind() {
            FilterKind::Type { class, extra } => {
                match class {
                    ValueClass::Scalar(SemanticType::List | SemanticType::Any)
                    | ValueClass::Vector(SemanticType::Any) => {
                        return Err(PipelineError::configuration(
                            STEP,
                            format!("type filter cannot test class {:?}", class),
                        ));
                    }
                    _ => {}
                }
                let extra = match extra {
                    Some(extra) => Some(Box::new(Predicate::lower(extra)?)),
                    None => None,
                };
                Predicate::Class {
                    class: *class,
                    extra,
                }
            }
            FilterKind::SemanticType(SemanticType::Any) => {
                return Err(PipelineError::configuration(
                    STEP,
                    "semantic type filter requires a concrete type",
                ));
            }
            FilterKind::SemanticType(ty) => Predicate::Semantic(*ty),
            FilterKind::Null => Predicate::IsNull,
            FilterKind::Missing => Predicate::IsMissing,
            FilterKind::Compare { op, subject } => Self::lower_compare(*op, subject)?,
            FilterKind::Matrix(kind) => Predicate::Matrix(*kind),
            FilterKind::Double(kind) => Predicate::Double(*kind),
            FilterKind::And(l, r) => {
                Predicate::And(Box::new(Self::lower(l)?), Box::new(Self::lower(r)?))
            }
            FilterKind::Or(l, r) => {
                Predicate::Or(Box::new(Self::lower(l)?), Box::new(Self::lower(r)?))
            }
            FilterKind::Not(f) => Predicate::Not(Box::new(Self::lower(f)?)),
        })
    }

    fn lower_compare(op: CompareOp, subject: &CompareSubject) -> PipelineResult<Predicate> {
        Ok(match subject {
            CompareSubject::ScalarValue(value) => match (op, value) {
                (CompareOp::Same, v) if v.is_scalar() || matches!(v, Value::Boolean(_)) => {
                    Predicate::ScalarSame(v.clone())
                }
                (CompareOp::StringEq, Value::Str(Some(s))) => Predicate::ScalarString(s.clone()),
                (CompareOp::Eq, Value::Complex(c)) if !c.is_na() => Predicate::ScalarComplex(*c),
                (CompareOp::Eq, Value::Logical(l)) if !l.is_na() => Predicate::ScalarNumeric {
                    op,
                    rhs: (*l == Logical::True) as i32 as f64,
                },
                (op, v @ (Value::Integer(_) | Value::Double(_) | Value::Raw(_)))
                    if op.is_ordering() =>
                {
                    match numeric(v) {
                        Some(rhs) => Predicate::ScalarNumeric { op, rhs },
                        None => {
                            return Err(PipelineError::configuration(
                                STEP,
                                "cannot compare against an NA constant",
                            ))
                        }
                    }
                }
                _ => return Err(unsupported(op, subject)),
            },
            CompareSubject::NaTest(ty) => match (op, ty) {
                (
                    CompareOp::Eq,
                    SemanticType::Logical
                    | SemanticType::Integer
                    | SemanticType::Double
                    | SemanticType::Complex
                    | SemanticType::Character,
                ) => Predicate::IsNa(*ty),
                _ => return Err(unsupported(op, subject)),
            },
            CompareSubject::StringLength(length) if op.is_ordering() => Predicate::StringLength {
                op,
                length: *length,
            },
            CompareSubject::VectorSize(size) if op.is_ordering() => {
                Predicate::VectorSize { op, size: *size }
            }
            CompareSubject::ElementAt { index, value } => match (op, value) {
                (CompareOp::StringEq, Value::Str(Some(_))) | (CompareOp::Eq | CompareOp::Same, _)
                    if value.is_scalar() =>
                {
                    Predicate::ElementEq {
                        index: *index,
                        value: value.clone(),
                    }
                }
                _ => return Err(unsupported(op, subject)),
            },
            CompareSubject::Dim { axis, size } if op.is_ordering() => Predicate::Dim {
                op,
                axis: *axis,
                size: *size,
            },
            _ => return Err(unsupported(op, subject)),
        })
    }

    /// Evaluate on a value; total over every value shape
    pub fn test(&self, value: &Value) -> bool {
        match self {
            Predicate::Class { class, extra } => {
                let matches = match class {
                    ValueClass::Scalar(ty) => {
                        value.is_scalar() && value.semantic_type() == Some(*ty)
                    }
                    ValueClass::Vector(ty) => {
                        matches!(value, Value::Vector(v) if v.data.semantic_type() == *ty)
                    }
                    ValueClass::AnyVector => matches!(value, Value::Vector(_)),
                    ValueClass::Null => matches!(value, Value::Null),
                    ValueClass::Missing => matches!(value, Value::Missing),
                    ValueClass::Boolean => matches!(value, Value::Boolean(_)),
                    ValueClass::Opaque => matches!(value, Value::Opaque(_)),
                };
                matches && extra.as_ref().map_or(true, |extra| extra.test(value))
            }
            Predicate::Semantic(ty) => value.semantic_type() == Some(*ty),
            Predicate::IsNull => matches!(value, Value::Null),
            Predicate::IsMissing => matches!(value, Value::Missing),
            Predicate::ScalarNumeric { op, rhs } => value
                .as_scalar()
                .and_then(|s| numeric(&s))
                .is_some_and(|lhs| op.apply(lhs, *rhs)),
            Predicate::ScalarString(rhs) => {
                matches!(value.as_scalar(), Some(Value::Str(Some(s))) if s == *rhs)
            }
            Predicate::ScalarComplex(rhs) => {
                matches!(value.as_scalar(), Some(Value::Complex(c)) if !c.is_na() && c == *rhs)
            }
            Predicate::ScalarSame(rhs) => match value {
                Value::Boolean(_) => value == rhs,
                _ => value.as_scalar().is_some_and(|s| s.identical(rhs)),
            },
            Predicate::IsNa(ty) => value
                .as_scalar()
                .is_some_and(|s| s.semantic_type() == Some(*ty) && s.is_na()),
            Predicate::StringLength { op, length } => match value.as_scalar() {
                Some(Value::Str(Some(s))) => op.apply(s.chars().count(), *length),
                _ => false,
            },
            Predicate::VectorSize { op, size } => {
                value.length().is_some_and(|len| op.apply(len, *size))
            }
            Predicate::ElementEq { index, value: rhs } => {
                let element = match value {
                    Value::Vector(v) => v.data.get(*index),
                    v if v.is_scalar() && *index == 0 => Some(v.clone()),
                    _ => None,
                };
                element.is_some_and(|e| scalar_equals(&e, rhs))
            }
            Predicate::Dim { op, axis, size } => value
                .dims()
                .and_then(|dims| dims.get(*axis))
                .is_some_and(|extent| op.apply(*extent, *size)),
            Predicate::Matrix(MatrixKind::IsMatrix) => {
                value.dims().is_some_and(|dims| dims.len() == 2)
            }
            Predicate::Matrix(MatrixKind::IsSquareMatrix) => value
                .dims()
                .is_some_and(|dims| dims.len() == 2 && dims[0] == dims[1]),
            Predicate::Double(kind) => match value.as_scalar() {
                Some(Value::Double(d)) => match kind {
                    DoubleKind::IsFinite => d.is_finite(),
                    DoubleKind::IsFractional => d.is_finite() && d.fract() != 0.0,
                },
                _ => false,
            },
            Predicate::And(l, r) => l.test(value) && r.test(value),
            Predicate::Or(l, r) => l.test(value) || r.test(value),
            Predicate::Not(f) => !f.test(value),
        }
    }
}

/// A predicate plus the sentinel shortcuts and boxing mode of the unit that owns it
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    predicate: Predicate,
    on_null: Tristate,
    on_missing: Tristate,
    box_primitives: bool,
}

impl Condition {
    pub fn new(filter: &Filter, box_primitives: bool) -> PipelineResult<Self> {
        Ok(Self {
            predicate: Predicate::lower(filter)?,
            on_null: filter.result_for_null(),
            on_missing: filter.result_for_missing(),
            box_primitives,
        })
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn boxes_primitives(&self) -> bool {
        self.box_primitives
    }

    /// Evaluate, answering sentinels from the precomputed constants when known
    pub fn evaluate(&self, value: &Value) -> bool {
        let shortcut = match value {
            Value::Null => self.on_null.known(),
            Value::Missing => self.on_missing.known(),
            _ => None,
        };
        if let Some(result) = shortcut {
            return result;
        }
        if self.box_primitives && value.is_scalar() {
            self.predicate.test(&value.clone().boxed())
        } else {
            self.predicate.test(value)
        }
    }
}
