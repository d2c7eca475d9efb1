//! Filter model: composable predicates with statically known sentinel outcomes.
//!
//! A [`Filter`] is a pure description; the compiler lowers it into an
//! executable predicate. Every filter carries two constants,
//! [`Filter::result_for_null`] and [`Filter::result_for_missing`], computed
//! eagerly at construction. Compiled units consult them before running the
//! predicate, so a sentinel input never reaches a predicate whose outcome is
//! already known.
//!
//! Combinators lift the constants structurally: `And`/`Or` apply the boolean
//! operator with `Undefined` absorbing, `Not` negates and keeps `Undefined`.

use crate::types::{SemanticType, Value};
use serde::{Deserialize, Serialize};

/// Three-valued outcome of a predicate on a sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tristate {
    True,
    False,
    Undefined,
}

impl Tristate {
    pub fn and(self, other: Tristate) -> Tristate {
        match (self, other) {
            (Tristate::Undefined, _) | (_, Tristate::Undefined) => Tristate::Undefined,
            (Tristate::True, Tristate::True) => Tristate::True,
            _ => Tristate::False,
        }
    }

    pub fn or(self, other: Tristate) -> Tristate {
        match (self, other) {
            (Tristate::Undefined, _) | (_, Tristate::Undefined) => Tristate::Undefined,
            (Tristate::False, Tristate::False) => Tristate::False,
            _ => Tristate::True,
        }
    }

    pub fn not(self) -> Tristate {
        match self {
            Tristate::True => Tristate::False,
            Tristate::False => Tristate::True,
            Tristate::Undefined => Tristate::Undefined,
        }
    }

    /// The decided value, if any
    pub fn known(self) -> Option<bool> {
        match self {
            Tristate::True => Some(true),
            Tristate::False => Some(false),
            Tristate::Undefined => None,
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }
}

/// Representation class tested by a type filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueClass {
    /// Bare scalar of the given type
    Scalar(SemanticType),
    /// Vector of the given type
    Vector(SemanticType),
    /// Any vector
    AnyVector,
    Null,
    Missing,
    Boolean,
    Opaque,
}

/// Comparison operator of a compare filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    StringEq,
    Same,
}

impl CompareOp {
    /// True for the ordering operators `EQ`, `GT`, `LT`, `GE`, `LE`
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            CompareOp::Eq | CompareOp::Gt | CompareOp::Lt | CompareOp::Ge | CompareOp::Le
        )
    }

    /// Apply an ordering operator to two ordered operands
    pub fn apply<T: PartialOrd>(&self, lhs: T, rhs: T) -> bool {
        match self {
            CompareOp::Eq | CompareOp::StringEq | CompareOp::Same => lhs == rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Le => lhs <= rhs,
        }
    }
}

/// What a compare filter compares against its operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareSubject {
    /// The input read as a scalar
    ScalarValue(Value),
    /// NA-ness of a scalar of the given type
    NaTest(SemanticType),
    /// Character count of a string scalar
    StringLength(usize),
    /// Length of the input
    VectorSize(usize),
    /// Element at a position
    ElementAt { index: usize, value: Value },
    /// Extent of one dimension
    Dim { axis: usize, size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixKind {
    IsMatrix,
    IsSquareMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleKind {
    IsFinite,
    IsFractional,
}

/// Structure of a filter expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Type {
        class: ValueClass,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extra: Option<Box<Filter>>,
    },
    SemanticType(SemanticType),
    Null,
    Missing,
    Compare {
        op: CompareOp,
        subject: CompareSubject,
    },
    Matrix(MatrixKind),
    Double(DoubleKind),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

/// A filter expression together with its precomputed sentinel outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FilterKind", into = "FilterKind")]
pub struct Filter {
    kind: FilterKind,
    result_for_null: Tristate,
    result_for_missing: Tristate,
}

impl From<FilterKind> for Filter {
    fn from(kind: FilterKind) -> Self {
        let (result_for_null, result_for_missing) = sentinel_results(&kind);
        Self {
            kind,
            result_for_null,
            result_for_missing,
        }
    }
}

impl From<Filter> for FilterKind {
    fn from(filter: Filter) -> Self {
        filter.kind
    }
}

fn sentinel_results(kind: &FilterKind) -> (Tristate, Tristate) {
    match kind {
        FilterKind::Type { class, extra } => {
            let on_null = Tristate::from(*class == ValueClass::Null);
            let on_missing = Tristate::from(*class == ValueClass::Missing);
            match extra {
                Some(extra) => (
                    if on_null == Tristate::True {
                        extra.result_for_null
                    } else {
                        on_null
                    },
                    if on_missing == Tristate::True {
                        extra.result_for_missing
                    } else {
                        on_missing
                    },
                ),
                None => (on_null, on_missing),
            }
        }
        FilterKind::SemanticType(_) => (Tristate::False, Tristate::False),
        FilterKind::Null => (Tristate::True, Tristate::False),
        FilterKind::Missing => (Tristate::False, Tristate::True),
        FilterKind::Compare {
            op: CompareOp::Eq,
            subject: CompareSubject::VectorSize(0),
        } => (Tristate::True, Tristate::Undefined),
        FilterKind::Compare { .. } | FilterKind::Matrix(_) | FilterKind::Double(_) => {
            (Tristate::Undefined, Tristate::Undefined)
        }
        FilterKind::And(l, r) => (
            l.result_for_null.and(r.result_for_null),
            l.result_for_missing.and(r.result_for_missing),
        ),
        FilterKind::Or(l, r) => (
            l.result_for_null.or(r.result_for_null),
            l.result_for_missing.or(r.result_for_missing),
        ),
        FilterKind::Not(f) => (f.result_for_null.not(), f.result_for_missing.not()),
    }
}

impl Filter {
    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    /// Outcome on `NULL`, if statically known
    pub fn result_for_null(&self) -> Tristate {
        self.result_for_null
    }

    /// Outcome on a missing argument, if statically known
    pub fn result_for_missing(&self) -> Tristate {
        self.result_for_missing
    }

    pub fn type_of(class: ValueClass) -> Self {
        FilterKind::Type { class, extra: None }.into()
    }

    /// Type test refined by a second predicate that only runs when the type matches
    pub fn type_with(class: ValueClass, extra: Filter) -> Self {
        FilterKind::Type {
            class,
            extra: Some(Box::new(extra)),
        }
        .into()
    }

    pub fn semantic_type(ty: SemanticType) -> Self {
        FilterKind::SemanticType(ty).into()
    }

    pub fn null() -> Self {
        FilterKind::Null.into()
    }

    pub fn missing() -> Self {
        FilterKind::Missing.into()
    }

    pub fn compare(op: CompareOp, subject: CompareSubject) -> Self {
        FilterKind::Compare { op, subject }.into()
    }

    pub fn matrix(kind: MatrixKind) -> Self {
        FilterKind::Matrix(kind).into()
    }

    pub fn double(kind: DoubleKind) -> Self {
        FilterKind::Double(kind).into()
    }

    pub fn and(self, other: Filter) -> Self {
        FilterKind::And(Box::new(self), Box::new(other)).into()
    }

    pub fn or(self, other: Filter) -> Self {
        FilterKind::Or(Box::new(self), Box::new(other)).into()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        FilterKind::Not(Box::new(self)).into()
    }

    // Shorthands used by builtin declarations

    pub fn size(size: usize) -> Self {
        Self::compare(CompareOp::Eq, CompareSubject::VectorSize(size))
    }

    pub fn empty() -> Self {
        Self::size(0)
    }

    pub fn not_empty() -> Self {
        Self::compare(CompareOp::Gt, CompareSubject::VectorSize(0))
    }

    pub fn single_element() -> Self {
        Self::size(1)
    }

    pub fn na(ty: SemanticType) -> Self {
        Self::compare(CompareOp::Eq, CompareSubject::NaTest(ty))
    }

    pub fn gt(value: Value) -> Self {
        Self::compare(CompareOp::Gt, CompareSubject::ScalarValue(value))
    }

    pub fn ge(value: Value) -> Self {
        Self::compare(CompareOp::Ge, CompareSubject::ScalarValue(value))
    }

    pub fn lt(value: Value) -> Self {
        Self::compare(CompareOp::Lt, CompareSubject::ScalarValue(value))
    }

    pub fn le(value: Value) -> Self {
        Self::compare(CompareOp::Le, CompareSubject::ScalarValue(value))
    }

    pub fn eq(value: Value) -> Self {
        Self::compare(CompareOp::Eq, CompareSubject::ScalarValue(value))
    }

    pub fn string_eq(value: impl Into<String>) -> Self {
        Self::compare(
            CompareOp::StringEq,
            CompareSubject::ScalarValue(Value::string(value)),
        )
    }

    pub fn string_length(op: CompareOp, length: usize) -> Self {
        Self::compare(op, CompareSubject::StringLength(length))
    }
}
