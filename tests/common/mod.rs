//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use argcast::pipeline::{ArgumentCast, CastOutcome, PipelineResult};
use argcast::types::{Complex, Logical, Value, Vector, VectorData, DOUBLE_NA, INT_NA};

/// Cast through the full dispatch, panicking on error
pub fn cast_ok(cast: &ArgumentCast, value: Value) -> Value {
    match cast.cast(value.clone()) {
        Ok(outcome) => outcome.value,
        Err(e) => panic!("cast of {} failed: {}", value, e),
    }
}

/// Rendered error message of a failing cast
pub fn cast_err(cast: &ArgumentCast, value: Value) -> String {
    match cast.cast(value.clone()) {
        Ok(outcome) => panic!("cast of {} unexpectedly produced {}", value, outcome.value),
        Err(e) => e.to_string(),
    }
}

/// Compare two cast results by value, warnings and error, ignoring the route
pub fn same_result(a: &PipelineResult<CastOutcome>, b: &PipelineResult<CastOutcome>) -> bool {
    match (a, b) {
        (Ok(a), Ok(b)) => a.value.identical(&b.value) && a.warnings == b.warnings,
        (Err(a), Err(b)) => a == b,
        _ => false,
    }
}

/// A mix of inputs of every shape
pub fn sample_inputs() -> Vec<Value> {
    vec![
        Value::Null,
        Value::Missing,
        Value::Integer(3),
        Value::Integer(0),
        Value::Integer(INT_NA),
        Value::Logical(Logical::True),
        Value::Logical(Logical::Na),
        Value::Double(2.5),
        Value::Double(DOUBLE_NA),
        Value::Complex(Complex::new(1.0, 2.0)),
        Value::string("7"),
        Value::string(""),
        Value::Str(None),
        Value::Raw(9),
        Value::Boolean(true),
        Value::vector(VectorData::Integer(vec![])),
        Value::vector(VectorData::Double(vec![1.0, 2.0])),
        Value::vector(VectorData::Logical(vec![Logical::False])),
        Value::Vector(Vector::new(VectorData::Integer(vec![5])).with_names(vec!["a".into()])),
        Value::Vector(Vector::new(VectorData::Double(vec![0.0; 4])).with_dims(vec![2, 2])),
        Value::vector(VectorData::List(vec![Value::Integer(1), Value::string("b")])),
        Value::Opaque("environment".into()),
    ]
}
