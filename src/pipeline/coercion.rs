//! Coercion arithmetic between the atomic types.
//!
//! Conversions follow R: NA stays NA, unparsable strings become NA with a
//! warning, complex values lose their imaginary part with a warning. Each
//! warning is raised at most once per coercion.

use crate::pipeline::context::CastContext;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::message::{
    MessageTemplate, CANNOT_COERCE, IMAGINARY_PARTS_DISCARDED, NA_INTRODUCED_COERCION,
    OUT_OF_RANGE_RAW,
};
use crate::types::{
    is_double_na, Complex, Logical, SemanticType, Value, Vector, VectorData, DOUBLE_NA,
    DOUBLE_NA_BITS, INT_NA,
};

/// Resolved parameters of a coercion unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoercionSpec {
    pub target: SemanticType,
    pub vector_coercion: bool,
    pub preserve_names: bool,
    pub preserve_dims: bool,
    pub preserve_attrs: bool,
    pub preserve_non_vector: bool,
}

/// Warnings noticed while converting elements
#[derive(Debug, Default)]
struct Flags {
    na_introduced: bool,
    imaginary_discarded: bool,
    raw_out_of_range: bool,
}

impl Flags {
    fn report(&self, ctx: &mut CastContext<'_>) {
        if self.na_introduced {
            ctx.warn(&MessageTemplate::new(NA_INTRODUCED_COERCION));
        }
        if self.imaginary_discarded {
            ctx.warn(&MessageTemplate::new(IMAGINARY_PARTS_DISCARDED));
        }
        if self.raw_out_of_range {
            ctx.warn(&MessageTemplate::new(OUT_OF_RANGE_RAW));
        }
    }
}

fn cannot_coerce(ctx: &CastContext<'_>, value: &Value, target: SemanticType) -> PipelineError {
    ctx.error(
        &MessageTemplate::new(CANNOT_COERCE)
            .with_text(value.type_name())
            .with_text(target.name()),
    )
}

/// Apply a coercion to one value
pub fn coerce(value: Value, spec: &CoercionSpec, ctx: &mut CastContext<'_>) -> PipelineResult<Value> {
    let mut flags = Flags::default();
    let result = match value {
        Value::Null | Value::Missing => {
            if spec.preserve_non_vector {
                value
            } else {
                Value::vector(VectorData::empty(spec.target))
            }
        }
        Value::Opaque(_) => return Err(cannot_coerce(ctx, &value, spec.target)),
        Value::Boolean(b) => coerce_scalar(Value::Logical(b.into()), spec.target, &mut flags),
        Value::Vector(vector) => {
            let converted = coerce_vector(vector, spec, &mut flags)
                .map_err(|original| cannot_coerce(ctx, &original, spec.target))?;
            if !spec.vector_coercion {
                unwrap_single(converted)
            } else {
                converted
            }
        }
        scalar => coerce_scalar(scalar, spec.target, &mut flags),
    };
    flags.report(ctx);
    Ok(result)
}

/// Length-1 plain atomic vectors become bare scalars
fn unwrap_single(value: Value) -> Value {
    let single = matches!(
        &value,
        Value::Vector(v) if v.len() == 1 && v.is_plain() && v.data.semantic_type().is_atomic()
    );
    if single {
        value.as_scalar().unwrap_or(value)
    } else {
        value
    }
}

fn coerce_scalar(value: Value, target: SemanticType, flags: &mut Flags) -> Value {
    if target == SemanticType::Any || value.semantic_type() == Some(target) {
        return value;
    }
    match target {
        SemanticType::Logical => Value::Logical(to_logical(&value)),
        SemanticType::Integer => Value::Integer(to_integer(&value, flags)),
        SemanticType::Double => Value::Double(to_double(&value, flags)),
        SemanticType::Complex => Value::Complex(to_complex(&value, flags)),
        SemanticType::Character => Value::Str(to_character(&value)),
        SemanticType::Raw => Value::Raw(to_raw(&value, flags)),
        SemanticType::List => Value::vector(VectorData::List(vec![value])),
        SemanticType::Any => value,
    }
}

/// Convert a vector; on failure the offending value is handed back for the message
fn coerce_vector(vector: Vector, spec: &CoercionSpec, flags: &mut Flags) -> Result<Value, Value> {
    let Vector {
        data,
        names,
        dims,
        attributes,
    } = vector;
    let source_type = data.semantic_type();
    let data = match data {
        data if spec.target == SemanticType::Any || spec.target == source_type => data,
        VectorData::List(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Boolean(b) => elements.push(Value::Logical(b.into())),
                    other => match other.as_scalar() {
                        Some(scalar) => elements.push(scalar),
                        None => return Err(Value::vector(VectorData::List(vec![other]))),
                    },
                }
            }
            convert_elements(&elements, spec.target, flags)
        }
        other => {
            let elements: Vec<Value> = (0..other.len()).filter_map(|i| other.get(i)).collect();
            convert_elements(&elements, spec.target, flags)
        }
    };

    let mut out = Vector::new(data);
    if spec.preserve_names {
        out.names = names;
    }
    if spec.preserve_dims {
        out.dims = dims;
    }
    if spec.preserve_attrs {
        out.attributes = attributes;
    }
    Ok(Value::Vector(out))
}

fn convert_elements(elements: &[Value], target: SemanticType, flags: &mut Flags) -> VectorData {
    match target {
        SemanticType::Logical => VectorData::Logical(elements.iter().map(to_logical).collect()),
        SemanticType::Integer => {
            VectorData::Integer(elements.iter().map(|e| to_integer(e, flags)).collect())
        }
        SemanticType::Double => {
            VectorData::Double(elements.iter().map(|e| to_double(e, flags)).collect())
        }
        SemanticType::Complex => {
            VectorData::Complex(elements.iter().map(|e| to_complex(e, flags)).collect())
        }
        SemanticType::Character => {
            VectorData::Character(elements.iter().map(to_character).collect())
        }
        SemanticType::Raw => VectorData::Raw(elements.iter().map(|e| to_raw(e, flags)).collect()),
        SemanticType::List | SemanticType::Any => VectorData::List(elements.to_vec()),
    }
}

fn parse_double(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    match trimmed {
        "NA" => Some(DOUBLE_NA),
        "Inf" | "inf" => Some(f64::INFINITY),
        "-Inf" | "-inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => trimmed.parse::<f64>().ok(),
    }
}

pub(crate) fn to_logical(value: &Value) -> Logical {
    match value {
        Value::Logical(l) => *l,
        Value::Boolean(b) => (*b).into(),
        Value::Integer(i) if *i == INT_NA => Logical::Na,
        Value::Integer(i) => (*i != 0).into(),
        Value::Double(d) if d.is_nan() => Logical::Na,
        Value::Double(d) => (*d != 0.0).into(),
        Value::Complex(c) if c.is_na() => Logical::Na,
        Value::Complex(c) => (c.re != 0.0 || c.im != 0.0).into(),
        Value::Str(Some(s)) => match s.as_str() {
            "TRUE" | "true" | "T" | "True" => Logical::True,
            "FALSE" | "false" | "F" | "False" => Logical::False,
            _ => Logical::Na,
        },
        Value::Raw(r) => (*r != 0).into(),
        _ => Logical::Na,
    }
}

fn double_to_integer(d: f64, flags: &mut Flags) -> i32 {
    if d.is_nan() {
        return INT_NA;
    }
    let truncated = d.trunc();
    if truncated <= INT_NA as f64 || truncated > i32::MAX as f64 {
        flags.na_introduced = true;
        return INT_NA;
    }
    truncated as i32
}

fn to_integer(value: &Value, flags: &mut Flags) -> i32 {
    match value {
        Value::Integer(i) => *i,
        Value::Logical(Logical::Na) => INT_NA,
        Value::Logical(l) => (*l == Logical::True) as i32,
        Value::Boolean(b) => *b as i32,
        Value::Double(d) => double_to_integer(*d, flags),
        Value::Complex(c) => {
            if c.is_na() {
                return INT_NA;
            }
            if c.im != 0.0 {
                flags.imaginary_discarded = true;
            }
            double_to_integer(c.re, flags)
        }
        Value::Str(None) => INT_NA,
        Value::Str(Some(s)) => match parse_double(s) {
            Some(d) => double_to_integer(d, flags),
            None => {
                flags.na_introduced = true;
                INT_NA
            }
        },
        Value::Raw(r) => *r as i32,
        _ => INT_NA,
    }
}

fn to_double(value: &Value, flags: &mut Flags) -> f64 {
    match value {
        Value::Double(d) => *d,
        Value::Integer(i) if *i == INT_NA => DOUBLE_NA,
        Value::Integer(i) => *i as f64,
        Value::Logical(Logical::Na) => DOUBLE_NA,
        Value::Logical(l) => (*l == Logical::True) as i32 as f64,
        Value::Boolean(b) => *b as i32 as f64,
        Value::Complex(c) => {
            if c.is_na() {
                return DOUBLE_NA;
            }
            if c.im != 0.0 {
                flags.imaginary_discarded = true;
            }
            c.re
        }
        Value::Str(None) => DOUBLE_NA,
        Value::Str(Some(s)) => parse_double(s).unwrap_or_else(|| {
            flags.na_introduced = true;
            DOUBLE_NA
        }),
        Value::Raw(r) => *r as f64,
        _ => DOUBLE_NA,
    }
}

fn to_complex(value: &Value, flags: &mut Flags) -> Complex {
    match value {
        Value::Complex(c) => *c,
        Value::Str(Some(s)) => match parse_double(s) {
            Some(d) if is_double_na(d) => Complex::NA,
            Some(d) => Complex::new(d, 0.0),
            None => {
                flags.na_introduced = true;
                Complex::NA
            }
        },
        other => {
            let d = to_double(other, flags);
            if is_double_na(d) {
                Complex::NA
            } else {
                Complex::new(d, 0.0)
            }
        }
    }
}

fn format_double(d: f64) -> String {
    if d.is_infinite() {
        return if d > 0.0 { "Inf".into() } else { "-Inf".into() };
    }
    if d.is_nan() {
        return "NaN".into();
    }
    if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{}", d as i64)
    } else {
        format!("{}", d)
    }
}

fn to_character(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => s.clone(),
        Value::Logical(Logical::Na) => None,
        Value::Logical(Logical::True) => Some("TRUE".into()),
        Value::Logical(Logical::False) => Some("FALSE".into()),
        Value::Boolean(b) => Some(if *b { "TRUE" } else { "FALSE" }.into()),
        Value::Integer(i) if *i == INT_NA => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Double(d) if d.to_bits() == DOUBLE_NA_BITS => None,
        Value::Double(d) => Some(format_double(*d)),
        Value::Complex(c) if c.is_na() => None,
        Value::Complex(c) => {
            let sign = if c.im < 0.0 { "-" } else { "+" };
            Some(format!("{}{}{}i", format_double(c.re), sign, format_double(c.im.abs())))
        }
        Value::Raw(r) => Some(format!("{:02x}", r)),
        _ => None,
    }
}

fn to_raw(value: &Value, flags: &mut Flags) -> u8 {
    if let Value::Raw(r) = value {
        return *r;
    }
    let as_int = match value {
        Value::Str(Some(s)) => match parse_double(s) {
            Some(d) => Some(double_to_integer(d, &mut Flags::default())),
            None => {
                flags.na_introduced = true;
                None
            }
        },
        other => Some(to_integer(other, flags)),
    };
    match as_int {
        Some(i) if (0..=255).contains(&i) => i as u8,
        _ => {
            flags.raw_out_of_range = true;
            0
        }
    }
}
