//! Mapper model: total value transformers referenced by `Map` steps.

use crate::types::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mapper {
    /// Replace the input with a constant
    ToConstant(Value),
    /// Logical scalar to host boolean; only `TRUE` maps to `true`
    LogicalToBoolean,
    /// Double scalar to integer, NA and out-of-range values become integer NA
    DoubleToIntWithNa,
    /// Code point at `index` of a string scalar, `default_if_empty` for empty strings
    CharAtIndex { index: usize, default_if_empty: i32 },
}

impl Mapper {
    /// Short name used in diagnostics and logs
    pub fn name(&self) -> &'static str {
        match self {
            Mapper::ToConstant(_) => "to_constant",
            Mapper::LogicalToBoolean => "logical_to_boolean",
            Mapper::DoubleToIntWithNa => "double_to_int",
            Mapper::CharAtIndex { .. } => "char_at",
        }
    }
}
