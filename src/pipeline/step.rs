//! Step model: the declarative description of a cast pipeline.
//!
//! A [`Chain`] is an ordered list of [`Step`]s. `MapIf` owns two independent
//! sub-chains, so a chain is a tree with a linear spine. Chains are built once
//! (usually through [`PipelineBuilder`](crate::pipeline::PipelineBuilder)) and
//! never mutated afterwards; every derived artifact is a pure function of it.

use crate::pipeline::filter::Filter;
use crate::pipeline::mapper::Mapper;
use crate::pipeline::message::MessageTemplate;
use crate::types::{SemanticType, Value};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Converts the value to a vector (or scalar) of the target type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercionStep {
    pub target: SemanticType,
    #[serde(default = "default_true")]
    pub vector_coercion: bool,
    #[serde(default)]
    pub preserve_names: bool,
    #[serde(default)]
    pub preserve_dims: bool,
    #[serde(default)]
    pub preserve_attrs: bool,
    /// Whether `NULL` and missing are forwarded rather than turned into an empty vector
    #[serde(default = "default_true")]
    pub preserve_non_vector: bool,
}

impl CoercionStep {
    /// Vector coercion with the usual defaults: attributes dropped, sentinels forwarded
    pub fn vector(target: SemanticType) -> Self {
        Self {
            target,
            vector_coercion: true,
            preserve_names: false,
            preserve_dims: false,
            preserve_attrs: false,
            preserve_non_vector: true,
        }
    }

    pub fn preserving(mut self, names: bool, dims: bool, attrs: bool) -> Self {
        self.preserve_names = names;
        self.preserve_dims = dims;
        self.preserve_attrs = attrs;
        self
    }
}

/// Converts the value to something that can carry attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttributableCoercionStep {
    #[serde(default)]
    pub preserve_names: bool,
    #[serde(default)]
    pub preserve_dims: bool,
    #[serde(default)]
    pub preserve_attrs: bool,
}

/// Takes the first element.
///
/// Without a default an empty input raises an error whose message is, in
/// order: the step's message, the current default error, the built-in
/// length-zero message. With a default the default is returned, accompanied
/// by a warning only if the step has its own message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindFirstStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    pub element_type: SemanticType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_empty_message: Option<MessageTemplate>,
}

/// Rejects or replaces NA values.
///
/// Without a replacement NA raises an error. With a replacement the NA is
/// substituted, with a warning if a message is also set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotNaStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_na_message: Option<MessageTemplate>,
}

/// Runs one of two sub-chains depending on a condition.
///
/// With `short_circuit`, taking the true branch ends the whole pipeline with
/// that branch's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapIfStep {
    pub condition: Filter,
    #[serde(default)]
    pub true_branch: Chain,
    #[serde(default)]
    pub false_branch: Chain,
    #[serde(default)]
    pub short_circuit: bool,
}

/// Raises an error (or a warning) if the value does not satisfy the condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStep {
    pub condition: Filter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_fail_message: Option<MessageTemplate>,
    #[serde(default)]
    pub is_warning: bool,
}

/// One node of a pipeline specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Coercion(CoercionStep),
    AttributableCoercion(AttributableCoercionStep),
    FindFirst(FindFirstStep),
    NotNa(NotNaStep),
    Map(Mapper),
    MapIf(MapIfStep),
    Filter(FilterStep),
    BoxPrimitive,
    DefaultErrorMessage(MessageTemplate),
    DefaultWarningMessage(MessageTemplate),
}

impl Step {
    /// Step kind name used in diagnostics and logs
    pub fn name(&self) -> &'static str {
        match self {
            Step::Coercion(_) => "coercion",
            Step::AttributableCoercion(_) => "attributable_coercion",
            Step::FindFirst(_) => "find_first",
            Step::NotNa(_) => "not_na",
            Step::Map(_) => "map",
            Step::MapIf(_) => "map_if",
            Step::Filter(_) => "filter",
            Step::BoxPrimitive => "box_primitive",
            Step::DefaultErrorMessage(_) => "default_error",
            Step::DefaultWarningMessage(_) => "default_warning",
        }
    }

    /// Steps that only configure the compiler and emit no unit
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            Step::DefaultErrorMessage(_) | Step::DefaultWarningMessage(_)
        )
    }
}

/// An ordered sequence of steps; empty chains are the identity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain {
    steps: Vec<Step>,
}

impl Chain {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Number of `MapIf` nodes anywhere in the tree, nested ones included
    pub fn conditional_count(&self) -> usize {
        self.steps
            .iter()
            .map(|step| match step {
                Step::MapIf(map_if) => {
                    1 + map_if.true_branch.conditional_count()
                        + map_if.false_branch.conditional_count()
                }
                _ => 0,
            })
            .sum()
    }
}

impl From<Vec<Step>> for Chain {
    fn from(steps: Vec<Step>) -> Self {
        Self::new(steps)
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_if(true_branch: Vec<Step>, false_branch: Vec<Step>) -> Step {
        Step::MapIf(MapIfStep {
            condition: Filter::null(),
            true_branch: true_branch.into(),
            false_branch: false_branch.into(),
            short_circuit: false,
        })
    }

    #[test]
    fn test_conditional_count_includes_nested() {
        let chain = Chain::new(vec![
            Step::BoxPrimitive,
            map_if(vec![map_if(vec![], vec![])], vec![map_if(vec![], vec![])]),
            map_if(vec![], vec![]),
        ]);
        assert_eq!(chain.conditional_count(), 4);
        assert_eq!(Chain::default().conditional_count(), 0);
    }

    #[test]
    fn test_metadata_steps() {
        assert!(Step::DefaultErrorMessage(MessageTemplate::length_zero()).is_metadata());
        assert!(!Step::BoxPrimitive.is_metadata());
    }

    #[test]
    fn test_chain_serde() {
        let chain = Chain::new(vec![
            Step::Coercion(CoercionStep::vector(SemanticType::Double)),
            Step::FindFirst(FindFirstStep {
                default_value: None,
                element_type: SemanticType::Double,
                on_empty_message: None,
            }),
        ]);
        let json = serde_json::to_string(&chain).unwrap();
        let back: Chain = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chain);
    }
}
