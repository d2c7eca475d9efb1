//! Single-scalar fast path.
//!
//! Recognizes chains of the shape
//! `Coercion(T)`, `T`-narrowing filters, `FindFirst`, optional
//! `Map(LogicalToBoolean)` (only for logical `T`), with metadata steps
//! anywhere. For an input that already is a `T` scalar, or a length-1 `T`
//! vector, everything up to the `FindFirst` is the identity on its first
//! element, so the cast can jump straight to the units after it.

use super::compiled_pipeline::{CastUnit, CompiledChain, CompiledPipeline, FindFirstUnit};
use super::context::CastContext;
use super::error::PipelineResult;
use super::filter::{FilterKind, ValueClass};
use super::mapper::Mapper;
use super::step::{Chain, Step};
use crate::types::{SemanticType, Value};

/// Everything needed to run the shortcut
#[derive(Debug, Clone, PartialEq)]
pub struct FastPathDescriptor {
    pub target: SemanticType,
    pub find_first: FindFirstUnit,
    pub find_first_default: Option<Value>,
    pub after_find_first: CompiledChain,
}

impl FastPathDescriptor {
    /// The scalar the shortcut starts from, if `value` qualifies
    pub fn entry_value(&self, value: &Value) -> Option<Value> {
        match value {
            v if v.is_scalar() && v.semantic_type() == Some(self.target) => Some(v.clone()),
            Value::Vector(v) if v.len() == 1 && v.data.semantic_type() == self.target => {
                v.data.get(0)
            }
            _ => None,
        }
    }

    /// Run the shortcut; `None` if `value` does not qualify
    pub fn execute(
        &self,
        value: &Value,
        ctx: &mut CastContext<'_>,
    ) -> Option<PipelineResult<Value>> {
        let scalar = self.entry_value(value)?;
        if self.after_find_first.is_empty() {
            return Some(Ok(scalar));
        }
        Some(self.after_find_first.run(scalar, ctx))
    }
}

fn narrows_to(kind: &FilterKind, target: SemanticType) -> bool {
    match kind {
        FilterKind::SemanticType(ty) => *ty == target,
        FilterKind::Type {
            class: ValueClass::Vector(ty),
            extra: None,
        } => *ty == target,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Coerced(SemanticType),
    Found(SemanticType),
    Mapped(SemanticType),
}

/// Index of the `FindFirst` among the emitted units and the target type,
/// if the whole chain has the fast-path shape
fn match_shape(chain: &Chain) -> Option<(usize, SemanticType)> {
    let mut phase = Phase::Start;
    let mut unit_index = 0;
    let mut find_first_at = None;
    for step in chain {
        if step.is_metadata() {
            continue;
        }
        phase = match (phase, step) {
            (Phase::Start, Step::Coercion(c)) if c.target.is_atomic() => Phase::Coerced(c.target),
            (Phase::Coerced(t), Step::Filter(f)) if narrows_to(f.condition.kind(), t) => {
                Phase::Coerced(t)
            }
            (Phase::Coerced(t), Step::FindFirst(ff))
                if ff.element_type == t || ff.element_type == SemanticType::Any =>
            {
                find_first_at = Some(unit_index);
                Phase::Found(t)
            }
            (Phase::Found(SemanticType::Logical), Step::Map(Mapper::LogicalToBoolean)) => {
                Phase::Mapped(SemanticType::Logical)
            }
            _ => return None,
        };
        unit_index += 1;
    }
    match phase {
        Phase::Found(t) | Phase::Mapped(t) => find_first_at.map(|index| (index, t)),
        Phase::Start | Phase::Coerced(_) => None,
    }
}

/// Build the descriptor for `chain` from its compiled form
pub fn recognize(chain: &Chain, pipeline: &CompiledPipeline) -> Option<FastPathDescriptor> {
    let Some((index, target)) = match_shape(chain) else {
        tracing::trace!("No fast path: chain shape does not qualify");
        return None;
    };
    let Some(CastUnit::FindFirst(find_first)) = pipeline.root.units().get(index) else {
        tracing::warn!("Compiled units do not line up with the step chain; fast path disabled");
        return None;
    };
    let descriptor = FastPathDescriptor {
        target,
        find_first: find_first.clone(),
        find_first_default: find_first.default_value.clone(),
        after_find_first: pipeline.root.tail(index),
    };
    tracing::debug!(
        "Fast path recognized for {} scalars ({} units after find_first)",
        target,
        descriptor.after_find_first.units().len()
    );
    Some(descriptor)
}
