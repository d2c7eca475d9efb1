//! Test data builders for creating pipelines and casts

use argcast::config::CastSettings;
use argcast::pipeline::{ArgumentCast, Chain, Filter, PipelineBuilder};
use argcast::types::{Logical, Value};

/// Builder for creating test ArgumentCasts
pub struct CastBuilder {
    name: String,
    chain: Chain,
    settings: CastSettings,
}

impl CastBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            chain: Chain::default(),
            settings: CastSettings::default(),
        }
    }

    pub fn chain(mut self, chain: Chain) -> Self {
        self.chain = chain;
        self
    }

    pub fn steps(self, f: impl FnOnce(PipelineBuilder) -> PipelineBuilder) -> Self {
        self.chain(f(PipelineBuilder::new()).build())
    }

    pub fn forwarding(mut self, enabled: bool) -> Self {
        self.settings.forwarding = enabled;
        self
    }

    pub fn fast_path(mut self, enabled: bool) -> Self {
        self.settings.fast_path = enabled;
        self
    }

    /// General pipeline only
    pub fn plain(self) -> Self {
        self.forwarding(false).fast_path(false)
    }

    pub fn max_conditional_steps(mut self, max: usize) -> Self {
        self.settings.max_conditional_steps = max;
        self
    }

    pub fn build(self) -> ArgumentCast {
        match ArgumentCast::new(self.name, self.chain, self.settings) {
            Ok(cast) => cast,
            Err(e) => panic!("test pipeline failed to compile: {}", e),
        }
    }
}

/// `[Coerce→Double(vector), FindFirst(no default)]`
pub fn first_double() -> Chain {
    PipelineBuilder::new().as_double_vector().find_first().build()
}

/// `[Coerce→Logical(vector), FindFirst(default=NA), Map(LogicalToBoolean)]`
pub fn logical_flag() -> Chain {
    PipelineBuilder::new()
        .as_logical_vector()
        .find_first_or(Value::Logical(Logical::Na))
        .as_boolean()
        .build()
}

/// `[MapIf(IsNull, [ToConstant(0)], [ToConstant(1)], short-circuit), ToConstant(99)]`;
/// with `nested` the false branch ends in a short-circuiting conditional of its own
pub fn null_switch(nested: bool) -> Chain {
    PipelineBuilder::new()
        .return_if_else(
            Filter::null(),
            |t| t.map_to(Value::Integer(0)),
            |f| {
                let f = f.map_to(Value::Integer(1));
                if nested {
                    f.return_if(Filter::null().not(), |b| b)
                } else {
                    f
                }
            },
        )
        .map_to(Value::Integer(99))
        .build()
}

/// Only touches character values
pub fn string_only() -> Chain {
    PipelineBuilder::new()
        .map_if(
            Filter::semantic_type(argcast::types::SemanticType::Character),
            |t| t.find_first_or(Value::string("")).replace_na(Value::string("")),
            |f| f,
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_builder() {
        let cast = CastBuilder::new("x").chain(first_double()).plain().build();
        assert_eq!(cast.name(), "x");
        assert!(!cast.settings().forwarding);
        assert!(!cast.settings().fast_path);
    }
}
