//! End-to-end cast scenarios through the public API

mod common;

use std::sync::Arc;

use argcast::pipeline::{
    analyze, BranchEnumerator, CastRoute, Chain, CoercionStep, DoubleKind, Filter, MapIfStep,
    Mapper, MessageTemplate, PipelineBuilder, PipelineCompiler, PipelineError, SentinelCategory, Step,
};
use argcast::types::{Logical, SemanticType, Value, VectorData};
use common::builders::{first_double, logical_flag, null_switch, string_only, CastBuilder};
use common::{cast_err, cast_ok, same_result, sample_inputs};

#[test]
fn test_first_double() {
    let cast = CastBuilder::new("x").chain(first_double()).build();
    assert_eq!(cast_ok(&cast, Value::Double(3.5)), Value::Double(3.5));
    assert_eq!(
        cast_ok(&cast, Value::vector(VectorData::Double(vec![3.5]))),
        Value::Double(3.5)
    );
    assert_eq!(
        cast_err(&cast, Value::vector(VectorData::Double(vec![]))),
        "argument of length zero"
    );
}

#[test]
fn test_logical_flag() {
    let cast = CastBuilder::new("flag").chain(logical_flag()).build();
    let empty = cast
        .cast(Value::vector(VectorData::Logical(vec![])))
        .unwrap();
    assert_eq!(empty.value, Value::Boolean(false));
    assert!(empty.warnings.is_empty());
    assert_eq!(cast_ok(&cast, Value::Logical(Logical::True)), Value::Boolean(true));
}

#[test]
fn test_short_circuit_versus_fallthrough() {
    let flat = CastBuilder::new("x").chain(null_switch(false)).build();
    assert_eq!(cast_ok(&flat, Value::Null), Value::Integer(0));
    assert_eq!(cast_ok(&flat, Value::Integer(5)), Value::Integer(99));

    let nested = CastBuilder::new("x").chain(null_switch(true)).build();
    assert_eq!(cast_ok(&nested, Value::Null), Value::Integer(0));
    assert_eq!(cast_ok(&nested, Value::Integer(5)), Value::Integer(1));
}

#[test]
fn test_semantic_type_filter_sentinels() {
    let filter = Filter::semantic_type(SemanticType::Integer);
    assert_eq!(filter.result_for_null(), argcast::pipeline::Tristate::False);
    assert_eq!(filter.result_for_missing(), argcast::pipeline::Tristate::False);
}

#[test]
fn test_string_only_pipeline_forwards_integers() {
    let chain = string_only();
    assert!(analyze(&chain, 4).integer);

    let cast = CastBuilder::new("s").chain(chain).build();
    let forwarded = cast.cast(Value::Integer(12)).unwrap();
    assert_eq!(forwarded.value, Value::Integer(12));
    assert_eq!(forwarded.route, CastRoute::Forwarded);

    let general = cast.cast_general(Value::Integer(12)).unwrap();
    assert_eq!(general.value, Value::Integer(12));
    assert_eq!(cast_ok(&cast, Value::Str(None)), Value::string(""));
}

#[test]
fn test_short_circuit_law() {
    // Whatever follows a taken short-circuit branch is never applied
    let tails: Vec<PipelineBuilder> = vec![
        PipelineBuilder::new(),
        PipelineBuilder::new().map_to(Value::Integer(1)),
        PipelineBuilder::new().must_be(Filter::missing()),
        PipelineBuilder::new().as_string_vector().find_first(),
    ];
    for tail in tails {
        let mut steps = PipelineBuilder::new()
            .return_if(Filter::null(), |b| b.map_to(Value::string("early")))
            .build()
            .steps()
            .to_vec();
        steps.extend(tail.build().steps().iter().cloned());
        let cast = CastBuilder::new("x").chain(Chain::new(steps)).plain().build();
        assert_eq!(cast_ok(&cast, Value::Null), Value::string("early"));
    }
}

#[test]
fn test_determinism() {
    let chain = PipelineBuilder::new()
        .default_error(MessageTemplate::new("'%s' must be a count").with_argument_name())
        .return_if(Filter::null(), |b| b.map_to(Value::Integer(1)))
        .as_integer_vector()
        .find_first()
        .must_not_be_na()
        .must_be(Filter::ge(Value::Integer(0)))
        .build();
    let compiler = PipelineCompiler::default();
    let a = compiler.compile(&chain).unwrap();
    let b = compiler.compile(&chain).unwrap();
    assert_eq!(a.root, b.root);

    let first = CastBuilder::new("n").chain(chain.clone()).plain().build();
    let second = CastBuilder::new("n").chain(chain).plain().build();
    for input in sample_inputs() {
        assert!(same_result(
            &first.cast(input.clone()),
            &second.cast(input.clone())
        ));
    }
    assert_eq!(cast_err(&first, Value::Integer(-1)), "'n' must be a count");
}

#[test]
fn test_enumeration_counts() {
    for k in 0..4 {
        let steps = (0..k)
            .map(|_| {
                Step::MapIf(MapIfStep {
                    condition: Filter::missing(),
                    true_branch: Chain::default(),
                    false_branch: Chain::default(),
                    short_circuit: false,
                })
            })
            .collect::<Vec<_>>();
        let chain = Chain::new(steps);
        let paths = BranchEnumerator::new(&chain).enumerate(SentinelCategory::Double);
        assert_eq!(paths.len(), 1 << k);
    }
}

#[test]
fn test_configuration_errors_surface_at_construction() {
    let chains = vec![
        PipelineBuilder::new().must_be(Filter::semantic_type(SemanticType::Any)),
        PipelineBuilder::new().must_be(Filter::compare(
            argcast::pipeline::CompareOp::StringEq,
            argcast::pipeline::CompareSubject::VectorSize(2),
        )),
        PipelineBuilder::new().coerce(CoercionStep {
            vector_coercion: false,
            ..CoercionStep::vector(SemanticType::Any)
        }),
        PipelineBuilder::new().map_to(Value::Missing),
        PipelineBuilder::new().as_integer_vector().find_first().as_boolean(),
        PipelineBuilder::new()
            .as_string_vector()
            .find_first()
            .map(Mapper::DoubleToIntWithNa),
        PipelineBuilder::new()
            .as_string_vector()
            .must_be(Filter::double(DoubleKind::IsFinite)),
    ];
    for builder in chains {
        let err = argcast::pipeline::ArgumentCast::new(
            "x",
            builder.build(),
            argcast::config::CastSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InternalConfiguration { .. }));
    }
}

#[test]
fn test_warnings_are_collected() {
    let cast = CastBuilder::new("digits")
        .steps(|b| {
            b.as_integer_vector()
                .find_first_or_warn(Value::Integer(7), MessageTemplate::new("using default"))
                .replace_na_with(Value::Integer(7), MessageTemplate::new("NA replaced"))
                .should_be(Filter::le(Value::Integer(22)))
        })
        .build();

    let out = cast.cast(Value::Null).unwrap();
    assert_eq!(out.value, Value::Integer(7));
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].render(), "using default");

    let out = cast.cast(Value::string("abc")).unwrap();
    assert_eq!(out.value, Value::Integer(7));
    let rendered: Vec<String> = out.warnings.iter().map(|w| w.render()).collect();
    assert_eq!(rendered, vec!["NAs introduced by coercion", "NA replaced"]);

    let out = cast.cast(Value::Integer(30)).unwrap();
    assert_eq!(out.value, Value::Integer(30));
    assert_eq!(out.warnings[0].render(), "invalid argument 'digits'");
    assert!(out.warnings[0].is_warning);
}

#[test]
fn test_concurrent_first_use() {
    let cast = Arc::new(CastBuilder::new("flag").chain(logical_flag()).build());
    let inputs = sample_inputs();
    let expected: Vec<_> = inputs.iter().map(|v| cast.cast_general(v.clone())).collect();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let cast = Arc::clone(&cast);
            let inputs = &inputs;
            let expected = &expected;
            scope.spawn(move || {
                for (input, want) in inputs.iter().zip(expected) {
                    assert!(same_result(&cast.cast(input.clone()), want));
                }
            });
        }
    });
    assert!(cast.analysis().logical_to_boolean);
    assert!(cast.fast_path().is_some());
}
