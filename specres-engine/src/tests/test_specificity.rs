//! Specificity comparator tests
//!
//! Antisymmetry, irreflexivity and the individual tie-break rules.

use super::{class, int, overload};
use crate::{
    ArgSlot, FamilyFlavor, Matcher, MatchMode, OrderingBasis, Parameter, Pattern, PatternId,
    Qualifiers, ResolverConfig, Specificity, SpecificityComparator, StandardTypeModel, Term,
};
use pretty_assertions::assert_eq;

fn function_comparator(model: &StandardTypeModel) -> SpecificityComparator<'_> {
    SpecificityComparator::new(model, ResolverConfig::default(), FamilyFlavor::Function)
}

/// The overload families every property test runs over
fn sample_overloads() -> Vec<Pattern> {
    vec![
        overload("f", &["T1", "T2"], vec![Term::param(0), Term::param(1)]),
        overload("f", &["T3", "T4"], vec![Term::param(0), Term::pointer(Term::param(1))]),
        overload("f", &["T1"], vec![Term::param(0), Term::param(0)]),
        overload("f", &["T2"], vec![Term::param(0), int()]),
        overload("f", &["T"], vec![Term::lvalue_ref(Term::param(0)), int()]),
        overload("f", &["T"], vec![Term::rvalue_ref(Term::param(0)), int()]),
        Pattern::overload(
            "f",
            vec![Parameter::ty("T"), Parameter::ty("Ts").packed()],
            vec![
                ArgSlot::new(Term::param(0)),
                ArgSlot::new(Term::expand(Term::param(1))),
            ],
        ),
    ]
}

#[test]
fn test_pointer_overload_is_more_specialized() {
    let model = StandardTypeModel::new();
    let general = overload("f", &["T1", "T2"], vec![Term::param(0), Term::param(1)]);
    let pointer = overload("f", &["T3", "T4"], vec![Term::param(0), Term::pointer(Term::param(1))]);

    let comparison = function_comparator(&model).compare(&general, &pointer);
    assert_eq!(comparison.specificity, Specificity::BMoreSpecific);
    assert_eq!(comparison.basis, OrderingBasis::Deduction);
    assert!(comparison.b_from_a);
    assert!(!comparison.a_from_b);
}

#[test]
fn test_repeated_parameter_against_fixed_type_is_incomparable() {
    let model = StandardTypeModel::new();
    let repeated = overload("f", &["T1"], vec![Term::param(0), Term::param(0)]);
    let fixed = overload("f", &["T2"], vec![Term::param(0), int()]);

    let comparison = function_comparator(&model).compare(&repeated, &fixed);
    assert_eq!(comparison.specificity, Specificity::Unordered);
    assert_eq!(comparison.basis, OrderingBasis::Incomparable);
}

#[test]
fn test_comparison_is_antisymmetric() {
    let model = StandardTypeModel::new();
    let patterns = sample_overloads();
    let mut comparator = function_comparator(&model);

    for a in &patterns {
        for b in &patterns {
            let forward = comparator.compare(a, b);
            let backward = comparator.compare(b, a);
            assert_eq!(
                forward.reversed(),
                backward,
                "{} vs {}",
                a.signature(),
                b.signature()
            );
        }
    }
}

#[test]
fn test_comparison_is_irreflexive() {
    let model = StandardTypeModel::new();
    let mut comparator = function_comparator(&model);
    for pattern in sample_overloads() {
        let comparison = comparator.compare(&pattern, &pattern);
        assert_eq!(
            comparison.specificity,
            Specificity::Unordered,
            "{}",
            pattern.signature()
        );
    }
}

#[test]
fn test_more_specialized_accepts_a_subset() {
    let model = StandardTypeModel::new();
    let general = overload("f", &["T1", "T2"], vec![Term::param(0), Term::param(1)]);
    let pointer = overload("f", &["T3", "T4"], vec![Term::param(0), Term::pointer(Term::param(1))]);
    assert_eq!(
        function_comparator(&model).compare(&general, &pointer).specificity,
        Specificity::BMoreSpecific
    );

    let matcher = Matcher::new(&model, MatchMode::Call);
    let queries = [
        vec![int(), Term::pointer(int())],
        vec![Term::ty("char"), Term::pointer(Term::pointer(int()))],
        vec![int(), int()],
    ];
    for query in &queries {
        if matcher.match_pattern(query, &pointer).is_some() {
            assert!(matcher.match_pattern(query, &general).is_some());
        }
    }
    assert!(matcher.match_pattern(&queries[2], &general).is_some());
    assert!(matcher.match_pattern(&queries[2], &pointer).is_none());
}

#[test]
fn test_lvalue_reference_beats_forwarding_reference() {
    let model = StandardTypeModel::new();
    let lvalue = overload("f", &["T"], vec![Term::lvalue_ref(Term::param(0))]);
    let forwarding = overload("f", &["T"], vec![Term::rvalue_ref(Term::param(0))]);

    let comparison = function_comparator(&model).compare(&lvalue, &forwarding);
    assert_eq!(comparison.specificity, Specificity::AMoreSpecific);
    assert_eq!(comparison.basis, OrderingBasis::ReferenceKind);
}

#[test]
fn test_more_qualified_reference_is_more_specialized() {
    let model = StandardTypeModel::new();
    let plain = overload("f", &["T"], vec![Term::lvalue_ref(Term::param(0))]);
    let constant = overload(
        "f",
        &["T"],
        vec![Term::lvalue_ref(Term::constant(Term::param(0)))],
    );

    let comparison = function_comparator(&model).compare(&plain, &constant);
    assert_eq!(comparison.specificity, Specificity::BMoreSpecific);
    assert_eq!(comparison.basis, OrderingBasis::Qualification);
}

#[test]
fn test_conflicting_positions_leave_a_qualification_tie() {
    let model = StandardTypeModel::new();
    let a = overload(
        "f",
        &["T", "U"],
        vec![
            Term::lvalue_ref(Term::constant(Term::param(0))),
            Term::lvalue_ref(Term::param(1)),
        ],
    );
    let b = overload(
        "f",
        &["T", "U"],
        vec![
            Term::lvalue_ref(Term::param(0)),
            Term::lvalue_ref(Term::constant(Term::param(1))),
        ],
    );

    let comparison = function_comparator(&model).compare(&a, &b);
    assert_eq!(comparison.specificity, Specificity::Unordered);
    assert_eq!(comparison.basis, OrderingBasis::QualificationTie);
}

#[test]
fn test_by_value_and_reference_are_equally_specialized() {
    let model = StandardTypeModel::new();
    let by_value = overload("f", &["T"], vec![Term::param(0)]);
    let by_reference = overload("f", &["T"], vec![Term::lvalue_ref(Term::param(0))]);

    let comparison = function_comparator(&model).compare(&by_value, &by_reference);
    assert_eq!(comparison.specificity, Specificity::Unordered);
    assert_eq!(comparison.basis, OrderingBasis::EquallySpecialized);
}

#[test]
fn test_qualification_tie_break_can_be_disabled() {
    let model = StandardTypeModel::new();
    let lvalue = overload("f", &["T"], vec![Term::lvalue_ref(Term::param(0))]);
    let forwarding = overload("f", &["T"], vec![Term::rvalue_ref(Term::param(0))]);
    let config = ResolverConfig::default().with_qualification_tie_break(false);

    let comparison = SpecificityComparator::new(&model, config, FamilyFlavor::Function)
        .compare(&lvalue, &forwarding);
    assert_eq!(comparison.specificity, Specificity::Unordered);
}

#[test]
fn test_pack_tie_break_prefers_the_non_pack_side() {
    let model = StandardTypeModel::new();
    let primary = class("A", &["T1", "T2"]);
    let fixed = Pattern::partial(
        "A",
        PatternId(0),
        vec![Parameter::ty("T")],
        vec![Term::param(0), int()],
    );
    let packed = Pattern::partial(
        "A",
        PatternId(0),
        vec![Parameter::ty("T"), Parameter::ty("Ts").packed()],
        vec![Term::param(0), Term::expand(Term::param(1))],
    );
    let mut comparator =
        SpecificityComparator::new(&model, ResolverConfig::default(), FamilyFlavor::Class);

    assert_eq!(
        comparator.compare(&primary, &fixed).specificity,
        Specificity::BMoreSpecific
    );
    // T... accepts anything A<T, int> accepts, and more
    let comparison = comparator.compare(&fixed, &packed);
    assert_eq!(comparison.specificity, Specificity::AMoreSpecific);
}

#[test]
fn test_mutual_packs_are_a_pack_tie() {
    let model = StandardTypeModel::new();
    let pack = |name: &str| {
        Pattern::overload(
            "f",
            vec![Parameter::ty(name).packed()],
            vec![ArgSlot::new(Term::expand(Term::param(0)))],
        )
    };

    let comparison = function_comparator(&model).compare(&pack("Ts"), &pack("Us"));
    assert_eq!(comparison.specificity, Specificity::Unordered);
    assert_eq!(comparison.basis, OrderingBasis::PackTie);
}

#[test]
fn test_cv_pointer_overload_is_more_specialized_without_a_use_site() {
    let model = StandardTypeModel::new();
    let plain = overload("f", &["T1"], vec![Term::pointer(Term::param(0))]);
    let cv = overload(
        "f",
        &["T1"],
        vec![Term::pointer(Term::cv(
            Qualifiers::CONST | Qualifiers::VOLATILE,
            Term::param(0),
        ))],
    );

    let comparison = function_comparator(&model).compare(&plain, &cv);
    assert_eq!(comparison.specificity, Specificity::BMoreSpecific);
    assert_eq!(comparison.basis, OrderingBasis::Deduction);
}
