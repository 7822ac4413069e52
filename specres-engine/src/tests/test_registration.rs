//! Registration and validation tests

use super::{class, declare, int, overload};
use crate::{
    ArgSlot, FamilyFlavor, Parameter, Pattern, PatternId, PatternKind, Registry,
    RegistrationError, Term,
};
use pretty_assertions::assert_eq;

fn class_b(registry: &mut Registry) -> PatternId {
    declare(registry, class("B", &["T1", "T2"]))
}

#[test]
fn test_families_group_by_name() {
    let mut registry = Registry::default();
    let primary = class_b(&mut registry);
    let partial = declare(
        &mut registry,
        Pattern::partial("B", primary, vec![Parameter::ty("T")], vec![Term::param(0), int()]),
    );
    let explicit = declare(&mut registry, Pattern::explicit("B", primary, vec![int(), int()]));
    let first = declare(&mut registry, overload("f", &["T"], vec![Term::param(0)]));
    let second = declare(&mut registry, overload("f", &["T"], vec![Term::pointer(Term::param(0))]));

    assert!(!registry.is_frozen());
    let snapshot = registry.freeze();
    assert!(registry.is_frozen());
    assert_eq!(snapshot.version(), 5);

    let family = snapshot.family("B").expect("family B");
    assert_eq!(family.flavor, FamilyFlavor::Class);
    assert_eq!(family.primaries, vec![primary]);
    assert_eq!(family.partials, vec![partial]);
    assert_eq!(family.explicits, vec![explicit]);
    assert_eq!(family.members(), vec![primary, partial, explicit]);

    let overloads = snapshot.family("f").expect("family f");
    assert_eq!(overloads.flavor, FamilyFlavor::Function);
    assert_eq!(overloads.primaries, vec![first, second]);
}

#[test]
fn test_frozen_registry_rejects_patterns() {
    let mut registry = Registry::default();
    class_b(&mut registry);
    let snapshot = registry.freeze();

    let error = registry
        .register(overload("f", &["T"], vec![Term::param(0)]))
        .unwrap_err();
    assert_eq!(error, RegistrationError::Frozen { name: "f".to_string() });
    assert_eq!(snapshot.len(), 1);
}

#[test]
fn test_snapshot_is_unaffected_by_later_registrations() {
    let mut registry = Registry::default();
    class_b(&mut registry);
    let before = registry.snapshot();
    declare(&mut registry, overload("f", &["T"], vec![Term::param(0)]));

    assert_eq!(before.version(), 1);
    assert!(before.family("f").is_none());
    assert_eq!(registry.snapshot().version(), 2);
}

#[test]
fn test_rejected_pattern_leaves_registry_unchanged() {
    let mut registry = Registry::default();
    class_b(&mut registry);
    assert!(registry.register(class("B", &["U"])).is_err());

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.version(), 1);
    assert_eq!(snapshot.len(), 1);
}

#[test]
fn test_flavors_cannot_mix() {
    let mut registry = Registry::default();
    class_b(&mut registry);
    declare(&mut registry, overload("f", &["T"], vec![Term::param(0)]));

    assert_eq!(
        registry.register(overload("B", &["T"], vec![Term::param(0)])),
        Err(RegistrationError::FlavorMismatch {
            name: "B".to_string(),
            existing: FamilyFlavor::Class,
            found: FamilyFlavor::Function,
        })
    );
    assert_eq!(
        registry.register(class("f", &["T"])),
        Err(RegistrationError::FlavorMismatch {
            name: "f".to_string(),
            existing: FamilyFlavor::Function,
            found: FamilyFlavor::Class,
        })
    );
}

#[test]
fn test_second_primary_is_rejected() {
    let mut registry = Registry::default();
    class_b(&mut registry);
    assert_eq!(
        registry.register(class("B", &["U"])),
        Err(RegistrationError::DuplicatePrimary { name: "B".to_string() })
    );
}

#[test]
fn test_overloads_cannot_be_partially_specialized() {
    let mut registry = Registry::default();
    let f = declare(&mut registry, overload("f", &["T"], vec![Term::param(0)]));
    let partial = Pattern::partial(
        "f",
        f,
        vec![Parameter::ty("T")],
        vec![Term::pointer(Term::param(0))],
    );

    assert_eq!(
        registry.register(partial),
        Err(RegistrationError::PartialOfOverload { name: "f".to_string() })
    );
}

#[test]
fn test_specialization_target_must_exist_in_family() {
    let mut registry = Registry::default();
    class_b(&mut registry);
    let other = declare(&mut registry, class("C", &["T"]));

    let missing = Pattern::partial(
        "B",
        PatternId(42),
        vec![Parameter::ty("T")],
        vec![Term::param(0), int()],
    );
    assert!(matches!(
        registry.register(missing),
        Err(RegistrationError::InvalidSpecializationTarget { target: PatternId(42), .. })
    ));

    let foreign = Pattern::explicit("B", other, vec![int()]);
    assert!(matches!(
        registry.register(foreign),
        Err(RegistrationError::InvalidSpecializationTarget { .. })
    ));
}

#[test]
fn test_parameter_list_validation() {
    let mut registry = Registry::default();

    assert_eq!(
        registry.register(class("D", &["T", "T"])),
        Err(RegistrationError::DuplicateParameter {
            name: "D".to_string(),
            parameter: "T".to_string(),
        })
    );

    let two_packs = Pattern::overload(
        "g",
        vec![Parameter::ty("Ts").packed(), Parameter::ty("Us").packed()],
        vec![
            ArgSlot::new(Term::expand(Term::param(0))),
            ArgSlot::new(Term::expand(Term::param(1))),
        ],
    );
    assert_eq!(
        registry.register(two_packs),
        Err(RegistrationError::MultiplePacks {
            name: "g".to_string(),
            first: "Ts".to_string(),
            second: "Us".to_string(),
        })
    );

    let pack_first = Pattern::primary("E", vec![Parameter::ty("Ts").packed(), Parameter::ty("U")]);
    assert_eq!(
        registry.register(pack_first),
        Err(RegistrationError::PackNotLast {
            name: "E".to_string(),
            pack: "Ts".to_string(),
            parameter: "U".to_string(),
        })
    );

    // a defaulted parameter may follow the pack
    let defaulted = Pattern::overload(
        "h",
        vec![Parameter::ty("Ts").packed(), Parameter::ty("U").with_default(int())],
        vec![ArgSlot::new(Term::expand(Term::param(0)))],
    );
    assert!(registry.register(defaulted).is_ok());
}

#[test]
fn test_pack_usage_validation() {
    let mut registry = Registry::default();

    let unexpanded = Pattern::overload(
        "f",
        vec![Parameter::ty("Ts").packed()],
        vec![ArgSlot::new(Term::param(0))],
    );
    assert_eq!(
        registry.register(unexpanded),
        Err(RegistrationError::UnexpandedPack {
            name: "f".to_string(),
            parameter: "Ts".to_string(),
        })
    );

    let not_last = Pattern::overload(
        "f",
        vec![Parameter::ty("T"), Parameter::ty("Ts").packed()],
        vec![
            ArgSlot::new(Term::expand(Term::param(1))),
            ArgSlot::new(Term::param(0)),
        ],
    );
    assert_eq!(
        registry.register(not_last),
        Err(RegistrationError::ExpansionNotLast { name: "f".to_string() })
    );

    let nested_not_last = Pattern::overload(
        "f",
        vec![Parameter::ty("T"), Parameter::ty("Ts").packed()],
        vec![ArgSlot::new(Term::apply(
            "tuple",
            vec![Term::expand(Term::param(1)), Term::param(0)],
        ))],
    );
    assert_eq!(
        registry.register(nested_not_last),
        Err(RegistrationError::ExpansionNotLast { name: "f".to_string() })
    );

    let without_pack = overload("f", &["T"], vec![Term::expand(Term::param(0))]);
    assert_eq!(
        registry.register(without_pack),
        Err(RegistrationError::ExpansionWithoutPack { name: "f".to_string() })
    );
}

#[test]
fn test_partial_parameters_must_be_deducible() {
    let mut registry = Registry::default();
    let primary = class_b(&mut registry);

    let unused = Pattern::partial(
        "B",
        primary,
        vec![Parameter::ty("T"), Parameter::ty("U")],
        vec![Term::param(0), int()],
    );
    assert_eq!(
        registry.register(unused),
        Err(RegistrationError::UndeducibleParameter {
            name: "B".to_string(),
            parameter: "U".to_string(),
        })
    );

    let c = declare(
        &mut registry,
        Pattern::primary(
            "C",
            vec![Parameter::ty("T"), Parameter::value("A", "int"), Parameter::value("B", "int")],
        ),
    );
    // X+2 alone is not a deducible context
    let offset_only = Pattern::partial(
        "C",
        c,
        vec![Parameter::value("X", "int")],
        vec![int(), Term::offset(Term::param(0), 2), Term::value(1, "int")],
    );
    assert!(matches!(
        registry.register(offset_only),
        Err(RegistrationError::UndeducibleParameter { .. })
    ));

    let offset = Pattern::partial(
        "C",
        c,
        vec![Parameter::value("X", "int")],
        vec![int(), Term::offset(Term::param(0), 2), Term::param(0)],
    );
    assert!(registry.register(offset).is_ok());
}

#[test]
fn test_partial_must_narrow_its_primary() {
    let mut registry = Registry::default();
    let primary = class_b(&mut registry);

    let identical = Pattern::partial(
        "B",
        primary,
        vec![Parameter::ty("U1"), Parameter::ty("U2")],
        vec![Term::param(0), Term::param(1)],
    );
    assert!(matches!(
        registry.register(identical),
        Err(RegistrationError::IdenticalToPrimary { .. })
    ));

    let d = declare(&mut registry, class("D", &["T"]));
    let wider = Pattern::partial(
        "D",
        d,
        vec![Parameter::ty("T"), Parameter::ty("U")],
        vec![Term::param(0), Term::param(1)],
    );
    assert!(matches!(
        registry.register(wider),
        Err(RegistrationError::NotMoreSpecialized { .. })
    ));
}

#[test]
fn test_specializations_cannot_declare_defaults() {
    let mut registry = Registry::default();
    let primary = class_b(&mut registry);
    let mut partial = Pattern::partial(
        "B",
        primary,
        vec![Parameter::ty("T")],
        vec![Term::param(0), int()],
    );
    partial.arguments[1] = ArgSlot::new(int()).with_default(int());

    assert_eq!(
        registry.register(partial),
        Err(RegistrationError::DefaultArgumentInSpecialization {
            name: "B".to_string(),
            position: 1,
        })
    );
}

#[test]
fn test_explicit_specialization_completion() {
    let mut registry = Registry::default();
    let f = declare(
        &mut registry,
        overload("f", &["T1", "T2"], vec![Term::param(0), Term::pointer(Term::param(1))]),
    );

    // template arguments given: the argument list follows
    let by_template_args = declare(
        &mut registry,
        Pattern::explicit("f", f, vec![int(), Term::ty("char")]),
    );
    // argument list given: the template arguments are deduced
    let by_arguments = declare(
        &mut registry,
        Pattern::explicit_for("f", f, vec![Term::ty("char"), Term::pointer(int())]),
    );

    let snapshot = registry.snapshot();
    let first = snapshot.pattern(by_template_args).expect("registered");
    assert_eq!(
        first.argument_terms(),
        vec![int(), Term::pointer(Term::ty("char"))]
    );
    let second = snapshot.pattern(by_arguments).expect("registered");
    assert_eq!(
        second.kind,
        PatternKind::Explicit {
            of: f,
            template_args: vec![Term::ty("char"), int()],
        }
    );
    assert_eq!(second.signature(), "template<> f<char, int>(char, int*)");
}

#[test]
fn test_explicit_specialization_inherits_defaults() {
    let mut registry = Registry::default();
    let vector = declare(
        &mut registry,
        Pattern::primary(
            "vector",
            vec![
                Parameter::ty("T"),
                Parameter::ty("Allocator").with_default(
                    Term::apply("allocator", vec![Term::param(0)]),
                ),
            ],
        ),
    );
    let explicit = declare(&mut registry, Pattern::explicit("vector", vector, vec![int()]));

    let snapshot = registry.snapshot();
    let pattern = snapshot.pattern(explicit).expect("registered");
    assert_eq!(
        pattern.argument_terms(),
        vec![int(), Term::apply("allocator", vec![int()])]
    );
}

#[test]
fn test_explicit_specialization_validation() {
    let mut registry = Registry::default();
    let primary = class_b(&mut registry);

    let mut with_parameters = Pattern::explicit("B", primary, vec![int(), int()]);
    with_parameters.parameters.push(Parameter::ty("T"));
    assert_eq!(
        registry.register(with_parameters),
        Err(RegistrationError::ExplicitWithParameters { name: "B".to_string() })
    );

    assert_eq!(
        registry.register(Pattern::explicit("B", primary, vec![int(), int(), int()])),
        Err(RegistrationError::ExplicitArgumentMismatch {
            name: "B".to_string(),
            expected: 2,
            found: 3,
        })
    );

    assert!(matches!(
        registry.register(Pattern::explicit_for("B", primary, vec![int()])),
        Err(RegistrationError::UndeducibleExplicit { .. })
    ));

    assert!(matches!(
        registry.register(Pattern::explicit("B", primary, vec![int(), Term::value(1, "int")])),
        Err(RegistrationError::ExplicitArgumentMismatch { .. })
    ));
}

#[test]
fn test_equivalent_patterns_are_rejected() {
    let mut registry = Registry::default();
    let first = declare(&mut registry, overload("f", &["T"], vec![Term::param(0)]));
    assert_eq!(
        registry.register(overload("f", &["U"], vec![Term::param(0)])),
        Err(RegistrationError::DuplicatePattern {
            name: "f".to_string(),
            signature: "template<typename U> f(U)".to_string(),
            existing: first,
        })
    );
    // differing only in a reference is a different overload
    assert!(registry
        .register(overload("f", &["T"], vec![Term::lvalue_ref(Term::param(0))]))
        .is_ok());

    let primary = class_b(&mut registry);
    let partial = declare(
        &mut registry,
        Pattern::partial("B", primary, vec![Parameter::ty("T")], vec![Term::param(0), int()]),
    );
    assert!(matches!(
        registry.register(Pattern::partial(
            "B",
            primary,
            vec![Parameter::ty("U")],
            vec![Term::param(0), int()],
        )),
        Err(RegistrationError::DuplicatePattern { existing, .. }) if existing == partial
    ));

    let explicit = declare(&mut registry, Pattern::explicit("B", primary, vec![int(), int()]));
    assert!(matches!(
        registry.register(Pattern::explicit_for("B", primary, vec![int(), int()])),
        Err(RegistrationError::DuplicatePattern { existing, .. }) if existing == explicit
    ));
}

#[test]
fn test_top_level_qualification_does_not_distinguish_overloads() {
    let mut registry = Registry::default();
    let by_value = declare(&mut registry, overload("f", &["T"], vec![Term::param(0)]));
    assert!(matches!(
        registry.register(overload("f", &["T"], vec![Term::constant(Term::param(0))])),
        Err(RegistrationError::DuplicatePattern { existing, .. }) if existing == by_value
    ));

    let pointer = declare(
        &mut registry,
        overload("f", &["T"], vec![Term::pointer(Term::param(0))]),
    );
    assert!(matches!(
        registry.register(overload(
            "f",
            &["T"],
            vec![Term::constant(Term::pointer(Term::param(0)))],
        )),
        Err(RegistrationError::DuplicatePattern { existing, .. }) if existing == pointer
    ));
    // qualification below the top level is part of the signature
    declare(
        &mut registry,
        overload("f", &["T"], vec![Term::pointer(Term::constant(Term::param(0)))]),
    );

    // class arguments keep their qualification
    let primary = class_b(&mut registry);
    declare(
        &mut registry,
        Pattern::partial("B", primary, vec![Parameter::ty("T")], vec![Term::param(0), int()]),
    );
    declare(
        &mut registry,
        Pattern::partial(
            "B",
            primary,
            vec![Parameter::ty("T")],
            vec![Term::constant(Term::param(0)), int()],
        ),
    );
}
