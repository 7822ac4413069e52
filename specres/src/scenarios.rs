//! Canned families replayed by `specres demo`
//!
//! Each scenario declares one family into a fresh registry and returns the
//! use-sites to resolve against it.

use specres_engine::{
    ArgSlot, Parameter, Pattern, Qualifiers, Query, Registry, RegistrationResult, Term,
};

pub struct Scenario {
    pub name: &'static str,
    pub summary: &'static str,
    pub declare: fn(&mut Registry) -> RegistrationResult<Vec<Query>>,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "overloads",
        summary: "f(T1, T2) against f(T3, T4*)",
        declare: overloads,
    },
    Scenario {
        name: "ambiguous",
        summary: "f(T1, T1) against f(T2, int) called with (int, int)",
        declare: ambiguous,
    },
    Scenario {
        name: "explicit",
        summary: "explicit specializations are only found through their own overload",
        declare: explicit,
    },
    Scenario {
        name: "qualification",
        summary: "f(T1*) against f(const volatile T1*) called with const int*",
        declare: qualification,
    },
    Scenario {
        name: "references",
        summary: "by-value, lvalue reference, const reference and forwarding reference",
        declare: references,
    },
    Scenario {
        name: "packs",
        summary: "f(T), f(T*, int = 5) and f(T, Ts...)",
        declare: packs,
    },
    Scenario {
        name: "partials",
        summary: "class B<T1, T2> with partial and explicit specializations",
        declare: partials,
    },
    Scenario {
        name: "defaults",
        summary: "vector<T, Allocator = allocator<T>> specialized for bool",
        declare: defaults,
    },
    Scenario {
        name: "offsets",
        summary: "C<int, X+2, X> selected by value",
        declare: offsets,
    },
];

pub fn find(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.name == name)
}

fn types(names: &[&str]) -> Vec<Parameter> {
    names.iter().map(|name| Parameter::ty(*name)).collect()
}

fn slots(terms: Vec<Term>) -> Vec<ArgSlot> {
    terms.into_iter().map(ArgSlot::new).collect()
}

fn int() -> Term {
    Term::ty("int")
}

fn overloads(registry: &mut Registry) -> RegistrationResult<Vec<Query>> {
    registry.register(Pattern::overload(
        "exampleFunc1",
        types(&["T1", "T2"]),
        slots(vec![Term::param(0), Term::param(1)]),
    ))?;
    registry.register(Pattern::overload(
        "exampleFunc1",
        types(&["T3", "T4"]),
        slots(vec![Term::param(0), Term::pointer(Term::param(1))]),
    ))?;
    Ok(vec![
        Query::new("exampleFunc1", vec![int(), int()]),
        Query::new("exampleFunc1", vec![int(), Term::pointer(int())]),
    ])
}

fn ambiguous(registry: &mut Registry) -> RegistrationResult<Vec<Query>> {
    registry.register(Pattern::overload(
        "exampleFunc2",
        types(&["T1"]),
        slots(vec![Term::param(0), Term::param(0)]),
    ))?;
    registry.register(Pattern::overload(
        "exampleFunc2",
        types(&["T2"]),
        slots(vec![Term::param(0), int()]),
    ))?;
    Ok(vec![
        Query::new("exampleFunc2", vec![int(), int()]),
        Query::new("exampleFunc2", vec![Term::ty("char"), int()]),
        Query::new("exampleFunc2", vec![Term::ty("char"), Term::ty("char")]),
    ])
}

fn explicit(registry: &mut Registry) -> RegistrationResult<Vec<Query>> {
    let general = registry.register(Pattern::overload(
        "exampleFunc3",
        types(&["T1", "T2"]),
        slots(vec![Term::param(0), Term::param(1)]),
    ))?;
    let pointer = registry.register(Pattern::overload(
        "exampleFunc3",
        types(&["T3", "T4"]),
        slots(vec![Term::param(0), Term::pointer(Term::param(1))]),
    ))?;
    registry.register(Pattern::explicit(
        "exampleFunc3",
        general,
        vec![int(), Term::pointer(int())],
    ))?;
    registry.register(Pattern::explicit_for(
        "exampleFunc3",
        pointer,
        vec![int(), Term::pointer(Term::ty("char"))],
    ))?;
    Ok(vec![
        Query::new("exampleFunc3", vec![int(), Term::pointer(int())]),
        Query::new("exampleFunc3", vec![int(), Term::pointer(int())])
            .with_explicit_arguments(vec![int(), Term::pointer(int())]),
        Query::new("exampleFunc3", vec![int(), Term::pointer(Term::ty("char"))]),
        Query::new("exampleFunc3", vec![int(), Term::pointer(Term::ty("char"))]).primary_only(),
    ])
}

fn qualification(registry: &mut Registry) -> RegistrationResult<Vec<Query>> {
    registry.register(Pattern::overload(
        "exampleFunc4",
        types(&["T1"]),
        slots(vec![Term::pointer(Term::param(0))]),
    ))?;
    registry.register(Pattern::overload(
        "exampleFunc4",
        types(&["T1"]),
        slots(vec![Term::pointer(Term::cv(
            Qualifiers::CONST | Qualifiers::VOLATILE,
            Term::param(0),
        ))]),
    ))?;
    Ok(vec![
        Query::new("exampleFunc4", vec![Term::pointer(Term::constant(int()))]),
        Query::new("exampleFunc4", vec![Term::pointer(int())]),
    ])
}

fn references(registry: &mut Registry) -> RegistrationResult<Vec<Query>> {
    registry.register(Pattern::overload(
        "byValue",
        types(&["T"]),
        slots(vec![Term::param(0)]),
    ))?;
    registry.register(Pattern::overload(
        "byValue",
        types(&["T"]),
        slots(vec![Term::lvalue_ref(Term::param(0))]),
    ))?;
    registry.register(Pattern::overload(
        "forwarding",
        types(&["T"]),
        slots(vec![Term::lvalue_ref(Term::param(0))]),
    ))?;
    registry.register(Pattern::overload(
        "forwarding",
        types(&["T"]),
        slots(vec![Term::rvalue_ref(Term::param(0))]),
    ))?;
    registry.register(Pattern::overload(
        "constRef",
        types(&["T"]),
        slots(vec![Term::lvalue_ref(Term::constant(Term::param(0)))]),
    ))?;
    registry.register(Pattern::overload(
        "constRef",
        types(&["T"]),
        slots(vec![Term::rvalue_ref(Term::param(0))]),
    ))?;
    let lvalue = Term::lvalue_ref(int());
    Ok(vec![
        Query::new("byValue", vec![lvalue.clone()]),
        Query::new("byValue", vec![int()]),
        Query::new("forwarding", vec![lvalue.clone()]),
        Query::new("forwarding", vec![int()]),
        Query::new("constRef", vec![lvalue]),
        Query::new("constRef", vec![int()]),
    ])
}

fn packs(registry: &mut Registry) -> RegistrationResult<Vec<Query>> {
    registry.register(Pattern::overload(
        "exampleFunc9",
        types(&["T"]),
        slots(vec![Term::param(0)]),
    ))?;
    registry.register(Pattern::overload(
        "exampleFunc9",
        types(&["T"]),
        vec![
            ArgSlot::new(Term::pointer(Term::param(0))),
            ArgSlot::new(int()).with_default(Term::value(5, "int")),
        ],
    ))?;
    registry.register(Pattern::overload(
        "exampleFunc9",
        vec![Parameter::ty("T"), Parameter::ty("Ts").packed()],
        slots(vec![Term::param(0), Term::expand(Term::param(1))]),
    ))?;
    Ok(vec![
        Query::new("exampleFunc9", vec![int()]),
        Query::new("exampleFunc9", vec![Term::pointer(int())]),
        Query::new("exampleFunc9", vec![int(), Term::ty("char"), Term::ty("bool")]),
    ])
}

fn partials(registry: &mut Registry) -> RegistrationResult<Vec<Query>> {
    let primary = registry.register(Pattern::primary("B", types(&["T1", "T2"])))?;
    registry.register(Pattern::partial(
        "B",
        primary,
        types(&["T"]),
        vec![Term::param(0), Term::param(0)],
    ))?;
    registry.register(Pattern::partial(
        "B",
        primary,
        types(&["T"]),
        vec![Term::param(0), int()],
    ))?;
    registry.register(Pattern::partial(
        "B",
        primary,
        types(&["T", "T1"]),
        vec![Term::param(0), Term::pointer(Term::param(1))],
    ))?;
    registry.register(Pattern::partial(
        "B",
        primary,
        types(&["T", "T1"]),
        vec![Term::pointer(Term::param(0)), Term::pointer(Term::param(1))],
    ))?;
    registry.register(Pattern::explicit("B", primary, vec![int(), int()]))?;
    Ok(vec![
        Query::new("B", vec![int(), int()]),
        Query::new("B", vec![int(), int()]).primary_only(),
        Query::new("B", vec![Term::ty("char"), Term::ty("char")]),
        Query::new("B", vec![Term::ty("char"), int()]),
        Query::new("B", vec![int(), Term::pointer(int())]),
        Query::new("B", vec![Term::pointer(int()), Term::pointer(Term::ty("char"))]),
        Query::new("B", vec![Term::pointer(int()), Term::pointer(int())]),
    ])
}

fn defaults(registry: &mut Registry) -> RegistrationResult<Vec<Query>> {
    let primary = registry.register(Pattern::primary(
        "vector",
        vec![
            Parameter::ty("T"),
            Parameter::ty("Allocator").with_default(Term::apply("allocator", vec![Term::param(0)])),
        ],
    ))?;
    registry.register(Pattern::partial(
        "vector",
        primary,
        types(&["Allocator"]),
        vec![Term::ty("bool"), Term::param(0)],
    ))?;
    Ok(vec![
        Query::new("vector", vec![Term::ty("bool")]),
        Query::new("vector", vec![int()]),
    ])
}

fn offsets(registry: &mut Registry) -> RegistrationResult<Vec<Query>> {
    let primary = registry.register(Pattern::primary(
        "C",
        vec![
            Parameter::ty("T"),
            Parameter::value("A", "int"),
            Parameter::value("B", "int"),
        ],
    ))?;
    registry.register(Pattern::partial(
        "C",
        primary,
        vec![Parameter::value("X", "int")],
        vec![int(), Term::offset(Term::param(0), 2), Term::param(0)],
    ))?;
    Ok(vec![
        Query::new("C", vec![int(), Term::value(5, "int"), Term::value(3, "int")]),
        Query::new("C", vec![int(), Term::value(4, "int"), Term::value(3, "int")]),
    ])
}
