//! Engine tests, one file per concern
//!
//! The families used here follow classic specialization examples: overloads
//! ordered by deduction, qualification and reference tie-breaks, parameter
//! packs, class templates with partial and explicit specializations.

mod test_registration;
mod test_specificity;

use crate::{ArgSlot, Parameter, Pattern, PatternId, Registry, Term};

/// Registers `pattern`, failing the test if it is rejected
pub(crate) fn declare(registry: &mut Registry, pattern: Pattern) -> PatternId {
    match registry.register(pattern) {
        Ok(id) => id,
        Err(error) => panic!("registration failed: {error}"),
    }
}

/// Overload whose parameters are all type parameters
pub(crate) fn overload(name: &str, parameters: &[&str], arguments: Vec<Term>) -> Pattern {
    Pattern::overload(
        name,
        parameters.iter().map(|name| Parameter::ty(*name)).collect(),
        arguments.into_iter().map(ArgSlot::new).collect(),
    )
}

/// Class-like primary whose parameters are all type parameters
pub(crate) fn class(name: &str, parameters: &[&str]) -> Pattern {
    Pattern::primary(
        name,
        parameters.iter().map(|name| Parameter::ty(*name)).collect(),
    )
}

pub(crate) fn int() -> Term {
    Term::ty("int")
}

/// An lvalue argument of type `term`
pub(crate) fn lvalue(term: Term) -> Term {
    Term::lvalue_ref(term)
}
