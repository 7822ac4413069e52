//! Candidate filtering
//!
//! Keeps every pattern of a family the matcher accepts for a use-site, in
//! declaration order, and remembers why the others were turned away.

use crate::matcher::{kind_accepts, MatchMode, Matcher};
use crate::model::TypeModel;
use crate::types::{Binding, FamilyFlavor, ParamId, Pattern, PatternId, Substitution, Term};
use std::fmt;

/// A pattern that accepts the use-site, with the substitution that does it
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub pattern: PatternId,
    pub substitution: Substitution,
}

/// Why a pattern was not a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The explicitly supplied arguments do not fit its parameters
    ExplicitArguments,
    /// No substitution reproduces the use-site's arguments
    Deduction,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ExplicitArguments => {
                f.write_str("explicit template arguments do not fit its parameters")
            }
            Rejection::Deduction => f.write_str("no substitution reproduces the arguments"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub viable: Vec<Candidate>,
    pub rejected: Vec<(PatternId, Rejection)>,
}

pub struct CandidateFilter<'f> {
    matcher: Matcher<'f>,
    model: &'f dyn TypeModel,
}

impl<'f> CandidateFilter<'f> {
    pub fn new(model: &'f dyn TypeModel, flavor: FamilyFlavor) -> Self {
        let mode = match flavor {
            FamilyFlavor::Class => MatchMode::Structural,
            FamilyFlavor::Function => MatchMode::Call,
        };
        Self {
            matcher: Matcher::new(model, mode),
            model,
        }
    }

    pub fn filter<'p>(
        &self,
        arguments: &[Term],
        explicit: &[Term],
        patterns: impl IntoIterator<Item = (PatternId, &'p Pattern)>,
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for (id, pattern) in patterns {
            let Some(seed) = seed_explicit_arguments(self.model, pattern, explicit) else {
                tracing::trace!(pattern = %id, "explicit arguments rejected");
                outcome.rejected.push((id, Rejection::ExplicitArguments));
                continue;
            };
            match self.matcher.match_seeded(arguments, pattern, seed) {
                Some(substitution) => {
                    tracing::trace!(
                        pattern = %id,
                        bindings = %substitution.describe(&pattern.parameters),
                        "candidate accepted"
                    );
                    outcome.viable.push(Candidate {
                        pattern: id,
                        substitution,
                    });
                }
                None => {
                    tracing::trace!(pattern = %id, "deduction failed");
                    outcome.rejected.push((id, Rejection::Deduction));
                }
            }
        }
        outcome
    }
}

/// Binds explicitly supplied arguments to `pattern`'s parameters by position
///
/// A pack parameter takes every remaining argument. Returns `None` when there
/// are more arguments than parameters or one has the wrong kind.
pub fn seed_explicit_arguments(
    model: &dyn TypeModel,
    pattern: &Pattern,
    explicit: &[Term],
) -> Option<Substitution> {
    let mut seed = Substitution::new();
    let mut remaining = explicit;
    for (index, parameter) in pattern.parameters.iter().enumerate() {
        if remaining.is_empty() {
            break;
        }
        let id = ParamId(index as u32);
        if model.is_pack(parameter) {
            if !remaining
                .iter()
                .all(|term| kind_accepts(model, parameter, term))
            {
                return None;
            }
            seed.insert(id, Binding::Pack(remaining.to_vec()));
            remaining = &[];
            break;
        }
        let (first, rest) = remaining.split_first()?;
        if !kind_accepts(model, parameter, first) {
            return None;
        }
        seed.insert(id, Binding::Single(first.clone()));
        remaining = rest;
    }
    remaining.is_empty().then_some(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StandardTypeModel;
    use crate::types::{ArgSlot, Parameter};

    #[test]
    fn explicit_pack_takes_the_remainder() {
        let model = StandardTypeModel::new();
        let pattern = Pattern::overload(
            "f",
            vec![Parameter::ty("T"), Parameter::ty("Ts").packed()],
            vec![
                ArgSlot::new(Term::param(0)),
                ArgSlot::new(Term::expand(Term::param(1))),
            ],
        );
        let seed = seed_explicit_arguments(
            &model,
            &pattern,
            &[Term::ty("int"), Term::ty("char"), Term::ty("bool")],
        );
        let seed = seed.expect("explicit arguments should fit");
        assert_eq!(
            seed.get(ParamId(1)),
            Some(&Binding::Pack(vec![Term::ty("char"), Term::ty("bool")]))
        );
    }

    #[test]
    fn surplus_explicit_arguments_are_rejected() {
        let model = StandardTypeModel::new();
        let pattern = Pattern::overload(
            "f",
            vec![Parameter::ty("T")],
            vec![ArgSlot::new(Term::param(0))],
        );
        assert!(
            seed_explicit_arguments(&model, &pattern, &[Term::ty("int"), Term::ty("int")])
                .is_none()
        );
        assert!(seed_explicit_arguments(&model, &pattern, &[Term::value(1, "int")]).is_none());
    }
}
