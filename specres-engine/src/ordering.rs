//! Specificity ordering between two patterns
//!
//! A is more specialized than B when B can reproduce every signature A accepts
//! but not the other way round. The check substitutes unique placeholders for
//! one pattern's parameters and asks the matcher whether the other pattern can
//! produce the result, in both directions:
//!
//! ```text
//! A = f(T1, T2)      A' = f(U1, U2)      B from A'? no  (U2 is not a pointer)
//! B = f(T3, T4*)     B' = f(U3, U4*)     A from B'? yes (T1 = U3, T2 = U4*)
//! => B is more specialized
//! ```
//!
//! Ties left by that test are broken, for function-like families, by the
//! qualification rules and, for every family, by the pack rule.

use crate::config::ResolverConfig;
use crate::matcher::{MatchMode, Matcher};
use crate::model::TypeModel;
use crate::synthetic::SyntheticGenerator;
use crate::types::{ArgSlot, FamilyFlavor, Pattern, RefKind, Substitution, Term};
use std::fmt;

/// Outcome of comparing pattern A against pattern B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specificity {
    AMoreSpecific,
    BMoreSpecific,
    Unordered,
}

impl Specificity {
    /// The same relation with the roles of A and B swapped
    pub fn reversed(self) -> Self {
        match self {
            Specificity::AMoreSpecific => Specificity::BMoreSpecific,
            Specificity::BMoreSpecific => Specificity::AMoreSpecific,
            Specificity::Unordered => Specificity::Unordered,
        }
    }
}

/// Which rule decided a comparison, or why it stayed undecided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderingBasis {
    /// Exactly one side could reproduce the other's synthetic signature
    Deduction,
    /// One side needed no qualification-adding conversion at the use-site
    ConversionAvoidance,
    /// An lvalue reference parameter against an rvalue reference parameter
    ReferenceKind,
    /// The more qualified of two reference parameters
    Qualification,
    /// The side without a pack expansion
    Pack,
    /// Both sides reproduce each other and no tie-break applies
    EquallySpecialized,
    /// Neither side can reproduce the other
    Incomparable,
    /// Reference or qualification decorations favour different sides
    QualificationTie,
    /// Both sides reproduce each other and both carry a pack expansion
    PackTie,
}

impl fmt::Display for OrderingBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OrderingBasis::Deduction => "deduction succeeds in one direction only",
            OrderingBasis::ConversionAvoidance => {
                "the other candidate needs a qualification-adding conversion"
            }
            OrderingBasis::ReferenceKind => "an lvalue reference beats an rvalue reference",
            OrderingBasis::Qualification => "the more qualified reference parameter wins",
            OrderingBasis::Pack => "the candidate without a pack expansion wins",
            OrderingBasis::EquallySpecialized => {
                "each pattern can reproduce the other (equally specialized)"
            }
            OrderingBasis::Incomparable => {
                "neither pattern can reproduce the other (incomparable)"
            }
            OrderingBasis::QualificationTie => {
                "qualification tie: reference and qualification decorations favour different candidates"
            }
            OrderingBasis::PackTie => "pack tie: both candidates carry a pack expansion",
        };
        f.write_str(text)
    }
}

/// Result of one comparison together with the evidence behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub specificity: Specificity,
    pub basis: OrderingBasis,
    /// A's synthetic signature can be produced from B
    pub a_from_b: bool,
    /// B's synthetic signature can be produced from A
    pub b_from_a: bool,
}

impl Comparison {
    pub fn is_ordered(&self) -> bool {
        self.specificity != Specificity::Unordered
    }

    pub fn reversed(self) -> Self {
        Self {
            specificity: self.specificity.reversed(),
            basis: self.basis,
            a_from_b: self.b_from_a,
            b_from_a: self.a_from_b,
        }
    }
}

/// What the use-site contributed: its arity and each candidate's deduction
#[derive(Debug, Clone, Copy)]
pub struct UseSite<'s> {
    pub arity: usize,
    pub a: &'s Substitution,
    pub b: &'s Substitution,
}

/// Per-position tie-break outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Neutral,
    Decisive(Specificity, OrderingBasis),
    Conflict,
}

impl Verdict {
    fn merge(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::Conflict, _) | (_, Verdict::Conflict) => Verdict::Conflict,
            (Verdict::Neutral, verdict) | (verdict, Verdict::Neutral) => verdict,
            (Verdict::Decisive(a, basis_a), Verdict::Decisive(b, basis_b)) => {
                if a != b {
                    return Verdict::Conflict;
                }
                let basis = if basis_b == OrderingBasis::ReferenceKind {
                    basis_b
                } else {
                    basis_a
                };
                Verdict::Decisive(a, basis)
            }
        }
    }
}

/// Compares patterns of one family
///
/// Owns the synthetic generator of the resolution it belongs to, so placeholder
/// tokens stay unique across every comparison made for one query.
#[derive(Debug)]
pub struct SpecificityComparator<'c> {
    model: &'c dyn TypeModel,
    config: ResolverConfig,
    flavor: FamilyFlavor,
    generator: SyntheticGenerator,
}

impl<'c> SpecificityComparator<'c> {
    pub fn new(model: &'c dyn TypeModel, config: ResolverConfig, flavor: FamilyFlavor) -> Self {
        Self {
            model,
            config,
            flavor,
            generator: SyntheticGenerator::new(),
        }
    }

    fn ordering_mode(&self) -> MatchMode {
        match self.flavor {
            FamilyFlavor::Class => MatchMode::Structural,
            FamilyFlavor::Function => MatchMode::Ordering,
        }
    }

    /// Compares two patterns independent of any use-site
    pub fn compare(&mut self, a: &Pattern, b: &Pattern) -> Comparison {
        self.compare_at(a, b, None)
    }

    /// Compares two patterns, optionally in the light of a use-site both matched
    pub fn compare_at(
        &mut self,
        a: &Pattern,
        b: &Pattern,
        site: Option<UseSite<'_>>,
    ) -> Comparison {
        let function_like = self.flavor == FamilyFlavor::Function;
        let arity = site
            .filter(|_| function_like && self.config.supplied_arguments_only)
            .map(|site| site.arity);
        let a_slots = ordering_slots(a, arity);
        let b_slots = ordering_slots(b, arity);

        let b_from_a = self.reproduces(a, a_slots, b, b_slots, self.ordering_mode());
        let a_from_b = self.reproduces(b, b_slots, a, a_slots, self.ordering_mode());
        tracing::trace!(b_from_a, a_from_b, ?arity, "deduction in both directions");
        let decided = |specificity, basis| Comparison {
            specificity,
            basis,
            a_from_b,
            b_from_a,
        };

        if let Some(site) = site.filter(|_| function_like && self.config.conversion_avoidance) {
            if let Verdict::Decisive(specificity, basis) =
                self.avoid_conversions(a, a_slots, b, b_slots, site)
            {
                return decided(specificity, basis);
            }
        }

        match (b_from_a, a_from_b) {
            (true, false) => return decided(Specificity::BMoreSpecific, OrderingBasis::Deduction),
            (false, true) => return decided(Specificity::AMoreSpecific, OrderingBasis::Deduction),
            _ => {}
        }

        let mutual = b_from_a && a_from_b;
        let mut unordered = if mutual {
            OrderingBasis::EquallySpecialized
        } else {
            OrderingBasis::Incomparable
        };

        if mutual && function_like && self.config.qualification_tie_break {
            match decoration_verdict(a_slots, b_slots) {
                Verdict::Decisive(specificity, basis) => return decided(specificity, basis),
                Verdict::Conflict => unordered = OrderingBasis::QualificationTie,
                Verdict::Neutral => {}
            }
        }

        if self.config.pack_tie_break {
            match (a.has_pack_expansion(), b.has_pack_expansion()) {
                (false, true) => return decided(Specificity::AMoreSpecific, OrderingBasis::Pack),
                (true, false) => return decided(Specificity::BMoreSpecific, OrderingBasis::Pack),
                (true, true) if mutual && unordered == OrderingBasis::EquallySpecialized => {
                    unordered = OrderingBasis::PackTie
                }
                _ => {}
            }
        }

        decided(Specificity::Unordered, unordered)
    }

    /// Whether each pattern reproduces the other exactly, decorations included
    ///
    /// Top-level qualification of by-value function parameters is not part of
    /// the signature, so `f(T)` and `f(const T)` are equivalent.
    pub fn equivalent(&mut self, a: &Pattern, b: &Pattern) -> bool {
        let (a_slots, b_slots) = match self.flavor {
            FamilyFlavor::Function => {
                (by_value_decayed(&a.arguments), by_value_decayed(&b.arguments))
            }
            FamilyFlavor::Class => (a.arguments.clone(), b.arguments.clone()),
        };
        self.reproduces(a, &a_slots, b, &b_slots, MatchMode::Structural)
            && self.reproduces(b, &b_slots, a, &a_slots, MatchMode::Structural)
    }

    /// Can `source` (restricted to `source_slots`) reproduce the synthetic form of `target`?
    fn reproduces(
        &mut self,
        source: &Pattern,
        source_slots: &[ArgSlot],
        target: &Pattern,
        target_slots: &[ArgSlot],
        mode: MatchMode,
    ) -> bool {
        let synthetic = self
            .generator
            .fresh(target, self.model)
            .apply_list(&slot_terms(target_slots));
        Matcher::new(self.model, mode)
            .match_slots(
                &synthetic,
                &source.parameters,
                source_slots,
                Substitution::new(),
            )
            .is_some()
    }

    /// Prefers the candidate that binds without adding qualifiers, provided the
    /// two candidates differ only in qualification and reference decorations
    fn avoid_conversions(
        &mut self,
        a: &Pattern,
        a_slots: &[ArgSlot],
        b: &Pattern,
        b_slots: &[ArgSlot],
        site: UseSite<'_>,
    ) -> Verdict {
        let a_erased = erased(a_slots);
        let b_erased = erased(b_slots);
        let equivalent = self.reproduces(a, &a_erased, b, &b_erased, MatchMode::Structural)
            && self.reproduces(b, &b_erased, a, &a_erased, MatchMode::Structural);
        if !equivalent {
            return Verdict::Neutral;
        }

        (0..site.arity).fold(Verdict::Neutral, |verdict, position| {
            let local = match (
                site.a.has_conversion_at(position),
                site.b.has_conversion_at(position),
            ) {
                (true, false) => Verdict::Decisive(
                    Specificity::BMoreSpecific,
                    OrderingBasis::ConversionAvoidance,
                ),
                (false, true) => Verdict::Decisive(
                    Specificity::AMoreSpecific,
                    OrderingBasis::ConversionAvoidance,
                ),
                _ => Verdict::Neutral,
            };
            verdict.merge(local)
        })
    }
}

/// Argument slots considered for ordering: those the use-site supplied, or all
fn ordering_slots(pattern: &Pattern, arity: Option<usize>) -> &[ArgSlot] {
    match arity {
        Some(arity) => &pattern.arguments[..arity.min(pattern.arguments.len())],
        None => &pattern.arguments,
    }
}

fn slot_terms(slots: &[ArgSlot]) -> Vec<Term> {
    slots.iter().map(|slot| slot.term.clone()).collect()
}

fn erased(slots: &[ArgSlot]) -> Vec<ArgSlot> {
    slots
        .iter()
        .map(|slot| ArgSlot {
            term: slot.term.erase_decorations(),
            default: slot.default.clone(),
        })
        .collect()
}

fn by_value_decayed(slots: &[ArgSlot]) -> Vec<ArgSlot> {
    slots
        .iter()
        .map(|slot| ArgSlot {
            term: drop_value_qualifiers(&slot.term),
            default: slot.default.clone(),
        })
        .collect()
}

fn drop_value_qualifiers(term: &Term) -> Term {
    match term {
        Term::Expansion(inner) => Term::expand(drop_value_qualifiers(inner)),
        Term::Reference { .. } => term.clone(),
        _ => term.split_qualifiers().1.clone(),
    }
}

fn decoration_verdict(a: &[ArgSlot], b: &[ArgSlot]) -> Verdict {
    a.iter()
        .zip(b)
        .map(|(a, b)| position_verdict(expansion_pattern(&a.term), expansion_pattern(&b.term)))
        .fold(Verdict::Neutral, Verdict::merge)
}

fn expansion_pattern(term: &Term) -> &Term {
    match term {
        Term::Expansion(inner) => inner,
        other => other,
    }
}

/// Reference-kind and qualification tie-break for one position
fn position_verdict(a: &Term, b: &Term) -> Verdict {
    let (Some(a_ref), a_inner) = a.strip_reference() else {
        return Verdict::Neutral;
    };
    let (Some(b_ref), b_inner) = b.strip_reference() else {
        return Verdict::Neutral;
    };

    if a_ref != b_ref {
        let specificity = if a_ref == RefKind::Lvalue {
            Specificity::AMoreSpecific
        } else {
            Specificity::BMoreSpecific
        };
        return Verdict::Decisive(specificity, OrderingBasis::ReferenceKind);
    }

    let a_quals = a_inner.split_qualifiers().0;
    let b_quals = b_inner.split_qualifiers().0;
    if a_quals == b_quals {
        Verdict::Neutral
    } else if a_quals.contains(b_quals) {
        Verdict::Decisive(Specificity::AMoreSpecific, OrderingBasis::Qualification)
    } else if b_quals.contains(a_quals) {
        Verdict::Decisive(Specificity::BMoreSpecific, OrderingBasis::Qualification)
    } else {
        Verdict::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Qualifiers;

    #[test]
    fn verdicts_merge_consistently() {
        let a = Verdict::Decisive(Specificity::AMoreSpecific, OrderingBasis::Qualification);
        let b = Verdict::Decisive(Specificity::BMoreSpecific, OrderingBasis::Qualification);
        assert_eq!(Verdict::Neutral.merge(a), a);
        assert_eq!(a.merge(b), Verdict::Conflict);
        assert_eq!(b.merge(Verdict::Neutral), b);
    }

    #[test]
    fn lvalue_reference_beats_rvalue_reference() {
        let lvalue = Term::lvalue_ref(Term::param(0));
        let rvalue = Term::rvalue_ref(Term::param(0));
        assert_eq!(
            position_verdict(&lvalue, &rvalue),
            Verdict::Decisive(Specificity::AMoreSpecific, OrderingBasis::ReferenceKind)
        );
        assert_eq!(position_verdict(&lvalue, &Term::param(0)), Verdict::Neutral);
    }

    #[test]
    fn incomparable_qualifiers_conflict() {
        let a = Term::lvalue_ref(Term::cv(Qualifiers::CONST, Term::param(0)));
        let b = Term::lvalue_ref(Term::cv(Qualifiers::VOLATILE, Term::param(0)));
        assert_eq!(position_verdict(&a, &b), Verdict::Conflict);
    }
}
