//! Pattern matching against argument lists
//!
//! The matcher answers one question: is there a substitution for a pattern's
//! parameters that turns its argument list into a given target list? It is a
//! pure function of its inputs. Matching never backtracks: every term shape
//! admits at most one way to bind, so the first failure is final.
//!
//! Three modes cover the three situations the resolver needs:
//! 1. `Structural` compares shapes exactly (class-like families)
//! 2. `Ordering` ignores top-level reference and qualification at each position
//!    (ordering function-like families)
//! 3. `Call` deduces from a use-site: value categories, forwarding references
//!    and qualification-adding conversions

use crate::model::TypeModel;
use crate::types::{
    ArgSlot, Binding, ParamId, ParamKind, Parameter, Pattern, QualificationConversion,
    Qualifiers, RefKind, Substitution, Term,
};

/// How argument positions are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    Structural,
    Ordering,
    Call,
}

/// Finds substitutions for a pattern's parameters
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'m> {
    model: &'m dyn TypeModel,
    mode: MatchMode,
}

impl<'m> Matcher<'m> {
    pub fn new(model: &'m dyn TypeModel, mode: MatchMode) -> Self {
        Self { model, mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Substitution reproducing `target` from `candidate`'s argument list, if any
    pub fn match_pattern(&self, target: &[Term], candidate: &Pattern) -> Option<Substitution> {
        self.match_seeded(target, candidate, Substitution::new())
    }

    /// Like [`Matcher::match_pattern`], starting from already bound parameters
    pub fn match_seeded(
        &self,
        target: &[Term],
        candidate: &Pattern,
        seed: Substitution,
    ) -> Option<Substitution> {
        self.match_slots(target, &candidate.parameters, &candidate.arguments, seed)
    }

    /// Matches an explicit slot list, used when ordering truncated signatures
    pub fn match_slots(
        &self,
        target: &[Term],
        parameters: &[Parameter],
        slots: &[ArgSlot],
        seed: Substitution,
    ) -> Option<Substitution> {
        let mut deduction = Deduction::new(self, parameters, seed);
        if !deduction.slots(slots, target) {
            return None;
        }
        deduction.finish()
    }
}

/// Whether `term` may be bound to `parameter` at all
pub(crate) fn kind_accepts(model: &dyn TypeModel, parameter: &Parameter, term: &Term) -> bool {
    let kind = if model.is_pack(parameter) {
        model.pack_kind(parameter)
    } else {
        parameter.kind
    };
    match kind {
        ParamKind::Type => term.is_type_like(),
        ParamKind::Value => match term {
            Term::Value { ty, .. } => parameter
                .value_type
                .as_ref()
                .map_or(true, |declared| model.equal_leaf(declared, ty)),
            Term::Synthetic(token) => token.kind == ParamKind::Value,
            Term::Offset { .. } => true,
            _ => false,
        },
        ParamKind::Nested => match term {
            Term::Template(_) => true,
            Term::Synthetic(token) => token.kind == ParamKind::Nested,
            _ => false,
        },
    }
}

/// Structural equality, comparing leaves through the type model
pub fn terms_equal(model: &dyn TypeModel, a: &Term, b: &Term) -> bool {
    match (a, b) {
        (Term::Param(x), Term::Param(y)) => x == y,
        (Term::Synthetic(x), Term::Synthetic(y)) => x == y,
        (Term::Type(x), Term::Type(y)) | (Term::Template(x), Term::Template(y)) => {
            model.equal_leaf(x, y)
        }
        (Term::Value { value: x, ty: tx }, Term::Value { value: y, ty: ty_ }) => {
            x == y && model.equal_leaf(tx, ty_)
        }
        (Term::Apply { head: hx, args: ax }, Term::Apply { head: hy, args: ay }) => {
            terms_equal(model, hx, hy) && lists_equal(model, ax, ay)
        }
        (Term::Pointer(x), Term::Pointer(y)) | (Term::Expansion(x), Term::Expansion(y)) => {
            terms_equal(model, x, y)
        }
        (
            Term::Qualified { quals: qx, inner: x },
            Term::Qualified { quals: qy, inner: y },
        ) => qx == qy && terms_equal(model, x, y),
        (Term::Reference { kind: kx, inner: x }, Term::Reference { kind: ky, inner: y }) => {
            kx == ky && terms_equal(model, x, y)
        }
        (Term::Offset { base: x, delta: dx }, Term::Offset { base: y, delta: dy }) => {
            dx == dy && terms_equal(model, x, y)
        }
        _ => false,
    }
}

pub fn lists_equal(model: &dyn TypeModel, a: &[Term], b: &[Term]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| terms_equal(model, x, y))
}

/// State of one matching attempt
struct Deduction<'a> {
    model: &'a dyn TypeModel,
    mode: MatchMode,
    parameters: &'a [Parameter],
    substitution: Substitution,
    /// Parameters bound before matching began (explicit arguments)
    seeded: Vec<ParamId>,
    /// Non-deduced terms, checked once everything else is bound
    deferred: Vec<(Term, Term)>,
    /// Pack parameter currently being matched one element at a time
    element: Option<(ParamId, Option<Term>)>,
}

impl<'a> Deduction<'a> {
    fn new(matcher: &Matcher<'a>, parameters: &'a [Parameter], seed: Substitution) -> Self {
        let seeded = seed.bindings().map(|(id, _)| id).collect();
        Self {
            model: matcher.model,
            mode: matcher.mode,
            parameters,
            substitution: seed,
            seeded,
            deferred: Vec::new(),
            element: None,
        }
    }

    fn finish(self) -> Option<Substitution> {
        for (pattern, target) in &self.deferred {
            let resolved = self.substitution.apply(pattern);
            if !terms_equal(self.model, &resolved, target) {
                return None;
            }
        }
        Some(self.substitution)
    }

    /// Top-level argument list; slots with defaults may go unmatched
    fn slots(&mut self, slots: &[ArgSlot], target: &[Term]) -> bool {
        let mut cursor = 0;
        for slot in slots {
            if let Term::Expansion(inner) = &slot.term {
                let rest = target.get(cursor..).unwrap_or(&[]);
                let base = cursor;
                cursor = target.len();
                if !self.expansion(inner, rest, base, true) {
                    return false;
                }
                continue;
            }
            match target.get(cursor) {
                Some(argument) => {
                    if !self.position(&slot.term, argument, cursor) {
                        return false;
                    }
                    cursor += 1;
                }
                None if slot.default.is_some() => {}
                None => return false,
            }
        }
        cursor == target.len()
    }

    /// Nested argument list of a template-id
    fn list(&mut self, patterns: &[Term], targets: &[Term], position: usize) -> bool {
        let mut cursor = 0;
        for pattern in patterns {
            if let Term::Expansion(inner) = pattern {
                let rest = targets.get(cursor..).unwrap_or(&[]);
                cursor = targets.len();
                if !self.expansion(inner, rest, position, false) {
                    return false;
                }
                continue;
            }
            let Some(target) = targets.get(cursor) else {
                return false;
            };
            if !self.unify(pattern, target, position) {
                return false;
            }
            cursor += 1;
        }
        cursor == targets.len()
    }

    fn position(&mut self, pattern: &Term, argument: &Term, position: usize) -> bool {
        match self.mode {
            MatchMode::Structural => self.unify(pattern, argument, position),
            MatchMode::Ordering => {
                self.unify(pattern.undecorated(), argument.undecorated(), position)
            }
            MatchMode::Call => self.call_position(pattern, argument, position),
        }
    }

    fn call_position(&mut self, pattern: &Term, argument: &Term, position: usize) -> bool {
        let (parameter_ref, parameter) = pattern.strip_reference();
        let (argument_ref, argument) = argument.strip_reference();
        let lvalue = argument_ref == Some(RefKind::Lvalue);

        match parameter_ref {
            // by value: top-level qualification never matters
            None => self.unify(
                parameter.split_qualifiers().1,
                argument.split_qualifiers().1,
                position,
            ),
            Some(RefKind::Rvalue) => match self.forwarding_parameter(parameter) {
                Some(id) if lvalue => self.bind(id, Term::lvalue_ref(argument.clone())),
                Some(_) => self.unify(parameter, argument, position),
                None => !lvalue && self.unify(parameter, argument, position),
            },
            Some(RefKind::Lvalue) => {
                let binds_rvalues = parameter.split_qualifiers().0.contains(Qualifiers::CONST);
                (lvalue || binds_rvalues) && self.unify(parameter, argument, position)
            }
        }
    }

    /// A cv-unqualified `T&&` on a deduced type parameter
    fn forwarding_parameter(&self, parameter: &Term) -> Option<ParamId> {
        let Term::Param(id) = parameter else {
            return None;
        };
        let declared = self.parameters.get(id.index())?;
        let kind = if self.model.is_pack(declared) {
            self.model.pack_kind(declared)
        } else {
            declared.kind
        };
        (kind == ParamKind::Type && !self.seeded.contains(id)).then_some(*id)
    }

    fn unify(&mut self, pattern: &Term, target: &Term, position: usize) -> bool {
        match (pattern, target) {
            (Term::Param(id), _) => self.bind_checked(*id, target),
            (Term::Offset { .. }, _) => {
                self.deferred.push((pattern.clone(), target.clone()));
                true
            }
            (Term::Qualified { quals, inner }, _) => {
                self.qualified(*quals, inner, target, position)
            }
            (Term::Synthetic(a), Term::Synthetic(b)) => a == b,
            (Term::Type(a), Term::Type(b)) | (Term::Template(a), Term::Template(b)) => {
                self.model.equal_leaf(a, b)
            }
            (Term::Value { value: a, ty: ta }, Term::Value { value: b, ty: tb }) => {
                a == b && self.model.equal_leaf(ta, tb)
            }
            (Term::Pointer(p), Term::Pointer(t)) => self.unify(p, t, position),
            (Term::Reference { kind: kp, inner: p }, Term::Reference { kind: kt, inner: t }) => {
                kp == kt && self.unify(p, t, position)
            }
            (Term::Apply { head: hp, args: ap }, Term::Apply { head: ht, args: at }) => {
                self.unify(hp, ht, position) && self.list(ap, at, position)
            }
            _ => false,
        }
    }

    fn qualified(
        &mut self,
        quals: Qualifiers,
        inner: &Term,
        target: &Term,
        position: usize,
    ) -> bool {
        let (target_quals, target_inner) = target.split_qualifiers();
        if !target_quals.contains(quals) {
            let convertible = self.mode == MatchMode::Call
                && self.model.qualification_compatible(target_quals, quals);
            if !convertible {
                return false;
            }
            self.substitution
                .record_conversion(QualificationConversion {
                    position,
                    added: quals - target_quals,
                });
        }
        // whatever the pattern does not spell out stays with the deduced parameter
        let rest = Term::cv(target_quals - quals, target_inner.clone());
        self.unify(inner, &rest, position)
    }

    fn bind_checked(&mut self, id: ParamId, target: &Term) -> bool {
        let Some(parameter) = self.parameters.get(id.index()) else {
            return false;
        };
        kind_accepts(self.model, parameter, target) && self.bind(id, target.clone())
    }

    fn bind(&mut self, id: ParamId, value: Term) -> bool {
        if let Some((element_id, slot)) = &mut self.element {
            if *element_id == id {
                return match slot {
                    Some(existing) => terms_equal(self.model, existing, &value),
                    None => {
                        *slot = Some(value);
                        true
                    }
                };
            }
        }
        let Some(parameter) = self.parameters.get(id.index()) else {
            return false;
        };
        if self.model.is_pack(parameter) {
            // a pack is only ever bound through an expansion
            return false;
        }
        match self.substitution.get(id) {
            Some(Binding::Single(existing)) => {
                let consistent = terms_equal(self.model, existing, &value);
                if !consistent {
                    tracing::trace!(parameter = %parameter.name, "conflicting deductions");
                }
                consistent
            }
            Some(Binding::Pack(_)) => false,
            None => {
                self.substitution.insert(id, Binding::Single(value));
                true
            }
        }
    }

    /// The pack parameter an expansion pattern iterates over
    fn pack_parameter(&self, inner: &Term) -> Option<ParamId> {
        inner.parameters().into_iter().find(|id| {
            self.parameters
                .get(id.index())
                .is_some_and(|parameter| self.model.is_pack(parameter))
        })
    }

    /// Matches `inner...` against every remaining target, binding the pack
    fn expansion(&mut self, inner: &Term, targets: &[Term], base: usize, top_level: bool) -> bool {
        let Some(pack) = self.pack_parameter(inner) else {
            return false;
        };
        if self.element.is_some() {
            // nested expansions are not deduced
            return false;
        }

        let mut elements = Vec::with_capacity(targets.len());
        for (offset, target) in targets.iter().enumerate() {
            let (expanded, target_term) = match target {
                Term::Expansion(inner_target) => (true, &**inner_target),
                other => (false, other),
            };
            self.element = Some((pack, None));
            let matched = if top_level {
                self.position(inner, target_term, base + offset)
            } else {
                self.unify(inner, target_term, base)
            };
            let element = self.element.take().and_then(|(_, value)| value);
            match (matched, element) {
                (true, Some(value)) if expanded => elements.push(Term::expand(value)),
                (true, Some(value)) => elements.push(value),
                _ => return false,
            }
        }

        match self.substitution.get(pack) {
            Some(Binding::Pack(existing)) => lists_equal(self.model, existing, &elements),
            Some(Binding::Single(_)) => false,
            None => {
                self.substitution.insert(pack, Binding::Pack(elements));
                true
            }
        }
    }
}
