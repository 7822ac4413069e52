//! Pattern registry
//!
//! Patterns are declared one at a time and grouped into families by name. Every
//! declaration is validated on the way in; a rejected pattern leaves the
//! registry untouched. Resolution works on an immutable [`RegistrySnapshot`],
//! which is cheap to take and safe to share between threads.

use crate::config::ResolverConfig;
use crate::error::{RegistrationError, RegistrationResult};
use crate::filter::seed_explicit_arguments;
use crate::matcher::{lists_equal, MatchMode, Matcher};
use crate::model::{StandardTypeModel, TypeModel};
use crate::ordering::{SpecificityComparator, Specificity};
use crate::types::{
    ArgSlot, Binding, FamilyFlavor, ParamId, Pattern, PatternId, PatternKind, Substitution, Term,
};
use indexmap::IndexMap;
use std::sync::Arc;

/// All patterns sharing one name
#[derive(Debug, Clone, PartialEq)]
pub struct Family {
    pub name: String,
    pub flavor: FamilyFlavor,
    /// The class-like primary, or every overload
    pub primaries: Vec<PatternId>,
    pub partials: Vec<PatternId>,
    pub explicits: Vec<PatternId>,
}

impl Family {
    fn new(name: &str, flavor: FamilyFlavor) -> Self {
        Self {
            name: name.to_string(),
            flavor,
            primaries: Vec::new(),
            partials: Vec::new(),
            explicits: Vec::new(),
        }
    }

    /// Every member in declaration order
    pub fn members(&self) -> Vec<PatternId> {
        let mut members: Vec<PatternId> = self
            .primaries
            .iter()
            .chain(&self.partials)
            .chain(&self.explicits)
            .copied()
            .collect();
        members.sort();
        members
    }
}

#[derive(Debug, Clone)]
struct RegistryData {
    model: Arc<dyn TypeModel>,
    patterns: Vec<Pattern>,
    families: IndexMap<String, Family>,
    version: u64,
}

/// Immutable view of a registry
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    data: Arc<RegistryData>,
}

impl RegistrySnapshot {
    /// Number of patterns accepted when the snapshot was taken
    pub fn version(&self) -> u64 {
        self.data.version
    }

    pub fn model(&self) -> &dyn TypeModel {
        self.data.model.as_ref()
    }

    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.data.patterns.get(id.index())
    }

    pub fn patterns(&self) -> impl Iterator<Item = (PatternId, &Pattern)> {
        self.data
            .patterns
            .iter()
            .enumerate()
            .map(|(index, pattern)| (PatternId(index as u32), pattern))
    }

    pub fn family(&self, name: &str) -> Option<&Family> {
        self.data.families.get(name)
    }

    pub fn families(&self) -> impl Iterator<Item = &Family> {
        self.data.families.values()
    }

    pub fn len(&self) -> usize {
        self.data.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.patterns.is_empty()
    }
}

/// Declaration-phase registry
#[derive(Debug, Clone)]
pub struct Registry {
    data: Arc<RegistryData>,
    frozen: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(StandardTypeModel::new()))
    }
}

impl Registry {
    pub fn new(model: Arc<dyn TypeModel>) -> Self {
        Self {
            data: Arc::new(RegistryData {
                model,
                patterns: Vec::new(),
                families: IndexMap::new(),
                version: 0,
            }),
            frozen: false,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Snapshot of the current declarations; the registry stays open
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            data: Arc::clone(&self.data),
        }
    }

    /// Closes the declaration phase
    pub fn freeze(&mut self) -> RegistrySnapshot {
        self.frozen = true;
        tracing::debug!(patterns = self.data.patterns.len(), "registry frozen");
        self.snapshot()
    }

    /// Validates and records `pattern`
    #[tracing::instrument(level = "debug", skip_all, fields(name = %pattern.name))]
    pub fn register(&mut self, pattern: Pattern) -> RegistrationResult<PatternId> {
        if self.frozen {
            return Err(RegistrationError::Frozen {
                name: pattern.name,
            });
        }

        let pattern = {
            let check = Validation {
                data: &self.data,
                pattern: &pattern,
            };
            check.parameters()?;
            match &pattern.kind {
                PatternKind::Primary => check.primary()?,
                PatternKind::Overload => check.overload()?,
                PatternKind::Partial { of } => check.partial(*of)?,
                PatternKind::Explicit { .. } => {}
            }
            match &pattern.kind {
                PatternKind::Explicit { of, template_args } => {
                    check.explicit(*of, template_args)?
                }
                _ => pattern.clone(),
            }
        };

        let data = Arc::make_mut(&mut self.data);
        let id = PatternId(data.patterns.len() as u32);
        let flavor = match pattern.kind {
            PatternKind::Primary | PatternKind::Partial { .. } => FamilyFlavor::Class,
            PatternKind::Overload => FamilyFlavor::Function,
            PatternKind::Explicit { .. } => data
                .families
                .get(&pattern.name)
                .map_or(FamilyFlavor::Class, |family| family.flavor),
        };
        let family = data
            .families
            .entry(pattern.name.clone())
            .or_insert_with(|| Family::new(&pattern.name, flavor));
        match pattern.kind {
            PatternKind::Primary | PatternKind::Overload => family.primaries.push(id),
            PatternKind::Partial { .. } => family.partials.push(id),
            PatternKind::Explicit { .. } => family.explicits.push(id),
        }
        tracing::debug!(pattern = %id, signature = %pattern.signature(), "registered");
        data.patterns.push(pattern);
        data.version += 1;
        Ok(id)
    }
}

/// Checks one incoming pattern against the registry as it stands
struct Validation<'v> {
    data: &'v RegistryData,
    pattern: &'v Pattern,
}

impl Validation<'_> {
    fn name(&self) -> String {
        self.pattern.name.clone()
    }

    fn model(&self) -> &dyn TypeModel {
        self.data.model.as_ref()
    }

    fn family(&self) -> Option<&Family> {
        self.data.families.get(&self.pattern.name)
    }

    fn comparator(&self, flavor: FamilyFlavor) -> SpecificityComparator<'_> {
        SpecificityComparator::new(self.model(), ResolverConfig::default(), flavor)
    }

    fn parameters(&self) -> RegistrationResult<()> {
        let parameters = &self.pattern.parameters;
        for (index, parameter) in parameters.iter().enumerate() {
            if parameters[..index]
                .iter()
                .any(|earlier| earlier.name == parameter.name)
            {
                return Err(RegistrationError::DuplicateParameter {
                    name: self.name(),
                    parameter: parameter.name.clone(),
                });
            }
        }

        let mut packs = parameters
            .iter()
            .enumerate()
            .filter(|(_, parameter)| self.model().is_pack(parameter));
        let Some((pack_index, pack)) = packs.next() else {
            return Ok(());
        };
        if let Some((_, second)) = packs.next() {
            return Err(RegistrationError::MultiplePacks {
                name: self.name(),
                first: pack.name.clone(),
                second: second.name.clone(),
            });
        }

        let deducible = if self.pattern.kind == PatternKind::Primary {
            Vec::new()
        } else {
            deducible_parameters(self.pattern)
        };
        for (index, parameter) in parameters.iter().enumerate().skip(pack_index + 1) {
            let id = ParamId(index as u32);
            if parameter.default.is_none() && !deducible.contains(&id) {
                return Err(RegistrationError::PackNotLast {
                    name: self.name(),
                    pack: pack.name.clone(),
                    parameter: parameter.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Pack usage and expansion placement across the argument list
    fn arguments(&self) -> RegistrationResult<()> {
        let slots = &self.pattern.arguments;
        if let Some(position) = slots.iter().position(ArgSlot::is_expansion) {
            if position + 1 != slots.len() {
                return Err(RegistrationError::ExpansionNotLast { name: self.name() });
            }
        }
        let mut misplaced = false;
        for slot in slots {
            slot.term.for_each_nested_list(&mut |list: &[Term]| {
                let expansion = list
                    .iter()
                    .position(|term| matches!(term, Term::Expansion(_)));
                if let Some(position) = expansion {
                    misplaced |= position + 1 != list.len();
                }
            });
            self.pack_usage(&slot.term, false)?;
        }
        if misplaced {
            return Err(RegistrationError::ExpansionNotLast { name: self.name() });
        }
        Ok(())
    }

    fn pack_usage(&self, term: &Term, expanded: bool) -> RegistrationResult<()> {
        match term {
            Term::Param(id) => {
                let is_pack = self
                    .pattern
                    .parameter(*id)
                    .is_some_and(|parameter| self.model().is_pack(parameter));
                match self.pattern.parameter(*id) {
                    Some(parameter) if is_pack && !expanded => {
                        Err(RegistrationError::UnexpandedPack {
                            name: self.name(),
                            parameter: parameter.name.clone(),
                        })
                    }
                    _ => Ok(()),
                }
            }
            Term::Expansion(inner) => {
                let mentions_pack = inner.parameters().into_iter().any(|id| {
                    self.pattern
                        .parameter(id)
                        .is_some_and(|parameter| self.model().is_pack(parameter))
                });
                if !mentions_pack {
                    return Err(RegistrationError::ExpansionWithoutPack { name: self.name() });
                }
                self.pack_usage(inner, true)
            }
            Term::Apply { head, args } => {
                self.pack_usage(head, expanded)?;
                args.iter()
                    .try_for_each(|arg| self.pack_usage(arg, expanded))
            }
            Term::Pointer(inner)
            | Term::Qualified { inner, .. }
            | Term::Reference { inner, .. } => self.pack_usage(inner, expanded),
            Term::Offset { base, .. } => self.pack_usage(base, expanded),
            Term::Synthetic(_) | Term::Type(_) | Term::Value { .. } | Term::Template(_) => Ok(()),
        }
    }

    fn primary(&self) -> RegistrationResult<()> {
        self.arguments()?;
        match self.family() {
            Some(family) if family.flavor == FamilyFlavor::Function => {
                Err(RegistrationError::FlavorMismatch {
                    name: self.name(),
                    existing: FamilyFlavor::Function,
                    found: FamilyFlavor::Class,
                })
            }
            Some(family) if !family.primaries.is_empty() => {
                Err(RegistrationError::DuplicatePrimary { name: self.name() })
            }
            _ => Ok(()),
        }
    }

    fn overload(&self) -> RegistrationResult<()> {
        self.arguments()?;
        let Some(family) = self.family() else {
            return Ok(());
        };
        if family.flavor == FamilyFlavor::Class {
            return Err(RegistrationError::FlavorMismatch {
                name: self.name(),
                existing: FamilyFlavor::Class,
                found: FamilyFlavor::Function,
            });
        }
        let siblings = family.primaries.clone();
        self.reject_duplicates(&siblings, FamilyFlavor::Function)
    }

    fn reject_duplicates(
        &self,
        siblings: &[PatternId],
        flavor: FamilyFlavor,
    ) -> RegistrationResult<()> {
        let mut comparator = self.comparator(flavor);
        for &existing in siblings {
            let Some(sibling) = self.data.patterns.get(existing.index()) else {
                continue;
            };
            if comparator.equivalent(sibling, self.pattern) {
                return Err(RegistrationError::DuplicatePattern {
                    name: self.name(),
                    signature: self.pattern.signature(),
                    existing,
                });
            }
        }
        Ok(())
    }

    /// The pattern `of` refers to, required to belong to the same family
    fn target(&self, of: PatternId) -> RegistrationResult<&Pattern> {
        let invalid = |reason: String| RegistrationError::InvalidSpecializationTarget {
            name: self.name(),
            target: of,
            reason,
        };
        let target = self
            .data
            .patterns
            .get(of.index())
            .ok_or_else(|| invalid("no such pattern is registered".to_string()))?;
        if target.name != self.pattern.name {
            return Err(invalid(format!("it belongs to `{}`", target.name)));
        }
        Ok(target)
    }

    fn partial(&self, of: PatternId) -> RegistrationResult<()> {
        let primary = self.target(of)?;
        match primary.kind {
            PatternKind::Primary => {}
            PatternKind::Overload => {
                return Err(RegistrationError::PartialOfOverload { name: self.name() })
            }
            PatternKind::Partial { .. } | PatternKind::Explicit { .. } => {
                return Err(RegistrationError::InvalidSpecializationTarget {
                    name: self.name(),
                    target: of,
                    reason: "only a primary can be partially specialized".to_string(),
                })
            }
        }

        if let Some(position) = self
            .pattern
            .arguments
            .iter()
            .position(|slot| slot.default.is_some())
        {
            return Err(RegistrationError::DefaultArgumentInSpecialization {
                name: self.name(),
                position,
            });
        }
        self.arguments()?;

        let deducible = deducible_parameters(self.pattern);
        for (index, parameter) in self.pattern.parameters.iter().enumerate() {
            if !deducible.contains(&ParamId(index as u32)) {
                return Err(RegistrationError::UndeducibleParameter {
                    name: self.name(),
                    parameter: parameter.name.clone(),
                });
            }
        }

        let comparison = self.comparator(FamilyFlavor::Class).compare(primary, self.pattern);
        if comparison.a_from_b && comparison.b_from_a {
            return Err(RegistrationError::IdenticalToPrimary {
                name: self.name(),
                signature: self.pattern.signature(),
            });
        }
        if comparison.specificity != Specificity::BMoreSpecific {
            return Err(RegistrationError::NotMoreSpecialized {
                name: self.name(),
                signature: self.pattern.signature(),
            });
        }

        let siblings = self
            .family()
            .map(|family| family.partials.clone())
            .unwrap_or_default();
        self.reject_duplicates(&siblings, FamilyFlavor::Class)
    }

    /// Completes an explicit specialization: template arguments and argument
    /// list are derived from each other, whichever was given
    fn explicit(&self, of: PatternId, template_args: &[Term]) -> RegistrationResult<Pattern> {
        if !self.pattern.parameters.is_empty() {
            return Err(RegistrationError::ExplicitWithParameters { name: self.name() });
        }
        let target = self.target(of)?;
        if !matches!(target.kind, PatternKind::Primary | PatternKind::Overload) {
            return Err(RegistrationError::InvalidSpecializationTarget {
                name: self.name(),
                target: of,
                reason: "only a primary or an overload can be explicitly specialized".to_string(),
            });
        }
        let model = self.model();
        let given = self.pattern.argument_terms();

        let mut substitution = if template_args.is_empty() {
            Matcher::new(model, MatchMode::Structural)
                .match_pattern(&given, target)
                .ok_or_else(|| self.undeducible())?
        } else {
            seed_explicit_arguments(model, target, template_args).ok_or_else(|| {
                RegistrationError::ExplicitArgumentMismatch {
                    name: self.name(),
                    expected: target.parameters.len(),
                    found: template_args.len(),
                }
            })?
        };
        complete_with_defaults(model, target, &mut substitution);
        let template_args = match substitution.flatten(target.parameters.len()) {
            Some(flattened) => flattened,
            None if template_args.is_empty() => return Err(self.undeducible()),
            None => {
                return Err(RegistrationError::ExplicitArgumentMismatch {
                    name: self.name(),
                    expected: target.parameters.len(),
                    found: template_args.len(),
                })
            }
        };
        let arguments = instantiate_slots(target, &substitution);

        if !given.is_empty() {
            let instantiated: Vec<Term> = arguments.iter().map(|slot| slot.term.clone()).collect();
            let supplied = instantiated.get(..given.len()).unwrap_or(&instantiated);
            if given.len() > instantiated.len() || !lists_equal(model, supplied, &given) {
                return Err(RegistrationError::InvalidSpecializationTarget {
                    name: self.name(),
                    target: of,
                    reason: "its argument list does not follow from its template arguments"
                        .to_string(),
                });
            }
        }

        let completed = Pattern {
            name: self.pattern.name.clone(),
            parameters: Vec::new(),
            arguments,
            kind: PatternKind::Explicit {
                of,
                template_args: template_args.clone(),
            },
        };

        if let Some(family) = self.family() {
            for &existing in &family.explicits {
                let duplicate = self
                    .data
                    .patterns
                    .get(existing.index())
                    .is_some_and(|other| match &other.kind {
                        PatternKind::Explicit {
                            of: other_of,
                            template_args: other_args,
                        } => *other_of == of && lists_equal(model, other_args, &template_args),
                        _ => false,
                    });
                if duplicate {
                    return Err(RegistrationError::DuplicatePattern {
                        name: self.name(),
                        signature: completed.signature(),
                        existing,
                    });
                }
            }
        }
        Ok(completed)
    }

    fn undeducible(&self) -> RegistrationError {
        RegistrationError::UndeducibleExplicit {
            name: self.name(),
            signature: self.pattern.signature(),
        }
    }
}

/// Parameters that occur somewhere in the argument list in a deducible position
fn deducible_parameters(pattern: &Pattern) -> Vec<ParamId> {
    let mut found = Vec::new();
    for slot in &pattern.arguments {
        for id in slot.term.deducible_parameters() {
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    found
}

/// Binds every still-unbound parameter of `pattern` that has a default
///
/// Defaults may mention earlier parameters, so they are applied in order. An
/// unbound pack becomes empty.
pub(crate) fn complete_with_defaults(
    model: &dyn TypeModel,
    pattern: &Pattern,
    substitution: &mut Substitution,
) {
    for (index, parameter) in pattern.parameters.iter().enumerate() {
        let id = ParamId(index as u32);
        if substitution.get(id).is_some() {
            continue;
        }
        if model.is_pack(parameter) {
            substitution.insert(id, Binding::Pack(Vec::new()));
        } else if let Some(default) = &parameter.default {
            let value = substitution.apply(default);
            substitution.insert(id, Binding::Single(value));
        }
    }
}

/// `pattern`'s argument slots with `substitution` applied and packs expanded
fn instantiate_slots(pattern: &Pattern, substitution: &Substitution) -> Vec<ArgSlot> {
    let mut slots = Vec::with_capacity(pattern.arguments.len());
    for slot in &pattern.arguments {
        if slot.is_expansion() {
            slots.extend(
                substitution
                    .apply_list(std::slice::from_ref(&slot.term))
                    .into_iter()
                    .map(ArgSlot::new),
            );
        } else {
            slots.push(ArgSlot {
                term: substitution.apply(&slot.term),
                default: slot.default.as_ref().map(|default| substitution.apply(default)),
            });
        }
    }
    slots
}
