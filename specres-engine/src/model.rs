//! Type model collaborator
//!
//! The resolver never interprets leaf types itself. Leaf equality, the
//! qualification conversions a use-site may undergo and the pack flags of
//! parameters are all answered by a [`TypeModel`] injected into the registry.

use crate::types::{ParamKind, Parameter, Qualifiers, TypeName};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use std::fmt;

/// Capability object supplying the type-level facts the resolver depends on
pub trait TypeModel: Send + Sync + fmt::Debug {
    /// Structural equality of two leaf type (or template) names
    fn equal_leaf(&self, a: &TypeName, b: &TypeName) -> bool;

    /// Whether an argument qualified with `target` may bind to a parameter
    /// qualified with `candidate` without any other conversion
    fn qualification_compatible(&self, target: Qualifiers, candidate: Qualifiers) -> bool;

    fn is_pack(&self, parameter: &Parameter) -> bool {
        parameter.pack
    }

    fn pack_kind(&self, parameter: &Parameter) -> ParamKind {
        parameter.kind
    }
}

lazy_static! {
    /// Alternative spellings of builtin types, mapped to their canonical spelling
    static ref BUILTIN_SPELLINGS: IndexMap<&'static str, &'static str> = IndexMap::from([
        ("signed", "int"),
        ("signed int", "int"),
        ("unsigned", "unsigned int"),
        ("short int", "short"),
        ("signed short", "short"),
        ("long int", "long"),
        ("signed long", "long"),
        ("long long int", "long long"),
        ("unsigned long int", "unsigned long"),
        ("std::size_t", "size_t"),
        ("std::nullptr_t", "nullptr_t"),
    ]);
}

/// Leaf equality through builtin spellings and declared aliases
///
/// Qualification conversions may only add qualifiers: a `const int*` argument
/// binds to `const volatile T*`, never the other way round.
#[derive(Debug, Clone, Default)]
pub struct StandardTypeModel {
    aliases: IndexMap<TypeName, TypeName>,
}

impl StandardTypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `alias` as another name for `target` (`using alias = target;`)
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.add_alias(alias, target);
        self
    }

    pub fn add_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases
            .insert(TypeName::new(alias), TypeName::new(target));
    }

    /// Canonical spelling of a leaf, following alias chains
    pub fn canonical<'a>(&'a self, name: &'a TypeName) -> &'a str {
        let mut current = name;
        // an alias cycle cannot be longer than the table
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(current) {
                Some(target) => current = target,
                None => break,
            }
        }
        let spelled = current.name();
        BUILTIN_SPELLINGS.get(spelled).copied().unwrap_or(spelled)
    }
}

impl TypeModel for StandardTypeModel {
    fn equal_leaf(&self, a: &TypeName, b: &TypeName) -> bool {
        a == b || self.canonical(a) == self.canonical(b)
    }

    fn qualification_compatible(&self, target: Qualifiers, candidate: Qualifiers) -> bool {
        candidate.contains(target)
    }
}
