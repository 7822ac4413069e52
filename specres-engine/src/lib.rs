//! Specres Engine
//!
//! Specialization and overload resolution for parameterized patterns.
//!
//! ## Architecture
//!
//! Patterns (class-like primaries with their partial and explicit
//! specializations, or families of function-like overloads) are declared into a
//! [`Registry`]. A frozen [`RegistrySnapshot`] is then queried through a
//! [`Resolver`]:
//!
//! - **Matcher**: finds the substitution that reproduces an argument list
//! - **Synthetic Generator**: unique placeholders for ordering two patterns
//! - **Specificity Comparator**: "more specialized than" with tie-breaks
//! - **Candidate Filter**: every pattern that accepts a use-site
//! - **Resolution Driver**: builds the specificity graph and picks the winner
//!
//! Leaf types are never interpreted by the engine itself; a [`TypeModel`] is
//! injected into the registry and answers every type-level question.
//!
//! ```
//! use specres_engine::{Parameter, Pattern, ArgSlot, Query, Registry, Resolver, Term};
//!
//! let mut registry = Registry::default();
//! let generic = registry
//!     .register(Pattern::overload(
//!         "f",
//!         vec![Parameter::ty("T")],
//!         vec![ArgSlot::new(Term::param(0))],
//!     ))
//!     .unwrap();
//! let pointer = registry
//!     .register(Pattern::overload(
//!         "f",
//!         vec![Parameter::ty("T")],
//!         vec![ArgSlot::new(Term::pointer(Term::param(0)))],
//!     ))
//!     .unwrap();
//!
//! let resolver = Resolver::new(registry.freeze());
//! let query = Query::new("f", vec![Term::pointer(Term::ty("int"))]);
//! assert_eq!(resolver.resolve(&query).selected(), Some(pointer));
//! # let _ = generic;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod model;
pub mod ordering;
pub mod registry;
pub mod resolution;
pub mod synthetic;
pub mod types;

// Re-export public API
pub use config::ResolverConfig;
pub use diagnostics::ResolutionReport;
pub use error::{RegistrationError, RegistrationResult, ResolutionError};
pub use filter::{Candidate, CandidateFilter, FilterOutcome, Rejection};
pub use matcher::{MatchMode, Matcher};
pub use model::{StandardTypeModel, TypeModel};
pub use ordering::{Comparison, OrderingBasis, Specificity, SpecificityComparator, UseSite};
pub use registry::{Family, Registry, RegistrySnapshot};
pub use resolution::{
    Ambiguity, OrderedPair, Resolution, Resolver, Selection, SelectionPath, Unmatched,
    UnorderedPair,
};
pub use synthetic::SyntheticGenerator;
pub use types::{
    ArgSlot, Binding, FamilyFlavor, ParamId, ParamKind, Parameter, Pattern, PatternId,
    PatternKind, QualificationConversion, Qualifiers, Query, RefKind, Substitution, Term,
    TypeName,
};

#[cfg(test)]
mod tests;
