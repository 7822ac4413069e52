//! Error types for the specialization resolver
//!
//! Registration failures reject a single pattern and leave the registry as it
//! was. Ambiguous and unmatched use-sites are ordinary [`crate::Resolution`]
//! values; [`ResolutionError`] is only produced when a caller asks for one.

use crate::types::{FamilyFlavor, PatternId};
use miette::Diagnostic;
use thiserror::Error;

/// A pattern was rejected at declaration time
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("Cannot register `{name}`: the registry has been frozen")]
    #[diagnostic(
        code(specres::registration::frozen),
        help("Declare every pattern before calling `freeze()`, or take a `snapshot()` to keep declaring")
    )]
    Frozen { name: String },

    #[error("`{name}` is a {existing} family and cannot take a {found} pattern")]
    #[diagnostic(
        code(specres::registration::flavor_mismatch),
        help("Overloads and class-like primaries cannot share a name")
    )]
    FlavorMismatch {
        name: String,
        existing: FamilyFlavor,
        found: FamilyFlavor,
    },

    #[error("`{name}` already has a primary pattern")]
    #[diagnostic(
        code(specres::registration::duplicate_primary),
        help("Declare a partial or explicit specialization of the existing primary instead")
    )]
    DuplicatePrimary { name: String },

    #[error("`{name}` is function-like and cannot be partially specialized")]
    #[diagnostic(
        code(specres::registration::partial_of_overload),
        help("Declare another overload instead")
    )]
    PartialOfOverload { name: String },

    #[error("`{name}` cannot specialize {target}: {reason}")]
    #[diagnostic(code(specres::registration::invalid_target))]
    InvalidSpecializationTarget {
        name: String,
        target: PatternId,
        reason: String,
    },

    #[error("Parameter `{parameter}` of `{name}` is declared twice")]
    #[diagnostic(code(specres::registration::duplicate_parameter))]
    DuplicateParameter { name: String, parameter: String },

    #[error("`{name}` declares more than one pack: `{first}` and `{second}`")]
    #[diagnostic(
        code(specres::registration::multiple_packs),
        help("A pattern may have at most one pack parameter")
    )]
    MultiplePacks {
        name: String,
        first: String,
        second: String,
    },

    #[error("Pack `{pack}` of `{name}` is followed by `{parameter}`, which has no default and cannot be deduced")]
    #[diagnostic(
        code(specres::registration::pack_not_last),
        help("Move the pack to the end of the parameter list or give `{parameter}` a default")
    )]
    PackNotLast {
        name: String,
        pack: String,
        parameter: String,
    },

    #[error("A pack expansion in `{name}` is not the last argument of its list")]
    #[diagnostic(code(specres::registration::expansion_not_last))]
    ExpansionNotLast { name: String },

    #[error("Pack `{parameter}` of `{name}` is used without being expanded")]
    #[diagnostic(
        code(specres::registration::unexpanded_pack),
        help("Write `{parameter}...` wherever the pack is used")
    )]
    UnexpandedPack { name: String, parameter: String },

    #[error("A pack expansion in `{name}` does not mention any pack")]
    #[diagnostic(code(specres::registration::expansion_without_pack))]
    ExpansionWithoutPack { name: String },

    #[error("Parameter `{parameter}` of `{name}` cannot be deduced from its argument list")]
    #[diagnostic(
        code(specres::registration::undeducible_parameter),
        help("Every parameter of a specialization must appear on its own at least once; `X+1` is not enough")
    )]
    UndeducibleParameter { name: String, parameter: String },

    #[error("`{signature}` has the same argument list as its primary")]
    #[diagnostic(
        code(specres::registration::identical_to_primary),
        help("A partial specialization must narrow the primary's arguments")
    )]
    IdenticalToPrimary { name: String, signature: String },

    #[error("`{signature}` is not more specialized than its primary")]
    #[diagnostic(
        code(specres::registration::not_more_specialized),
        help("A partial specialization must accept a strict subset of what the primary accepts")
    )]
    NotMoreSpecialized { name: String, signature: String },

    #[error("Argument {position} of specialization `{name}` declares a default")]
    #[diagnostic(
        code(specres::registration::default_in_specialization),
        help("Specializations inherit defaults from the pattern they specialize")
    )]
    DefaultArgumentInSpecialization { name: String, position: usize },

    #[error("Explicit specialization of `{name}` declares parameters")]
    #[diagnostic(
        code(specres::registration::explicit_with_parameters),
        help("Use a partial specialization to keep parameters")
    )]
    ExplicitWithParameters { name: String },

    #[error("Explicit specialization of `{name}` supplies {found} template arguments, expected {expected}")]
    #[diagnostic(code(specres::registration::explicit_argument_mismatch))]
    ExplicitArgumentMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Template arguments of explicit specialization `{signature}` cannot be deduced")]
    #[diagnostic(
        code(specres::registration::undeducible_explicit),
        help("Supply the template arguments explicitly")
    )]
    UndeducibleExplicit { name: String, signature: String },

    #[error("`{signature}` is equivalent to the already registered {existing}")]
    #[diagnostic(
        code(specres::registration::duplicate_pattern),
        help("Functionally equivalent patterns would make every use ambiguous; remove one of them")
    )]
    DuplicatePattern {
        name: String,
        signature: String,
        existing: PatternId,
    },
}

/// An ambiguous or unmatched use-site, reported as an error
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("No pattern for `{query}`")]
    #[diagnostic(code(specres::resolution::unmatched), help("{details}"))]
    Unmatched {
        name: String,
        query: String,
        details: String,
    },

    #[error("Ambiguous use `{query}`: {count} patterns are equally good")]
    #[diagnostic(code(specres::resolution::ambiguous), help("{details}"))]
    Ambiguous {
        name: String,
        query: String,
        count: usize,
        details: String,
    },
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;
