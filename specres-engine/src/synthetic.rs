//! Synthetic substitutions used to order patterns
//!
//! To ask "is A more specialized than B" each pattern's parameters are replaced
//! by placeholders that cannot coincide with any real type or with each other.

use crate::model::TypeModel;
use crate::types::{Binding, ParamId, ParamKind, Pattern, Substitution, SyntheticToken, Term};

/// Hands out unique placeholder tokens
///
/// One generator lives for one resolution; tokens are never reused within it.
#[derive(Debug, Default)]
pub struct SyntheticGenerator {
    next: u64,
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens issued so far
    pub fn issued(&self) -> u64 {
        self.next
    }

    pub fn token(&mut self, kind: ParamKind) -> SyntheticToken {
        let token = SyntheticToken {
            id: self.next,
            kind,
        };
        self.next += 1;
        token
    }

    /// Maps every parameter of `pattern` to a fresh placeholder
    ///
    /// A pack parameter is bound to a single unexpanded placeholder element, so
    /// applying the substitution keeps the pattern's expansion as a synthetic pack.
    pub fn fresh(&mut self, pattern: &Pattern, model: &dyn TypeModel) -> Substitution {
        let mut substitution = Substitution::new();
        for (index, parameter) in pattern.parameters.iter().enumerate() {
            let id = ParamId(index as u32);
            if model.is_pack(parameter) {
                let token = self.token(model.pack_kind(parameter));
                substitution.insert(
                    id,
                    Binding::Pack(vec![Term::expand(Term::Synthetic(token))]),
                );
            } else {
                let token = self.token(parameter.kind);
                substitution.insert(id, Binding::Single(Term::Synthetic(token)));
            }
        }
        substitution
    }
}
