//! Resolver configuration

/// Switches for the tie-break rules applied after deduction-based ordering
///
/// Every rule is on by default; turning one off makes the corresponding ties
/// surface as ambiguities instead, which is how the CLI demonstrates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Prefer the candidate without a pack expansion when ordering leaves a tie
    pub pack_tie_break: bool,
    /// Order mutually matching reference parameters by reference kind and qualification
    pub qualification_tie_break: bool,
    /// Prefer the candidate that needs no qualification-adding conversion at the use-site
    pub conversion_avoidance: bool,
    /// Only order the positions the use-site actually supplied arguments for
    pub supplied_arguments_only: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pack_tie_break: true,
            qualification_tie_break: true,
            conversion_avoidance: true,
            supplied_arguments_only: true,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pack_tie_break(mut self, enabled: bool) -> Self {
        self.pack_tie_break = enabled;
        self
    }

    pub fn with_qualification_tie_break(mut self, enabled: bool) -> Self {
        self.qualification_tie_break = enabled;
        self
    }

    pub fn with_conversion_avoidance(mut self, enabled: bool) -> Self {
        self.conversion_avoidance = enabled;
        self
    }

    pub fn with_supplied_arguments_only(mut self, enabled: bool) -> Self {
        self.supplied_arguments_only = enabled;
        self
    }
}
