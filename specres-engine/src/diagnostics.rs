//! Human-readable reports of resolution outcomes

use crate::registry::RegistrySnapshot;
use crate::resolution::{Resolution, SelectionPath};
use crate::types::{PatternId, Query};
use std::fmt::{self, Write};

/// A resolution rendered against the snapshot it was computed from
///
/// ```text
/// f(int, int) is ambiguous between 2 candidates
///   #0 template<typename T1> f(T1, T1)
///   #1 template<typename T2> f(T2, int)
/// unordered:
///   #0 and #1: neither pattern can reproduce the other (incomparable)
/// ```
pub struct ResolutionReport<'a> {
    snapshot: &'a RegistrySnapshot,
    query: &'a Query,
    resolution: &'a Resolution,
}

impl<'a> ResolutionReport<'a> {
    pub fn new(
        snapshot: &'a RegistrySnapshot,
        query: &'a Query,
        resolution: &'a Resolution,
    ) -> Self {
        Self {
            snapshot,
            query,
            resolution,
        }
    }

    fn signature(&self, id: PatternId) -> String {
        self.snapshot
            .pattern(id)
            .map_or_else(|| "<unknown pattern>".to_string(), |pattern| pattern.signature())
    }

    /// Everything below the headline: candidates, bindings, reasons
    pub fn details(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_details(&mut out);
        out.trim_end().to_string()
    }

    fn headline(&self, f: &mut impl Write) -> fmt::Result {
        match self.resolution {
            Resolution::Resolved(selection) => write!(
                f,
                "{} resolves to {} {}",
                self.query,
                selection.pattern,
                self.signature(selection.pattern)
            ),
            Resolution::Ambiguous(ambiguity) => write!(
                f,
                "{} is ambiguous between {} candidates",
                self.query,
                ambiguity.maximal.len()
            ),
            Resolution::Unmatched(unmatched) if !unmatched.known_name => {
                write!(f, "no pattern is named `{}`", self.query.name)
            }
            Resolution::Unmatched(_) => write!(f, "{} matches no pattern", self.query),
        }
    }

    fn write_details(&self, f: &mut impl Write) -> fmt::Result {
        match self.resolution {
            Resolution::Resolved(selection) => {
                let how = match selection.path {
                    SelectionPath::Explicit => "explicit specialization",
                    SelectionPath::SoleCandidate => "only viable candidate",
                    SelectionPath::MostSpecialized => "most specialized candidate",
                };
                writeln!(f, "  selected as the {how}")?;
                if let Some(base) = selection.specializes {
                    writeln!(f, "  specializes {base} {}", self.signature(base))?;
                }
                // explicit selections bind the specialized pattern's parameters
                let named_by = match selection.path {
                    SelectionPath::Explicit => selection.specializes.unwrap_or(selection.pattern),
                    _ => selection.pattern,
                };
                if let Some(pattern) = self.snapshot.pattern(named_by) {
                    if !selection.substitution.is_empty() {
                        writeln!(
                            f,
                            "  with {}",
                            selection.substitution.describe(&pattern.parameters)
                        )?;
                    }
                }
                for conversion in selection.substitution.conversions() {
                    writeln!(
                        f,
                        "  argument {} gains `{}`",
                        conversion.position, conversion.added
                    )?;
                }
            }
            Resolution::Ambiguous(ambiguity) => {
                for &id in &ambiguity.maximal {
                    writeln!(f, "  {id} {}", self.signature(id))?;
                }
                if !ambiguity.unordered.is_empty() {
                    writeln!(f, "unordered:")?;
                    for pair in &ambiguity.unordered {
                        writeln!(f, "  {} and {}: {}", pair.a, pair.b, pair.basis)?;
                    }
                }
                if !ambiguity.cycle.is_empty() {
                    writeln!(f, "cyclic ordering:")?;
                    for pair in &ambiguity.cycle {
                        writeln!(f, "  {} over {}: {}", pair.more, pair.less, pair.basis)?;
                    }
                }
                let dominated: Vec<String> = ambiguity
                    .considered
                    .iter()
                    .filter(|id| !ambiguity.maximal.contains(id))
                    .map(ToString::to_string)
                    .collect();
                if !dominated.is_empty() {
                    writeln!(f, "less specialized: {}", dominated.join(", "))?;
                }
            }
            Resolution::Unmatched(unmatched) => {
                for (id, rejection) in &unmatched.considered {
                    writeln!(f, "  {id} {}: {rejection}", self.signature(*id))?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for ResolutionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.headline(f)?;
        writeln!(f)?;
        self.write_details(f)
    }
}
