//! Resolution driver
//!
//! Resolves one use-site against a registry snapshot:
//! 1. class-like families short-circuit on an explicit specialization whose
//!    arguments equal the query
//! 2. primaries (or overloads) and partial specializations are filtered
//! 3. the survivors are ordered pairwise into a specificity graph
//! 4. the unique maximal element wins; several maximal elements are ambiguous
//! 5. function-like families then look for an explicit specialization of the
//!    winning overload only

use crate::config::ResolverConfig;
use crate::diagnostics::ResolutionReport;
use crate::error::ResolutionError;
use crate::filter::{seed_explicit_arguments, Candidate, CandidateFilter, Rejection};
use crate::matcher::lists_equal;
use crate::ordering::{Comparison, OrderingBasis, Specificity, SpecificityComparator, UseSite};
use crate::registry::{complete_with_defaults, Family, RegistrySnapshot};
use crate::types::{FamilyFlavor, Pattern, PatternId, PatternKind, Query, Substitution, Term};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// How the selected pattern was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPath {
    /// An explicit specialization matched
    Explicit,
    /// Only one pattern accepted the use-site
    SoleCandidate,
    /// Several patterns accepted it and this one is more specialized than the rest
    MostSpecialized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub pattern: PatternId,
    /// Bindings for the selected pattern's parameters, or for the specialized
    /// pattern's parameters when an explicit specialization was selected
    pub substitution: Substitution,
    pub path: SelectionPath,
    /// The primary or overload the selected pattern specializes
    pub specializes: Option<PatternId>,
}

/// Two candidates the comparator could not order, and why
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnorderedPair {
    pub a: PatternId,
    pub b: PatternId,
    pub basis: OrderingBasis,
}

/// An ordering that is part of a cycle: `more` was ranked above `less`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedPair {
    pub more: PatternId,
    pub less: PatternId,
    pub basis: OrderingBasis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ambiguity {
    /// Candidates no other candidate is more specialized than
    pub maximal: Vec<PatternId>,
    /// Every viable candidate
    pub considered: Vec<PatternId>,
    /// Unordered pairs among the maximal candidates
    pub unordered: Vec<UnorderedPair>,
    /// Contradicting orderings, set only when no candidate is maximal
    pub cycle: Vec<OrderedPair>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unmatched {
    /// Whether any pattern carries the queried name
    pub known_name: bool,
    pub considered: Vec<(PatternId, Rejection)>,
}

/// Outcome of resolving one use-site
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Selection),
    Ambiguous(Ambiguity),
    Unmatched(Unmatched),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Resolution::Ambiguous(_))
    }

    pub fn selected(&self) -> Option<PatternId> {
        match self {
            Resolution::Resolved(selection) => Some(selection.pattern),
            Resolution::Ambiguous(_) | Resolution::Unmatched(_) => None,
        }
    }

    /// The selection, or a diagnostic describing why there is none
    pub fn into_result(
        self,
        snapshot: &RegistrySnapshot,
        query: &Query,
    ) -> Result<Selection, ResolutionError> {
        let details = ResolutionReport::new(snapshot, query, &self).details();
        match self {
            Resolution::Resolved(selection) => Ok(selection),
            Resolution::Ambiguous(ambiguity) => Err(ResolutionError::Ambiguous {
                name: query.name.clone(),
                query: query.to_string(),
                count: ambiguity.maximal.len(),
                details,
            }),
            Resolution::Unmatched(_) => Err(ResolutionError::Unmatched {
                name: query.name.clone(),
                query: query.to_string(),
                details,
            }),
        }
    }
}

/// Resolves queries against one snapshot
///
/// Every query gets its own comparator, and with it its own synthetic token
/// counter, so a resolver can be shared between threads.
#[derive(Debug, Clone)]
pub struct Resolver {
    snapshot: RegistrySnapshot,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self::with_config(snapshot, ResolverConfig::default())
    }

    pub fn with_config(snapshot: RegistrySnapshot, config: ResolverConfig) -> Self {
        Self { snapshot, config }
    }

    pub fn snapshot(&self) -> &RegistrySnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// Compares two patterns of the same family outside any use-site
    pub fn compare(&self, a: PatternId, b: PatternId) -> Option<Comparison> {
        let pattern_a = self.snapshot.pattern(a)?;
        let pattern_b = self.snapshot.pattern(b)?;
        if pattern_a.name != pattern_b.name {
            return None;
        }
        let family = self.snapshot.family(&pattern_a.name)?;
        let mut comparator =
            SpecificityComparator::new(self.snapshot.model(), self.config, family.flavor);
        Some(comparator.compare(pattern_a, pattern_b))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(query = %query))]
    pub fn resolve(&self, query: &Query) -> Resolution {
        let Some(family) = self.snapshot.family(&query.name) else {
            tracing::debug!("unknown name");
            return Resolution::Unmatched(Unmatched {
                known_name: false,
                considered: Vec::new(),
            });
        };
        let model = self.snapshot.model();

        let arguments = match family.flavor {
            FamilyFlavor::Class => self.complete_class_arguments(family, &query.arguments),
            FamilyFlavor::Function => query.arguments.clone(),
        };

        if family.flavor == FamilyFlavor::Class && !query.primary_only {
            if let Some(selection) = self.explicit_for_arguments(family, &arguments) {
                tracing::debug!(pattern = %selection.pattern, "explicit specialization matched");
                return Resolution::Resolved(selection);
            }
        }

        let mut members: Vec<PatternId> = family.primaries.clone();
        if !query.primary_only {
            members.extend(&family.partials);
        }
        members.sort();

        let outcome = CandidateFilter::new(model, family.flavor).filter(
            &arguments,
            &query.explicit_arguments,
            members
                .iter()
                .filter_map(|&id| self.snapshot.pattern(id).map(|pattern| (id, pattern))),
        );
        tracing::debug!(
            viable = outcome.viable.len(),
            rejected = outcome.rejected.len(),
            "filtered candidates"
        );

        let mut viable = outcome.viable;
        let (winner, path) = match viable.len() {
            0 => {
                return Resolution::Unmatched(Unmatched {
                    known_name: true,
                    considered: outcome.rejected,
                })
            }
            1 => (viable.remove(0), SelectionPath::SoleCandidate),
            _ => match self.order(family.flavor, query.arguments.len(), &viable) {
                Ok(index) => (viable.remove(index), SelectionPath::MostSpecialized),
                Err(ambiguity) => {
                    tracing::debug!(maximal = ambiguity.maximal.len(), "ambiguous");
                    return Resolution::Ambiguous(ambiguity);
                }
            },
        };

        let Some(pattern) = self.snapshot.pattern(winner.pattern) else {
            return Resolution::Unmatched(Unmatched {
                known_name: true,
                considered: outcome.rejected,
            });
        };
        let mut substitution = winner.substitution;
        complete_with_defaults(model, pattern, &mut substitution);

        if family.flavor == FamilyFlavor::Function && !query.primary_only {
            let explicit = self.explicit_of(family, winner.pattern, pattern, &substitution);
            if let Some(explicit) = explicit {
                tracing::debug!(
                    pattern = %explicit,
                    overload = %winner.pattern,
                    "explicit specialization of the selected overload"
                );
                return Resolution::Resolved(Selection {
                    pattern: explicit,
                    substitution,
                    path: SelectionPath::Explicit,
                    specializes: Some(winner.pattern),
                });
            }
        }

        tracing::debug!(pattern = %winner.pattern, ?path, "resolved");
        Resolution::Resolved(Selection {
            pattern: winner.pattern,
            substitution,
            path,
            specializes: pattern.specializes(),
        })
    }

    /// Appends defaults for trailing parameters the query left out
    fn complete_class_arguments(&self, family: &Family, arguments: &[Term]) -> Vec<Term> {
        let model = self.snapshot.model();
        let Some(primary) = family
            .primaries
            .first()
            .and_then(|&id| self.snapshot.pattern(id))
        else {
            return arguments.to_vec();
        };
        if arguments.len() >= primary.parameters.len() {
            return arguments.to_vec();
        }
        let Some(mut seed) = seed_explicit_arguments(model, primary, arguments) else {
            return arguments.to_vec();
        };
        complete_with_defaults(model, primary, &mut seed);
        seed.flatten(primary.parameters.len())
            .unwrap_or_else(|| arguments.to_vec())
    }

    /// Class-like explicit specialization spelled exactly like the query
    fn explicit_for_arguments(&self, family: &Family, arguments: &[Term]) -> Option<Selection> {
        let model = self.snapshot.model();
        family.explicits.iter().find_map(|&id| {
            let explicit = self.snapshot.pattern(id)?;
            let PatternKind::Explicit { of, template_args } = &explicit.kind else {
                return None;
            };
            if !lists_equal(model, &explicit.argument_terms(), arguments) {
                return None;
            }
            let substitution = self
                .snapshot
                .pattern(*of)
                .and_then(|primary| seed_explicit_arguments(model, primary, template_args))
                .unwrap_or_default();
            Some(Selection {
                pattern: id,
                substitution,
                path: SelectionPath::Explicit,
                specializes: Some(*of),
            })
        })
    }

    /// Explicit specialization of `overload` whose template arguments equal the deduced ones
    fn explicit_of(
        &self,
        family: &Family,
        overload: PatternId,
        pattern: &Pattern,
        substitution: &Substitution,
    ) -> Option<PatternId> {
        let model = self.snapshot.model();
        let deduced = substitution.flatten(pattern.parameters.len())?;
        family.explicits.iter().copied().find(|&id| {
            self.snapshot.pattern(id).is_some_and(|explicit| {
                matches!(&explicit.kind, PatternKind::Explicit { of, template_args }
                    if *of == overload && lists_equal(model, template_args, &deduced))
            })
        })
    }

    /// Index of the unique most specialized candidate
    fn order(
        &self,
        flavor: FamilyFlavor,
        arity: usize,
        viable: &[Candidate],
    ) -> Result<usize, Ambiguity> {
        let model = self.snapshot.model();
        let mut comparator = SpecificityComparator::new(model, self.config, flavor);
        let patterns: Vec<&Pattern> = viable
            .iter()
            .filter_map(|candidate| self.snapshot.pattern(candidate.pattern))
            .collect();
        let considered: Vec<PatternId> = viable.iter().map(|candidate| candidate.pattern).collect();

        // edges run from the more specialized candidate to the less specialized one
        let mut graph = DiGraph::<PatternId, OrderingBasis>::new();
        let nodes: Vec<NodeIndex> = considered.iter().map(|&id| graph.add_node(id)).collect();
        let mut unordered = Vec::new();

        for i in 0..patterns.len() {
            for j in (i + 1)..patterns.len() {
                let site = UseSite {
                    arity,
                    a: &viable[i].substitution,
                    b: &viable[j].substitution,
                };
                let comparison = comparator.compare_at(patterns[i], patterns[j], Some(site));
                tracing::trace!(
                    a = %considered[i],
                    b = %considered[j],
                    specificity = ?comparison.specificity,
                    basis = ?comparison.basis,
                    "compared"
                );
                match comparison.specificity {
                    Specificity::AMoreSpecific => {
                        graph.add_edge(nodes[i], nodes[j], comparison.basis);
                    }
                    Specificity::BMoreSpecific => {
                        graph.add_edge(nodes[j], nodes[i], comparison.basis);
                    }
                    Specificity::Unordered => unordered.push(UnorderedPair {
                        a: considered[i],
                        b: considered[j],
                        basis: comparison.basis,
                    }),
                }
            }
        }

        rank(&graph, unordered)
    }
}

/// Picks the unique maximal node of a specificity graph, or explains why there is none
///
/// Node indices follow candidate order, so the returned index is a candidate index.
fn rank(
    graph: &DiGraph<PatternId, OrderingBasis>,
    unordered: Vec<UnorderedPair>,
) -> Result<usize, Ambiguity> {
    let considered: Vec<PatternId> = graph.node_weights().copied().collect();
    let maximal: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&node| {
            graph
                .neighbors_directed(node, Direction::Incoming)
                .next()
                .is_none()
        })
        .collect();

    if let [node] = maximal.as_slice() {
        return Ok(node.index());
    }

    // every candidate sits below another one only when the orderings form a cycle
    let (maximal, cycle) = if maximal.is_empty() {
        (considered.clone(), cyclic_orderings(graph))
    } else {
        (maximal.iter().map(|&node| graph[node]).collect(), Vec::new())
    };
    let unordered = unordered
        .into_iter()
        .filter(|pair| maximal.contains(&pair.a) && maximal.contains(&pair.b))
        .collect();
    Err(Ambiguity {
        maximal,
        considered,
        unordered,
        cycle,
    })
}

/// Edges that lie on a cycle, in insertion order
fn cyclic_orderings(graph: &DiGraph<PatternId, OrderingBasis>) -> Vec<OrderedPair> {
    let mut component = vec![0; graph.node_count()];
    for (index, members) in tarjan_scc(graph).iter().enumerate() {
        for node in members {
            component[node.index()] = index;
        }
    }
    graph
        .edge_references()
        .filter(|edge| component[edge.source().index()] == component[edge.target().index()])
        .map(|edge| OrderedPair {
            more: graph[edge.source()],
            less: graph[edge.target()],
            basis: *edge.weight(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn unknown_names_are_unmatched() {
        let resolver = Resolver::new(Registry::default().freeze());
        let resolution = resolver.resolve(&Query::new("missing", vec![Term::ty("int")]));
        assert_eq!(
            resolution,
            Resolution::Unmatched(Unmatched {
                known_name: false,
                considered: Vec::new(),
            })
        );
    }

    #[test]
    fn selected_is_only_set_when_resolved() {
        let resolution = Resolution::Ambiguous(Ambiguity {
            maximal: vec![PatternId(0), PatternId(1)],
            considered: vec![PatternId(0), PatternId(1)],
            unordered: Vec::new(),
            cycle: Vec::new(),
        });
        assert_eq!(resolution.selected(), None);
        assert!(resolution.is_ambiguous());
    }

    fn graph_of(
        count: u32,
        edges: &[(u32, u32, OrderingBasis)],
    ) -> DiGraph<PatternId, OrderingBasis> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..count).map(|id| graph.add_node(PatternId(id))).collect();
        for &(more, less, basis) in edges {
            graph.add_edge(nodes[more as usize], nodes[less as usize], basis);
        }
        graph
    }

    #[test]
    fn unique_maximal_node_wins() {
        let graph = graph_of(3, &[(1, 0, OrderingBasis::Deduction), (1, 2, OrderingBasis::Pack)]);
        assert_eq!(rank(&graph, Vec::new()), Ok(1));
    }

    #[test]
    fn cyclic_orderings_leave_every_candidate_ambiguous() {
        let graph = graph_of(
            4,
            &[
                (0, 1, OrderingBasis::Deduction),
                (1, 2, OrderingBasis::Pack),
                (2, 0, OrderingBasis::ConversionAvoidance),
                (0, 3, OrderingBasis::Deduction),
            ],
        );
        let ambiguity = rank(&graph, Vec::new()).expect_err("a cycle has no maximal node");
        let all: Vec<PatternId> = (0..4).map(PatternId).collect();
        assert_eq!(ambiguity.maximal, all);
        assert_eq!(ambiguity.considered, all);
        // the edge leaving the cycle is an ordinary ordering
        assert_eq!(
            ambiguity.cycle,
            vec![
                OrderedPair {
                    more: PatternId(0),
                    less: PatternId(1),
                    basis: OrderingBasis::Deduction,
                },
                OrderedPair {
                    more: PatternId(1),
                    less: PatternId(2),
                    basis: OrderingBasis::Pack,
                },
                OrderedPair {
                    more: PatternId(2),
                    less: PatternId(0),
                    basis: OrderingBasis::ConversionAvoidance,
                },
            ]
        );
    }

    #[test]
    fn several_maximal_nodes_report_no_cycle() {
        let unordered = vec![UnorderedPair {
            a: PatternId(0),
            b: PatternId(1),
            basis: OrderingBasis::Incomparable,
        }];
        let graph = graph_of(3, &[(0, 2, OrderingBasis::Deduction)]);
        let ambiguity = rank(&graph, unordered.clone()).expect_err("two maximal nodes");
        assert_eq!(ambiguity.maximal, vec![PatternId(0), PatternId(1)]);
        assert_eq!(ambiguity.unordered, unordered);
        assert!(ambiguity.cycle.is_empty());
    }
}
