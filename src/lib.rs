//! `hyperltlmso` library crate for synthesising invariant/well-founded-
//! relation advice pairs that prove HyperLTL(MSO) hyperproperties of
//! parameterised concurrent systems.
//!
//! The crate is organised around the eight components of the design notes:
//! a tape-stratified alphabet (C1), an NFA core (C2), a multi-tape automaton
//! algebra (C3), MSO atomic builders (C4), a Büchi-Normal-Form normaliser
//! (C5), a formula-to-automaton compiler (C6), a set of decision procedures
//! (C7), and a SAT-guided CEGAR enumerator (C8). [`driver`] wires these
//! together for the CLI; [`prove`] and [`prove_with`] are the two entry
//! points a caller wanting the library directly should use.

pub mod alphabet;
pub mod automaton;
pub mod compiler;
pub mod decision;
pub mod driver;
pub mod formula;
pub mod mso_atoms;
pub mod multitape;
pub mod options;
pub mod synth;

use std::fmt;

use log::{debug, info, warn};

use alphabet::{Tape, TapeLayout};
use compiler::CompileContext;
use decision::TraceQuantifierPrefix;
use driver::{compose, explicit_nfa, formula_text, DriverError};
use formula::{bnf, FormulaArena, LtlOp, NodeId, NodeKind};
use multitape::{Kind, MultiTapeAutomaton};
use options::{KBoundStrategy, RelationSearch, SynthesisOptions};
use synth::{SynthesisInput, SynthesisOutcome};

/// The outcome of a [`prove`]/[`prove_with`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A full advice pair (invariant and well-founded relation) was found
    /// and passed every decision procedure of §4.7.
    Proved,
    /// No advice pair was found up to the configured `k_max`.
    NoProof,
    /// Only a dry-run check (`RelationSearch::Never`): the payload is
    /// whether the supplied invariant passed initial inclusion and
    /// inductiveness. No relation was searched for or required.
    Checked(bool),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proved => write!(f, "PROVED"),
            Self::NoProof => write!(f, "NO PROOF"),
            Self::Checked(true) => write!(f, "CHECKED (passed)"),
            Self::Checked(false) => write!(f, "CHECKED (failed)"),
        }
    }
}

/// The invariant/relation pair witnessing a [`Status::Proved`] result.
#[derive(Debug, Clone)]
pub struct AdvicePair {
    invariant: MultiTapeAutomaton,
    relation: MultiTapeAutomaton,
}

impl AdvicePair {
    pub fn invariant(&self) -> &MultiTapeAutomaton {
        &self.invariant
    }

    pub fn relation(&self) -> &MultiTapeAutomaton {
        &self.relation
    }
}

/// The full result of a synthesis/check run.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    status: Status,
    advice: Option<AdvicePair>,
}

impl SynthesisResult {
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn advice(&self) -> Option<&AdvicePair> {
        self.advice.as_ref()
    }

    fn proved(invariant: MultiTapeAutomaton, relation: MultiTapeAutomaton) -> Self {
        Self { status: Status::Proved, advice: Some(AdvicePair { invariant, relation }) }
    }

    fn no_proof() -> Self {
        Self { status: Status::NoProof, advice: None }
    }

    fn checked(passed: bool) -> Self {
        Self { status: Status::Checked(passed), advice: None }
    }
}

/// Runs [`prove_with`] with default [`SynthesisOptions`] and no pre-supplied
/// advice pair.
pub fn prove(
    formula_text: &str,
    initial_config_text: &str,
    system_transducer_text: &str,
    symbol_mapping_text: &str,
) -> Result<SynthesisResult, DriverError> {
    prove_with(
        formula_text,
        initial_config_text,
        system_transducer_text,
        symbol_mapping_text,
        None,
        None,
        &SynthesisOptions::default(),
    )
}

/// Parses every input, builds `I_ext`/`R_ext`/`R_sys`/`Acc` (§4.6-§4.8), and
/// either runs the CEGAR search (C8) or, for `RelationSearch::Never`, only
/// checks a pre-supplied invariant against the first two decision procedures.
///
/// `invariant_text`/`relation_text` are explicit-NFA text (§6) for a
/// candidate advice pair: if both are given and `options.relation_search`
/// is `Always`, they are checked first (against every decision procedure)
/// before falling back to a full search, the "resume" shortcut of
/// [`KBoundStrategy::Resume`].
pub fn prove_with(
    formula_text: &str,
    initial_config_text: &str,
    system_transducer_text: &str,
    symbol_mapping_text: &str,
    invariant_text: Option<&str>,
    relation_text: Option<&str>,
    options: &SynthesisOptions,
) -> Result<SynthesisResult, DriverError> {
    let canonical_aps = explicit_nfa::parse_symbol_mapping(symbol_mapping_text);
    let formula = formula_text::parse(formula_text)?;

    let ctx = CompileContext {
        trace_names: formula.trace_quantifiers.iter().map(|q| q.name().to_string()).collect(),
        canonical_aps: canonical_aps.clone(),
    };
    info!(
        "parsed formula: {} trace quantifier(s), {} atomic proposition(s)",
        ctx.num_traces(),
        ctx.canonical_aps.len()
    );

    let bnf = bnf::normalize(&formula)?;
    debug!(
        "BNF normalisation: {} local constraint(s), {} eventuality constraint(s)",
        bnf.local_constraints.len(),
        bnf.eventuality_constraints.len()
    );

    let initial_layout = TapeLayout::new(vec![Tape::new("process", canonical_aps.clone())]);
    let initial_nfa = explicit_nfa::parse_acceptor(initial_config_text, canonical_aps.len())?;
    let initial_config = MultiTapeAutomaton::new(initial_nfa, initial_layout, canonical_aps.clone(), Kind::Acceptor);

    let raw_r_sys = explicit_nfa::parse_transducer(system_transducer_text, canonical_aps.len())?;
    let r_sys = compose::build_r_sys(&ctx, &raw_r_sys);

    let i_ext = compose::build_i_ext(&ctx, &bnf, &initial_config)?;
    let r_ext = compose::build_r_ext(&ctx, &bnf, &r_sys)?;
    let has_f_operator = contains_f_operator(&formula.arena, formula.body);
    if !has_f_operator {
        debug!("formula has no F operator: irreflexivity and transitivity are vacuous (§4.8)");
    }
    let acc = compose::build_acc(&ctx, &bnf, &r_ext, has_f_operator)?;

    let prefix = TraceQuantifierPrefix {
        universal: formula.trace_quantifiers.iter().map(|q| q.is_universal()).collect(),
        trace_names: compose::generic_trace_tape_names(ctx.num_traces()),
    };

    if options.relation_search == RelationSearch::Never {
        let invariant_text = invariant_text.ok_or(DriverError::MissingInvariant)?;
        let invariant = parse_candidate(&i_ext, invariant_text, Kind::Acceptor)?;
        let (initial_ok, _) = decision::initial_inclusion(&i_ext, &invariant);
        let (inductive_ok, _) = decision::inductiveness(&invariant, &r_ext);
        info!("dry run: initial_inclusion={}, inductiveness={}", initial_ok, inductive_ok);
        return Ok(SynthesisResult::checked(initial_ok && inductive_ok));
    }

    if let (Some(inv_text), Some(rel_text)) = (invariant_text, relation_text) {
        let invariant = parse_candidate(&i_ext, inv_text, Kind::Acceptor)?;
        let relation = parse_candidate(&r_ext, rel_text, Kind::Transducer)?;
        if check_advice_pair(&invariant, &relation, &i_ext, &r_ext, &r_sys, &acc, &prefix, has_f_operator) {
            info!("supplied advice pair already passes every decision procedure");
            return Ok(SynthesisResult::proved(invariant, relation));
        }
        if options.k_bound_strategy == KBoundStrategy::Resume {
            warn!("supplied advice pair failed verification, falling back to a full search");
        }
    }

    let input = SynthesisInput {
        i_ext: &i_ext,
        r_ext: &r_ext,
        r_sys: &r_sys,
        acc: &acc,
        prefix: &prefix,
        has_f_operator,
    };
    match synth::synthesize(&input, options.k_max) {
        SynthesisOutcome::Found { invariant, relation } => Ok(SynthesisResult::proved(invariant, relation)),
        SynthesisOutcome::NoProof { k_max } => {
            warn!("no proof found up to k_aut = {}", k_max);
            Ok(SynthesisResult::no_proof())
        }
    }
}

/// Parses a pre-supplied candidate (explicit-NFA acceptor text, §6) over
/// `reference`'s full flat alphabet, tagging it with `reference`'s layout
/// and atomic propositions but the caller-chosen [`Kind`]. Candidates are
/// always flat-alphabet NFAs regardless of kind ([`synth::candidate::CandidateStore`]
/// encodes `T` the same way), so the acceptor reader suffices for both.
fn parse_candidate(reference: &MultiTapeAutomaton, text: &str, kind: Kind) -> Result<MultiTapeAutomaton, DriverError> {
    let width = reference.layout().width();
    let nfa = explicit_nfa::parse_acceptor(text, width)?;
    Ok(MultiTapeAutomaton::new(nfa, reference.layout().clone(), reference.atomic_propositions().to_vec(), kind))
}

/// Runs every decision procedure of §4.7 against a fixed, already-built
/// advice pair, short-circuiting on the first failure.
#[allow(clippy::too_many_arguments)]
fn check_advice_pair(
    invariant: &MultiTapeAutomaton,
    relation: &MultiTapeAutomaton,
    i_ext: &MultiTapeAutomaton,
    r_ext: &MultiTapeAutomaton,
    r_sys: &MultiTapeAutomaton,
    acc: &MultiTapeAutomaton,
    prefix: &TraceQuantifierPrefix,
    has_f_operator: bool,
) -> bool {
    let (initial_ok, _) = decision::initial_inclusion(i_ext, invariant);
    if !initial_ok {
        return false;
    }
    let (inductive_ok, _) = decision::inductiveness(invariant, r_ext);
    if !inductive_ok {
        return false;
    }
    if has_f_operator {
        let (irreflexive_ok, _) = decision::irreflexivity(relation);
        if !irreflexive_ok {
            return false;
        }
        let (transitive_ok, _) = decision::transitivity(invariant, relation);
        if !transitive_ok {
            return false;
        }
    }
    let (backward_ok, _) = decision::backward_reachability(invariant, i_ext, r_ext, relation);
    if !backward_ok {
        return false;
    }
    let (trace_ok, _) = decision::trace_quantifier_condition(invariant, r_ext, r_sys, acc, relation, prefix);
    trace_ok
}

/// Scans the original (pre-BNF) formula tree for any `F` operator, the
/// condition §4.8's optimisation note keys irreflexivity/transitivity on.
fn contains_f_operator(arena: &FormulaArena, node: NodeId) -> bool {
    match arena.node(node).kind() {
        NodeKind::Ltl(LtlOp::F) => true,
        _ => arena.node(node).children().iter().any(|&c| contains_f_operator(arena, c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYMBOL_MAPPING: &str = "a\n";

    const INITIAL_CONFIG: &str = "\
@NFA-explicit
%States-enum s0
%Initial s0
%Final s0
s0 0 s0
s0 1 s0
";

    const SYSTEM_TRANSDUCER: &str = "\
@NFA-explicit
%States-enum s0
%Initial s0
%Final s0
s0 0|0 s0
s0 0|1 s0
s0 1|0 s0
s0 1|1 s0
";

    #[test]
    fn proves_an_always_true_formula_over_a_single_trace() {
        let formula = "trace forall t; forall i . (ap(a, t, i) | !ap(a, t, i))";
        let result = prove(formula, INITIAL_CONFIG, SYSTEM_TRANSDUCER, SYMBOL_MAPPING).unwrap();
        assert_eq!(result.status(), Status::Proved);
        assert!(result.advice().is_some());
    }

    #[test]
    fn dry_run_without_an_invariant_is_an_error() {
        let formula = "trace forall t; forall i . ap(a, t, i)";
        let mut options = SynthesisOptions::default();
        options.relation_search = RelationSearch::Never;
        let err = prove_with(formula, INITIAL_CONFIG, SYSTEM_TRANSDUCER, SYMBOL_MAPPING, None, None, &options).unwrap_err();
        assert_eq!(err, DriverError::MissingInvariant);
    }

    #[test]
    fn status_display_matches_each_variant() {
        assert_eq!(Status::Proved.to_string(), "PROVED");
        assert_eq!(Status::NoProof.to_string(), "NO PROOF");
        assert_eq!(Status::Checked(true).to_string(), "CHECKED (passed)");
        assert_eq!(Status::Checked(false).to_string(), "CHECKED (failed)");
    }
}
