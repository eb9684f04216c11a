//! Assembles the four fixed automata the synthesiser (C8) checks every
//! candidate against, per §4.6's "Structure note" and §4.7's definitions:
//! `I_ext` the restricted initial automaton, `R_ext` the restricted
//! transducer, `R_sys` the (per-trace-lifted) system transducer, and `Acc`
//! the eventuality transducer. `R_sys` and the loaded initial-configuration
//! acceptor come from outside the core (via [`super::explicit_nfa`]);
//! everything else is produced by the formula compiler (C6, [`crate::compiler`]).

use crate::alphabet::{bits_of, id_of, Tape, TapeLayout};
use crate::automaton::Nfa;
use crate::compiler::{self, CompileContext};
use crate::decision;
use crate::formula::bnf::BnfFormula;
use crate::formula::{FormulaArena, FormulaError, NodeId};
use crate::multitape::{Kind, MultiTapeAutomaton};

/// The generic, positional tape names ("trace0", "trace1", ...) every C4/C6
/// builder uses for trace tapes ([`crate::mso_atoms::trace_layout`]) --
/// distinct from [`CompileContext::trace_names`], which holds the
/// formula's own trace *variable* names purely to resolve them to an index.
/// Anything built outside the compiler (the lifted initial-configuration
/// acceptor, the lifted system transducer) must use this same generic
/// naming to end up on an identical [`crate::alphabet::TapeLayout`].
pub(crate) fn generic_trace_tape_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("trace{}", i)).collect()
}

/// Intersects the automata compiled from every node in `nodes`, in order,
/// aligning configuration tapes and disciplining after each step -- the
/// same pattern [`compiler::compile`]'s own `BoolOp::And` case uses, lifted
/// to an arbitrary-length list of top-level constraint formulas. `None` on
/// an empty list, so callers can supply the right default: no local
/// constraints means no restriction at all, and no eventuality constraints
/// despite an `F` operator falls back to `R_ext` itself (§4.8).
fn compile_intersection<'a>(
    ctx: &CompileContext,
    arena: &FormulaArena,
    nodes: impl Iterator<Item = &'a NodeId>,
) -> Result<Option<MultiTapeAutomaton>, FormulaError> {
    let mut acc: Option<MultiTapeAutomaton> = None;
    for &node in nodes {
        let compiled = compiler::compile(ctx, arena, node)?;
        acc = Some(match acc {
            None => compiled,
            Some(prev) => {
                let (prev, compiled) = MultiTapeAutomaton::align_config_tapes(&prev, &compiled);
                compiler::discipline(&prev.intersect(&compiled))
            }
        });
    }
    Ok(acc)
}

/// Builds `I_ext`: the loaded initial-configuration acceptor (one tape,
/// over the canonical atomic propositions) lifted onto every trace tape via
/// [`MultiTapeAutomaton::multi_tape_lift`], intersected with the compiled
/// MSO-initial formula.
pub fn build_i_ext(
    ctx: &CompileContext,
    bnf: &BnfFormula,
    initial_config: &MultiTapeAutomaton,
) -> Result<MultiTapeAutomaton, FormulaError> {
    let lifted = initial_config.multi_tape_lift(&generic_trace_tape_names(ctx.num_traces()));
    let mso = compiler::compile(ctx, &bnf.arena, bnf.mso_initial)?;
    let (lifted, mso) = MultiTapeAutomaton::align_config_tapes(&lifted, &mso);
    Ok(compiler::discipline(&lifted.intersect(&mso)))
}

/// Wraps the raw system transducer, parsed from its explicit-NFA file as a
/// plain two-tape (current/next) relation over the canonical atomic
/// propositions, into the `[trace, current, next]` three-tape shape
/// [`decision::cylindrify_single_trace_transducer`] requires.
///
/// The system transducer file only ever records one process's own
/// current/next step, with no separate notion of "which trace". The new
/// leading trace tape's bits are therefore mechanically duplicated from the
/// current tape's bits at construction time -- a simplifying assumption for
/// the general case, justified by the end-to-end scenarios of §8, where the
/// atomic proposition value literally *is* the system's own state.
pub fn build_r_sys(ctx: &CompileContext, raw: &Nfa) -> MultiTapeAutomaton {
    let ap_width = ctx.canonical_aps.len();
    let old_width = ap_width * 2;

    let trace_tape = Tape::new("trace", ctx.canonical_aps.clone());
    let current_tape = Tape::new("current", ctx.canonical_aps.clone());
    let next_vars: Vec<String> = ctx.canonical_aps.iter().map(|v| format!("{}'", v)).collect();
    let next_tape = Tape::new("next", next_vars);
    let layout = TapeLayout::new(vec![trace_tape, current_tape, next_tape]);
    let new_width = layout.width();

    let mut nfa = Nfa::new(raw.num_states(), 1 << new_width);
    for &s in raw.initial_states() {
        nfa.set_initial(s);
    }
    for &s in raw.final_states() {
        nfa.set_final(s);
    }
    for from in 0..raw.num_states() {
        for symbol in 0..raw.alphabet_size() {
            let successors = raw.successors(from, symbol);
            if successors.is_empty() {
                continue;
            }
            let bits = bits_of(symbol, old_width);
            let current_bits = &bits[0..ap_width];
            let mut new_bits = current_bits.to_vec();
            new_bits.extend_from_slice(&bits);
            let new_symbol = id_of(&new_bits);
            for &to in successors {
                nfa.add_transition(from, new_symbol, to);
            }
        }
    }
    MultiTapeAutomaton::new(nfa, layout, ctx.canonical_aps.clone(), Kind::Transducer)
}

/// Builds `R_ext`: the per-trace lift of `r_sys` (one
/// [`decision::cylindrify_single_trace_transducer`] call per trace index,
/// intersected, mirroring [`decision::trace_quantifier_condition`]'s own
/// `L_∀` construction), further restricted by the intersection of every
/// local constraint's compiled automaton, if any.
pub fn build_r_ext(
    ctx: &CompileContext,
    bnf: &BnfFormula,
    r_sys: &MultiTapeAutomaton,
) -> Result<MultiTapeAutomaton, FormulaError> {
    let generic_names = generic_trace_tape_names(ctx.num_traces());
    let mut lifted: Option<MultiTapeAutomaton> = None;
    for index in 0..ctx.num_traces() {
        let cyl = decision::cylindrify_single_trace_transducer(r_sys, &generic_names, index);
        lifted = Some(match lifted {
            None => cyl,
            Some(prev) => {
                let (prev, cyl) = MultiTapeAutomaton::align_config_tapes(&prev, &cyl);
                prev.intersect(&cyl)
            }
        });
    }
    let lifted = compiler::discipline(&lifted.expect("at least one trace must be quantified"));

    let local_nodes = bnf.local_constraints.iter().map(|c| &c.formula);
    match compile_intersection(ctx, &bnf.arena, local_nodes)? {
        None => Ok(lifted),
        Some(constraints) => {
            let (lifted, constraints) = MultiTapeAutomaton::align_config_tapes(&lifted, &constraints);
            Ok(compiler::discipline(&lifted.intersect(&constraints)))
        }
    }
}

/// Builds `Acc`: the intersection of every eventuality constraint's
/// compiled automaton when the original formula contains an `F` operator;
/// otherwise `Acc` is `R_ext` itself, per the §4.8 optimisation note ("if
/// the formula contains no F operator, Acc equals the full R_ext").
pub fn build_acc(
    ctx: &CompileContext,
    bnf: &BnfFormula,
    r_ext: &MultiTapeAutomaton,
    has_f_operator: bool,
) -> Result<MultiTapeAutomaton, FormulaError> {
    if !has_f_operator {
        return Ok(r_ext.clone());
    }
    let ev_nodes = bnf.eventuality_constraints.iter().map(|c| &c.formula);
    match compile_intersection(ctx, &bnf.arena, ev_nodes)? {
        Some(acc) => Ok(acc),
        None => Ok(r_ext.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::id_of as alphabet_id_of;
    use crate::formula::{AtomicForm, TraceQuantifier};

    fn ctx() -> CompileContext {
        CompileContext {
            trace_names: vec!["t".to_string()],
            canonical_aps: vec!["a".to_string()],
        }
    }

    fn always_true_initial_config() -> MultiTapeAutomaton {
        let layout = TapeLayout::new(vec![Tape::new("process", vec!["a".to_string()])]);
        let mut nfa = Nfa::new(1, 2);
        nfa.set_initial(0);
        nfa.set_final(0);
        nfa.add_transition(0, 0, 0);
        nfa.add_transition(0, 1, 0);
        MultiTapeAutomaton::new(nfa, layout, vec!["a".to_string()], Kind::Acceptor)
    }

    #[test]
    fn build_i_ext_lifts_and_restricts_the_initial_acceptor() {
        let mut arena = FormulaArena::new();
        let body = arena.atomic(AtomicForm::AtomicProposition {
            prop: "a".to_string(),
            trace: "t".to_string(),
            i: "i".to_string(),
        });
        let bnf = BnfFormula {
            arena,
            mso_initial: body,
            local_constraints: Vec::new(),
            eventuality_constraints: Vec::new(),
        };
        let _ = TraceQuantifier::Forall("t".to_string());
        let i_ext = build_i_ext(&ctx(), &bnf, &always_true_initial_config()).unwrap();
        assert!(!i_ext.nfa().is_empty());
    }

    #[test]
    fn build_r_sys_duplicates_current_bits_onto_the_trace_tape() {
        let mut raw = Nfa::new(1, 4);
        raw.set_initial(0);
        raw.set_final(0);
        raw.add_transition(0, 0b01, 0);
        let r_sys = build_r_sys(&ctx(), &raw);
        assert_eq!(r_sys.num_tapes(), 3);
        // trace bit must equal the current bit (0), next bit is 1.
        assert!(r_sys.nfa().accepts(&[alphabet_id_of(&[false, false, true])]));
        assert!(!r_sys.nfa().accepts(&[alphabet_id_of(&[true, false, true])]));
    }

    #[test]
    fn build_acc_falls_back_to_r_ext_without_an_f_operator() {
        let arena = FormulaArena::new();
        let bnf = BnfFormula {
            arena,
            mso_initial: 0,
            local_constraints: Vec::new(),
            eventuality_constraints: Vec::new(),
        };
        let r_ext = always_true_initial_config().cylindrify_to_transducer();
        let acc = build_acc(&ctx(), &bnf, &r_ext, false).unwrap();
        assert_eq!(acc.nfa(), r_ext.nfa());
    }
}
