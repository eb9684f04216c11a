//! MSO atomic builders (component C4): the base multi-tape automata for the
//! primitive formulae out of which the formula compiler (C6) builds
//! everything else -- `i ∈ I`, `I ⊆ J`, `j = succ(i)`, a parameterised
//! atomic proposition `p_t[i]`, and configuration-variable leaves
//! `x_k`/`x_k[i]` (current and next-step variants).
//!
//! Every builder here produces a [`MultiTapeAutomaton`] whose trace tapes
//! each carry the full canonical atomic-proposition list (the trace tapes
//! are "don't care" for these atoms -- every value is allowed on every
//! step) and whose last tape carries only the handful of variables the atom
//! actually constrains, matching §4.4.

use crate::alphabet::{bits_of, Tape, TapeLayout};
use crate::automaton::Nfa;
use crate::multitape::{Kind, MultiTapeAutomaton};

fn trace_layout(num_traces: usize, canonical_aps: &[String], last_tape_vars: Vec<String>) -> TapeLayout {
    let mut tapes: Vec<Tape> = (0..num_traces)
        .map(|t| Tape::new(format!("trace{}", t), canonical_aps.to_vec()))
        .collect();
    tapes.push(Tape::new("cfg", last_tape_vars));
    TapeLayout::new(tapes)
}

/// Absolute bit position of `var` on `tape_index`.
fn bit_pos(layout: &TapeLayout, tape_index: usize, var: &str) -> usize {
    layout.tape_offset(tape_index)
        + layout
            .tape(tape_index)
            .position(var)
            .unwrap_or_else(|| panic!("variable '{}' not present on tape {}", var, tape_index))
}

fn wrap(nfa: Nfa, layout: TapeLayout, canonical_aps: &[String]) -> MultiTapeAutomaton {
    MultiTapeAutomaton::new(nfa, layout, canonical_aps.to_vec(), Kind::Acceptor)
}

/// Two-state "occurs exactly once, and the companion bit is set there"
/// shape shared by `i ∈ I` and the parameterised configuration-variable
/// atom `x_k[i]` (§4.4): state 0 until `elem` is seen set, then state 1;
/// `elem` must never be set again, and `companion` must equal `elem` at the
/// moment it fires.
fn membership_nfa(layout: &TapeLayout, elem: usize, companion: usize) -> Nfa {
    let width = layout.width();
    let mut nfa = Nfa::new(2, 1 << width);
    nfa.set_initial(0);
    nfa.set_final(1);
    for symbol in 0..(1usize << width) {
        let bits = bits_of(symbol, width);
        match (bits[elem], bits[companion]) {
            (false, _) => {
                nfa.add_transition(0, symbol, 0);
                nfa.add_transition(1, symbol, 1);
            }
            (true, true) => nfa.add_transition(0, symbol, 1),
            (true, false) => {
                // elem fires without companion at state 0: reject.
                // elem fires again at state 1: reject.
            }
        }
    }
    nfa
}

/// Builds the automaton for `i ∈ I` on a fresh last tape `[i_name, set_name]`.
pub fn member_of(num_traces: usize, canonical_aps: &[String], i_name: &str, set_name: &str) -> MultiTapeAutomaton {
    let layout = trace_layout(num_traces, canonical_aps, vec![i_name.to_string(), set_name.to_string()]);
    let elem = bit_pos(&layout, layout.num_tapes() - 1, i_name);
    let companion = bit_pos(&layout, layout.num_tapes() - 1, set_name);
    wrap(membership_nfa(&layout, elem, companion), layout, canonical_aps)
}

/// Builds the automaton for `I ⊆ J`: one accepting state, reject whenever
/// `I` is set but `J` is not.
pub fn subseteq(num_traces: usize, canonical_aps: &[String], i_set: &str, j_set: &str) -> MultiTapeAutomaton {
    let layout = trace_layout(num_traces, canonical_aps, vec![i_set.to_string(), j_set.to_string()]);
    let a = bit_pos(&layout, layout.num_tapes() - 1, i_set);
    let b = bit_pos(&layout, layout.num_tapes() - 1, j_set);
    let width = layout.width();
    let mut nfa = Nfa::new(1, 1 << width);
    nfa.set_initial(0);
    nfa.set_final(0);
    for symbol in 0..(1usize << width) {
        let bits = bits_of(symbol, width);
        if !(bits[a] && !bits[b]) {
            nfa.add_transition(0, symbol, 0);
        }
    }
    wrap(nfa, layout, canonical_aps)
}

/// Builds the automaton for `j = succ(i)`: three states, `i` must fire at
/// some position `k`, `j` must fire at exactly `k+1`, and neither fires
/// again afterwards (§4.4, supplemented per `original_source/src/mso.py`:
/// state 2 self-loops only on the all-zero symbol).
pub fn succ(num_traces: usize, canonical_aps: &[String], i_name: &str, j_name: &str) -> MultiTapeAutomaton {
    let layout = trace_layout(num_traces, canonical_aps, vec![i_name.to_string(), j_name.to_string()]);
    let bi = bit_pos(&layout, layout.num_tapes() - 1, i_name);
    let bj = bit_pos(&layout, layout.num_tapes() - 1, j_name);
    let width = layout.width();
    let mut nfa = Nfa::new(3, 1 << width);
    nfa.set_initial(0);
    nfa.set_final(2);
    for symbol in 0..(1usize << width) {
        let bits = bits_of(symbol, width);
        let (i, j) = (bits[bi], bits[bj]);
        match (i, j) {
            (false, false) => {
                nfa.add_transition(0, symbol, 0);
                nfa.add_transition(2, symbol, 2);
            }
            (true, false) => nfa.add_transition(0, symbol, 1),
            (false, true) => nfa.add_transition(1, symbol, 2),
            (true, true) => {}
        }
    }
    wrap(nfa, layout, canonical_aps)
}

/// Builds the automaton for the parameterised atomic proposition `p_t[i]`:
/// position `p` on trace tape `t` must equal 1 exactly when the last-tape
/// bit `i` equals 1 -- the same two-state shape as [`member_of`], with the
/// "set" role played by the proposition bit on a trace tape instead of a
/// second last-tape variable.
pub fn atomic_proposition(
    num_traces: usize,
    canonical_aps: &[String],
    prop: &str,
    trace_index: usize,
    i_name: &str,
) -> MultiTapeAutomaton {
    let layout = trace_layout(num_traces, canonical_aps, vec![i_name.to_string()]);
    let elem = bit_pos(&layout, layout.num_tapes() - 1, i_name);
    let companion = bit_pos(&layout, trace_index, prop);
    wrap(membership_nfa(&layout, elem, companion), layout, canonical_aps)
}

/// Builds the automaton for a configuration-variable leaf. If `index_var`
/// is `Some`, this is the parameterised form `x_k[i]` (same shape as
/// [`member_of`], with the configuration bit playing the "set" role);
/// otherwise it is the unparameterised form, requiring the configuration
/// bit to be set at every step.
///
/// Always built on the single configuration tape of an acceptor shape; the
/// `X` (next-step) variant of §4.4 is obtained by applying
/// [`MultiTapeAutomaton::next_step_shell`] to the result, not by a parameter
/// here.
pub fn config_var(
    num_traces: usize,
    canonical_aps: &[String],
    name: &str,
    index_var: Option<&str>,
) -> MultiTapeAutomaton {
    match index_var {
        Some(i_name) => {
            let layout = trace_layout(num_traces, canonical_aps, vec![i_name.to_string(), name.to_string()]);
            let elem = bit_pos(&layout, layout.num_tapes() - 1, i_name);
            let companion = bit_pos(&layout, layout.num_tapes() - 1, name);
            wrap(membership_nfa(&layout, elem, companion), layout, canonical_aps)
        }
        None => {
            let layout = trace_layout(num_traces, canonical_aps, vec![name.to_string()]);
            let bit = bit_pos(&layout, layout.num_tapes() - 1, name);
            let width = layout.width();
            let mut nfa = Nfa::new(1, 1 << width);
            nfa.set_initial(0);
            nfa.set_final(0);
            for symbol in 0..(1usize << width) {
                let bits = bits_of(symbol, width);
                if bits[bit] {
                    nfa.add_transition(0, symbol, 0);
                }
            }
            wrap(nfa, layout, canonical_aps)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aps() -> Vec<String> {
        vec!["a".to_string()]
    }

    #[test]
    fn member_of_accepts_exactly_one_coincidence() {
        let a = member_of(1, &aps(), "i", "set");
        // trace tape has 1 bit (a), last tape has 2 bits (i, set): width 3.
        // symbol bits order: [a, i, set].
        let sym = |a: bool, i: bool, set: bool| -> usize {
            crate::alphabet::id_of(&[a, i, set])
        };
        assert!(a.nfa().accepts(&[sym(false, false, false), sym(false, true, true), sym(false, false, false)]));
        assert!(!a.nfa().accepts(&[sym(false, true, false)]));
        assert!(!a.nfa().accepts(&[sym(false, true, true), sym(false, true, true)]));
        assert!(!a.nfa().accepts(&[]));
    }

    #[test]
    fn subseteq_rejects_i_without_j() {
        let s = subseteq(1, &aps(), "set_i", "set_j");
        let sym = |a: bool, i: bool, j: bool| -> usize { crate::alphabet::id_of(&[a, i, j]) };
        assert!(s.nfa().accepts(&[sym(false, false, false), sym(false, true, true)]));
        assert!(!s.nfa().accepts(&[sym(false, true, false)]));
    }

    #[test]
    fn succ_requires_adjacency() {
        let s = succ(1, &aps(), "i", "j");
        let sym = |a: bool, i: bool, j: bool| -> usize { crate::alphabet::id_of(&[a, i, j]) };
        assert!(s.nfa().accepts(&[sym(false, true, false), sym(false, false, true)]));
        assert!(!s.nfa().accepts(&[sym(false, true, false), sym(false, false, false), sym(false, false, true)]));
    }

    #[test]
    fn config_var_parameterless_requires_constant_true() {
        let x = config_var(1, &aps(), "cfg0", None);
        let sym = |a: bool, x: bool| -> usize { crate::alphabet::id_of(&[a, x]) };
        assert!(x.nfa().accepts(&[sym(false, true), sym(true, true)]));
        assert!(!x.nfa().accepts(&[sym(false, true), sym(true, false)]));
    }
}
