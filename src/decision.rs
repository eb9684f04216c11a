//! The decision procedures (component C7): the six checks a candidate
//! invariant/relation pair (A, T) must pass for the synthesiser (C8) to
//! accept them, per §4.7. Each procedure is a short pipeline of C3 algebra
//! operations terminating in a [`crate::automaton::Nfa::included_in`] or
//! emptiness test, returning the pass/fail bit together with a
//! counterexample word whenever one exists -- the same `(bool, Option<Word>)`
//! shape `Nfa::included_in` already returns, so every procedure here reuses
//! it verbatim rather than inventing its own result type.

use crate::alphabet::{bits_of, id_of, Tape, TapeLayout};
use crate::automaton::Nfa;
use crate::multitape::{Kind, MultiTapeAutomaton};

pub type Word = Vec<usize>;

/// The trace-quantifier prefix (§3.3) in tape order: `universal[k]` is
/// `true` iff the k-th trace tape is bound by a `∀`, and `trace_names[k]`
/// names it (needed to build the per-tape cylindrified system transducer of
/// §4.7.6).
#[derive(Debug, Clone)]
pub struct TraceQuantifierPrefix {
    pub universal: Vec<bool>,
    pub trace_names: Vec<String>,
}

impl TraceQuantifierPrefix {
    pub fn num_traces(&self) -> usize {
        self.trace_names.len()
    }
}

/// §4.7.1: project the configuration tape off both operands and test
/// language inclusion. The counterexample, if any, lives over the projected
/// (trace-tapes-only) alphabet.
pub fn initial_inclusion(i_ext: &MultiTapeAutomaton, a: &MultiTapeAutomaton) -> (bool, Option<Word>) {
    let pi_i = i_ext.drop_tape(i_ext.num_tapes() - 1);
    let pi_a = a.drop_tape(a.num_tapes() - 1);
    pi_i.nfa().included_in(pi_a.nfa())
}

/// §4.7.2: A's current-tape cylindrification, intersected with the
/// restricted transducer, must be included in A's next-tape
/// cylindrification.
pub fn inductiveness(a: &MultiTapeAutomaton, r_ext: &MultiTapeAutomaton) -> (bool, Option<Word>) {
    let a_current = a.cylindrify_to_transducer();
    let (a_current, r_ext_aligned) = MultiTapeAutomaton::align_config_tapes(&a_current, r_ext);
    let lhs = a_current.intersect(&r_ext_aligned);

    let a_next = a.next_step_shell();
    let (lhs, a_next) = MultiTapeAutomaton::align_config_tapes(&lhs, &a_next);
    lhs.nfa().included_in(a_next.nfa())
}

/// Builds the single-state "current half equals next half" filter of
/// §4.7.3: a transition fires on `symbol` iff every current-tape variable
/// agrees with its primed next-tape counterpart. Variables present on only
/// one side (shouldn't occur for a well-formed transducer, but handled
/// gracefully) are simply unconstrained.
fn identity_filter(layout: &TapeLayout, atomic_propositions: &[String]) -> MultiTapeAutomaton {
    let n = layout.num_tapes();
    let current = layout.tape(n - 2);
    let next = layout.tape(n - 1);
    let current_offset = layout.tape_offset(n - 2);
    let next_offset = layout.tape_offset(n - 1);
    let mut pairs = Vec::new();
    for (i, v) in current.vars().iter().enumerate() {
        if let Some(j) = next.position(&format!("{}'", v)) {
            pairs.push((current_offset + i, next_offset + j));
        }
    }
    let width = layout.width();
    let mut nfa = Nfa::new(1, 1 << width);
    nfa.set_initial(0);
    nfa.set_final(0);
    for symbol in 0..(1usize << width) {
        let bits = bits_of(symbol, width);
        if pairs.iter().all(|&(a, b)| bits[a] == bits[b]) {
            nfa.add_transition(0, symbol, 0);
        }
    }
    MultiTapeAutomaton::new(nfa, layout.clone(), atomic_propositions.to_vec(), Kind::Transducer)
}

/// §4.7.3: `T` is irreflexive iff its intersection with the identity
/// transducer over the same layout is empty.
pub fn irreflexivity(t: &MultiTapeAutomaton) -> (bool, Option<Word>) {
    let filter = identity_filter(t.layout(), t.atomic_propositions());
    let product = t.intersect(&filter);
    match product.nfa().shortest_accepted_word() {
        Some(word) => (false, Some(word)),
        None => (true, None),
    }
}

/// `π_next(T ∩ cyl_current(x))`: the set of configurations one `T`-step
/// away from `x`, expressed as a plain acceptor again (current tape
/// eliminated, next tape's primed names restored).
fn post(x: &MultiTapeAutomaton, t: &MultiTapeAutomaton) -> MultiTapeAutomaton {
    let x_current = x.cylindrify_to_transducer();
    let (x_current, t_aligned) = MultiTapeAutomaton::align_config_tapes(&x_current, t);
    let stepped = t_aligned.intersect(&x_current);
    let n = stepped.num_tapes();
    stepped.eliminate_tape(n - 2).unprime_tape(n - 2).minimize()
}

/// §4.7.4: `post_A = π_next(T ∩ cyl_current(A))`, `post² = post_A` stepped
/// through `T` once more; transitivity holds iff `post² ⊆ post_A`.
pub fn transitivity(a: &MultiTapeAutomaton, t: &MultiTapeAutomaton) -> (bool, Option<Word>) {
    let post_a = post(a, t);
    let post2 = post(&post_a, t);
    let (post2, post_a) = MultiTapeAutomaton::align_config_tapes(&post2, &post_a);
    post2.nfa().included_in(post_a.nfa())
}

/// §4.7.5: `A ⊆ π_current(cyl_both(A) ∩ (cyl_next(I_ext) ∪ (R_ext ∩ T)))`.
pub fn backward_reachability(
    a: &MultiTapeAutomaton,
    i_ext: &MultiTapeAutomaton,
    r_ext: &MultiTapeAutomaton,
    t: &MultiTapeAutomaton,
) -> (bool, Option<Word>) {
    let a_current = a.cylindrify_to_transducer();
    let a_next = a.next_step_shell();
    let (a_current, a_next) = MultiTapeAutomaton::align_config_tapes(&a_current, &a_next);
    let a_both = a_current.intersect(&a_next);

    let i_cyl_next = i_ext.next_step_shell();
    let (r_ext_aligned, t_aligned) = MultiTapeAutomaton::align_config_tapes(r_ext, t);
    let r_and_t = r_ext_aligned.intersect(&t_aligned);
    let (i_cyl_next, r_and_t) = MultiTapeAutomaton::align_config_tapes(&i_cyl_next, &r_and_t);
    let rhs = i_cyl_next.union(&r_and_t);

    let (a_both, rhs) = MultiTapeAutomaton::align_config_tapes(&a_both, &rhs);
    let product = a_both.intersect(&rhs);
    let n = product.num_tapes();
    let projected = product.eliminate_tape(n - 2).unprime_tape(n - 2).minimize();

    let (a, projected) = MultiTapeAutomaton::align_config_tapes(a, &projected);
    a.nfa().included_in(projected.nfa())
}

/// Embeds a single-trace-tape transducer (`r_sys`, laid out as one trace
/// tape followed by current/next configuration tapes) into the full
/// `n`-trace-tape layout, pinning `r_sys`'s own trace tape at
/// `target_index` and leaving every other trace tape entirely free.
/// Grounded on `invariant_conditions.py`'s `create_cylindrified_system_transducer`.
pub(crate) fn cylindrify_single_trace_transducer(
    r_sys: &MultiTapeAutomaton,
    trace_names: &[String],
    target_index: usize,
) -> MultiTapeAutomaton {
    let old_layout = r_sys.layout();
    assert_eq!(old_layout.num_tapes(), 3, "system transducer must be laid out as trace/current/next");
    let ap_width = old_layout.tape(0).len();
    let n = trace_names.len();

    let mut tapes: Vec<Tape> = Vec::with_capacity(n + 2);
    for name in trace_names {
        tapes.push(Tape::new(name.clone(), old_layout.tape(0).vars().to_vec()));
    }
    tapes.push(old_layout.tape(1).clone());
    tapes.push(old_layout.tape(2).clone());
    let new_layout = TapeLayout::new(tapes);
    let new_width = new_layout.width();
    let other_width = ap_width * (n - 1);
    let old_width = old_layout.width();

    let mut nfa = Nfa::new(r_sys.nfa().num_states(), 1 << new_width);
    for &s in r_sys.nfa().initial_states() {
        nfa.set_initial(s);
    }
    for &s in r_sys.nfa().final_states() {
        nfa.set_final(s);
    }
    for from in 0..r_sys.nfa().num_states() {
        for old_symbol in 0..(1usize << old_width) {
            let successors = r_sys.nfa().successors(from, old_symbol);
            if successors.is_empty() {
                continue;
            }
            let old_bits = bits_of(old_symbol, old_width);
            let trace_bits = &old_bits[0..ap_width];
            let config_bits = &old_bits[ap_width..];
            for other in 0..(1usize << other_width) {
                let other_bits = bits_of(other, other_width);
                let mut parts: Vec<&[bool]> = Vec::with_capacity(n + 1);
                let mut cursor = 0;
                for idx in 0..n {
                    if idx == target_index {
                        parts.push(trace_bits);
                    } else {
                        parts.push(&other_bits[cursor..cursor + ap_width]);
                        cursor += ap_width;
                    }
                }
                parts.push(config_bits);
                let new_bits: Vec<bool> = parts.concat();
                let new_symbol = id_of(&new_bits);
                for &to in successors {
                    nfa.add_transition(from, new_symbol, to);
                }
            }
        }
    }
    MultiTapeAutomaton::new(nfa, new_layout, r_sys.atomic_propositions().to_vec(), Kind::Transducer)
}

/// §4.7.6, per the `drop_configuration_tapes`-then-`eliminate_trace_quantifiers`
/// pipeline of the supplemented design: configuration-tape projection
/// happens exactly once, before any quantifier elimination, never
/// interleaved with it.
pub fn trace_quantifier_condition(
    a: &MultiTapeAutomaton,
    r_ext: &MultiTapeAutomaton,
    r_sys: &MultiTapeAutomaton,
    acc: &MultiTapeAutomaton,
    t: &MultiTapeAutomaton,
    prefix: &TraceQuantifierPrefix,
) -> (bool, Option<Word>) {
    let a_current = a.cylindrify_to_transducer();
    let a_next = a.next_step_shell();
    let (a_current, a_next) = MultiTapeAutomaton::align_config_tapes(&a_current, &a_next);
    let a_both = a_current.intersect(&a_next);

    let (t_aligned, acc_aligned) = MultiTapeAutomaton::align_config_tapes(t, acc);
    let t_or_acc = t_aligned.union(&acc_aligned);
    let (r_ext_aligned, t_or_acc) = MultiTapeAutomaton::align_config_tapes(r_ext, &t_or_acc);
    let r_ext_and_step = r_ext_aligned.intersect(&t_or_acc);
    let (a_both, r_ext_and_step) = MultiTapeAutomaton::align_config_tapes(&a_both, &r_ext_and_step);
    let r_right = a_both.intersect(&r_ext_and_step);

    let universal_indices: Vec<usize> = prefix
        .universal
        .iter()
        .enumerate()
        .filter(|(_, &u)| u)
        .map(|(i, _)| i)
        .collect();

    let whole = if universal_indices.is_empty() {
        r_right
    } else {
        let mut l_forall: Option<MultiTapeAutomaton> = None;
        for &index in &universal_indices {
            let cyl = cylindrify_single_trace_transducer(r_sys, &prefix.trace_names, index);
            l_forall = Some(match l_forall {
                None => cyl,
                Some(acc) => {
                    let (acc, cyl) = MultiTapeAutomaton::align_config_tapes(&acc, &cyl);
                    acc.intersect(&cyl)
                }
            });
        }
        let l_forall = l_forall.unwrap();
        let (l_forall, r_right) = MultiTapeAutomaton::align_config_tapes(&l_forall, &r_right);
        let not_l_forall = l_forall.complement().enforce_same_process().minimize();
        let (not_l_forall, r_right) = MultiTapeAutomaton::align_config_tapes(&not_l_forall, &r_right);
        not_l_forall.union(&r_right)
    };

    // Drop both configuration tapes once, up front.
    let n = whole.num_tapes();
    let dropped = whole.eliminate_tape(n - 1).eliminate_tape(n - 2);

    // Eliminate trace-tape quantifiers in reverse prefix order: ∃ by plain
    // tape removal, ∀ by complement-remove-complement.
    let mut result = dropped;
    for (index, &universal) in prefix.universal.iter().enumerate().rev() {
        let last = result.num_tapes() - 1;
        debug_assert_eq!(last, index, "trace tapes must be eliminated back to front");
        if universal {
            let negated = result.complement();
            let removed = negated.eliminate_tape(last);
            result = removed.complement().minimize();
        } else {
            result = result.eliminate_tape(last);
        }
    }

    let pi_a = a.drop_tape(a.num_tapes() - 1);
    pi_a.nfa().included_in(result.nfa())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::id_of;

    fn single_tape_layout(width: usize) -> TapeLayout {
        TapeLayout::new(vec![Tape::new("trace0", (0..width).map(|i| format!("a{}", i)).collect())])
    }

    fn cfg_layout(trace_vars: Vec<String>, cfg_vars: Vec<String>) -> TapeLayout {
        TapeLayout::new(vec![Tape::new("trace0", trace_vars), Tape::new("cfg", cfg_vars)])
    }

    fn always_true_acceptor(layout: TapeLayout) -> MultiTapeAutomaton {
        let width = layout.width();
        let mut nfa = Nfa::new(1, 1 << width);
        nfa.set_initial(0);
        nfa.set_final(0);
        for symbol in 0..(1usize << width) {
            nfa.add_transition(0, symbol, 0);
        }
        MultiTapeAutomaton::new(nfa, layout, vec!["a".to_string()], Kind::Acceptor)
    }

    #[test]
    fn initial_inclusion_holds_when_initial_is_a_subset() {
        let layout = cfg_layout(vec!["a".to_string()], vec!["cfg0".to_string()]);
        let a = always_true_acceptor(layout.clone());
        // I_ext: only accepts the empty word (a stricter initial set).
        let width = layout.width();
        let mut nfa = Nfa::new(1, 1 << width);
        nfa.set_initial(0);
        nfa.set_final(0);
        let i_ext = MultiTapeAutomaton::new(nfa, layout, vec!["a".to_string()], Kind::Acceptor);

        let (holds, cex) = initial_inclusion(&i_ext, &a);
        assert!(holds);
        assert!(cex.is_none());
    }

    #[test]
    fn initial_inclusion_fails_with_counterexample() {
        let layout = cfg_layout(vec!["a".to_string()], vec!["cfg0".to_string()]);
        let i_ext = always_true_acceptor(layout.clone());
        let width = layout.width();
        let mut nfa = Nfa::new(1, 1 << width);
        nfa.set_initial(0);
        nfa.set_final(0);
        let a = MultiTapeAutomaton::new(nfa, layout, vec!["a".to_string()], Kind::Acceptor);

        let (holds, cex) = initial_inclusion(&i_ext, &a);
        assert!(!holds);
        assert!(cex.is_some());
    }

    #[test]
    fn irreflexive_identity_free_transducer_passes() {
        // T that never lets current equal next on its sole config bit.
        let layout = TapeLayout::new(vec![
            Tape::new("trace0", vec!["a".to_string()]),
            Tape::new("current", vec!["cfg0".to_string()]),
            Tape::new("next", vec!["cfg0'".to_string()]),
        ]);
        let width = layout.width();
        let mut nfa = Nfa::new(1, 1 << width);
        nfa.set_initial(0);
        nfa.set_final(0);
        for symbol in 0..(1usize << width) {
            let bits = bits_of(symbol, width);
            if bits[1] != bits[2] {
                nfa.add_transition(0, symbol, 0);
            }
        }
        let t = MultiTapeAutomaton::new(nfa, layout, vec!["a".to_string()], Kind::Transducer);
        let (holds, _) = irreflexivity(&t);
        assert!(holds);
    }

    #[test]
    fn reflexive_transducer_fails_irreflexivity() {
        let layout = TapeLayout::new(vec![
            Tape::new("trace0", vec!["a".to_string()]),
            Tape::new("current", vec!["cfg0".to_string()]),
            Tape::new("next", vec!["cfg0'".to_string()]),
        ]);
        let width = layout.width();
        let mut nfa = Nfa::new(1, 1 << width);
        nfa.set_initial(0);
        nfa.set_final(0);
        for symbol in 0..(1usize << width) {
            nfa.add_transition(0, symbol, 0);
        }
        let t = MultiTapeAutomaton::new(nfa, layout, vec!["a".to_string()], Kind::Transducer);
        let (holds, cex) = irreflexivity(&t);
        assert!(!holds);
        assert!(cex.is_some());
    }

    #[test]
    fn inductiveness_holds_for_an_always_true_invariant_under_any_step() {
        let layout = cfg_layout(vec!["a".to_string()], vec!["cfg0".to_string()]);
        let a = always_true_acceptor(layout);
        let (cyl, shell) = MultiTapeAutomaton::align_config_tapes(&a.cylindrify_to_transducer(), &a.next_step_shell());
        let r_ext = cyl.intersect(&shell);
        let (holds, _) = inductiveness(&a, &r_ext);
        assert!(holds);
    }

    #[test]
    fn symbol_helper_matches_id_of() {
        assert_eq!(id_of(&[true, false]), 2);
    }
}
