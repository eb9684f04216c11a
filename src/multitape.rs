//! The multi-tape algebra (component C3): operations that preserve the
//! tape-stratified structure of an automaton's alphabet while changing its
//! shape -- extending a tape (cylindrification), removing a variable from a
//! tape (existential projection), promoting an acceptor to a transducer
//! shell, and the two discipline filters (singleton, same-process) that the
//! formula compiler (C6) must reapply after every operation that can break
//! them.
//!
//! Grounded on `controller/machine/mod.rs`'s separation between the raw
//! automaton and the metadata layered on top of it (there: per-state
//! labels; here: the tape layout), and on `controller/aiger.rs`'s pattern of
//! building a derived automaton structurally from an existing one rather
//! than mutating in place -- every method below returns a fresh
//! [`MultiTapeAutomaton`].

use std::collections::HashMap;

use crate::alphabet::{bits_of, id_of, Bits, Tape, TapeLayout};
use crate::automaton::Nfa;

/// Whether a [`MultiTapeAutomaton`] is a plain acceptor (one configuration
/// tape) or a transducer (a current/next pair of configuration tapes), per
/// §3.2.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Kind {
    Acceptor,
    Transducer,
}

/// A finite-state acceptor or transducer whose alphabet is stratified into
/// named tapes. Immutable to callers: every operation returns a new value.
#[derive(Debug, Clone)]
pub struct MultiTapeAutomaton {
    nfa: Nfa,
    layout: TapeLayout,
    atomic_propositions: Vec<String>,
    kind: Kind,
}

fn split_by_tape<'a>(layout: &TapeLayout, bits: &'a [bool]) -> Vec<&'a [bool]> {
    let mut out = Vec::with_capacity(layout.num_tapes());
    let mut offset = 0;
    for tape in layout.tapes() {
        out.push(&bits[offset..offset + tape.len()]);
        offset += tape.len();
    }
    out
}

fn join_tapes(parts: &[&[bool]]) -> Bits {
    parts.concat()
}

/// Identifiers beginning with these prefixes name configuration variables
/// (`cfgN`) or eventuality witnesses (`witN`) introduced by the BNF
/// normaliser (C5); process and process-set variables never use them. The
/// same-process discipline (§4.3.7) must leave configuration variables free
/// to change between current and next, so it relies on this distinction.
pub fn is_configuration_name(name: &str) -> bool {
    name.starts_with("cfg") || name.starts_with("wit")
}

/// A first-order (singleton) process variable is named starting with a
/// lowercase letter and is not a configuration variable; a second-order
/// (process-set) variable starts with an uppercase letter. Only first-order
/// variables are subject to the singleton discipline (§4.3.8).
pub fn is_first_order_name(name: &str) -> bool {
    !is_configuration_name(name)
        && name
            .chars()
            .next()
            .map(|c| c.is_lowercase())
            .unwrap_or(false)
}

impl MultiTapeAutomaton {
    pub fn new(nfa: Nfa, layout: TapeLayout, atomic_propositions: Vec<String>, kind: Kind) -> Self {
        assert_eq!(
            nfa.alphabet_size(),
            1 << layout.width(),
            "nfa alphabet size must match 2^(layout width)"
        );
        Self {
            nfa,
            layout,
            atomic_propositions,
            kind,
        }
    }

    pub fn nfa(&self) -> &Nfa {
        &self.nfa
    }

    pub fn layout(&self) -> &TapeLayout {
        &self.layout
    }

    pub fn atomic_propositions(&self) -> &[String] {
        &self.atomic_propositions
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_transducer(&self) -> bool {
        self.kind == Kind::Transducer
    }

    pub fn num_tapes(&self) -> usize {
        self.layout.num_tapes()
    }

    fn with_nfa_and_layout(&self, nfa: Nfa, layout: TapeLayout) -> Self {
        Self {
            nfa,
            layout,
            atomic_propositions: self.atomic_propositions.clone(),
            kind: self.kind,
        }
    }

    /// §4.3.1: replaces the variables of `tape_index` with `new_vars`.
    /// Variables that existed before (matched by name) keep their bit
    /// values; every variable that is genuinely new induces a free bit,
    /// generating `2^(#new)` output transitions per input transition.
    pub fn extend_alphabet(&self, tape_index: usize, new_vars: Vec<String>) -> Self {
        let old_width = self.layout.width();
        let new_layout = self.layout.with_tape_vars(tape_index, new_vars.clone());
        let new_width = new_layout.width();

        let old_tape = self.layout.tape(tape_index);
        let old_positions: HashMap<&str, usize> = old_tape
            .vars()
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_str(), i))
            .collect();
        let copy_from: Vec<Option<usize>> = new_vars
            .iter()
            .map(|v| old_positions.get(v.as_str()).copied())
            .collect();
        let free_positions: Vec<usize> = copy_from
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
            .collect();
        let num_free = free_positions.len();

        let mut nfa = Nfa::new(self.nfa.num_states(), 1 << new_width);
        for &s in self.nfa.initial_states() {
            nfa.set_initial(s);
        }
        for &s in self.nfa.final_states() {
            nfa.set_final(s);
        }

        for from in 0..self.nfa.num_states() {
            for old_symbol in 0..(1usize << old_width) {
                let successors = self.nfa.successors(from, old_symbol);
                if successors.is_empty() {
                    continue;
                }
                let old_bits = bits_of(old_symbol, old_width);
                let old_parts = split_by_tape(&self.layout, &old_bits);
                for combo in 0..(1usize << num_free) {
                    let combo_bits = bits_of(combo, num_free);
                    let mut new_tape_bits = vec![false; new_vars.len()];
                    let mut free_i = 0;
                    for (j, cf) in copy_from.iter().enumerate() {
                        new_tape_bits[j] = match cf {
                            Some(p) => old_parts[tape_index][*p],
                            None => {
                                let b = combo_bits[free_i];
                                free_i += 1;
                                b
                            }
                        };
                    }
                    let mut new_parts = old_parts.clone();
                    new_parts[tape_index] = &new_tape_bits;
                    let new_bits = join_tapes(&new_parts);
                    let new_symbol = id_of(&new_bits);
                    for &to in successors {
                        nfa.add_transition(from, new_symbol, to);
                    }
                }
            }
        }
        self.with_nfa_and_layout(nfa, new_layout)
    }

    /// §4.3.2: removes variable `var_index` of `tape_index`, existentially
    /// projecting it out. The result may be nondeterministic even if
    /// `self` was not, since several old symbols can collapse onto the
    /// same new symbol for the same pair of states.
    pub fn remove_index(&self, tape_index: usize, var_index: usize) -> Self {
        let old_width = self.layout.width();
        let new_layout = self.layout.without_var(tape_index, var_index);
        let new_width = new_layout.width();
        let remove_pos = self.layout.tape_offset(tape_index) + var_index;

        let mut nfa = Nfa::new(self.nfa.num_states(), 1 << new_width);
        for &s in self.nfa.initial_states() {
            nfa.set_initial(s);
        }
        for &s in self.nfa.final_states() {
            nfa.set_final(s);
        }
        for from in 0..self.nfa.num_states() {
            for old_symbol in 0..(1usize << old_width) {
                let successors = self.nfa.successors(from, old_symbol);
                if successors.is_empty() {
                    continue;
                }
                let mut new_bits = bits_of(old_symbol, old_width);
                new_bits.remove(remove_pos);
                let new_symbol = id_of(&new_bits);
                for &to in successors {
                    nfa.add_transition(from, new_symbol, to);
                }
            }
        }
        self.with_nfa_and_layout(nfa, new_layout)
    }

    /// Like [`Self::remove_index`], but looks the variable up by name on
    /// the given tape.
    pub fn remove_var(&self, tape_index: usize, var: &str) -> Self {
        let pos = self
            .layout
            .tape(tape_index)
            .position(var)
            .unwrap_or_else(|| panic!("variable '{}' not present on tape {}", var, tape_index));
        self.remove_index(tape_index, pos)
    }

    /// §4.3.3: appends an empty tape. Leaves the alphabet untouched (an
    /// empty tape contributes zero bits), so the underlying [`Nfa`] is
    /// shared as-is.
    pub fn create_tape(&self, name: impl Into<String>) -> Self {
        let new_layout = self.layout.with_appended_empty_tape(name);
        self.with_nfa_and_layout(self.nfa.clone(), new_layout)
    }

    /// §4.3.4: promotes a single-step acceptor into a transducer "shell" by
    /// appending a tape holding a primed copy of the last tape's variables,
    /// left fully free -- which is exactly [`Self::extend_alphabet`] called
    /// on a brand-new empty tape.
    pub fn cylindrify_to_transducer(&self) -> Self {
        assert_eq!(self.kind, Kind::Acceptor, "already a transducer");
        let last = self.layout.num_tapes() - 1;
        let current_vars = self.layout.tape(last).vars().to_vec();
        let next_vars: Vec<String> = current_vars.iter().map(|v| format!("{}'", v)).collect();

        // Canonically rename the acceptor's own last tape to "current" so
        // that the result lines up, tape name for tape name, with
        // `Self::next_step_shell`'s output.
        let mut tapes = self.layout.tapes().to_vec();
        tapes[last] = Tape::new("current", current_vars);
        let renamed = self.with_nfa_and_layout(self.nfa.clone(), TapeLayout::new(tapes));

        let shell = renamed.create_tape("next");
        let extended = shell.extend_alphabet(shell.layout.num_tapes() - 1, next_vars);
        Self {
            kind: Kind::Transducer,
            ..extended
        }
    }

    /// Existentially projects away every variable of `tape_index`, one bit
    /// at a time, leaving the tape present but empty. Used by the decision
    /// procedures (§4.7) to drop a whole configuration tape rather than one
    /// named variable.
    pub fn drop_tape(&self, tape_index: usize) -> Self {
        let num_vars = self.layout.tape(tape_index).len();
        let mut result = self.clone();
        for _ in 0..num_vars {
            result = result.remove_index(tape_index, 0);
        }
        result
    }

    /// [`Self::drop_tape`] followed by physically removing the now-empty
    /// tape from the layout (valid since a zero-width tape never occupies
    /// any bit position, wherever it sits) and resetting `kind` to
    /// `Acceptor` -- turning a transducer back into a plain acceptor once
    /// its "current" half has been eliminated, as §4.7.4's `post_A`
    /// construction needs.
    pub fn eliminate_tape(&self, tape_index: usize) -> Self {
        let dropped = self.drop_tape(tape_index);
        let mut tapes = dropped.layout.tapes().to_vec();
        tapes.remove(tape_index);
        Self {
            nfa: dropped.nfa,
            layout: TapeLayout::new(tapes),
            atomic_propositions: dropped.atomic_propositions,
            kind: Kind::Acceptor,
        }
    }

    /// Renames every variable of `tape_index` by stripping a trailing `'`,
    /// e.g. after [`Self::eliminate_tape`] removes a transducer's current
    /// tape and the former next tape's primed names must become the plain
    /// names of a fresh acceptor.
    pub fn unprime_tape(&self, tape_index: usize) -> Self {
        let unprimed: Vec<String> = self
            .layout
            .tape(tape_index)
            .vars()
            .iter()
            .map(|v| v.strip_suffix('\'').unwrap_or(v).to_string())
            .collect();
        let new_layout = self.layout.with_tape_vars(tape_index, unprimed);
        self.with_nfa_and_layout(self.nfa.clone(), new_layout)
    }

    /// Promotes a one-tape acceptor into a transducer whose *next* tape
    /// carries this acceptor's own variables, primed, and whose *current*
    /// tape is a fresh empty shell. Bit positions are unaffected (an empty
    /// tape contributes zero width wherever it is inserted), so the
    /// underlying [`Nfa`] is reused as-is. This is the "next-step variant"
    /// the compiler (C6) needs for `X` applied to a configuration-variable
    /// leaf (§4.4): the leaf's own acceptor already expresses "holds at the
    /// current step"; this shifts that same constraint onto the step after.
    pub fn next_step_shell(&self) -> Self {
        assert_eq!(self.kind, Kind::Acceptor, "next_step_shell expects an acceptor");
        let n = self.layout.num_tapes();
        let last = self.layout.tape(n - 1);
        let primed_vars: Vec<String> = last.vars().iter().map(|v| format!("{}'", v)).collect();
        let mut tapes = self.layout.tapes()[..n - 1].to_vec();
        tapes.push(Tape::new("current", Vec::new()));
        tapes.push(Tape::new("next", primed_vars));
        let new_layout = TapeLayout::new(tapes);
        Self {
            nfa: self.nfa.clone(),
            layout: new_layout,
            atomic_propositions: self.atomic_propositions.clone(),
            kind: Kind::Transducer,
        }
    }

    /// §4.3.5: given a one-tape automaton, determinises it and builds `n`
    /// copies, the `k`-th of which pins the original automaton's behaviour
    /// onto trace tape `k` while leaving the other `n-1` trace tapes free;
    /// intersects all copies and minimises. An extra empty tape is reserved
    /// for auxiliary configuration variables, as required by the acceptor
    /// shape the rest of the crate expects (one configuration tape beyond
    /// the trace tapes).
    pub fn multi_tape_lift(&self, trace_names: &[String]) -> Self {
        assert_eq!(self.layout.num_tapes(), 1, "multi_tape_lift expects a one-tape automaton");
        let n = trace_names.len();
        let det = self.nfa.determinize();
        let base_tape = self.layout.tape(0).clone();
        let base_width = base_tape.len();

        let tapes: Vec<Tape> = trace_names
            .iter()
            .map(|name| Tape::new(name.clone(), base_tape.vars().to_vec()))
            .collect();
        let lifted_layout = TapeLayout::new(tapes);
        let lifted_width = lifted_layout.width();
        let other_width = lifted_width - base_width;

        let mut result: Option<MultiTapeAutomaton> = None;
        for k in 0..n {
            let mut nfa = Nfa::new(det.num_states(), 1 << lifted_width);
            for &s in det.initial_states() {
                nfa.set_initial(s);
            }
            for &s in det.final_states() {
                nfa.set_final(s);
            }
            for from in 0..det.num_states() {
                for old_symbol in 0..det.alphabet_size() {
                    let successors = det.successors(from, old_symbol);
                    if successors.is_empty() {
                        continue;
                    }
                    let base_bits = bits_of(old_symbol, base_width);
                    for other in 0..(1usize << other_width) {
                        let other_bits = bits_of(other, other_width);
                        let mut parts: Vec<&[bool]> = Vec::with_capacity(n);
                        let mut other_cursor = 0;
                        for tape_index in 0..n {
                            if tape_index == k {
                                parts.push(&base_bits);
                            } else {
                                parts.push(&other_bits[other_cursor..other_cursor + base_width]);
                                other_cursor += base_width;
                            }
                        }
                        let symbol_bits = join_tapes(&parts);
                        let symbol = id_of(&symbol_bits);
                        for &to in successors {
                            nfa.add_transition(from, symbol, to);
                        }
                    }
                }
            }
            let copy = MultiTapeAutomaton::new(
                nfa,
                lifted_layout.clone(),
                self.atomic_propositions.clone(),
                Kind::Acceptor,
            );
            result = Some(match result {
                None => copy,
                Some(acc) => acc.intersect(&copy),
            });
        }
        let lifted = result.unwrap().minimize();
        lifted.create_tape("cfg")
    }

    /// §4.3.7: filters out every transition whose symbol disagrees on a
    /// process/process-set variable between the current (second-to-last)
    /// and next (last) tape of a transducer. A variable named `v` on the
    /// current tape is paired with `v'` on the next tape; configuration
    /// variables (named per [`is_configuration_name`]) are exempt, since
    /// they are exactly the bits a step is allowed to change.
    pub fn enforce_same_process(&self) -> Self {
        if !self.is_transducer() {
            return self.clone();
        }
        let n = self.layout.num_tapes();
        let current = self.layout.tape(n - 2);
        let next = self.layout.tape(n - 1);
        let current_offset = self.layout.tape_offset(n - 2);
        let next_offset = self.layout.tape_offset(n - 1);
        let mut pairs = Vec::new();
        for (i, v) in current.vars().iter().enumerate() {
            if is_configuration_name(v) {
                continue;
            }
            if let Some(j) = next.position(&format!("{}'", v)) {
                pairs.push((current_offset + i, next_offset + j));
            }
        }
        if pairs.is_empty() {
            return self.clone();
        }
        let width = self.layout.width();
        let mut filter = Nfa::new(1, 1 << width);
        filter.set_initial(0);
        filter.set_final(0);
        for symbol in 0..(1usize << width) {
            let bits = bits_of(symbol, width);
            if pairs.iter().all(|&(a, b)| bits[a] == bits[b]) {
                filter.add_transition(0, symbol, 0);
            }
        }
        let filter = self.with_nfa_and_layout(filter, self.layout.clone());
        self.intersect(&filter).minimize()
    }

    /// §4.3.8: intersects with the two-state automaton asserting that the
    /// bit at `tape_index`/`var_index` is set at most once across a run.
    pub fn enforce_singleton(&self, tape_index: usize, var_index: usize) -> Self {
        let width = self.layout.width();
        let pos = self.layout.tape_offset(tape_index) + var_index;
        let mut discipline = Nfa::new(2, 1 << width);
        discipline.set_initial(0);
        discipline.set_final(0);
        discipline.set_final(1);
        for symbol in 0..(1usize << width) {
            let bits = bits_of(symbol, width);
            if bits[pos] {
                discipline.add_transition(0, symbol, 1);
            } else {
                discipline.add_transition(0, symbol, 0);
                discipline.add_transition(1, symbol, 1);
            }
        }
        let discipline = self.with_nfa_and_layout(discipline, self.layout.clone());
        self.intersect(&discipline).minimize()
    }

    /// Applies [`Self::enforce_singleton`] to every first-order variable
    /// exposed on `tape_index`, as required after union or complement
    /// (§4.3.8).
    pub fn enforce_singleton_all(&self, tape_index: usize) -> Self {
        let vars: Vec<(usize, String)> = self
            .layout
            .tape(tape_index)
            .vars()
            .iter()
            .enumerate()
            .filter(|(_, v)| is_first_order_name(v))
            .map(|(i, v)| (i, v.clone()))
            .collect();
        let mut result = self.clone();
        for (i, _) in vars {
            result = result.enforce_singleton(tape_index, i);
        }
        result
    }

    fn assert_same_layout(&self, other: &Self) {
        assert_eq!(
            self.layout, other.layout,
            "operands must share a tape layout; call align_config_tapes first"
        );
    }

    pub fn union(&self, other: &Self) -> Self {
        self.assert_same_layout(other);
        self.with_nfa_and_layout(self.nfa.union(&other.nfa), self.layout.clone())
    }

    pub fn intersect(&self, other: &Self) -> Self {
        self.assert_same_layout(other);
        self.with_nfa_and_layout(self.nfa.intersect(&other.nfa), self.layout.clone())
    }

    pub fn complement(&self) -> Self {
        self.with_nfa_and_layout(self.nfa.complement(), self.layout.clone())
    }

    pub fn minimize(&self) -> Self {
        self.with_nfa_and_layout(self.nfa.minimize(), self.layout.clone())
    }

    fn union_vars(a: &[String], b: &[String]) -> Vec<String> {
        let mut out = a.to_vec();
        for v in b {
            if !out.contains(v) {
                out.push(v.clone());
            }
        }
        out
    }

    /// Extends a single tape of both operands to the union of their
    /// variable sets, so they can subsequently be combined with
    /// [`Self::union`]/[`Self::intersect`].
    pub fn align_tape(a: &Self, a_tape: usize, b: &Self, b_tape: usize) -> (Self, Self) {
        let union = Self::union_vars(a.layout.tape(a_tape).vars(), b.layout.tape(b_tape).vars());
        (
            a.extend_alphabet(a_tape, union.clone()),
            b.extend_alphabet(b_tape, union),
        )
    }

    /// §4.6: aligns the configuration tape(s) of two operands before
    /// combining them. If one is an acceptor and the other a transducer,
    /// the acceptor is promoted to a transducer shell first; then the
    /// current (and, for transducers, next) tape's variables are unioned.
    pub fn align_config_tapes(a: &Self, b: &Self) -> (Self, Self) {
        let (a, b) = match (a.kind, b.kind) {
            (Kind::Acceptor, Kind::Transducer) => (a.cylindrify_to_transducer(), b.clone()),
            (Kind::Transducer, Kind::Acceptor) => (a.clone(), b.cylindrify_to_transducer()),
            _ => (a.clone(), b.clone()),
        };
        if a.is_transducer() {
            let na = a.layout.num_tapes();
            let nb = b.layout.num_tapes();
            let (a2, b2) = Self::align_tape(&a, na - 2, &b, nb - 2);
            let na2 = a2.layout.num_tapes();
            let nb2 = b2.layout.num_tapes();
            Self::align_tape(&a2, na2 - 1, &b2, nb2 - 1)
        } else {
            let na = a.layout.num_tapes();
            let nb = b.layout.num_tapes();
            Self::align_tape(&a, na - 1, &b, nb - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_acceptor(layout: TapeLayout, accept_on_bit: usize) -> MultiTapeAutomaton {
        let width = layout.width();
        let mut nfa = Nfa::new(2, 1 << width);
        nfa.set_initial(0);
        nfa.set_final(1);
        for symbol in 0..(1usize << width) {
            let bits = bits_of(symbol, width);
            if bits[accept_on_bit] {
                nfa.add_transition(0, symbol, 1);
            } else {
                nfa.add_transition(0, symbol, 0);
            }
            nfa.add_transition(1, symbol, 1);
        }
        MultiTapeAutomaton::new(nfa, layout, vec![], Kind::Acceptor)
    }

    #[test]
    fn extend_alphabet_then_project_back_is_language_preserving() {
        let layout = TapeLayout::new(vec![Tape::new("cfg", vec!["a".into()])]);
        let a = two_state_acceptor(layout, 0);

        let extended = a.extend_alphabet(0, vec!["a".into(), "b".into()]);
        assert_eq!(extended.layout().width(), 2);

        let projected = extended.remove_var(0, "b");
        // projecting the fresh free bit back out must restore the original
        // two-state behaviour: same number of reachable distinguishable
        // states after minimization.
        assert_eq!(projected.minimize().nfa().num_states(), a.minimize().nfa().num_states());
        assert!(projected.nfa().accepts(&[1]));
        assert!(!projected.nfa().accepts(&[0]));
    }

    #[test]
    fn singleton_discipline_rejects_two_occurrences() {
        let layout = TapeLayout::new(vec![Tape::new("cfg", vec!["i".into()])]);
        let mut nfa = Nfa::new(1, 2);
        nfa.set_initial(0);
        nfa.set_final(0);
        nfa.add_transition(0, 0, 0);
        nfa.add_transition(0, 1, 0);
        let any = MultiTapeAutomaton::new(nfa, layout, vec![], Kind::Acceptor);
        let disciplined = any.enforce_singleton(0, 0);
        assert!(disciplined.nfa().accepts(&[0, 1, 0]));
        assert!(!disciplined.nfa().accepts(&[1, 0, 1]));
    }
}
