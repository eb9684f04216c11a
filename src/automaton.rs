//! The automaton core (component C2): a state-explicit NFA over a flat
//! integer alphabet, with the language operations the rest of the crate is
//! built on (union, intersection, determinization, minimization,
//! complement, inclusion, emptiness, counterexample extraction).
//!
//! This is assumed-available infrastructure, not a novel contribution:
//! nothing about symbol *meaning* (tapes, variables) lives here;
//! [`crate::multitape`] is the layer that keeps an [`Nfa`] in step with a
//! [`crate::alphabet::TapeLayout`]. Every operation here requires both
//! operands to share an alphabet size, the same way a shared BDD manager is
//! required before combining machines in a symbolic automaton library.

mod minimization;

use std::collections::{BTreeSet, VecDeque};

/// A state-explicit nondeterministic finite automaton over alphabet
/// `0..alphabet_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nfa {
    num_states: usize,
    alphabet_size: usize,
    initial: BTreeSet<usize>,
    finals: BTreeSet<usize>,
    // transitions[state][symbol] = sorted, deduplicated successor states.
    transitions: Vec<Vec<Vec<usize>>>,
}

impl Nfa {
    pub fn new(num_states: usize, alphabet_size: usize) -> Self {
        Self {
            num_states,
            alphabet_size,
            initial: BTreeSet::new(),
            finals: BTreeSet::new(),
            transitions: vec![vec![Vec::new(); alphabet_size]; num_states],
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    pub fn initial_states(&self) -> &BTreeSet<usize> {
        &self.initial
    }

    pub fn final_states(&self) -> &BTreeSet<usize> {
        &self.finals
    }

    pub fn set_initial(&mut self, state: usize) {
        assert!(state < self.num_states);
        self.initial.insert(state);
    }

    pub fn set_final(&mut self, state: usize) {
        assert!(state < self.num_states);
        self.finals.insert(state);
    }

    pub fn add_transition(&mut self, from: usize, symbol: usize, to: usize) {
        let targets = &mut self.transitions[from][symbol];
        if let Err(pos) = targets.binary_search(&to) {
            targets.insert(pos, to);
        }
    }

    pub fn successors(&self, state: usize, symbol: usize) -> &[usize] {
        &self.transitions[state][symbol]
    }

    fn assert_compatible(&self, other: &Self) {
        assert_eq!(
            self.alphabet_size, other.alphabet_size,
            "automata must share an alphabet before combining"
        );
    }

    /// Disjoint union: language of the result is `L(self) ∪ L(other)`.
    pub fn union(&self, other: &Self) -> Self {
        self.assert_compatible(other);
        let offset = self.num_states;
        let num_states = self.num_states + other.num_states;
        let mut result = Self::new(num_states, self.alphabet_size);
        for &s in &self.initial {
            result.set_initial(s);
        }
        for &s in &other.initial {
            result.set_initial(s + offset);
        }
        for &s in &self.finals {
            result.set_final(s);
        }
        for &s in &other.finals {
            result.set_final(s + offset);
        }
        for (state, by_symbol) in self.transitions.iter().enumerate() {
            for (symbol, targets) in by_symbol.iter().enumerate() {
                for &t in targets {
                    result.add_transition(state, symbol, t);
                }
            }
        }
        for (state, by_symbol) in other.transitions.iter().enumerate() {
            for (symbol, targets) in by_symbol.iter().enumerate() {
                for &t in targets {
                    result.add_transition(state + offset, symbol, t + offset);
                }
            }
        }
        result
    }

    /// Product construction: language of the result is `L(self) ∩ L(other)`.
    pub fn intersect(&self, other: &Self) -> Self {
        self.assert_compatible(other);
        let n2 = other.num_states;
        let num_states = self.num_states * n2;
        let pair_index = |i: usize, j: usize| i * n2 + j;
        let mut result = Self::new(num_states, self.alphabet_size);
        for &i in &self.initial {
            for &j in &other.initial {
                result.set_initial(pair_index(i, j));
            }
        }
        for &i in &self.finals {
            for &j in &other.finals {
                result.set_final(pair_index(i, j));
            }
        }
        for i in 0..self.num_states {
            for j in 0..n2 {
                for symbol in 0..self.alphabet_size {
                    for &i2 in self.successors(i, symbol) {
                        for &j2 in other.successors(j, symbol) {
                            result.add_transition(pair_index(i, j), symbol, pair_index(i2, j2));
                        }
                    }
                }
            }
        }
        result
    }

    /// Genuine subset-construction determinization producing a *complete*
    /// DFA (every state has exactly one successor per symbol, including a
    /// trap state for previously-undefined transitions). Kept distinct from
    /// [`Self::brzozowski_minimize`]; the two are not interchangeable.
    pub fn determinize(&self) -> Self {
        minimization::determinize(self)
    }

    /// Reverses every transition and swaps the initial/final sets.
    pub fn reverse(&self) -> Self {
        minimization::reverse(self)
    }

    /// Minimal DFA language-equivalent to `self`, via Brzozowski's
    /// reverse-determinize-reverse-determinize construction.
    pub fn minimize(&self) -> Self {
        minimization::brzozowski_minimize(self)
    }

    /// Complement over the shared alphabet: determinizes (completing with a
    /// trap state), then swaps final/non-final states.
    pub fn complement(&self) -> Self {
        let mut dfa = self.determinize();
        let all: BTreeSet<usize> = (0..dfa.num_states).collect();
        let non_final: BTreeSet<usize> = all.difference(&dfa.finals).copied().collect();
        dfa.finals = non_final;
        dfa
    }

    /// `true` iff `L(self)` is empty.
    pub fn is_empty(&self) -> bool {
        self.shortest_accepted_word().is_none()
    }

    /// `true` iff `word` (a sequence of symbol ids) is accepted.
    pub fn accepts(&self, word: &[usize]) -> bool {
        let mut current: BTreeSet<usize> = self.initial.clone();
        for &symbol in word {
            let mut next = BTreeSet::new();
            for &state in &current {
                next.extend(self.successors(state, symbol));
            }
            current = next;
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|s| self.finals.contains(s))
    }

    /// BFS over the (implicit) subset-construction reachability graph,
    /// returning the lexicographically-first shortest accepted word, or
    /// `None` if the language is empty. Used both for emptiness tests and
    /// to extract inclusion counterexamples (§4.2).
    pub fn shortest_accepted_word(&self) -> Option<Vec<usize>> {
        if self.initial.iter().any(|s| self.finals.contains(s)) {
            return Some(Vec::new());
        }
        let start: BTreeSet<usize> = self.initial.clone();
        if start.is_empty() {
            return None;
        }
        let mut visited: BTreeSet<BTreeSet<usize>> = BTreeSet::new();
        visited.insert(start.clone());
        let mut queue: VecDeque<(BTreeSet<usize>, Vec<usize>)> = VecDeque::new();
        queue.push_back((start, Vec::new()));
        while let Some((current, path)) = queue.pop_front() {
            for symbol in 0..self.alphabet_size {
                let mut next = BTreeSet::new();
                for &state in &current {
                    next.extend(self.successors(state, symbol));
                }
                if next.is_empty() {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(symbol);
                if next.iter().any(|s| self.finals.contains(s)) {
                    return Some(next_path);
                }
                if visited.insert(next.clone()) {
                    queue.push_back((next, next_path));
                }
            }
        }
        None
    }

    /// Tests `L(self) ⊆ L(other)`, returning a counterexample word in
    /// `L(self) \ L(other)` on failure.
    pub fn included_in(&self, other: &Self) -> (bool, Option<Vec<usize>>) {
        self.assert_compatible(other);
        let difference = self.intersect(&other.complement());
        match difference.shortest_accepted_word() {
            Some(word) => (false, Some(word)),
            None => (true, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_symbol_loop(accept_on_empty: bool) -> Nfa {
        // Accepts: the language over alphabet {0} where symbol 0 can occur
        // any number of times, used as a trivial "Sigma*" style automaton.
        let mut nfa = Nfa::new(1, 1);
        nfa.set_initial(0);
        if accept_on_empty {
            nfa.set_final(0);
        }
        nfa.add_transition(0, 0, 0);
        nfa
    }

    #[test]
    fn union_accepts_either_language() {
        let mut a = Nfa::new(2, 1);
        a.set_initial(0);
        a.set_final(1);
        a.add_transition(0, 0, 1);

        let empty = Nfa::new(1, 1);
        let mut empty = empty;
        empty.set_initial(0);
        empty.set_final(0);

        let u = a.union(&empty);
        assert!(u.accepts(&[0]));
        assert!(u.accepts(&[]));
    }

    #[test]
    fn intersection_is_conjunctive() {
        let sigma_star = single_symbol_loop(true);
        let mut never = Nfa::new(1, 1);
        never.set_initial(0);
        let i = sigma_star.intersect(&never);
        assert!(i.is_empty());
    }

    #[test]
    fn complement_of_sigma_star_is_empty() {
        let sigma_star = single_symbol_loop(true);
        assert!(sigma_star.complement().is_empty());
    }

    #[test]
    fn inclusion_counterexample_is_accepted_by_self_not_other() {
        let sigma_star = single_symbol_loop(true);
        let mut nothing = Nfa::new(1, 1);
        nothing.set_initial(0);
        let (holds, counterexample) = sigma_star.included_in(&nothing);
        assert!(!holds);
        let word = counterexample.unwrap();
        assert!(sigma_star.accepts(&word));
        assert!(!nothing.accepts(&word));
    }

    #[test]
    fn minimize_preserves_language() {
        // Two states both final, both self-looping: language-equivalent to
        // the one-state "always accept" automaton.
        let mut redundant = Nfa::new(2, 1);
        redundant.set_initial(0);
        redundant.set_final(0);
        redundant.set_final(1);
        redundant.add_transition(0, 0, 1);
        redundant.add_transition(1, 0, 0);
        let minimized = redundant.minimize();
        assert_eq!(minimized.num_states(), 1);
        assert!(minimized.accepts(&[]));
        assert!(minimized.accepts(&[0, 0, 0]));
    }
}
