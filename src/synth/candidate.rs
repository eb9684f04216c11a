//! The boolean-variable candidate encoding shared by the outer (A) and
//! inner (T) searches of §4.8: per-`(state, symbol, state)` transition
//! variables and per-state accepting variables, with determinism and
//! non-empty acceptance asserted as soon as the store is built. Grounded on
//! `controller/machine/sat.rs`'s `varisat`-based incremental CNF idiom --
//! `Solver::new_lit`/`add_clause` to build the formula, `solver.model()`
//! indexed by `Lit::index()` to read a satisfying assignment back out,
//! exactly as `minimal_model` does there.

use varisat::{ExtendFormula, Lit, Solver};

use crate::automaton::Nfa;

/// A candidate automaton of `k` states over an alphabet of `alphabet_size`
/// symbols, represented as the SAT variables that decide its transition
/// relation and accepting-state set. State 0 is always the sole initial
/// state, matching `invariant_conditions.py`'s candidate reconstruction.
pub struct CandidateStore {
    k: usize,
    alphabet_size: usize,
    transitions: Vec<Lit>,
    accepting: Vec<Lit>,
}

impl CandidateStore {
    fn transition_index(&self, s: usize, a: usize, sp: usize) -> usize {
        (s * self.alphabet_size + a) * self.k + sp
    }

    /// Allocates a fresh store in `solver` and asserts the two structural
    /// constraints every candidate must satisfy regardless of which checks
    /// it later passes: determinism (§4.8 step 2) and non-empty acceptance
    /// (a candidate that accepts nothing can never satisfy initial
    /// inclusion).
    pub fn build(solver: &mut Solver, k: usize, alphabet_size: usize) -> Self {
        let transitions: Vec<Lit> = (0..k * alphabet_size * k).map(|_| solver.new_lit()).collect();
        let accepting: Vec<Lit> = (0..k).map(|_| solver.new_lit()).collect();
        let store = Self {
            k,
            alphabet_size,
            transitions,
            accepting,
        };

        for s in 0..k {
            for a in 0..alphabet_size {
                for sp1 in 0..k {
                    for sp2 in (sp1 + 1)..k {
                        let l1 = store.transition(s, a, sp1);
                        let l2 = store.transition(s, a, sp2);
                        solver.add_clause(&[!l1, !l2]);
                    }
                }
            }
        }
        solver.add_clause(&store.accepting);
        store
    }

    pub fn num_states(&self) -> usize {
        self.k
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    pub fn transition(&self, s: usize, a: usize, sp: usize) -> Lit {
        self.transitions[self.transition_index(s, a, sp)]
    }

    pub fn accepting(&self, s: usize) -> Lit {
        self.accepting[s]
    }

    /// Every variable this store owns, for use by [`block_model`] -- never
    /// includes the Tseitin auxiliaries a learning clause allocates.
    fn own_lits(&self) -> impl Iterator<Item = Lit> + '_ {
        self.transitions.iter().chain(self.accepting.iter()).copied()
    }

    /// Reconstructs an [`Nfa`] from a satisfying model: state 0 is initial,
    /// every `f[s]`-true state is final, every `t[s,a,s']`-true triple
    /// becomes a transition.
    pub fn reconstruct(&self, model: &[Lit]) -> Nfa {
        let mut nfa = Nfa::new(self.k, self.alphabet_size);
        nfa.set_initial(0);
        for s in 0..self.k {
            if model[self.accepting(s).index()].is_positive() {
                nfa.set_final(s);
            }
            for a in 0..self.alphabet_size {
                for sp in 0..self.k {
                    if model[self.transition(s, a, sp).index()].is_positive() {
                        nfa.add_transition(s, a, sp);
                    }
                }
            }
        }
        nfa
    }
}

/// Excludes the exact assignment `model` gives to `store`'s own variables,
/// forcing the next `solver.solve()` call to find a different candidate.
/// Needed whenever a model is set aside without a counterexample-derived
/// learning clause (e.g. an inductiveness failure), since nothing else
/// would stop the solver handing back the identical model forever.
pub fn block_model(solver: &mut Solver, store: &CandidateStore, model: &[Lit]) {
    let clause: Vec<Lit> = store.own_lits().map(|lit| !model[lit.index()]).collect();
    solver.add_clause(&clause);
}

/// Tseitin-encodes `g <-> (lits[0] AND lits[1] AND ...)` and returns `g`.
fn encode_and(solver: &mut Solver, lits: &[Lit]) -> Lit {
    let g = solver.new_lit();
    for &l in lits {
        solver.add_clause(&[!g, l]);
    }
    let mut clause: Vec<Lit> = lits.iter().map(|&l| !l).collect();
    clause.push(g);
    solver.add_clause(&clause);
    g
}

/// Tseitin-encodes `g <-> (lits[0] OR lits[1] OR ...)` and returns `g`.
fn encode_or(solver: &mut Solver, lits: &[Lit]) -> Lit {
    let g = solver.new_lit();
    for &l in lits {
        solver.add_clause(&[!l, g]);
    }
    let mut clause: Vec<Lit> = lits.to_vec();
    clause.push(!g);
    solver.add_clause(&clause);
    g
}

/// Enumerates every sequence of states `s_1..s_len` reachable by reading
/// `word` from the fixed initial state 0, one at a time (an odometer over
/// base `k`); used by both [`encode_word_accepted`] and
/// [`block_word_not_accepted`].
struct RunEnumerator {
    k: usize,
    assignment: Vec<usize>,
    done: bool,
}

impl RunEnumerator {
    fn new(k: usize, len: usize) -> Self {
        Self {
            k,
            assignment: vec![0; len],
            done: len == 0,
        }
    }
}

impl Iterator for RunEnumerator {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let current = self.assignment.clone();
        let mut carry = true;
        for d in self.assignment.iter_mut().rev() {
            if !carry {
                break;
            }
            *d += 1;
            if *d < self.k {
                carry = false;
            } else {
                *d = 0;
            }
        }
        if carry {
            self.done = true;
        }
        Some(current)
    }
}

/// Tseitin-encodes "the candidate in `store` accepts `word`" (§4.8 step 5,
/// used for the initial-inclusion learning clause): a disjunction over every
/// run assignment of states of the conjunction of the transition variables
/// it uses, terminating in the final state's accepting variable. The empty
/// word is accepted iff state 0 itself is accepting.
pub fn encode_word_accepted(solver: &mut Solver, store: &CandidateStore, word: &[usize]) -> Lit {
    if word.is_empty() {
        return store.accepting(0);
    }
    let mut run_lits = Vec::new();
    for assignment in RunEnumerator::new(store.num_states(), word.len()) {
        let mut conjuncts = Vec::with_capacity(word.len() + 1);
        let mut prev = 0usize;
        for (i, &symbol) in word.iter().enumerate() {
            conjuncts.push(store.transition(prev, symbol, assignment[i]));
            prev = assignment[i];
        }
        conjuncts.push(store.accepting(prev));
        run_lits.push(encode_and(solver, &conjuncts));
    }
    encode_or(solver, &run_lits)
}

/// Asserts as a hard constraint that the candidate in `store` must never
/// accept `word` (§4.8 step 6, the irreflexivity learning clause): for
/// every run assignment, at least one of its transition variables or its
/// final accepting variable must be false.
pub fn block_word_not_accepted(solver: &mut Solver, store: &CandidateStore, word: &[usize]) {
    if word.is_empty() {
        solver.add_clause(&[!store.accepting(0)]);
        return;
    }
    for assignment in RunEnumerator::new(store.num_states(), word.len()) {
        let mut clause = Vec::with_capacity(word.len() + 1);
        let mut prev = 0usize;
        for (i, &symbol) in word.iter().enumerate() {
            clause.push(!store.transition(prev, symbol, assignment[i]));
            prev = assignment[i];
        }
        clause.push(!store.accepting(prev));
        solver.add_clause(&clause);
    }
}

/// All cylindrifications of a projected (configuration-tape-dropped) word
/// back onto the full alphabet: one per assignment of the `config_width`
/// bits the projection removed, reinserted as the low-order bits of each
/// symbol (the configuration tape is always laid out last, so dropping it
/// only ever discards a symbol's trailing bits -- §4.3.2).
pub fn cylindrify_word(word: &[usize], config_width: usize) -> Vec<Vec<usize>> {
    let num_combos = 1usize << config_width;
    let mut results = vec![Vec::with_capacity(word.len())];
    for &projected_symbol in word {
        let mut next = Vec::with_capacity(results.len() * num_combos);
        for prefix in &results {
            for combo in 0..num_combos {
                let mut w = prefix.clone();
                w.push((projected_symbol << config_width) | combo);
                next.push(w);
            }
        }
        results = next;
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_clauses_reject_two_successors_on_the_same_symbol() {
        let mut solver = Solver::new();
        let store = CandidateStore::build(&mut solver, 2, 2);
        solver.add_clause(&[store.transition(0, 0, 0)]);
        solver.add_clause(&[store.transition(0, 0, 1)]);
        assert!(!solver.solve().unwrap());
    }

    #[test]
    fn non_empty_acceptance_is_satisfiable_with_a_single_state() {
        let mut solver = Solver::new();
        let store = CandidateStore::build(&mut solver, 1, 1);
        assert!(solver.solve().unwrap());
        let model = solver.model().unwrap();
        assert!(model[store.accepting(0).index()].is_positive());
    }

    #[test]
    fn reconstructed_candidate_accepts_the_word_it_was_built_for() {
        let mut solver = Solver::new();
        let store = CandidateStore::build(&mut solver, 2, 2);
        solver.add_clause(&[store.transition(0, 1, 1)]);
        solver.add_clause(&[store.accepting(1)]);
        solver.add_clause(&[!store.accepting(0)]);
        assert!(solver.solve().unwrap());
        let model = solver.model().unwrap();
        let nfa = store.reconstruct(&model);
        assert!(nfa.accepts(&[1]));
    }

    #[test]
    fn block_model_excludes_the_exact_assignment() {
        let mut solver = Solver::new();
        let store = CandidateStore::build(&mut solver, 1, 1);
        assert!(solver.solve().unwrap());
        let model = solver.model().unwrap();
        block_model(&mut solver, &store, &model);
        // with a single state whose only candidate is "accepting", and that
        // exact assignment now blocked, nothing else satisfies the formula.
        assert!(!solver.solve().unwrap());
    }

    #[test]
    fn cylindrify_word_produces_all_combinations() {
        let words = cylindrify_word(&[0, 1], 1);
        assert_eq!(words.len(), 4);
        assert!(words.contains(&vec![0, 2]));
        assert!(words.contains(&vec![1, 3]));
    }

    #[test]
    fn block_word_not_accepted_then_accepted_word_is_unsat() {
        let mut solver = Solver::new();
        let store = CandidateStore::build(&mut solver, 1, 1);
        block_word_not_accepted(&mut solver, &store, &[0]);
        solver.add_clause(&[store.transition(0, 0, 0)]);
        assert!(!solver.solve().unwrap());
    }
}
