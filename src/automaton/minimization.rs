//! Subset-construction determinization and Brzozowski minimization.
//!
//! Kept in a separate file from the rest of [`super::Nfa`]'s API: a data
//! model (state/transition storage) module stays free of the algorithms
//! that operate on it, which live here instead.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::Nfa;

fn intern(
    set: BTreeSet<usize>,
    index_of: &mut BTreeMap<BTreeSet<usize>, usize>,
    subsets: &mut Vec<BTreeSet<usize>>,
    queue: &mut VecDeque<BTreeSet<usize>>,
) -> usize {
    if let Some(&i) = index_of.get(&set) {
        i
    } else {
        let i = subsets.len();
        subsets.push(set.clone());
        index_of.insert(set.clone(), i);
        queue.push_back(set);
        i
    }
}

/// Subset construction, completing the result with an explicit trap state
/// whenever some state/symbol pair has no successor in `nfa`.
pub(super) fn determinize(nfa: &Nfa) -> Nfa {
    let alphabet_size = nfa.alphabet_size();
    let start: BTreeSet<usize> = nfa.initial_states().clone();

    let mut index_of: BTreeMap<BTreeSet<usize>, usize> = BTreeMap::new();
    let mut subsets: Vec<BTreeSet<usize>> = Vec::new();
    let mut queue: VecDeque<BTreeSet<usize>> = VecDeque::new();

    let start_index = intern(start, &mut index_of, &mut subsets, &mut queue);

    // The trap (empty-set) state is only ever interned below, as the `next`
    // set for some state/symbol pair with no successor in `nfa`. An
    // already-complete input therefore comes out with no trap at all, which
    // is what keeps `minimize` able to reach a true 1-state result for a
    // total, single-class language.
    let mut edges: Vec<Vec<usize>> = Vec::new();
    while let Some(set) = queue.pop_front() {
        let mut row = vec![0; alphabet_size];
        for symbol in 0..alphabet_size {
            let mut next = BTreeSet::new();
            for &state in &set {
                next.extend(nfa.successors(state, symbol));
            }
            row[symbol] = intern(next, &mut index_of, &mut subsets, &mut queue);
        }
        edges.push(row);
    }
    // `edges` was filled in the order subsets were popped, which is the
    // same order they were interned in (FIFO queue), so `edges[i]`
    // corresponds to `subsets[i]`.

    let mut result = Nfa::new(subsets.len(), alphabet_size);
    result.set_initial(start_index);
    for (i, set) in subsets.iter().enumerate() {
        if set.iter().any(|s| nfa.final_states().contains(s)) {
            result.set_final(i);
        }
    }
    for (from, row) in edges.iter().enumerate() {
        for (symbol, &to) in row.iter().enumerate() {
            result.add_transition(from, symbol, to);
        }
    }
    result
}

/// Reverses every transition of `nfa` and swaps its initial and final
/// state sets.
pub(super) fn reverse(nfa: &Nfa) -> Nfa {
    let mut result = Nfa::new(nfa.num_states(), nfa.alphabet_size());
    for &s in nfa.final_states() {
        result.set_initial(s);
    }
    for &s in nfa.initial_states() {
        result.set_final(s);
    }
    for from in 0..nfa.num_states() {
        for symbol in 0..nfa.alphabet_size() {
            for &to in nfa.successors(from, symbol) {
                result.add_transition(to, symbol, from);
            }
        }
    }
    result
}

/// Brzozowski's minimization: `determinize(reverse(determinize(reverse(n))))`
/// yields the minimal complete DFA for `L(n)`, since each determinize step
/// only ever constructs reachable subsets and the double reversal removes
/// both unreachable and indistinguishable states.
pub(super) fn brzozowski_minimize(nfa: &Nfa) -> Nfa {
    let r1 = reverse(nfa);
    let d1 = determinize(&r1);
    let r2 = reverse(&d1);
    determinize(&r2)
}
