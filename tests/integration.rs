//! End-to-end tests driving the crate through its public entry points only
//! (`hyperltlmso::prove`/`prove_with`), in the style of small named helper
//! functions asserting on the returned [`Status`], mirroring the scenarios
//! of the testable-properties section: a tautological safety property, an
//! eventuality property, a single-trace invariance property, a formula
//! structurally rejected for having two free first-order variables under a
//! single temporal operator, and the `k_max` search-bound boundary.

use hyperltlmso::driver::DriverError;
use hyperltlmso::formula::FormulaError;
use hyperltlmso::options::{RelationSearch, SynthesisOptions};
use hyperltlmso::{prove, prove_with, Status};

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

/// An explicit-NFA acceptor with zero states: accepts nothing, at any width,
/// since the label/width check only runs over the (empty) transition list.
const EMPTY_ACCEPTOR: &str = "\
@NFA-explicit
%States-enum
%Initial
%Final
";

fn verify(formula: &str) -> Result<Status, DriverError> {
    prove(formula, INITIAL_CONFIG, SYSTEM_TRANSDUCER, SYMBOL_MAPPING).map(|r| r.status())
}

fn verify_with_options(formula: &str, options: &SynthesisOptions) -> Result<Status, DriverError> {
    prove_with(formula, INITIAL_CONFIG, SYSTEM_TRANSDUCER, SYMBOL_MAPPING, None, None, options).map(|r| r.status())
}

/// A tautological `G` safety property over an arbitrary system holds no
/// matter what the system does: the all-accepting, single-state invariant
/// is always a valid witness, and since the formula has no `F` operator,
/// irreflexivity and transitivity of the relation are never even checked.
#[test]
fn tautological_safety_property_is_proved() {
    let formula = "trace forall t; forall i . G(ap(a, t, i) | !ap(a, t, i))";
    assert_eq!(verify(formula).unwrap(), Status::Proved);
}

/// An eventuality property is accepted by the compiler and either proved or
/// exhausts the search, but never errors: this exercises the irreflexivity
/// and transitivity decision procedures (§4.7), which only run when the
/// source formula contains an `F` operator.
#[test]
fn eventuality_property_is_handled_without_error() {
    let formula = "trace forall t; forall i . F(ap(a, t, i) | !ap(a, t, i))";
    let status = verify(formula).unwrap();
    assert!(matches!(status, Status::Proved | Status::NoProof));
}

/// A single existentially-quantified trace whose proposition never changes
/// under an identity system transducer satisfies "holds now iff holds next".
#[test]
fn single_trace_next_invariance_is_handled_without_error() {
    let formula = "trace exists t; forall i . (ap(a, t, i) <-> X(ap(a, t, i)))";
    let status = verify(formula).unwrap();
    assert!(matches!(status, Status::Proved | Status::NoProof));
}

/// A propagation-shaped property using only one free first-order variable
/// per temporal operator is accepted by the formula compiler.
#[test]
fn single_variable_propagation_property_is_handled_without_error() {
    let formula = "trace forall t; forall i . G(ap(a, t, i) -> ap(a, t, i))";
    let status = verify(formula).unwrap();
    assert!(matches!(status, Status::Proved | Status::NoProof));
}

/// `succ(i, j)` under a single `G` leaves both `i` and `j` free at that
/// node: normalisation into Büchi Normal Form rejects any temporal operator
/// with more than one free first-order variable (C5, §4.5).
#[test]
fn formula_with_two_free_variables_under_one_temporal_operator_is_rejected() {
    let formula = "trace forall t; G(succ(i, j))";
    let err = verify(formula).unwrap_err();
    assert!(matches!(err, DriverError::Formula(FormulaError::TooManyFreeVars { .. })));
}

/// `k_max = 0` leaves the outer candidate-size loop empty (`1..=0`),
/// returning "no proof" immediately regardless of the formula or system.
#[test]
fn a_zero_k_max_search_bound_returns_no_proof() {
    let formula = "trace forall t; forall i . G(ap(a, t, i) | !ap(a, t, i))";
    let options = SynthesisOptions { k_max: 0, ..SynthesisOptions::default() };
    assert_eq!(verify_with_options(formula, &options).unwrap(), Status::NoProof);
}

/// A dry run (`RelationSearch::Never`) against a deliberately-wrong,
/// empty invariant fails initial inclusion: the system's own initial
/// configurations are non-empty, so they cannot be included in an
/// automaton that accepts nothing.
#[test]
fn dry_run_against_an_empty_invariant_reports_a_failed_check() {
    let formula = "trace forall t; forall i . (ap(a, t, i) | !ap(a, t, i))";
    let options = SynthesisOptions { relation_search: RelationSearch::Never, ..SynthesisOptions::default() };
    let result =
        prove_with(formula, INITIAL_CONFIG, SYSTEM_TRANSDUCER, SYMBOL_MAPPING, Some(EMPTY_ACCEPTOR), None, &options)
            .unwrap();
    assert_eq!(result.status(), Status::Checked(false));
}
