//! The formula-to-automaton compiler (component C6): recursive descent
//! over a Büchi-Normal-Form constraint tree, producing a
//! [`MultiTapeAutomaton`] per §4.6. Used identically for the MSO initial
//! formula, each local constraint, and each eventuality constraint -- all
//! three are just trees in the same arena.

use crate::formula::{AtomicForm, BoolOp, FormulaArena, FormulaError, LtlOp, NodeId, NodeKind, ProcessQuantifier};
use crate::mso_atoms;
use crate::multitape::MultiTapeAutomaton;

/// The driver-supplied constants every C4 builder needs: how many trace
/// tapes to lay out, and the canonical atomic-proposition list shared by
/// all of them.
#[derive(Debug, Clone)]
pub struct CompileContext {
    pub trace_names: Vec<String>,
    pub canonical_aps: Vec<String>,
}

impl CompileContext {
    pub fn num_traces(&self) -> usize {
        self.trace_names.len()
    }

    fn trace_index(&self, name: &str) -> Result<usize, FormulaError> {
        self.trace_names
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| FormulaError::UnknownTraceVariable(name.to_string()))
    }
}

/// Compiles the subtree rooted at `node`.
pub fn compile(ctx: &CompileContext, arena: &FormulaArena, node: NodeId) -> Result<MultiTapeAutomaton, FormulaError> {
    let n = arena.node(node);
    match n.kind() {
        NodeKind::Atomic(form) => compile_atomic(ctx, form),
        NodeKind::ProcessQuantifier(quant) => {
            let child = n.children()[0];
            compile_quantifier(ctx, arena, quant, child)
        }
        NodeKind::Bool(op) => {
            let children = n.children().to_vec();
            compile_bool(ctx, arena, *op, &children)
        }
        NodeKind::Ltl(LtlOp::X) => {
            let child = n.children()[0];
            compile_next(ctx, arena, child, node)
        }
        NodeKind::Ltl(other) => {
            // BNF output never leaves a recursive LTL operator in place;
            // only the non-recursive `X` survives normalisation.
            unreachable!("BNF output should not contain a bare {:?} node", other)
        }
    }
}

fn compile_atomic(ctx: &CompileContext, form: &AtomicForm) -> Result<MultiTapeAutomaton, FormulaError> {
    let n = ctx.num_traces();
    let aps = &ctx.canonical_aps;
    match form {
        AtomicForm::In { i, set } => Ok(mso_atoms::member_of(n, aps, i, set)),
        AtomicForm::Subseteq { lhs, rhs } => Ok(mso_atoms::subseteq(n, aps, lhs, rhs)),
        AtomicForm::Succ { i, j } => Ok(mso_atoms::succ(n, aps, i, j)),
        AtomicForm::AtomicProposition { prop, trace, i } => {
            let trace_index = ctx.trace_index(trace)?;
            Ok(mso_atoms::atomic_proposition(n, aps, prop, trace_index, i))
        }
        AtomicForm::ConfigVar { name, index } => Ok(mso_atoms::config_var(n, aps, name, index.as_deref())),
    }
}

/// `X` is only ever applied, post-BNF, to a configuration-variable leaf
/// (§4.4, §4.6); compiling the leaf as an ordinary acceptor and shifting it
/// onto a fresh transducer's next tape realises the next-step variant.
fn compile_next(
    ctx: &CompileContext,
    arena: &FormulaArena,
    child: NodeId,
    x_node: NodeId,
) -> Result<MultiTapeAutomaton, FormulaError> {
    if !matches!(arena.node(child).kind(), NodeKind::Atomic(AtomicForm::ConfigVar { .. })) {
        return Err(FormulaError::XOnNonConfigLeaf { node: x_node });
    }
    let inner = compile(ctx, arena, child)?;
    Ok(inner.next_step_shell())
}

fn compile_quantifier(
    ctx: &CompileContext,
    arena: &FormulaArena,
    quant: &ProcessQuantifier,
    child: NodeId,
) -> Result<MultiTapeAutomaton, FormulaError> {
    let compiled = compile(ctx, arena, child)?;
    let var = match quant {
        ProcessQuantifier::ExistsFo(v) | ProcessQuantifier::ExistsSo(v) => {
            return Ok(project_var(&compiled, v));
        }
        ProcessQuantifier::ForallFo(v) | ProcessQuantifier::ForallSo(v) => v,
    };
    // ∀v. φ = ¬∃v.¬φ
    let negated = apply_not(&compiled);
    let projected = project_var(&negated, var);
    Ok(apply_not(&projected))
}

fn compile_bool(
    ctx: &CompileContext,
    arena: &FormulaArena,
    op: BoolOp,
    children: &[NodeId],
) -> Result<MultiTapeAutomaton, FormulaError> {
    match op {
        BoolOp::Not => {
            let a = compile(ctx, arena, children[0])?;
            Ok(apply_not(&a))
        }
        BoolOp::And => {
            let a = compile(ctx, arena, children[0])?;
            let b = compile(ctx, arena, children[1])?;
            let (a, b) = MultiTapeAutomaton::align_config_tapes(&a, &b);
            Ok(discipline(&a.intersect(&b)))
        }
        BoolOp::Or => {
            let a = compile(ctx, arena, children[0])?;
            let b = compile(ctx, arena, children[1])?;
            let (a, b) = MultiTapeAutomaton::align_config_tapes(&a, &b);
            Ok(discipline(&a.union(&b)))
        }
        BoolOp::Implies => {
            // a -> b  ==  ¬a ∨ b
            let a = compile(ctx, arena, children[0])?;
            let b = compile(ctx, arena, children[1])?;
            let not_a = apply_not(&a);
            let (not_a, b) = MultiTapeAutomaton::align_config_tapes(&not_a, &b);
            Ok(discipline(&not_a.union(&b)))
        }
        BoolOp::Iff => {
            // a <-> b  ==  (a ∧ b) ∨ (¬a ∧ ¬b)
            let a = compile(ctx, arena, children[0])?;
            let b = compile(ctx, arena, children[1])?;
            let (a1, b1) = MultiTapeAutomaton::align_config_tapes(&a, &b);
            let both = discipline(&a1.intersect(&b1));
            let not_a = apply_not(&a);
            let not_b = apply_not(&b);
            let (not_a, not_b) = MultiTapeAutomaton::align_config_tapes(&not_a, &not_b);
            let neither = discipline(&not_a.intersect(&not_b));
            let (both, neither) = MultiTapeAutomaton::align_config_tapes(&both, &neither);
            Ok(discipline(&both.union(&neither)))
        }
    }
}

/// Complement, followed by the two discipline filters every non-trivial
/// operation (union, complement) can break (§4.3.7, §4.3.8), then
/// minimisation.
fn apply_not(a: &MultiTapeAutomaton) -> MultiTapeAutomaton {
    discipline(&a.complement())
}

pub(crate) fn discipline(a: &MultiTapeAutomaton) -> MultiTapeAutomaton {
    let n = a.num_tapes();
    let disciplined = if a.is_transducer() {
        a.enforce_singleton_all(n - 2).enforce_singleton_all(n - 1)
    } else {
        a.enforce_singleton_all(n - 1)
    };
    disciplined.enforce_same_process().minimize()
}

/// Projects away a process/process-set variable: off the (only) config
/// tape for an acceptor, or off both the current (unprimed `v`) and next
/// (primed `v'`) tapes for a transducer, matching the pairing
/// [`MultiTapeAutomaton::enforce_same_process`] relies on.
fn project_var(a: &MultiTapeAutomaton, v: &str) -> MultiTapeAutomaton {
    if a.is_transducer() {
        let n = a.num_tapes();
        let mut result = a.clone();
        if let Some(pos) = result.layout().tape(n - 2).position(v) {
            result = result.remove_index(n - 2, pos);
        }
        let n = result.num_tapes();
        let primed = format!("{}'", v);
        if let Some(pos) = result.layout().tape(n - 1).position(&primed) {
            result = result.remove_index(n - 1, pos);
        }
        result
    } else {
        let n = a.num_tapes();
        match a.layout().tape(n - 1).position(v) {
            Some(pos) => a.remove_index(n - 1, pos),
            None => a.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::id_of;
    use crate::formula::{LtlOp, ProcessQuantifier};

    fn ctx() -> CompileContext {
        CompileContext {
            trace_names: vec!["t".to_string()],
            canonical_aps: vec!["a".to_string()],
        }
    }

    #[test]
    fn compiles_membership_atom() {
        let mut arena = FormulaArena::new();
        let node = arena.atomic(AtomicForm::In {
            i: "i".to_string(),
            set: "I".to_string(),
        });
        let automaton = compile(&ctx(), &arena, node).unwrap();
        let sym = |a: bool, i: bool, set: bool| id_of(&[a, i, set]);
        assert!(automaton.nfa().accepts(&[sym(false, true, true)]));
        assert!(!automaton.nfa().accepts(&[sym(false, true, false)]));
    }

    #[test]
    fn conjunction_of_two_atomic_propositions() {
        let mut arena = FormulaArena::new();
        let p = arena.atomic(AtomicForm::AtomicProposition {
            prop: "a".to_string(),
            trace: "t".to_string(),
            i: "i".to_string(),
        });
        let succ = arena.atomic(AtomicForm::Succ {
            i: "i".to_string(),
            j: "j".to_string(),
        });
        let conj = arena.boolean(BoolOp::And, vec![p, succ]);
        let automaton = compile(&ctx(), &arena, conj).unwrap();
        // both atoms reference "i" but not "j"/"a" jointly; the compiled
        // automaton must at least be satisfiable (non-empty language).
        assert!(!automaton.nfa().is_empty());
    }

    #[test]
    fn exists_projects_the_quantified_variable() {
        let mut arena = FormulaArena::new();
        let member = arena.atomic(AtomicForm::In {
            i: "i".to_string(),
            set: "I".to_string(),
        });
        let exists = arena.process_quantifier(ProcessQuantifier::ExistsFo("i".to_string()), member);
        let automaton = compile(&ctx(), &arena, exists).unwrap();
        assert!(automaton.layout().tape(automaton.num_tapes() - 1).position("i").is_none());
        assert!(!automaton.nfa().is_empty());
    }

    #[test]
    fn x_on_non_config_leaf_is_a_structural_error() {
        let mut arena = FormulaArena::new();
        let ap = arena.atomic(AtomicForm::AtomicProposition {
            prop: "a".to_string(),
            trace: "t".to_string(),
            i: "i".to_string(),
        });
        let x = arena.ltl(LtlOp::X, vec![ap]);
        let err = compile(&ctx(), &arena, x).unwrap_err();
        assert!(matches!(err, FormulaError::XOnNonConfigLeaf { .. }));
    }
}
