//! Büchi Normal Form translation (component C5): a post-order walk that
//! replaces every temporal subformula with a fresh configuration-variable
//! leaf, emitting a local constraint (and, for `F`, an eventuality
//! constraint) per replacement (§3.4, §4.5).
//!
//! Every LTL operator is treated uniformly: it is replaced by a fresh
//! configuration-variable leaf named `cfgN`, guarded by a local constraint
//! relating that leaf to its (already-normalised) operand(s). `G`, `F` and
//! `W` get the recursive "ψ op Xx" shape; `F` additionally allocates an
//! eventuality witness `witN` immediately after its own `cfgN` (so the two
//! ids are always consecutive, matching how the source always processes a
//! guard and its witness back to back). Plain `X` has no fixpoint shape of
//! its own, but still goes through the same replacement so that every
//! `Ltl::X` node surviving into the output is applied to a literal
//! configuration-variable leaf, never to an arbitrary subformula -- the
//! restriction the compiler (C6) relies on. When `X`'s operand does not
//! already normalise to a leaf, an extra rename-only local constraint
//! (`zN ↔ ψ`, no recursion) is emitted first.

use super::{AtomicForm, BoolOp, Formula, FormulaArena, FormulaError, LtlOp, Node, NodeId, NodeKind, ProcessQuantifier};

/// A local-step constraint: `∀i. x ↔ (...)`, or just `x ↔ (...)` if `x` is
/// unparameterised.
#[derive(Debug, Clone)]
pub struct LocalConstraint {
    pub var_name: String,
    pub index_var: Option<String>,
    pub formula: NodeId,
}

/// An eventuality constraint for the `F`-witness `y_name`, guarded by the
/// `F`'s own configuration variable `x_name`.
#[derive(Debug, Clone)]
pub struct EventualityConstraint {
    pub x_name: String,
    pub y_name: String,
    pub index_var: Option<String>,
    pub formula: NodeId,
}

/// The Büchi-Normal-Form output of C5: a pure MSO initial formula plus the
/// local-step and eventuality constraint lists, all living in the same
/// output arena.
#[derive(Debug, Clone)]
pub struct BnfFormula {
    pub arena: FormulaArena,
    pub mso_initial: NodeId,
    pub local_constraints: Vec<LocalConstraint>,
    pub eventuality_constraints: Vec<EventualityConstraint>,
}

struct Normalizer<'a> {
    source: &'a FormulaArena,
    out: FormulaArena,
    next_cfg: usize,
    local_constraints: Vec<LocalConstraint>,
    eventuality_constraints: Vec<EventualityConstraint>,
}

impl<'a> Normalizer<'a> {
    fn fresh_name(&mut self, prefix: &str) -> String {
        let name = format!("{}{}", prefix, self.next_cfg);
        self.next_cfg += 1;
        name
    }

    fn config_leaf(&mut self, name: &str, index_var: Option<&str>) -> NodeId {
        self.out.atomic(AtomicForm::ConfigVar {
            name: name.to_string(),
            index: index_var.map(str::to_string),
        })
    }

    fn maybe_quantify(&mut self, formula: NodeId, index_var: Option<&str>) -> NodeId {
        match index_var {
            Some(v) => self.out.process_quantifier(ProcessQuantifier::ForallFo(v.to_string()), formula),
            None => formula,
        }
    }

    /// Ensures `node` is a configuration-variable leaf suitable as the
    /// operand of an `Ltl::X` node, introducing a rename-only local
    /// constraint when it is not.
    fn ensure_config_leaf(&mut self, node: NodeId, index_var: Option<&str>) -> NodeId {
        if matches!(self.out.node(node).kind(), NodeKind::Atomic(AtomicForm::ConfigVar { .. })) {
            return node;
        }
        let name = self.fresh_name("cfg");
        let leaf = self.config_leaf(&name, index_var);
        let constraint = self.out.boolean(BoolOp::Iff, vec![leaf, node]);
        let constraint = self.maybe_quantify(constraint, index_var);
        self.local_constraints.push(LocalConstraint {
            var_name: name,
            index_var: index_var.map(str::to_string),
            formula: constraint,
        });
        leaf
    }

    fn free_fo_of(&self, id: NodeId) -> Vec<String> {
        self.source.node(id).free_fo().iter().cloned().collect()
    }

    fn normalize(&mut self, id: NodeId) -> Result<NodeId, FormulaError> {
        let source_node: &Node = self.source.node(id);
        match source_node.kind().clone() {
            NodeKind::Atomic(form) => Ok(self.out.atomic(form)),
            NodeKind::ProcessQuantifier(quant) => {
                let child = source_node.children()[0];
                let normalized_child = self.normalize(child)?;
                Ok(self.out.process_quantifier(quant, normalized_child))
            }
            NodeKind::Bool(op) => {
                let children = source_node.children().to_vec();
                let normalized: Vec<NodeId> = children
                    .iter()
                    .map(|&c| self.normalize(c))
                    .collect::<Result<_, _>>()?;
                Ok(self.out.boolean(op, normalized))
            }
            NodeKind::Ltl(op) => self.normalize_ltl(id, op),
        }
    }

    fn normalize_ltl(&mut self, id: NodeId, op: LtlOp) -> Result<NodeId, FormulaError> {
        let free = self.free_fo_of(id);
        if free.len() > 1 {
            return Err(FormulaError::TooManyFreeVars { node: id, free });
        }
        let index_var = free.first().cloned();
        let children = self.source.node(id).children().to_vec();

        match op {
            LtlOp::G => {
                let child = self.normalize(children[0])?;
                let x_name = self.fresh_name("cfg");
                let x_leaf = self.config_leaf(&x_name, index_var.as_deref());
                let next_x = self.out.ltl(LtlOp::X, vec![x_leaf]);
                let body = self.out.boolean(BoolOp::And, vec![child, next_x]);
                let constraint = self.out.boolean(BoolOp::Iff, vec![x_leaf, body]);
                let constraint = self.maybe_quantify(constraint, index_var.as_deref());
                self.local_constraints.push(LocalConstraint {
                    var_name: x_name,
                    index_var: index_var.clone(),
                    formula: constraint,
                });
                Ok(x_leaf)
            }
            LtlOp::F => {
                let child = self.normalize(children[0])?;
                let x_name = self.fresh_name("cfg");
                let y_name = self.fresh_name("wit");
                let x_leaf = self.config_leaf(&x_name, index_var.as_deref());
                let y_leaf = self.config_leaf(&y_name, index_var.as_deref());

                let next_x = self.out.ltl(LtlOp::X, vec![x_leaf]);
                let x_body = self.out.boolean(BoolOp::Or, vec![child, next_x]);
                let x_constraint = self.out.boolean(BoolOp::Iff, vec![x_leaf, x_body]);
                let x_constraint = self.maybe_quantify(x_constraint, index_var.as_deref());
                self.local_constraints.push(LocalConstraint {
                    var_name: x_name.clone(),
                    index_var: index_var.clone(),
                    formula: x_constraint,
                });

                let next_y = self.out.ltl(LtlOp::X, vec![y_leaf]);
                let y_body = self.out.boolean(BoolOp::And, vec![x_leaf, next_y]);
                let y_constraint = self.out.boolean(BoolOp::Iff, vec![y_leaf, y_body]);
                let y_constraint = self.maybe_quantify(y_constraint, index_var.as_deref());
                self.local_constraints.push(LocalConstraint {
                    var_name: y_name.clone(),
                    index_var: index_var.clone(),
                    formula: y_constraint,
                });

                let not_y = self.out.boolean(BoolOp::Not, vec![y_leaf]);
                let eventually_not_y = self.out.ltl(LtlOp::F, vec![not_y]);
                let discharge = self.out.boolean(BoolOp::Implies, vec![y_leaf, eventually_not_y]);
                let ev_formula = self.out.ltl(LtlOp::G, vec![discharge]);
                let ev_formula = self.maybe_quantify(ev_formula, index_var.as_deref());
                self.eventuality_constraints.push(EventualityConstraint {
                    x_name,
                    y_name,
                    index_var: index_var.clone(),
                    formula: ev_formula,
                });

                Ok(x_leaf)
            }
            LtlOp::W => {
                let left = self.normalize(children[0])?;
                let right = self.normalize(children[1])?;
                let x_name = self.fresh_name("cfg");
                let x_leaf = self.config_leaf(&x_name, index_var.as_deref());
                let next_x = self.out.ltl(LtlOp::X, vec![x_leaf]);
                let holds_and_waits = self.out.boolean(BoolOp::And, vec![left, next_x]);
                let body = self.out.boolean(BoolOp::Or, vec![right, holds_and_waits]);
                let constraint = self.out.boolean(BoolOp::Iff, vec![x_leaf, body]);
                let constraint = self.maybe_quantify(constraint, index_var.as_deref());
                self.local_constraints.push(LocalConstraint {
                    var_name: x_name,
                    index_var: index_var.clone(),
                    formula: constraint,
                });
                Ok(x_leaf)
            }
            LtlOp::X => {
                let operand = self.normalize(children[0])?;
                let operand_leaf = self.ensure_config_leaf(operand, index_var.as_deref());
                let x_name = self.fresh_name("cfg");
                let x_leaf = self.config_leaf(&x_name, index_var.as_deref());
                let next_operand = self.out.ltl(LtlOp::X, vec![operand_leaf]);
                let constraint = self.out.boolean(BoolOp::Iff, vec![x_leaf, next_operand]);
                let constraint = self.maybe_quantify(constraint, index_var.as_deref());
                self.local_constraints.push(LocalConstraint {
                    var_name: x_name,
                    index_var: index_var.clone(),
                    formula: constraint,
                });
                Ok(x_leaf)
            }
        }
    }
}

/// Translates `formula.body` into Büchi Normal Form.
pub fn normalize(formula: &Formula) -> Result<BnfFormula, FormulaError> {
    let mut normalizer = Normalizer {
        source: &formula.arena,
        out: FormulaArena::new(),
        next_cfg: 0,
        local_constraints: Vec::new(),
        eventuality_constraints: Vec::new(),
    };
    let mso_initial = normalizer.normalize(formula.body)?;
    Ok(BnfFormula {
        arena: normalizer.out,
        mso_initial,
        local_constraints: normalizer.local_constraints,
        eventuality_constraints: normalizer.eventuality_constraints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::TraceQuantifier;

    fn leaf_ap(arena: &mut FormulaArena, prop: &str, trace: &str, i: &str) -> NodeId {
        arena.atomic(AtomicForm::AtomicProposition {
            prop: prop.to_string(),
            trace: trace.to_string(),
            i: i.to_string(),
        })
    }

    #[test]
    fn globally_produces_one_local_constraint_and_no_eventuality() {
        let mut arena = FormulaArena::new();
        let ap = leaf_ap(&mut arena, "a", "t", "i");
        let g = arena.ltl(LtlOp::G, vec![ap]);
        let body = arena.process_quantifier(ProcessQuantifier::ForallFo("i".to_string()), g);
        let formula = Formula {
            trace_quantifiers: vec![TraceQuantifier::Forall("t".to_string())],
            arena,
            body,
        };
        let bnf = normalize(&formula).unwrap();
        assert_eq!(bnf.local_constraints.len(), 1);
        assert!(bnf.eventuality_constraints.is_empty());
        assert_eq!(bnf.local_constraints[0].var_name, "cfg0");
        assert_eq!(bnf.local_constraints[0].index_var.as_deref(), Some("i"));
    }

    #[test]
    fn finally_allocates_consecutive_guard_and_witness_and_one_eventuality() {
        let mut arena = FormulaArena::new();
        let ap = leaf_ap(&mut arena, "a", "t", "i");
        let f = arena.ltl(LtlOp::F, vec![ap]);
        let body = arena.process_quantifier(ProcessQuantifier::ForallFo("i".to_string()), f);
        let formula = Formula {
            trace_quantifiers: vec![TraceQuantifier::Forall("t".to_string())],
            arena,
            body,
        };
        let bnf = normalize(&formula).unwrap();
        assert_eq!(bnf.local_constraints.len(), 2);
        assert_eq!(bnf.local_constraints[0].var_name, "cfg0");
        assert_eq!(bnf.local_constraints[1].var_name, "wit1");
        assert_eq!(bnf.eventuality_constraints.len(), 1);
        assert_eq!(bnf.eventuality_constraints[0].x_name, "cfg0");
        assert_eq!(bnf.eventuality_constraints[0].y_name, "wit1");
    }

    #[test]
    fn two_free_variables_is_a_structural_error() {
        let mut arena = FormulaArena::new();
        let succ = arena.atomic(AtomicForm::Succ {
            i: "i".to_string(),
            j: "j".to_string(),
        });
        let g = arena.ltl(LtlOp::G, vec![succ]);
        let formula = Formula {
            trace_quantifiers: vec![],
            arena,
            body: g,
        };
        let err = normalize(&formula).unwrap_err();
        assert!(matches!(err, FormulaError::TooManyFreeVars { .. }));
    }

    #[test]
    fn next_of_a_non_leaf_introduces_a_rename_constraint_first() {
        let mut arena = FormulaArena::new();
        let a = leaf_ap(&mut arena, "a", "t", "i");
        let b = leaf_ap(&mut arena, "b", "t", "i");
        let conj = arena.boolean(BoolOp::And, vec![a, b]);
        let x = arena.ltl(LtlOp::X, vec![conj]);
        let body = arena.process_quantifier(ProcessQuantifier::ForallFo("i".to_string()), x);
        let formula = Formula {
            trace_quantifiers: vec![TraceQuantifier::Forall("t".to_string())],
            arena,
            body,
        };
        let bnf = normalize(&formula).unwrap();
        // one rename constraint for the conjunction, one for X itself.
        assert_eq!(bnf.local_constraints.len(), 2);
        assert_eq!(bnf.local_constraints[0].var_name, "cfg0");
        assert_eq!(bnf.local_constraints[1].var_name, "cfg1");
    }
}
