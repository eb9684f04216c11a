//! A convenience layer for building a [`Formula`] outside the core: a
//! small [`FormulaBuilder`] wrapper over [`FormulaArena`]'s own
//! constructors, plus a deliberately minimal textual reader for the
//! `--formula` CLI flag.
//!
//! The full HyperLTL(MSO) surface syntax of §6 (arbitrary infix precedence,
//! user-chosen operator spellings) is explicitly out of scope for the core
//! (§1, §13: "the core consumes parsed ASTs"). What follows is a simplified
//! prefix-heavy grammar that covers every construct of §4.4/§4.5 without
//! implementing a full precedence-climbing parser:
//!
//! ```text
//! input      := "trace" trace_quant* ";" expr
//! trace_quant:= ("forall" | "exists") ident
//! expr       := iff
//! iff        := implies ("<->" implies)*
//! implies    := or ("->" or)?
//! or         := and ("|" and)*
//! and        := wexpr ("&" wexpr)*
//! wexpr      := unary ("W" unary)?
//! unary      := "!" unary | "G" unary | "F" unary | "X" unary | quant | atom | "(" expr ")"
//! quant      := ("forall" | "exists") ("fo" | "so")? ident "." unary
//! atom       := "in" "(" ident "," ident ")"
//!             | "subseteq" "(" ident "," ident ")"
//!             | "succ" "(" ident "," ident ")"
//!             | "ap" "(" ident "," ident "," ident ")"
//! ```

use crate::formula::{AtomicForm, BoolOp, Formula, FormulaArena, LtlOp, NodeId, ProcessQuantifier, TraceQuantifier};

use super::DriverError;

/// A thin, domain-named wrapper over [`FormulaArena`]'s constructors, for
/// callers who want to build a [`Formula`] directly from Rust rather than
/// through the textual reader.
pub struct FormulaBuilder {
    arena: FormulaArena,
}

impl FormulaBuilder {
    pub fn new() -> Self {
        Self { arena: FormulaArena::new() }
    }

    pub fn ap(&mut self, prop: &str, trace: &str, i: &str) -> NodeId {
        self.arena.atomic(AtomicForm::AtomicProposition {
            prop: prop.to_string(),
            trace: trace.to_string(),
            i: i.to_string(),
        })
    }

    pub fn in_set(&mut self, i: &str, set: &str) -> NodeId {
        self.arena.atomic(AtomicForm::In { i: i.to_string(), set: set.to_string() })
    }

    pub fn subseteq(&mut self, lhs: &str, rhs: &str) -> NodeId {
        self.arena.atomic(AtomicForm::Subseteq { lhs: lhs.to_string(), rhs: rhs.to_string() })
    }

    pub fn succ(&mut self, i: &str, j: &str) -> NodeId {
        self.arena.atomic(AtomicForm::Succ { i: i.to_string(), j: j.to_string() })
    }

    pub fn not(&mut self, a: NodeId) -> NodeId {
        self.arena.boolean(BoolOp::Not, vec![a])
    }

    pub fn and(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.arena.boolean(BoolOp::And, vec![a, b])
    }

    pub fn or(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.arena.boolean(BoolOp::Or, vec![a, b])
    }

    pub fn implies(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.arena.boolean(BoolOp::Implies, vec![a, b])
    }

    pub fn iff(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.arena.boolean(BoolOp::Iff, vec![a, b])
    }

    pub fn forall_fo(&mut self, v: &str, child: NodeId) -> NodeId {
        self.arena.process_quantifier(ProcessQuantifier::ForallFo(v.to_string()), child)
    }

    pub fn exists_fo(&mut self, v: &str, child: NodeId) -> NodeId {
        self.arena.process_quantifier(ProcessQuantifier::ExistsFo(v.to_string()), child)
    }

    pub fn forall_so(&mut self, v: &str, child: NodeId) -> NodeId {
        self.arena.process_quantifier(ProcessQuantifier::ForallSo(v.to_string()), child)
    }

    pub fn exists_so(&mut self, v: &str, child: NodeId) -> NodeId {
        self.arena.process_quantifier(ProcessQuantifier::ExistsSo(v.to_string()), child)
    }

    pub fn globally(&mut self, child: NodeId) -> NodeId {
        self.arena.ltl(LtlOp::G, vec![child])
    }

    pub fn finally(&mut self, child: NodeId) -> NodeId {
        self.arena.ltl(LtlOp::F, vec![child])
    }

    pub fn next(&mut self, child: NodeId) -> NodeId {
        self.arena.ltl(LtlOp::X, vec![child])
    }

    pub fn weak_until(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.arena.ltl(LtlOp::W, vec![a, b])
    }

    /// Finishes the build: pairs this builder's arena with a trace-quantifier
    /// prefix and the node naming the formula's root.
    pub fn finish(self, trace_quantifiers: Vec<TraceQuantifier>, body: NodeId) -> Formula {
        Formula { trace_quantifiers, arena: self.arena, body }
    }
}

impl Default for FormulaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Semicolon,
    Not,
    And,
    Or,
    Implies,
    Iff,
}

fn tokenize(text: &str) -> Result<Vec<Token>, DriverError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semicolon);
                i += 1;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '&' => {
                tokens.push(Token::And);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Or);
                i += 1;
            }
            '<' => {
                if chars[i..].iter().collect::<String>().starts_with("<->") {
                    tokens.push(Token::Iff);
                    i += 3;
                } else {
                    return Err(DriverError::Parse(format!("unexpected character '{}'", c)));
                }
            }
            '-' => {
                if chars.get(i + 1) == Some(&'>') {
                    tokens.push(Token::Implies);
                    i += 2;
                } else {
                    return Err(DriverError::Parse("expected '->'".to_string()));
                }
            }
            _ if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(DriverError::Parse(format!("unexpected character '{}'", c))),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    builder: FormulaBuilder,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expect(&mut self, tok: &Token) -> Result<(), DriverError> {
        match self.advance() {
            Some(t) if t == tok => Ok(()),
            other => Err(DriverError::Parse(format!("expected {:?}, found {:?}", tok, other))),
        }
    }

    fn expect_ident(&mut self) -> Result<String, DriverError> {
        match self.advance() {
            Some(Token::Ident(s)) => Ok(s.clone()),
            other => Err(DriverError::Parse(format!("expected an identifier, found {:?}", other))),
        }
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s == kw)
    }

    fn parse_trace_quantifiers(&mut self) -> Result<Vec<TraceQuantifier>, DriverError> {
        let kw = self.expect_ident()?;
        if kw != "trace" {
            return Err(DriverError::Parse(format!("expected 'trace', found '{}'", kw)));
        }
        let mut out = Vec::new();
        loop {
            if self.peek_keyword("forall") {
                self.advance();
                let name = self.expect_ident()?;
                out.push(TraceQuantifier::Forall(name));
            } else if self.peek_keyword("exists") {
                self.advance();
                let name = self.expect_ident()?;
                out.push(TraceQuantifier::Exists(name));
            } else {
                break;
            }
        }
        self.expect(&Token::Semicolon)?;
        Ok(out)
    }

    fn parse_expr(&mut self) -> Result<NodeId, DriverError> {
        self.parse_iff()
    }

    fn parse_iff(&mut self) -> Result<NodeId, DriverError> {
        let mut lhs = self.parse_implies()?;
        while self.peek() == Some(&Token::Iff) {
            self.advance();
            let rhs = self.parse_implies()?;
            lhs = self.builder.iff(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_implies(&mut self) -> Result<NodeId, DriverError> {
        let lhs = self.parse_or()?;
        if self.peek() == Some(&Token::Implies) {
            self.advance();
            let rhs = self.parse_or()?;
            return Ok(self.builder.implies(lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<NodeId, DriverError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = self.builder.or(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<NodeId, DriverError> {
        let mut lhs = self.parse_w()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let rhs = self.parse_w()?;
            lhs = self.builder.and(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_w(&mut self) -> Result<NodeId, DriverError> {
        let lhs = self.parse_unary()?;
        if self.peek_keyword("W") {
            self.advance();
            let rhs = self.parse_unary()?;
            return Ok(self.builder.weak_until(lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<NodeId, DriverError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let a = self.parse_unary()?;
            return Ok(self.builder.not(a));
        }
        if self.peek_keyword("G") {
            self.advance();
            let a = self.parse_unary()?;
            return Ok(self.builder.globally(a));
        }
        if self.peek_keyword("F") {
            self.advance();
            let a = self.parse_unary()?;
            return Ok(self.builder.finally(a));
        }
        if self.peek_keyword("X") {
            self.advance();
            let a = self.parse_unary()?;
            return Ok(self.builder.next(a));
        }
        if self.peek_keyword("forall") || self.peek_keyword("exists") {
            return self.parse_quantifier();
        }
        if self.peek() == Some(&Token::LParen) {
            self.advance();
            let inner = self.parse_expr()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }
        self.parse_atom()
    }

    fn parse_quantifier(&mut self) -> Result<NodeId, DriverError> {
        let universal = self.peek_keyword("forall");
        self.advance();
        let second_order = if self.peek_keyword("fo") {
            self.advance();
            false
        } else if self.peek_keyword("so") {
            self.advance();
            true
        } else {
            false
        };
        let var = self.expect_ident()?;
        self.expect(&Token::Dot)?;
        let child = self.parse_unary()?;
        Ok(match (universal, second_order) {
            (true, false) => self.builder.forall_fo(&var, child),
            (false, false) => self.builder.exists_fo(&var, child),
            (true, true) => self.builder.forall_so(&var, child),
            (false, true) => self.builder.exists_so(&var, child),
        })
    }

    fn parse_atom(&mut self) -> Result<NodeId, DriverError> {
        let name = self.expect_ident()?;
        match name.as_str() {
            "in" => {
                self.expect(&Token::LParen)?;
                let i = self.expect_ident()?;
                self.expect(&Token::Comma)?;
                let set = self.expect_ident()?;
                self.expect(&Token::RParen)?;
                Ok(self.builder.in_set(&i, &set))
            }
            "subseteq" => {
                self.expect(&Token::LParen)?;
                let lhs = self.expect_ident()?;
                self.expect(&Token::Comma)?;
                let rhs = self.expect_ident()?;
                self.expect(&Token::RParen)?;
                Ok(self.builder.subseteq(&lhs, &rhs))
            }
            "succ" => {
                self.expect(&Token::LParen)?;
                let i = self.expect_ident()?;
                self.expect(&Token::Comma)?;
                let j = self.expect_ident()?;
                self.expect(&Token::RParen)?;
                Ok(self.builder.succ(&i, &j))
            }
            "ap" => {
                self.expect(&Token::LParen)?;
                let prop = self.expect_ident()?;
                self.expect(&Token::Comma)?;
                let trace = self.expect_ident()?;
                self.expect(&Token::Comma)?;
                let i = self.expect_ident()?;
                self.expect(&Token::RParen)?;
                Ok(self.builder.ap(&prop, &trace, &i))
            }
            other => Err(DriverError::Parse(format!("unknown atom '{}'", other))),
        }
    }
}

/// Parses the simplified textual format described above into a [`Formula`].
pub fn parse(text: &str) -> Result<Formula, DriverError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens: &tokens, pos: 0, builder: FormulaBuilder::new() };
    let trace_quantifiers = parser.parse_trace_quantifiers()?;
    let body = parser.parse_expr()?;
    if parser.pos != tokens.len() {
        return Err(DriverError::Parse("trailing tokens after formula body".to_string()));
    }
    Ok(parser.builder.finish(trace_quantifiers, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::NodeKind;

    #[test]
    fn parses_trace_quantifiers_and_a_simple_implication() {
        let formula = parse("trace forall t1 forall t2; forall i . (ap(p, t1, i) -> ap(p, t2, i))").unwrap();
        assert_eq!(formula.trace_quantifiers.len(), 2);
        assert!(formula.trace_quantifiers[0].is_universal());
        let root = formula.arena.node(formula.body);
        assert!(matches!(root.kind(), NodeKind::ProcessQuantifier(_)));
    }

    #[test]
    fn parses_ltl_operators_and_weak_until() {
        let formula = parse("trace forall t; forall i . (G(ap(p, t, i)) & (ap(q, t, i) W ap(r, t, i)))").unwrap();
        assert_eq!(formula.trace_quantifiers.len(), 1);
        assert!(!formula.arena.is_empty());
    }

    #[test]
    fn rejects_an_unknown_atom() {
        let err = parse("trace forall t; bogus(p, t, i)").unwrap_err();
        assert!(matches!(err, DriverError::Parse(_)));
    }

    #[test]
    fn builder_produces_the_same_shape_as_the_parser_for_a_single_atom() {
        let mut builder = FormulaBuilder::new();
        let ap = builder.ap("p", "t", "i");
        let formula = builder.finish(vec![TraceQuantifier::Forall("t".to_string())], ap);
        assert!(matches!(
            formula.arena.node(formula.body).kind(),
            NodeKind::Atomic(AtomicForm::AtomicProposition { .. })
        ));
    }
}
