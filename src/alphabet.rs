//! Tape-stratified symbol alphabets (component C1).
//!
//! A [`TapeLayout`] fixes an ordered sequence of tapes, each carrying an
//! ordered sequence of named bit positions ("variables"). The alphabet of a
//! multi-tape automaton is the set of bit-strings of length `L = sum of tape
//! widths`; [`Alphabet`] enumerates that set deterministically and exposes
//! the bijection between bit-strings and small integer identifiers that the
//! automaton core and the SAT encoding both rely on.

use std::collections::HashMap;
use std::fmt;

/// One tape of a [`TapeLayout`]: a name (for diagnostics) and the ordered
/// list of variable names that occupy its bit positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    name: String,
    vars: Vec<String>,
}

impl Tape {
    pub fn new(name: impl Into<String>, vars: Vec<String>) -> Self {
        Self {
            name: name.into(),
            vars,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Position of `var` within this tape, if present.
    pub fn position(&self, var: &str) -> Option<usize> {
        self.vars.iter().position(|v| v == var)
    }
}

/// An ordered sequence of [`Tape`]s. Every automaton carries its own copy;
/// two layouts with the same total bit width induce identical symbol maps
/// (see [`Alphabet::build`]), but nothing is shared between automata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeLayout {
    tapes: Vec<Tape>,
}

impl TapeLayout {
    pub fn new(tapes: Vec<Tape>) -> Self {
        Self { tapes }
    }

    pub fn tapes(&self) -> &[Tape] {
        &self.tapes
    }

    pub fn num_tapes(&self) -> usize {
        self.tapes.len()
    }

    pub fn tape(&self, index: usize) -> &Tape {
        &self.tapes[index]
    }

    /// Total bit width `L = sum |tape_i|`.
    pub fn width(&self) -> usize {
        self.tapes.iter().map(Tape::len).sum()
    }

    /// Bit offset at which `tape_index` begins within a flattened symbol.
    pub fn tape_offset(&self, tape_index: usize) -> usize {
        self.tapes[..tape_index].iter().map(Tape::len).sum()
    }

    /// Appends an empty tape, as used to promote an acceptor into a
    /// transducer "shell" before extension (§4.3.3).
    pub fn with_appended_empty_tape(&self, name: impl Into<String>) -> Self {
        let mut tapes = self.tapes.clone();
        tapes.push(Tape::new(name, Vec::new()));
        Self { tapes }
    }

    /// Returns a copy of this layout with the variables of `tape_index`
    /// replaced by `new_vars`, keeping all other tapes untouched.
    pub fn with_tape_vars(&self, tape_index: usize, new_vars: Vec<String>) -> Self {
        let mut tapes = self.tapes.clone();
        tapes[tape_index] = Tape::new(tapes[tape_index].name().to_string(), new_vars);
        Self { tapes }
    }

    /// Returns a copy of this layout with variable `var_index` removed from
    /// `tape_index`.
    pub fn without_var(&self, tape_index: usize, var_index: usize) -> Self {
        let mut tapes = self.tapes.clone();
        let mut vars = tapes[tape_index].vars().to_vec();
        vars.remove(var_index);
        tapes[tape_index] = Tape::new(tapes[tape_index].name().to_string(), vars);
        Self { tapes }
    }

    /// Locates a variable by name, searching tapes back-to-front since most
    /// callers are looking for a variable on the last or second-to-last
    /// tape (the usual home of process/configuration variables).
    pub fn locate(&self, var: &str) -> Option<(usize, usize)> {
        for (tape_index, tape) in self.tapes.iter().enumerate().rev() {
            if let Some(pos) = tape.position(var) {
                return Some((tape_index, pos));
            }
        }
        None
    }
}

/// A symbol is represented as a flat bit vector of length `layout.width()`,
/// most-significant (first tape, first variable) bit first -- this makes
/// lexicographic order on the bit-string coincide with numeric order on the
/// generated identifier, as required by §3.1.
pub type Bits = Vec<bool>;

/// A small integer identifier for a symbol, stable for the lifetime of the
/// [`Alphabet`] that produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub usize);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Renders a bit vector as a `{0,1}`-string, matching the explicit-NFA text
/// format of §6.
pub fn bits_to_string(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Parses a `{0,1}`-string into a bit vector.
pub fn string_to_bits(s: &str) -> Result<Bits, AlphabetError> {
    s.chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => Err(AlphabetError::InvalidBit(other)),
        })
        .collect()
}

/// The `n`-th bit-string of length `width` in lexicographic order, i.e. the
/// big-endian binary representation of `n`. Since the alphabet of a
/// multi-tape automaton is always the *full* cube `{0,1}^width` (§3.1), the
/// symbol identifier of a bit-string and its numeric value coincide, and
/// [`crate::multitape`] uses this directly instead of rebuilding a whole
/// [`Alphabet`] per operation.
pub fn bits_of(n: usize, width: usize) -> Bits {
    (0..width).map(|i| (n >> (width - 1 - i)) & 1 == 1).collect()
}

/// Inverse of [`bits_of`]: the numeric identifier of a bit-string.
pub fn id_of(bits: &[bool]) -> usize {
    bits.iter().fold(0usize, |acc, &b| (acc << 1) | (b as usize))
}

/// The enumerative, explicit alphabet over a [`TapeLayout`]: every bit-string
/// of length `L` together with the bijection to small integers. No
/// compression or BDD-like sharing is attempted (§4.1): `L` is assumed small
/// (`~12` or less) in intended workloads, and the alphabet is regenerated
/// locally whenever an operation needs it.
#[derive(Debug, Clone)]
pub struct Alphabet {
    width: usize,
    symbols: Vec<Bits>,
    index: HashMap<Bits, SymbolId>,
}

impl Alphabet {
    /// Builds the alphabet for a layout of total width `width`, enumerating
    /// all `2^width` bit-strings in lexicographic order, numbered from 0.
    pub fn build(width: usize) -> Self {
        let count = 1usize << width;
        let mut symbols = Vec::with_capacity(count);
        let mut index = HashMap::with_capacity(count);
        for n in 0..count {
            let bits = bits_of(n, width);
            index.insert(bits.clone(), SymbolId(n));
            symbols.push(bits);
        }
        Self {
            width,
            symbols,
            index,
        }
    }

    pub fn from_layout(layout: &TapeLayout) -> Self {
        Self::build(layout.width())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of symbols, `2^width`.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, id: SymbolId) -> &[bool] {
        &self.symbols[id.0]
    }

    /// Returns the (string -> int) bijection, per §4.1's `get_symbol_map`.
    pub fn get_symbol_map(&self) -> &HashMap<Bits, SymbolId> {
        &self.index
    }

    pub fn id_of(&self, bits: &[bool]) -> Option<SymbolId> {
        self.index.get(bits).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Bits)> {
        self.symbols.iter().enumerate().map(|(i, b)| (SymbolId(i), b))
    }
}

/// Errors surfaced while parsing or constructing alphabets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlphabetError {
    InvalidBit(char),
    WrongLength { expected: usize, found: usize },
}

impl fmt::Display for AlphabetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBit(c) => write!(f, "invalid bit character '{}', expected '0' or '1'", c),
            Self::WrongLength { expected, found } => write!(
                f,
                "symbol has length {} but layout requires length {}",
                found, expected
            ),
        }
    }
}

impl std::error::Error for AlphabetError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_is_a_bijection() {
        let alphabet = Alphabet::build(3);
        assert_eq!(alphabet.len(), 8);
        let mut seen = std::collections::HashSet::new();
        for (id, bits) in alphabet.iter() {
            assert_eq!(bits.len(), 3);
            assert!(seen.insert(id));
            assert_eq!(alphabet.id_of(bits), Some(id));
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn lexicographic_order_matches_numeric_order() {
        let alphabet = Alphabet::build(2);
        assert_eq!(alphabet.symbol(SymbolId(0)), &[false, false]);
        assert_eq!(alphabet.symbol(SymbolId(1)), &[false, true]);
        assert_eq!(alphabet.symbol(SymbolId(2)), &[true, false]);
        assert_eq!(alphabet.symbol(SymbolId(3)), &[true, true]);
    }

    #[test]
    fn bit_string_round_trips() {
        let bits = string_to_bits("101").unwrap();
        assert_eq!(bits_to_string(&bits), "101");
    }
}
