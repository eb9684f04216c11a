//! Parses the explicit-NFA textual format of §6: an `@NFA-explicit` header,
//! a `%States-enum` directive naming every state, `%Initial`/`%Final`
//! directives naming subsets of them, and one `<src> <label> <dst>`
//! transition per remaining line. `label` is a plain bit-string for an
//! acceptor, or a `u|v` pair of equal-length bit-strings for a transducer.

use crate::alphabet::{id_of, string_to_bits};
use crate::automaton::Nfa;

use super::DriverError;

/// One `<src> <label> <dst>` line, before the label has been interpreted as
/// an acceptor or transducer symbol.
#[derive(Debug, Clone)]
pub struct RawTransition {
    pub src: usize,
    pub label: String,
    pub dst: usize,
}

/// The directive-level structure of an explicit-NFA file, independent of
/// whether its labels turn out to be acceptor or transducer symbols.
#[derive(Debug, Clone)]
pub struct ParsedStates {
    pub num_states: usize,
    pub initial: Vec<usize>,
    pub final_states: Vec<usize>,
    pub transitions: Vec<RawTransition>,
}

fn find_state(names: &[String], token: &str) -> Result<usize, DriverError> {
    names
        .iter()
        .position(|n| n == token)
        .ok_or_else(|| DriverError::UnknownState(token.to_string()))
}

/// Parses the directive/transition structure of an explicit-NFA file,
/// without yet committing to an alphabet width.
fn parse_states(text: &str) -> Result<ParsedStates, DriverError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines.next().ok_or(DriverError::EmptyFile)?;
    if header != "@NFA-explicit" {
        return Err(DriverError::MissingHeader);
    }

    let mut state_names: Vec<String> = Vec::new();
    let mut initial = Vec::new();
    let mut final_states = Vec::new();
    let mut transitions = Vec::new();

    for line in lines {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("%States-enum") => {
                state_names = fields.map(str::to_string).collect();
            }
            Some("%Initial") => {
                for token in fields {
                    initial.push(find_state(&state_names, token)?);
                }
            }
            Some("%Final") => {
                for token in fields {
                    final_states.push(find_state(&state_names, token)?);
                }
            }
            Some(src_token) => {
                let label = fields
                    .next()
                    .ok_or_else(|| DriverError::MalformedTransition(line.to_string()))?;
                let dst_token = fields
                    .next()
                    .ok_or_else(|| DriverError::MalformedTransition(line.to_string()))?;
                if fields.next().is_some() {
                    return Err(DriverError::MalformedTransition(line.to_string()));
                }
                transitions.push(RawTransition {
                    src: find_state(&state_names, src_token)?,
                    label: label.to_string(),
                    dst: find_state(&state_names, dst_token)?,
                });
            }
            None => {}
        }
    }

    Ok(ParsedStates {
        num_states: state_names.len(),
        initial,
        final_states,
        transitions,
    })
}

/// Builds a plain acceptor [`Nfa`] from an explicit-NFA file whose labels
/// are bit-strings of exactly `width` bits.
pub fn parse_acceptor(text: &str, width: usize) -> Result<Nfa, DriverError> {
    let parsed = parse_states(text)?;
    let mut nfa = Nfa::new(parsed.num_states, 1 << width);
    for s in parsed.initial {
        nfa.set_initial(s);
    }
    for s in parsed.final_states {
        nfa.set_final(s);
    }
    for t in &parsed.transitions {
        let bits = string_to_bits(&t.label)?;
        if bits.len() != width {
            return Err(DriverError::WrongLabelWidth {
                expected: width,
                found: bits.len(),
            });
        }
        nfa.add_transition(t.src, id_of(&bits), t.dst);
    }
    Ok(nfa)
}

/// Builds a transducer [`Nfa`] from an explicit-NFA file whose labels are
/// `u|v` pairs, each half exactly `half_width` bits; the resulting
/// alphabet has width `2 * half_width`, current half first.
pub fn parse_transducer(text: &str, half_width: usize) -> Result<Nfa, DriverError> {
    let parsed = parse_states(text)?;
    let width = half_width * 2;
    let mut nfa = Nfa::new(parsed.num_states, 1 << width);
    for s in parsed.initial {
        nfa.set_initial(s);
    }
    for s in parsed.final_states {
        nfa.set_final(s);
    }
    for t in &parsed.transitions {
        let mut halves = t.label.splitn(2, '|');
        let u = halves
            .next()
            .ok_or_else(|| DriverError::MalformedTransition(t.label.clone()))?;
        let v = halves
            .next()
            .ok_or_else(|| DriverError::MalformedTransition(t.label.clone()))?;
        let mut bits = string_to_bits(u)?;
        let mut v_bits = string_to_bits(v)?;
        if bits.len() != half_width || v_bits.len() != half_width {
            return Err(DriverError::WrongLabelWidth {
                expected: width,
                found: bits.len() + v_bits.len(),
            });
        }
        bits.append(&mut v_bits);
        nfa.add_transition(t.src, id_of(&bits), t.dst);
    }
    Ok(nfa)
}

/// Parses the symbol-mapping file: one atomic-proposition name per
/// non-empty line, in the order every tape's variables are laid out.
pub fn parse_symbol_mapping(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEPTOR_TEXT: &str = "\
@NFA-explicit
%States-enum s0 s1
%Initial s0
%Final s1
s0 1 s1
s1 1 s1
";

    #[test]
    fn acceptor_parses_states_and_transitions() {
        let nfa = parse_acceptor(ACCEPTOR_TEXT, 1).unwrap();
        assert_eq!(nfa.num_states(), 2);
        assert!(nfa.accepts(&[1]));
        assert!(!nfa.accepts(&[]));
    }

    #[test]
    fn acceptor_rejects_wrong_label_width() {
        let err = parse_acceptor(ACCEPTOR_TEXT, 2).unwrap_err();
        assert!(matches!(err, DriverError::WrongLabelWidth { .. }));
    }

    const TRANSDUCER_TEXT: &str = "\
@NFA-explicit
%States-enum s0
%Initial s0
%Final s0
s0 0|1 s0
s0 1|0 s0
";

    #[test]
    fn transducer_splits_current_and_next_halves() {
        let nfa = parse_transducer(TRANSDUCER_TEXT, 1).unwrap();
        assert!(nfa.accepts(&[0b01]));
        assert!(nfa.accepts(&[0b10]));
        assert!(!nfa.accepts(&[0b00]));
    }

    #[test]
    fn unknown_state_reference_is_an_error() {
        let text = "@NFA-explicit\n%States-enum s0\n%Initial s0\n%Final s1\n";
        let err = parse_acceptor(text, 1).unwrap_err();
        assert_eq!(err, DriverError::UnknownState("s1".to_string()));
    }

    #[test]
    fn symbol_mapping_skips_blank_lines() {
        let names = parse_symbol_mapping("a\n\nb\n  c  \n");
        assert_eq!(names, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }
}
