//! Options for the synthesis procedure.

use clap::{ArgEnum, Parser};

/// Implement [`Display`](std::fmt::Display) with the information in
/// [`clap::ArgEnum`].
///
/// This ensures consistent names for parsing of the default argument.
macro_rules! clap_display {
    ($t:ty) => {
        impl std::fmt::Display for $t
        where
            $t: clap::ArgEnum,
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let self_str = Self::VARIANTS
                    .iter()
                    .find(|s| &Self::from_str(s, false).unwrap() == self)
                    .unwrap();
                write!(f, "{}", self_str)
            }
        }
    };
}

/// Whether the outer `k_aut` bound search for a candidate invariant starts
/// at size 1 and increases strictly, or at a user-supplied starting size
/// (the "exploration strategy"-equivalent knob of the ambient stack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ArgEnum)]
pub enum KBoundStrategy {
    /// Always start the search at `k_aut = 1`.
    #[clap(name = "strict")]
    Strict,
    /// Start the search at the size of a user-supplied advice pair, if one
    /// was given, skipping straight past sizes already known too small.
    #[clap(name = "resume")]
    Resume,
}
impl Default for KBoundStrategy {
    fn default() -> Self {
        Self::Strict
    }
}
clap_display!(KBoundStrategy);

/// Whether C8 searches for a relation `T` at all, or only runs the
/// invariant-only checks of §4.7.1/§4.7.2 against a hand-supplied `A`
/// (`check.py`'s "dry-run" mode, supplement #5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ArgEnum)]
pub enum RelationSearch {
    /// Search for a relation `T` once a candidate invariant passes the
    /// initial-inclusion and inductiveness checks.
    #[clap(name = "always")]
    Always,
    /// Only check initial inclusion and inductiveness; never search for a
    /// relation. Requires a pre-supplied invariant, since otherwise no
    /// candidate would ever be accepted as a proof.
    #[clap(name = "never")]
    Never,
}
impl Default for RelationSearch {
    fn default() -> Self {
        Self::Always
    }
}
clap_display!(RelationSearch);

/// The trace level / verbosity for the logging framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ArgEnum)]
pub enum TraceLevel {
    /// Turn logging off.
    #[clap(name = "off")]
    Off,
    /// Only print errors.
    #[clap(name = "error")]
    Error,
    /// Print errors and warnings.
    #[clap(name = "warn")]
    Warn,
    /// Print errors, warnings and useful information.
    #[clap(name = "info")]
    Info,
    /// Print errors, warnings, useful and debug information.
    #[clap(name = "debug")]
    Debug,
    /// Print all information, including very verbose output.
    #[clap(name = "trace")]
    Trace,
}
impl Default for TraceLevel {
    fn default() -> Self {
        Self::Error
    }
}
clap_display!(TraceLevel);

impl From<TraceLevel> for log::LevelFilter {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off => Self::Off,
            TraceLevel::Error => Self::Error,
            TraceLevel::Warn => Self::Warn,
            TraceLevel::Info => Self::Info,
            TraceLevel::Debug => Self::Debug,
            TraceLevel::Trace => Self::Trace,
        }
    }
}

// Workaround for https://github.com/TeXitoi/structopt/issues/333
#[cfg_attr(not(doc), allow(missing_docs))]
#[cfg_attr(
    doc,
    doc = r#"
A group of options used for parsing the arguments of the
command-line interface.

This struct should mainly be used with [`clap`] and not
instantiated manually. For using this crate as a library,
please use [`SynthesisOptions`] directly instead. This struct
only includes the additional fields needed for locating the
input files.
"#
)]
#[derive(Debug, Clone, Parser)]
#[clap(version, about)]
pub struct CliOptions {
    /// The HyperLTL(MSO) formula to prove, in the surface syntax of §6.
    #[clap(short = 'f', long = "formula", about = "HyperLTL(MSO) formula to prove")]
    pub formula: String,
    /// The explicit-NFA file giving the extended initial-configuration set
    /// `I_ext`.
    #[clap(long = "initial_config", about = "Path to the explicit-NFA file for I_ext")]
    pub initial_config: String,
    /// The explicit-NFA file giving the per-trace system transducer
    /// `R_sys`.
    #[clap(long = "system_transducer", about = "Path to the explicit-NFA file for R_sys")]
    pub system_transducer: String,
    /// The symbol-mapping file naming the atomic propositions shared by
    /// every trace tape.
    #[clap(long = "symbol_mapping", about = "Path to the atomic-proposition symbol-mapping file")]
    pub symbol_mapping: String,
    /// A pre-supplied candidate invariant, in explicit-NFA format, to check
    /// or to resume the search from.
    #[clap(long = "invariant", about = "Path to a pre-supplied candidate invariant")]
    pub invariant: Option<String>,
    /// A pre-supplied candidate relation, in explicit-NFA format.
    #[clap(long = "relation", about = "Path to a pre-supplied candidate relation")]
    pub relation: Option<String>,
    /// The trace level to use for instantiating the logging framework.
    #[clap(
        arg_enum,
        short = 't',
        long = "trace",
        name = "trace-level",
        default_value_t,
        about = "Trace level"
    )]
    pub trace_level: TraceLevel,
    /// The set of options for the synthesis process.
    #[clap(flatten)]
    pub synthesis_options: SynthesisOptions,
}

// Workaround for https://github.com/TeXitoi/structopt/issues/333
#[cfg_attr(not(doc), allow(missing_docs))]
#[cfg_attr(
    doc,
    doc = r#"
Options to control the synthesis procedure.

These options can then be used with [`prove_with`](crate::prove_with).

# Examples

```
use hyperltlmso::options::*;
let options = SynthesisOptions {
    k_bound_strategy: KBoundStrategy::Resume,
    relation_search: RelationSearch::Never,
    ..SynthesisOptions::default()
};
```
"#
)]
#[derive(Debug, Clone, Parser)]
pub struct SynthesisOptions {
    /// The largest candidate automaton size (`k_aut`) to search up to.
    #[clap(long = "k-max", default_value = "8", about = "Largest candidate automaton size to search")]
    pub k_max: usize,
    /// Whether the `k_aut` search always starts at 1 or resumes from a
    /// pre-supplied advice pair's size.
    #[clap(
        arg_enum,
        long = "k-bound-strategy",
        name = "k-strategy",
        default_value_t,
        about = "Where the k_aut search starts"
    )]
    pub k_bound_strategy: KBoundStrategy,
    /// Whether a relation `T` is searched for, or only the invariant-only
    /// checks are run against a pre-supplied candidate (`check.py`'s
    /// dry-run mode).
    #[clap(
        arg_enum,
        long = "relation-search",
        name = "search",
        default_value_t,
        about = "Whether to search for a relation, or only check a supplied invariant"
    )]
    pub relation_search: RelationSearch,
    /// Whether the eager counterexample-word enumeration of the CEGAR
    /// learning clauses (§4.8 steps 5-6) is capped at a maximum word
    /// length, beyond which a failing check is treated as a silent skip
    /// rather than a learned clause.
    #[clap(long = "learning-word-limit", about = "Cap on counterexample word length eligible for a learning clause")]
    pub learning_word_limit: Option<usize>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            k_max: 8,
            k_bound_strategy: KBoundStrategy::default(),
            relation_search: RelationSearch::default(),
            learning_word_limit: None,
        }
    }
}

impl From<&CliOptions> for SynthesisOptions {
    fn from(options: &CliOptions) -> Self {
        options.synthesis_options.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_level_display_round_trips_through_arg_enum() {
        for name in TraceLevel::VARIANTS {
            let level = TraceLevel::from_str(name, false).unwrap();
            assert_eq!(level.to_string(), *name);
        }
    }

    #[test]
    fn trace_level_converts_to_a_log_level_filter() {
        assert_eq!(log::LevelFilter::from(TraceLevel::Trace), log::LevelFilter::Trace);
        assert_eq!(log::LevelFilter::from(TraceLevel::Off), log::LevelFilter::Off);
    }

    #[test]
    fn synthesis_options_default_matches_cli_defaults() {
        let opts = SynthesisOptions::default();
        assert_eq!(opts.k_max, 8);
        assert_eq!(opts.relation_search, RelationSearch::Always);
    }
}
