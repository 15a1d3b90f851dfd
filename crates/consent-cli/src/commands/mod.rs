//! Subcommand implementations.

pub(crate) mod config;
pub(crate) mod hash;
pub(crate) mod query;
pub(crate) mod record;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Human-readable, coloured.
    Pretty,
    /// One JSON document on stdout.
    Json,
}

impl OutputFormat {
    pub(crate) fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}
