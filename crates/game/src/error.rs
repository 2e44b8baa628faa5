//! Error types for the simulation crate.

use thiserror::Error;

/// Everything that can be rejected while setting up or feeding a run.
///
/// The tick itself has no failure path; these errors are raised at the
/// boundaries (name lookups, balance/settings validation, RON parsing).
#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown {category} type `{name}`")]
    UnknownKind { category: &'static str, name: String },

    #[error("invalid balance table: {0}")]
    InvalidBalance(String),

    #[error("invalid run settings: {0}")]
    InvalidSettings(String),

    #[error("could not parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: ron::error::SpannedError,
    },
}

impl SimError {
    pub(crate) fn unknown(category: &'static str, name: &str) -> Self {
        SimError::UnknownKind {
            category,
            name: name.to_string(),
        }
    }
}

/// Look up `name` (case-insensitive) in a kind table.
pub(crate) fn parse_kind<T: Copy>(
    category: &'static str,
    name: &str,
    table: &[(&'static str, T)],
) -> Result<T, SimError> {
    let wanted = name.trim();
    table
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(wanted))
        .map(|(_, k)| *k)
        .ok_or_else(|| {
            log::warn!("rejected unknown {} type {:?}", category, name);
            SimError::unknown(category, name)
        })
}
