//! Event Sequence Check
//!
//! Walks each identity's events in time order and flags terminal events
//! (purchase-like) that are not preceded by a prerequisite event
//! (add-to-cart-like) anywhere earlier in that identity's history.
//!
//! # State per identity
//!
//! ```text
//!   seen_prerequisite = false
//!   for event in events sorted by parsed timestamp:
//!       prerequisite?            -> seen_prerequisite = true   (never reset)
//!       terminal && !seen        -> violation
//! ```
//!
//! The identity column is chosen once, up front: the primary key if the schema
//! has it, else the secondary key, else the whole check is skipped.

use crate::quality::check::{Check, CheckContext, CheckResult, EVENT_SEQUENCE};
use crate::quality::config::DqConfig;
use crate::quality::records::{RecordSet, Schema};
use crate::quality::timestamp::Timestamp;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

// =============================================================================
// IDENTITY SELECTION
// =============================================================================

/// Which column identifies a user/session for sequencing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IdentityField {
    Primary(String),
    Secondary(String),
    /// Neither key exists; the check does not run.
    Unavailable,
}

impl IdentityField {
    pub fn resolve(schema: &Schema, primary: &str, secondary: &str) -> Self {
        if schema.contains(primary) {
            IdentityField::Primary(primary.to_string())
        } else if schema.contains(secondary) {
            IdentityField::Secondary(secondary.to_string())
        } else {
            IdentityField::Unavailable
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            IdentityField::Primary(name) | IdentityField::Secondary(name) => Some(name),
            IdentityField::Unavailable => None,
        }
    }
}

// =============================================================================
// SYNONYM SETS
// =============================================================================

/// Case-insensitive set of equivalent event names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymSet {
    names: HashSet<String>,
}

impl SynonymSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, event: &str) -> bool {
        self.names.contains(&event.to_lowercase())
    }
}

/// Everything the walk needs besides the rows themselves.
#[derive(Debug, Clone)]
pub struct SequenceRules {
    pub event_name_field: String,
    pub primary_identity_field: String,
    pub secondary_identity_field: String,
    pub prerequisites: SynonymSet,
    pub terminals: SynonymSet,
}

impl SequenceRules {
    pub fn from_config(config: &DqConfig) -> Self {
        Self {
            event_name_field: config.event_name_field.clone(),
            primary_identity_field: config.primary_identity_field.clone(),
            secondary_identity_field: config.secondary_identity_field.clone(),
            prerequisites: SynonymSet::new(&config.prerequisite_events),
            terminals: SynonymSet::new(&config.terminal_events),
        }
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// A terminal event with no earlier prerequisite for the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceViolation {
    /// Identity value.
    pub user: String,
    pub row_index: usize,
    /// Event name as written in the row.
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceResult {
    pub identity: IdentityField,
    /// True when the check could not run (no identity or event-name column).
    pub skipped: bool,
    pub violations: Vec<SequenceViolation>,
}

impl SequenceResult {
    fn skipped(identity: IdentityField) -> Self {
        Self {
            identity,
            skipped: true,
            violations: Vec::new(),
        }
    }
}

// =============================================================================
// WALK
// =============================================================================

/// Run the per-identity walk.
///
/// `event_times` holds the parsed event time per row; rows without one are left
/// out of the ordering entirely. Groups are visited in ascending identity order.
pub fn sequence_violations(
    records: &RecordSet,
    event_times: Option<&[Option<Timestamp>]>,
    rules: &SequenceRules,
) -> SequenceResult {
    let schema = records.schema();
    let identity = IdentityField::resolve(
        schema,
        &rules.primary_identity_field,
        &rules.secondary_identity_field,
    );
    let (Some(identity_pos), Some(event_pos)) = (
        identity.name().and_then(|name| schema.position(name)),
        schema.position(&rules.event_name_field),
    ) else {
        return SequenceResult::skipped(identity);
    };

    let mut groups: BTreeMap<&str, Vec<(Timestamp, usize, &str)>> = BTreeMap::new();
    for record in records {
        let (Some(user), Some(event)) = (record.value_at(identity_pos), record.value_at(event_pos))
        else {
            continue;
        };
        let Some(ts) = event_times.and_then(|times| times.get(record.row()).copied().flatten())
        else {
            continue;
        };
        groups
            .entry(user)
            .or_default()
            .push((ts, record.row(), event));
    }

    let mut violations = Vec::new();
    for (user, mut events) in groups {
        // stable: equal instants keep row order
        events.sort_by_key(|(ts, _, _)| *ts);

        let mut seen_prerequisite = false;
        for (_, row, event) in events {
            if rules.prerequisites.contains(event) {
                seen_prerequisite = true;
            }
            if rules.terminals.contains(event) && !seen_prerequisite {
                violations.push(SequenceViolation {
                    user: user.to_string(),
                    row_index: row,
                    event: event.to_string(),
                });
            }
        }
    }

    SequenceResult {
        identity,
        skipped: false,
        violations,
    }
}

pub struct SequenceCheck;

impl Check for SequenceCheck {
    fn name(&self) -> &'static str {
        EVENT_SEQUENCE
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        let rules = SequenceRules::from_config(ctx.config);
        CheckResult::Sequence(sequence_violations(ctx.records, ctx.event_times(), &rules))
    }
}
