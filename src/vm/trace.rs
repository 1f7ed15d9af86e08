//! This module contains the record of everything the semantics chose not to
//! model while executing a context.

use serde::{Deserialize, Serialize};

/// How the semantics treats an instruction or value.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Classification {
    /// Translated precisely.
    Tracked,

    /// Deliberately ignored, as it has no effect on tracked state.
    Skipped,

    /// Tracked, but outside what the semantics can model. Its result is
    /// unconstrained.
    Unhandled,
}

/// A single entry in the [`Trace`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TraceRecord {
    /// The identifier of the instruction, or [`None`] for constants.
    pub location: Option<u32>,

    /// The textual form of the instruction or value.
    pub text: String,

    /// Whether the entry was skipped or unhandled.
    pub kind: Classification,

    /// Why the semantics did not model it.
    pub reason: String,
}

/// The ordered skip and unhandled records of a context.
///
/// Each instruction or value is recorded at most once per kind, however often
/// it is executed.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Trace {
    records: Vec<TraceRecord>,
}

impl Trace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record` unless an equivalent record is already present, returning
    /// whether it was added.
    pub fn record(&mut self, record: TraceRecord) -> bool {
        let seen = self.records.iter().any(|r| {
            r.kind == record.kind && r.location == record.location && r.text == record.text
        });
        if !seen {
            self.records.push(record);
        }

        !seen
    }

    /// Gets the records in the order they were made.
    #[must_use]
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Gets the skipped records.
    pub fn skipped(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter().filter(|r| r.kind == Classification::Skipped)
    }

    /// Gets the unhandled records.
    pub fn unhandled(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter().filter(|r| r.kind == Classification::Unhandled)
    }

    /// Checks whether everything that was executed has been modelled, so that
    /// the context describes the program exactly.
    #[must_use]
    pub fn is_sound(&self) -> bool {
        self.unhandled().next().is_none()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod test {
    use crate::vm::trace::{Classification, Trace, TraceRecord};

    fn record(location: u32, kind: Classification) -> TraceRecord {
        TraceRecord {
            location: Some(location),
            text: format!("%{location} = fadd"),
            kind,
            reason: "floating point".into(),
        }
    }

    #[test]
    fn records_each_entry_once() {
        let mut trace = Trace::new();
        assert!(trace.record(record(1, Classification::Skipped)));
        assert!(!trace.record(record(1, Classification::Skipped)));
        assert!(trace.record(record(2, Classification::Skipped)));

        assert_eq!(trace.len(), 2);
        assert!(trace.is_sound());
    }

    #[test]
    fn unhandled_entries_make_the_trace_unsound() {
        let mut trace = Trace::new();
        trace.record(record(1, Classification::Skipped));
        trace.record(record(3, Classification::Unhandled));

        assert!(!trace.is_sound());
        assert_eq!(trace.skipped().count(), 1);
        assert_eq!(trace.unhandled().count(), 1);
    }

    #[test]
    fn serialises_to_json() -> anyhow::Result<()> {
        let mut trace = Trace::new();
        trace.record(record(4, Classification::Unhandled));
        let json = serde_json::to_value(&trace)?;
        assert_eq!(json["records"][0]["kind"], "Unhandled");
        assert_eq!(json["records"][0]["location"], 4);

        Ok(())
    }
}
