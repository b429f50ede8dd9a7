//! Session state: the single retained result slot.
//!
//! One [`Session`] value holds the last run's outcome. Each successful run
//! overwrites (never merges) the slot; the view and export functions are
//! pure reads over the retained state, so they can re-render at any time
//! without reprocessing. Single writer (the pipeline), single reader (the
//! render/export step).

use crate::export;
use crate::output::RunOutcome;
use crate::ExtractError;

/// What the user should currently be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run has happened yet.
    AwaitingInput,
    /// The last run found no PDFs in the shared folder.
    NoInput,
    /// The last run processed documents but none yielded a table.
    NoResults,
    /// The last run produced a consolidated table with this many rows.
    Ready { rows: usize },
}

/// The session-scoped slot holding the last consolidated result.
#[derive(Debug, Default)]
pub struct Session {
    last: Option<RunOutcome>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot with a fresh run outcome.
    pub fn record(&mut self, outcome: RunOutcome) {
        self.last = Some(outcome);
    }

    /// The retained outcome, if any run has completed.
    pub fn last(&self) -> Option<&RunOutcome> {
        self.last.as_ref()
    }

    /// Pure view of the retained state.
    pub fn view(&self) -> RunState {
        match &self.last {
            None => RunState::AwaitingInput,
            Some(outcome) if outcome.is_no_input() => RunState::NoInput,
            Some(outcome) => match &outcome.table {
                Some(table) => RunState::Ready {
                    rows: table.row_count(),
                },
                None => RunState::NoResults,
            },
        }
    }

    /// Re-render the retained consolidated table as CSV.
    ///
    /// Returns `None` when there is no exportable result (no run yet, no
    /// input, or nothing parsed) — the "no exported file available" states.
    pub fn export_csv(&self) -> Option<Result<String, ExtractError>> {
        self.last
            .as_ref()
            .and_then(|outcome| outcome.table.as_ref())
            .map(export::to_csv_string)
    }
}
