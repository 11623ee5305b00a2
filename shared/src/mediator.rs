use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Identifies one submission. A ticket is only honoured while it is the
/// mediator's pending ticket; closing the form invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    epoch: u64,
    seq: u64,
}

impl Ticket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitError {
    #[error("{message}")]
    InputMissing { field: String, message: String },

    #[error("a submission is already pending")]
    Busy,
}

/// A required form value: `(field name, current value)`.
pub type RequiredField<'a> = (&'a str, &'a str);

/// One form's `{result, error}` pair bound to a single-shot external call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormMediator<R, E = String> {
    result: Option<R>,
    error: Option<E>,
    pending: Option<Ticket>,
    epoch: u64,
    seq: u64,
}

impl<R, E> Default for FormMediator<R, E> {
    fn default() -> Self {
        Self {
            result: None,
            error: None,
            pending: None,
            epoch: 0,
            seq: 0,
        }
    }
}

impl<R, E> FormMediator<R, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_ticket(&self) -> Option<Ticket> {
        self.pending
    }

    /// Starts a submission. Any blank required field fails fast with
    /// `missing_message`; no ticket is issued and nothing should be invoked.
    pub fn submit(
        &mut self,
        required: &[RequiredField<'_>],
        missing_message: &str,
    ) -> Result<Ticket, SubmitError> {
        if self.pending.is_some() {
            debug!("submission rejected while pending");
            return Err(SubmitError::Busy);
        }

        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(SubmitError::InputMissing {
                field: (*field).to_string(),
                message: missing_message.to_string(),
            });
        }

        self.seq += 1;
        let ticket = Ticket {
            epoch: self.epoch,
            seq: self.seq,
        };
        self.result = None;
        self.error = None;
        self.pending = Some(ticket);
        Ok(ticket)
    }

    /// Records a validation failure that never reached the external call.
    pub fn reject(&mut self, error: E) {
        self.result = None;
        self.error = Some(error);
    }

    /// Applies the outcome for `ticket`. Returns `false` when the ticket is
    /// stale (the form was closed or another submission superseded it).
    pub fn settle(&mut self, ticket: Ticket, outcome: Result<R, E>) -> bool {
        if self.pending != Some(ticket) {
            warn!(
                epoch = ticket.epoch,
                seq = ticket.seq,
                current_epoch = self.epoch,
                "discarding stale form settlement"
            );
            return false;
        }

        self.pending = None;
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.error = None;
            }
            Err(error) => {
                self.result = None;
                self.error = Some(error);
            }
        }
        true
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Resets to the initial state regardless of anything in flight.
    pub fn close(&mut self) {
        self.epoch += 1;
        self.result = None;
        self.error = None;
        self.pending = None;
    }
}
