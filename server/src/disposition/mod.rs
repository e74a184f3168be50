//! Message decision engine.
//!
//! [`decide`] is the pure state machine choosing a [`Disposition`];
//! [`MessageProcessor`] peeks, decides and drives a transport accordingly.

pub mod decision;
pub mod processor;

pub use decision::{
    Decision, Disposition, NoActionReason, REQUEUE_BACKOFF_SECS, decide, requeue_delay,
};
pub use processor::{DEAD_LETTER_LOG_TARGET, MessageProcessor, ProcessOutcome};
