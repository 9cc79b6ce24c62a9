//! Dispatch polling core.
//!
//! `DispatchPollRoutine` owns the poll loop: it fetches new dispatches from a
//! `DispatchSource`, writes the unseen ones to an `EventStore` and publishes a
//! `RoutineStatus` snapshot after every cycle.

pub mod poll_routine;

pub use poll_routine::{Clock, DispatchPollRoutine, PollSettings};
