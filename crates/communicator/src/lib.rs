//! # Communicator
//!
//! Transport implementations for the [`contracts::Communicator`] boundary.
//!
//! The wire protocol between real processes is deliberately out of scope
//! here; this crate ships the in-process bus used by tests, demos and
//! single-process deployments. Networked transports implement the same
//! trait and drop in without touching the core.

mod inprocess;

pub use inprocess::{InProcessBus, InProcessCommunicator};

pub use contracts::{Communicator, SampleCallback};
