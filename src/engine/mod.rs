//! Container engine plumbing
//!
//! The pipeline never spawns processes directly. It asks [`ContainerEngine`] for an
//! [`Invocation`] and hands it to a [`CommandRunner`]: [`SystemRunner`] for real
//! runs, [`MockRunner`] to record calls in tests.

pub mod container;
pub mod mock;
pub mod runner;

pub use container::ContainerEngine;
pub use mock::{FailureRule, MockRunner};
pub use runner::{CommandRunner, Invocation, ProcessError, SystemRunner};
