//! Concrete [`Scheduler`](crate::scheduler::Scheduler) implementations.
//!
//! [`TokioScheduler`] backs operators with real tokio timers in
//! production; [`VirtualScheduler`] is a deterministic manual-advance clock
//! for tests and simulations. Both satisfy the same capability contract,
//! so operators never know which one is driving them.

pub mod tokio_scheduler;
pub mod virtual_scheduler;

pub use tokio_scheduler::TokioScheduler;
pub use virtual_scheduler::VirtualScheduler;
