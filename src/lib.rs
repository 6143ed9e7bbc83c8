//! # dirq
//!
//! Filesystem-backed competing-consumer work queue.
//!
//! One or more independent instances watch a shared directory. Each regular
//! file appearing there is one unit of work, and instances race to claim files
//! using the filesystem's atomic rename — no locks, no external coordinator,
//! no shared memory. A claimed file is processed by a caller-supplied
//! [`processor::Processor`] and then archived under `processed/` by its
//! original name.
//!
//! The guarantee is competing-consumer mutual exclusion, not transactional
//! exactly-once: no two instances process the same file concurrently, but a
//! processor failure leaves the claimed file stuck in `working/` for manual
//! inspection.

pub mod config;
pub mod consumer;
pub mod error;
pub mod event;
pub mod identity;
pub mod poller;
pub mod processor;
pub mod telemetry;
