//! Event-sourced case management engine.
//!
//! Cases run CMMN-style definitions: a tree of stages, tasks, milestones,
//! and event listeners wired together by entry and exit criteria, alongside
//! a structured case file and a case team. Every change is an event in a
//! per-case append-only log; the aggregate, the read view, and recovery all
//! fold the same stream.
//!
//! Layers, bottom up:
//! - [`definition`]: static case definitions loaded from YAML
//! - [`instance`]: runtime state and the transition cascade
//! - [`domain`]: CQRS aggregate, commands, events, view, and the case actor
//! - [`event_store`]: file-backed event log with snapshots
//! - [`config`], [`engine_paths`], [`case_trace`]: engine plumbing

pub mod case_trace;
pub mod config;
pub mod definition;
pub mod domain;
pub mod engine_paths;
pub mod event_store;
pub mod instance;
