//! Crewline core — crew definitions, the run supervisor, and the input broker.
//!
//! A "crew" is a YAML-defined team of agents with an ordered task list.
//! Running a crew produces an ordered stream of [`run::RunEvent`]s; a run can
//! pause mid-task to ask a human for input, correlated through the shared
//! [`run::InputBroker`].
//!
//! This crate is transport-agnostic. The HTTP surface lives in
//! `crewline-server`; enabling the `axum` feature here adds an
//! `IntoResponse` impl on [`CoreError`] for that adapter.

pub mod crew;
pub mod error;
pub mod run;
pub mod runner;

pub use error::CoreError;
