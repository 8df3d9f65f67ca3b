//! Lead ownership lifecycle and automated recycling engine.
//!
//! The engine decides when a sales lead is reclaimed from an individual
//! owner into the shared pool, audits every ownership transfer, and delivers
//! at-most-once notifications about pending and executed reclamations. The
//! pool module carries the request-driven side of the same state machine.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod memory;
pub mod pool;
pub mod repository;
pub mod telemetry;
