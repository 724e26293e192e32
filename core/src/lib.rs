//! coastal-core: the turn engine, event catalog and persistence for a
//! coastal city-resilience game. No rendering, no I/O beyond the store.

pub mod achievement;
pub mod catalog;
pub mod climate;
pub mod command;
pub mod config;
pub mod end_condition;
pub mod engine;
pub mod error;
pub mod event;
pub mod rng;
pub mod save_manager;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod stats;
pub mod store;
pub mod structure;
pub mod types;
pub mod validate;
