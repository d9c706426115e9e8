//! # IO Module
//!
//! Interfaces that expose the domain services to the outside world.
//! Currently a JSON REST API under `/api`.

pub mod rest;
