//! Durable provider implementations.

pub mod postgres;
