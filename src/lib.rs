//! Normalizes version-control webhooks into build trigger requests.
//!
//! [`hooks`] holds the pure decision logic per provider, [`trigger_api`] the
//! canonical build parameters and the client for the downstream API, and
//! [`web`] the HTTP routing around them.

pub mod config;
pub mod hooks;
pub mod proxy;
pub mod trigger_api;
pub mod web;
