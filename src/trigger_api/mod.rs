//! The downstream build trigger API: the canonical parameters every hook
//! provider produces, and the client that sends them.

mod client;
pub mod model;

pub use self::client::TriggerClient;
pub use self::model::{TriggerApiParams, TriggerApiResponse};
