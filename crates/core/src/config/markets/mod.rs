//! Static market templates.
//!
//! One versioned base template plus per-market overrides applied key by
//! key, instead of near-duplicate whole-file copies. Every template is
//! validated before it leaves the resolver.

mod base;
mod bob;

pub use base::{base, rate_strategy_stable_one, rate_strategy_volatile_one};
pub use bob::bob;
