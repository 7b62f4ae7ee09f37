//! Reconciler: compares drift against policy and decides what to correct.
//!
//! Everything here is a pure function of its inputs. A corrected value is
//! always the exact desired value, and an observed value equal to the desired
//! one is never drift, so the platform echoing a correction back cannot start
//! another round.

pub mod action;
pub mod plan;
pub mod reconciler;

pub use action::{CorrectiveAction, ResourceKey};
pub use plan::{needs_roster, plan_command};
pub use reconciler::reconcile;
