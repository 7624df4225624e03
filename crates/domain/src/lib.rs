//! # domohub-domain
//!
//! Pure domain model for the domohub orchestration hub.
//!
//! ## Responsibilities
//! - Foundational types: string identifiers, error conventions, timestamps
//! - Define **Devices** (inputs reporting telemetry, outputs accepting commands)
//! - Define **Timers** (fixed time-of-day or solar-relative rules)
//! - Define **Events** (device update notifications for observers)
//! - Define **Hardware** configuration (which plugin drives which devices)
//! - Compute **solar times** (sunrise, sunset, …) for a date and location
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod event;
pub mod hardware;
pub mod solar;
pub mod timer;
