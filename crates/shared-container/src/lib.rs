//! # Shared Container - Type-Keyed Dependency Container
//!
//! Process-wide store of already-constructed service handles, passed
//! explicitly to whoever needs it instead of living in a global.
//!
//! ## Usage Rules
//!
//! - Keys are derived from a type identity plus an optional instance name
//!   (`ServiceKey::of::<T>()`, `ServiceKey::named::<T>("primary")`)
//! - A missing key is a normal outcome (`None`), never a panic
//! - A stored value of the wrong type is treated exactly like a missing key
//! - Every dependency kind gets an `x_from(&Container) -> Option<X>` accessor
//!   in the crate that owns `X`, so call sites stay statically typed
//!
//! ## Lifecycle
//!
//! ```text
//!   bootstrap (single writer)          steady state (many readers)
//! ┌────────────────────────────┐    ┌────────────────────────────┐
//! │ set / set_factory / update │ ─→ │ get / get_as / x_from(..)  │
//! └────────────────────────────┘    └────────────────────────────┘
//!                 ↑                               │
//!                 └──── reconfiguration / test ───┘
//!                       fixture swapping (set)
//! ```
//!
//! All access goes through a reader/writer lock, so a late `set` is safe:
//! readers observe either the old or the new value, never a partial one.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod container;
pub mod key;

pub use container::{Container, Instance, ServiceMap};
pub use key::{key_for, ServiceKey, INSTANCE_SEPARATOR};
