//! The checkout saga.
//!
//! A purchase touches the local store and the payment gateway with no
//! shared transaction between them, so consistency comes from explicit
//! compensation: every row inserted by an attempt is recorded in an undo
//! log and hard-deleted, in reverse order, the moment a later step fails.
//!
//! ```text
//! Pricing ──► Validating ──► Persisting ──► Capturing ──► Settled
//!                 │               └──────┬──────┘
//!                 ▼                      ▼
//!               Failed ◄────────── Compensating
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod input;
pub mod label;
pub mod mail;
pub mod state;
pub mod undo;

pub use config::Config;
pub use coordinator::CheckoutCoordinator;
pub use error::CheckoutError;
pub use input::{AddressSelection, CheckoutInput};
pub use state::CheckoutState;
