//! The `gatehouse configure` wizard.
//!
//! Each section keeps its decisions in pure functions over
//! [`RuntimeConfig`](gatehouse_core::RuntimeConfig); only the `collect`
//! functions talk to the [`Prompter`](gatehouse_core::Prompter). The
//! [`Wizard`] driver runs the selected sections in a fixed order.

mod error;

pub mod driver;
pub mod gateway;
pub mod health;
pub mod links;
pub mod remote;
pub mod section;
pub mod summary;
pub mod workspace;

pub use driver::{Wizard, WizardOptions, WizardOutcome};
pub use error::WizardError;
pub use health::{HealthCheck, ProbeHealthCheck};
pub use section::Section;
