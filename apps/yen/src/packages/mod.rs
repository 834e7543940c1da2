//! Isolated package installs exposed through one shim each.
//!
//! ## Layout
//!
//! ```text
//! ~/.yen_packages/
//! ├── venv_black/     # private environment for `black`
//! ├── black           # shim: entry point moved out of venv_black/bin
//! ├── venv_calc/
//! └── calc            # shim: launcher running `python -m calc`
//! ```

pub mod pathcheck;
pub mod publisher;
pub mod shim;

pub use publisher::{InstallOutcome, PackageRequest, ShimPublisher};
pub use shim::Invocation;
