//! Command implementations.

mod run;
mod validate;

pub use run::run_load;
pub use validate::run_validate;
