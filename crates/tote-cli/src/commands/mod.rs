//! Command implementations.
//!
//! Each command lives in its own module and exposes an `execute` function
//! taking the parsed arguments.

pub mod build;
pub mod check;
pub mod dev;
pub mod init;
mod templates;
pub mod utils;

pub use build::execute as build_execute;
pub use check::execute as check_execute;
pub use dev::execute as dev_execute;
pub use init::execute as init_execute;
