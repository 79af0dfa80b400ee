//! Command handlers for the `h2o` binary

pub mod convert;
pub mod init;
pub mod inspect;

pub use convert::convert_export;
pub use init::init_config;
pub use inspect::inspect_export;
