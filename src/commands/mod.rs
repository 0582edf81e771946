//! CLI commands implementation

pub mod init;
pub mod knowledge;
pub mod optimize;
pub mod status;

pub use init::*;
pub use knowledge::*;
pub use optimize::*;
pub use status::*;
