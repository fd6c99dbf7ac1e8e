pub mod charset;
pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod mask;
pub mod session;

pub use error::{MaskError, MaskResult};
pub use session::{MaskOptions, MaskSession};
