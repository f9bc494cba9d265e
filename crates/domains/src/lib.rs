//! # domains
//!
//! Domain models, the error taxonomy, and the ports (traits) every
//! adapter crate implements. No I/O lives here.

pub mod error;
pub mod models;
pub mod ports;

pub use error::{AppError, FieldError, Result};
pub use models::*;
pub use ports::*;
