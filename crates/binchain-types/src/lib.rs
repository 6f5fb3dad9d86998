#![warn(clippy::pedantic)]

pub mod error;
pub mod length;
pub mod value;
pub mod vars;

pub use error::TypeError;
pub use length::Len;
pub use value::Value;
pub use vars::Vars;
