pub mod codec;
pub mod convert;
pub mod error;
