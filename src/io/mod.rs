//! Model persistence.

pub mod native;

pub use native::{DeserializeError, FormatHeader, ModelType, NativeCodec, SerializeError};
