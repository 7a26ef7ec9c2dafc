pub mod key;
pub mod encoder;
pub mod error;

pub use key::{make_key_fn, KeyFn, KeySpec, DEFAULT_KEY_PROPERTY};
pub use encoder::{encode_line, EntityStream, LineStream, NdjsonEncoder};
pub use error::{NdjsonError, Result};
