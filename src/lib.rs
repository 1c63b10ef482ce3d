pub mod api;
pub mod common;
pub mod inflate;
pub mod stream;

pub use api::Inflater;
pub use inflate::{Flush, InflateStream, Status};
pub use stream::DeflateDecoder;
