#![forbid(unsafe_code)]

mod client;
mod error;
mod estimate;
mod session;
mod types;

pub use client::HttpClient;
pub use error::{Error, ErrorKind, Result};
pub use estimate::response_head_bytes;
pub use session::Session;
pub use types::{Request, Response};
