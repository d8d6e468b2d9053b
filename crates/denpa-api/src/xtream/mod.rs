mod client;
mod error;
mod types;

pub use client::XtreamClient;
pub use error::XtreamError;
