//! Custom resource conversion webhook protocol.
//!
//! [`ConversionHandler`] turns the raw body of a `ConversionReview` request
//! into the raw body of the reply. It is transport agnostic; the HTTP side
//! lives in [`crate::api`].

mod converter;
pub mod errors;
mod handler;
mod observer;
pub mod review;

pub use converter::{ApiVersionConverter, Converter};
pub use errors::{ConversionError, HandlerError};
pub use handler::ConversionHandler;
pub use observer::{ConversionObserver, NoopObserver, TracingObserver};
pub use review::{ConversionRequest, ConversionResponse, ConversionReview, ConversionStatus};
