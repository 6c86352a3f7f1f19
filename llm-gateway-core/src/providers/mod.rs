//! Provider mappings and dispatch
//!
//! Each provider family is a set of declarative mapping tables
//! ([`mapping::ProviderMapper`]) plus an error classifier. The [`Adapter`]
//! runs one mapper against one API client, and [`routing`] decides which
//! pair a caller gets.

pub mod adapter;
pub mod anthropic;
pub mod error;
pub mod groq;
pub mod mapping;
pub mod openai;
pub mod routing;

pub use adapter::Adapter;
pub use error::{ApiErrorDetail, ErrorKind, GatewayError, GatewayResult};
pub use mapping::{FileOutputMapper, ProviderMapper};
pub use routing::{
    resolve_model, BuildConfig, GatewayBuilder, ModelRoute, ProviderRegistry, Router,
    TransportKind,
};
