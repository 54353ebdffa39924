//! Protocol boundary and HTTP surface of the watch-together server

pub mod http;
pub mod impls;
pub mod protocol;

pub use http::{create_router, AppState};
