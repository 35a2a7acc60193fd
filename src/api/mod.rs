pub mod error;
pub mod connection;
pub mod client;
pub mod status;
pub mod live;
pub mod broker;

#[cfg(test)]
pub(crate) mod mock;

pub use error::*;
pub use connection::*;
pub use client::*;
pub use status::*;
pub use live::*;
pub use broker::*;
