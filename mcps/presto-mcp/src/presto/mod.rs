//! Presto client module
//!
//! The [`Driver`], [`Connection`] and [`Cursor`] traits form the seam the
//! executor talks to; [`PrestoDriver`] implements them over the Presto REST
//! protocol.

pub mod client;
pub mod driver;
pub mod error;
pub mod types;

pub use client::{Auth, ClientSession, PrestoConnection, PrestoCursor, PrestoDriver};
pub use driver::{Connection, Cursor, Driver};
pub use error::{ClientError, ClientResult};
pub use types::{Column, QueryResults};
