pub mod classify;
pub mod context;
pub mod digest;
pub mod error;
pub mod links;
pub mod model;
pub mod outcome;
pub mod store;

pub use error::{AppraiseError, Result};
