//! # Value model
//!
//! A [`Value`] is one of a closed set of property-list kinds.
//!
//! Scalars (everything except [`Array`] and [`Dict`]) are plain owned data.
//! Containers are shared handles: cloning an [`Array`] or a [`Dict`] yields
//! another handle to the same instance, and that identity is observable via
//! [`ContainerId`]. Encoders deduplicate scalars by content and containers by
//! identity; see [`ValueKey`].

pub mod ds_n_a;
mod error;
mod key;
mod value;

pub use error::*;
pub use key::*;
pub use value::*;
