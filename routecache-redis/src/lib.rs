#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod store;

#[doc(inline)]
pub use crate::store::{RedisStore, RedisStoreBuilder};
