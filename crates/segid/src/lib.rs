#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod backend;
mod buffer;
mod cache;
mod error;
#[cfg(feature = "futures")]
mod futures;
mod mutex;
mod option;
mod time;

pub use crate::backend::*;
pub use crate::buffer::*;
pub use crate::cache::*;
pub use crate::error::*;
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
#[cfg(feature = "futures")]
pub use crate::futures::*;
pub use crate::option::*;
pub use crate::time::*;
