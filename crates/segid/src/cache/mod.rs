mod lock;
mod registry;

pub use lock::*;
pub(crate) use registry::*;
