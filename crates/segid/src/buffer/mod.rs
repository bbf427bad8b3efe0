mod lock;
mod segment;
mod status;
#[cfg(test)]
mod tests;

pub use lock::*;
pub use segment::*;
pub use status::*;
