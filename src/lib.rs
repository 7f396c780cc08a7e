pub mod prelude;
pub mod progress;
pub mod shared;
pub mod source;
