mod baseline;
mod delta;
mod segment;
mod session;
mod stop;
mod trip;
mod window;

pub use baseline::*;
pub use delta::*;
pub use segment::*;
pub use session::*;
pub use stop::*;
pub use trip::*;
pub use window::*;
