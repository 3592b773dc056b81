pub mod memory;
pub mod util;
