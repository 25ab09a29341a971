pub mod encoding;
pub mod memory;
