pub mod encoding;
pub mod mmap;
pub mod progress;
pub mod trigram;

pub use encoding::*;
pub use mmap::*;
pub use trigram::*;
