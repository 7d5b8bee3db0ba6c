// # State Store Implementations
//
// This module provides implementations of the StateStore trait for
// different persistence strategies, plus the exported result file.

pub mod file;
pub mod memory;
pub mod result;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use result::ResultFile;
