//! Memory management: address-space switching and per-process heaps.

pub mod address_space;
pub mod heap;

pub use address_space::{activate, frame_for};
pub use heap::{AllocError, BlockAllocator};
