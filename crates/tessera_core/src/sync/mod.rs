//! # Frame-Phased World Access
//!
//! The core is single-writer: structural mutation (create/destroy, add/remove
//! components) needs exclusive access, while queries only read.
//!
//! ```text
//! Frame N:
//!   ┌──────────────────────┐   ┌──────────────────────────────────┐
//!   │ mutation phase       │ → │ read phase                       │
//!   │ one WorldWriteHandle │   │ many WorldReadHandles (threads)  │
//!   └──────────────────────┘   └──────────────────────────────────┘
//!                                               │
//!                                          end_frame()
//! ```
//!
//! One coarse lock per phase, never per call: the swap-remove and free-list
//! paths inside the world stay lock-free and branch-predictable.

mod phased;

pub use phased::{SharedWorld, WorldReadHandle, WorldWriteHandle};
