//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the event
//! loop. In particular, it exposes a generational [`Slab`] used as the arena
//! that owns every watcher of a context.

mod slab;

pub(crate) use slab::Slab;
