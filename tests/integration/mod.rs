//! Integration tests for adcdutil
//!
//! This module contains integration tests that verify the functionality
//! of the conversion pipeline and of real disc images.

pub mod iso;
pub mod pipeline;
