//! This module contains the error types of the library, one per subsystem,
//! along with the container used to attach instruction locations to them.

pub mod container;
pub mod execution;
pub mod layout;
