//! Error types for the Ringforge engine
//!
//! This module defines the error types used throughout the engine:
//! GPU allocation, named binding contracts, render graph configuration
//! and resource lookup.

use std::fmt;
use crate::graphics_device::{BindingType, DescriptorCategory};
use crate::binding::BindingLocation;

/// Result type for Ringforge engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ringforge engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (device call failed, lock poisoned, etc.)
    BackendError(String),

    /// Out of GPU (or host bookkeeping) memory
    OutOfMemory,

    /// GPU allocation failed with a device-provided reason
    AllocationFailed(String),

    /// Invalid argument or resource (zero size, empty name, bad frame index)
    InvalidResource(String),

    /// Initialization failed (configuration, context creation)
    InitializationFailed(String),

    /// A named binding was used that was never registered for the pipeline
    UnknownBinding {
        pipeline: String,
        name: String,
    },

    /// A named binding was used with a resource of the wrong category
    BindingTypeMismatch {
        name: String,
        expected: BindingType,
        actual: DescriptorCategory,
    },

    /// A binding name was re-registered with a different location
    DuplicateBindingName {
        name: String,
        existing: BindingLocation,
        requested: BindingLocation,
    },

    /// The enabled passes of a render graph contain a dependency cycle
    CyclicDependency(Vec<String>),

    /// A render pass failed its setup (recorded on the pass, never fatal to the graph)
    PassSetupFailed {
        pass: String,
        reason: String,
    },

    /// Pipeline, pass or resource not registered
    ResourceNotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::AllocationFailed(msg) => write!(f, "Allocation failed: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::UnknownBinding { pipeline, name } => {
                write!(f, "Unknown binding '{}' for pipeline {}", name, pipeline)
            }
            Error::BindingTypeMismatch { name, expected, actual } => write!(
                f,
                "Binding type mismatch for '{}': binding is {:?}, resource is {:?}",
                name, expected, actual
            ),
            Error::DuplicateBindingName { name, existing, requested } => write!(
                f,
                "Duplicate binding name '{}': registered at {}, re-registered at {}",
                name, existing, requested
            ),
            Error::CyclicDependency(passes) => {
                write!(f, "Cyclic dependency between render passes: {}", passes.join(", "))
            }
            Error::PassSetupFailed { pass, reason } => {
                write!(f, "Setup of render pass '{}' failed: {}", pass, reason)
            }
            Error::ResourceNotFound(msg) => write!(f, "Resource not found: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether this error is a programmer/configuration error that must not be retried
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::UnknownBinding { .. }
                | Error::BindingTypeMismatch { .. }
                | Error::DuplicateBindingName { .. }
                | Error::CyclicDependency(_)
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
