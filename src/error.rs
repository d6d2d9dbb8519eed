// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use alloc::string::String;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// A layer identifier outside L0/L1/L2.
    UnknownLayer(String),
    /// A recording mode outside full/hash_only/none.
    UnknownRecordingMode(String),
    /// A change action outside create/update/delete/promote.
    UnknownAction(String),
    /// A commit type outside explicit/auto.
    UnknownCommitType(String),
    /// A value that should have been a 64 character hex digest.
    MalformedDigest(String),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::UnknownLayer(v) => write!(f, "unknown layer '{}'", v),
            KernelError::UnknownRecordingMode(v) => write!(f, "unknown recording mode '{}'", v),
            KernelError::UnknownAction(v) => write!(f, "unknown change action '{}'", v),
            KernelError::UnknownCommitType(v) => write!(f, "unknown commit type '{}'", v),
            KernelError::MalformedDigest(v) => write!(f, "malformed digest '{}'", v),
        }
    }
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
