// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![no_std]

//! strata-kernel: deterministic, no_std core of the Strata governed ledger.
//!
//! Everything an independent auditor needs to re-derive a chain or a snapshot
//! lives here: block hashing, merkle roots, chain verification, the layer
//! governance table, layer manifests and snapshot identities.

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod config;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod block;
pub mod verify;
pub mod layer;
pub mod governance;
pub mod change;
pub mod manifest;
pub mod snapshot;
pub mod proof;

#[cfg(test)]
pub mod tests;
