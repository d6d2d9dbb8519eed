// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod chain_tests;
pub mod manifest_tests;
pub mod snapshot_tests;
