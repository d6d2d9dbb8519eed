// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod api;
pub mod storage;
pub mod ledger;
pub mod governance;
pub mod layers;
pub mod pending;
pub mod snapshot;
pub mod commit;
pub mod recorder;
pub mod engine;
pub mod tools;
pub mod server;
pub mod telemetry;
