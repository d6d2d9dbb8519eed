pub mod diff;
pub mod inspect;
pub mod snapshots;
pub mod timeline;
pub mod verify;
