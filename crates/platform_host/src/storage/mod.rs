//! Storage contracts: the durable VFS mirror and synchronous preference storage.

pub mod durable;
pub mod prefs;
