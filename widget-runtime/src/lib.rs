pub mod backend;
pub mod config_store;
pub mod defaults;
pub mod files;
pub mod storage;
pub mod widget;
