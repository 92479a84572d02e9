//! HostGenius - hosts file manager with named, toggleable groups.

pub mod backup;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod error;
pub mod group;
pub mod hosts;
pub mod manager;
pub mod platform;
pub mod sections;
pub mod store;
pub mod writer;
