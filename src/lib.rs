//! Static file server that keeps dot files and dot directories private.

pub mod fs;
pub mod path_utils;
pub mod server;
