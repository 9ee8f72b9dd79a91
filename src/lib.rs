pub mod authz;
pub mod config;
pub mod logs;
pub mod proto;
pub mod server;
