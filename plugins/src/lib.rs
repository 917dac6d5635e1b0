pub mod factory;
pub mod http;
pub mod module;
pub mod operation;
