pub mod http;
pub mod service;

pub use service::handle_request;
