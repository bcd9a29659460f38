// Infrastructure adapters behind the application ports.

pub mod http_client;
pub mod object_store;
pub mod warehouse;
