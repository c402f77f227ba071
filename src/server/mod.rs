pub mod http;
pub mod sessions;

pub use http::{HttpServer, SESSION_ID_HEADER};
pub use sessions::SessionStore;
