mod error;
mod handles;
mod protocol;
mod registry;
mod server;

pub use error::ServerError;
pub use protocol::{Request, Response};
pub use server::Server;
