mod server;

pub use server::{TestServer, cuboid, init_tracing};
