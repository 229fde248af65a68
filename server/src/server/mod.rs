mod server;
pub use server::MetavoxelServer;

mod server_config;
pub use server_config::ServerConfig;
