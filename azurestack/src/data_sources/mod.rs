pub mod client_config;
pub mod network_interface;

pub use client_config::ClientConfigDataSource;
pub use network_interface::NetworkInterfaceDataSource;
