pub mod connectivity_monitor;
pub mod probe;

pub use connectivity_monitor::ConnectivityMonitor;
pub use probe::{ConnectivityProbe, TcpConnectivityProbe};
