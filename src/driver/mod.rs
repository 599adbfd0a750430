//! Driver layer: the main API for sending commands and managing
//! privilege levels on network devices.

mod builder;
mod network;
mod privilege;
pub(crate) mod response;

pub use builder::DriverBuilder;
pub use network::NetworkDriver;
pub use privilege::PrivilegeManager;
pub use response::{MultiResponse, Response};
