pub mod client;
pub mod discovery;
pub mod retry;

pub use client::{AwsClients, AwsInstanceSource};
pub use discovery::{discover, InstanceSource, NormalizedInstance};
pub use retry::CallPolicy;
