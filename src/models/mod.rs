pub mod admin;
pub mod provisioner;

pub use admin::{AdminIdentity, AdminScope};
pub use provisioner::{ProvisionerRecord, ProvisionerRef, ProvisionerType};
