use crate::models::{AdminIdentity, ProvisionerRecord};

/// Output of the authentication guard.
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    admin: AdminIdentity,
}

impl Authenticated {
    pub(crate) fn new(admin: AdminIdentity) -> Self {
        Self { admin }
    }

    pub fn admin(&self) -> &AdminIdentity {
        &self.admin
    }

    pub(crate) fn with_provisioner(self, provisioner: ProvisionerRecord) -> ProvisionerLoaded {
        ProvisionerLoaded {
            admin: self.admin,
            provisioner,
        }
    }
}

/// Output of provisioner resolution: everything `Authenticated` had, plus the
/// stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionerLoaded {
    admin: AdminIdentity,
    provisioner: ProvisionerRecord,
}

impl ProvisionerLoaded {
    pub fn admin(&self) -> &AdminIdentity {
        &self.admin
    }

    pub fn provisioner(&self) -> &ProvisionerRecord {
        &self.provisioner
    }
}

/// Context handed to terminal handlers once every composed guard passed.
#[derive(Debug, Clone, PartialEq)]
pub struct Admitted {
    admin: AdminIdentity,
    provisioner: Option<ProvisionerRecord>,
}

impl Admitted {
    pub fn admin(&self) -> &AdminIdentity {
        &self.admin
    }

    pub fn provisioner(&self) -> Option<&ProvisionerRecord> {
        self.provisioner.as_ref()
    }
}

impl From<Authenticated> for Admitted {
    fn from(value: Authenticated) -> Self {
        Self {
            admin: value.admin,
            provisioner: None,
        }
    }
}

impl From<ProvisionerLoaded> for Admitted {
    fn from(value: ProvisionerLoaded) -> Self {
        Self {
            admin: value.admin,
            provisioner: Some(value.provisioner),
        }
    }
}
