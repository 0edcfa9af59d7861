use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Active employee as returned by the directory, including the stored credential hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub tax_id: String,
    pub site: String,
    pub site_id: String,
    pub area: String,
    pub role: String,
    #[serde(default)]
    pub credential_hash: Option<String>,
}

impl EmployeeRecord {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        full.trim().to_string()
    }

    pub fn has_credential(&self) -> bool {
        self.credential_hash.as_deref().map(|hash| !hash.trim().is_empty()).unwrap_or(false)
    }

    pub fn profile(&self) -> EmployeeProfile {
        EmployeeProfile {
            id: self.id.clone(),
            name: self.display_name(),
            email: self.email.clone(),
            tax_id: self.tax_id.clone(),
            site: self.site.clone(),
            site_id: self.site_id.clone(),
            area: self.area.clone(),
            role: self.role.clone(),
        }
    }
}

impl fmt::Debug for EmployeeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmployeeRecord")
            .field("id", &self.id)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("site_id", &self.site_id)
            .field("credential_hash", &self.credential_hash.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// Profile kept on the conversation once the employee is authenticated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProfile {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    pub tax_id: String,
    pub site: String,
    pub site_id: String,
    pub area: String,
    pub role: String,
}
