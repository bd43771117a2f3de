use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Staff roles known to the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StaffRole {
    Admin,
    Manager,
    Officer,
    Auditor,
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StaffRole::Admin => "ADMIN",
            StaffRole::Manager => "MANAGER",
            StaffRole::Officer => "OFFICER",
            StaffRole::Auditor => "AUDITOR",
        };
        f.write_str(name)
    }
}

impl FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(StaffRole::Admin),
            "MANAGER" => Ok(StaffRole::Manager),
            "OFFICER" => Ok(StaffRole::Officer),
            "AUDITOR" => Ok(StaffRole::Auditor),
            other => Err(format!(
                "unknown role '{}' (expected ADMIN, MANAGER, OFFICER or AUDITOR)",
                other
            )),
        }
    }
}

/// Payload for `POST /api/staff/create`.
#[derive(Debug, Clone, Serialize)]
pub struct NewStaffUser {
    pub username: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "phoneNumber", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub role: StaffRole,
    pub password: String,
    #[serde(rename = "branchId", skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("officer".parse::<StaffRole>(), Ok(StaffRole::Officer));
        assert_eq!(" ADMIN ".parse::<StaffRole>(), Ok(StaffRole::Admin));
        assert!("teller".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_role_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&StaffRole::Auditor).unwrap(),
            "\"AUDITOR\""
        );
        assert_eq!(StaffRole::Manager.to_string(), "MANAGER");
    }
}
