use serde::{Deserialize, Serialize};

/// A bank branch from `GET /branches`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    #[serde(rename = "branchId")]
    pub branch_id: i64,
    pub name: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    pub email: Option<String>,
}
