use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "accountId")]
    pub account_id: i64,
    #[serde(rename = "accountType")]
    pub account_type: Option<String>,
    pub balance: Option<f64>,
    pub status: Option<String>,
    #[serde(rename = "customer")]
    pub customer_id: Option<i64>,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    #[serde(rename = "branch")]
    pub branch_id: Option<i64>,
    #[serde(rename = "branchName")]
    pub branch_name: Option<String>,
}

/// Payload for opening an account (`POST /accounts`).
///
/// The server binds this to its account entity, so the owner and branch are
/// nested references rather than flat ids.
#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    #[serde(rename = "accountType")]
    pub account_type: String,
    pub balance: f64,
    pub status: String,
    pub customer: CustomerRef,
    pub branch: BranchRef,
}

impl NewAccount {
    pub fn new(account_type: impl Into<String>, customer_id: i64, branch_id: i64, balance: f64) -> Self {
        Self {
            account_type: account_type.into(),
            balance,
            status: "ACTIVE".to_string(),
            customer: CustomerRef { customer_id },
            branch: BranchRef { branch_id },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CustomerRef {
    #[serde(rename = "customerId")]
    pub customer_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BranchRef {
    #[serde(rename = "branchId")]
    pub branch_id: i64,
}

/// Body for deposit and withdraw calls.
#[derive(Debug, Clone, Serialize)]
pub struct AmountRequest {
    pub amount: f64,
}

/// Direction of a cash transaction against an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashAction {
    Deposit,
    Withdraw,
}

impl CashAction {
    pub fn path_segment(self) -> &'static str {
        match self {
            CashAction::Deposit => "deposit",
            CashAction::Withdraw => "withdraw",
        }
    }
}
