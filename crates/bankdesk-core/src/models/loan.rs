//! Loans and the collateral pledged against them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    #[serde(rename = "loanId")]
    pub loan_id: i64,
    #[serde(rename = "loanNo")]
    pub loan_no: Option<String>,
    #[serde(rename = "customerId")]
    pub customer_id: Option<i64>,
    #[serde(rename = "customerName", skip_serializing)]
    pub customer_name: Option<String>,
    #[serde(rename = "branchId")]
    pub branch_id: Option<i64>,
    #[serde(rename = "branchName", skip_serializing)]
    pub branch_name: Option<String>,
    #[serde(rename = "collateralId")]
    pub collateral_id: Option<i64>,
    #[serde(rename = "loanType")]
    pub loan_type: Option<String>,
    pub principal: Option<f64>,
    #[serde(rename = "interestRate")]
    pub interest_rate: Option<f64>,
    #[serde(rename = "tenureMonths")]
    pub tenure_months: Option<i32>,
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "maturityDate", skip_serializing)]
    pub maturity_date: Option<NaiveDate>,
    pub status: Option<String>,
}

impl Loan {
    /// Fields the server needs on `PUT /api/loans/{id}`; it recomputes the
    /// maturity date from start date and tenure.
    pub fn missing_update_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.customer_id.is_none() {
            missing.push("customerId");
        }
        if self.branch_id.is_none() {
            missing.push("branchId");
        }
        if self.start_date.is_none() {
            missing.push("startDate");
        }
        if self.tenure_months.is_none() {
            missing.push("tenureMonths");
        }
        missing
    }
}

/// Payload for originating a loan (`POST /api/loans`).
#[derive(Debug, Clone, Serialize)]
pub struct NewLoan {
    #[serde(rename = "customerId")]
    pub customer_id: i64,
    #[serde(rename = "branchId")]
    pub branch_id: i64,
    #[serde(rename = "loanType")]
    pub loan_type: String,
    pub principal: f64,
    #[serde(rename = "interestRate")]
    pub interest_rate: f64,
    #[serde(rename = "tenureMonths")]
    pub tenure_months: i32,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
}

/// Collateral as returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collateral {
    #[serde(rename = "collateralId")]
    pub collateral_id: Option<i64>,
    #[serde(rename = "loanId")]
    pub loan_id: Option<i64>,
    #[serde(rename = "customerId")]
    pub customer_id: Option<i64>,
    #[serde(rename = "collateralType")]
    pub collateral_type: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "estimatedValue")]
    pub estimated_value: Option<f64>,
    #[serde(rename = "pledgedDate")]
    pub pledged_date: Option<NaiveDate>,
    pub status: Option<String>,
}

/// Collateral to attach to an existing loan. Valuation happens server-side.
#[derive(Debug, Clone, Serialize)]
pub struct NewCollateral {
    #[serde(rename = "loanId")]
    pub loan_id: i64,
    #[serde(rename = "collateralType")]
    pub collateral_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "estimatedValue")]
    pub estimated_value: f64,
    #[serde(rename = "pledgedDate", skip_serializing_if = "Option::is_none")]
    pub pledged_date: Option<NaiveDate>,
}
