//! Data models for the core banking API.
//!
//! - `JobDefinition`, `JobRun`: scheduler monitoring
//! - `Account`, `NewAccount`, `AmountRequest`: account opening, closing and cash
//! - `Customer`, `NewCustomer`: onboarding
//! - `Loan`, `NewLoan`, `Collateral`: origination and lending
//! - `Branch`: branch lookup
//! - `NewStaffUser`, `StaffRole`: staff administration
//! - `RepaymentReportRow`, `ReportFilter`: repayment reporting

pub mod account;
pub mod branch;
pub mod customer;
pub mod job;
pub mod loan;
pub mod repayment;
pub mod staff;

pub use account::{Account, AmountRequest, BranchRef, CashAction, CustomerRef, NewAccount};
pub use branch::Branch;
pub use customer::{Customer, NewCustomer};
pub use job::{JobDefinition, JobRun};
pub use loan::{Collateral, Loan, NewCollateral, NewLoan};
pub use repayment::{RepaymentReportRow, ReportFilter};
pub use staff::{NewStaffUser, StaffRole};
