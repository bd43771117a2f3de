//! Plain-text rendering of API records for the terminal.

use std::fmt::Write;

use bankdesk_core::models::{
    Account, Branch, Collateral, Customer, JobDefinition, JobRun, Loan, RepaymentReportRow,
};
use chrono::{Duration, NaiveDate};

const PLACEHOLDER: &str = "-";

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

/// Format a money amount with two decimals and thousands separators
pub fn format_amount(amount: Option<f64>) -> String {
    let Some(amount) = amount else {
        return PLACEHOLDER.to_string();
    };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Human-readable age such as "just now", "5m ago" or "2d ago"
pub fn age_display(age: Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 60 * 24 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / (60 * 24))
    }
}

// ===== Tables =====

pub fn jobs_table(jobs: &[JobDefinition]) -> String {
    let mut out = format!(
        "{:>5}  {:<28} {:<8} {:<12} {}\n",
        "ID", "JOB", "ACTIVE", "STATUS", "LAST RUN"
    );
    for job in jobs {
        let _ = writeln!(
            out,
            "{:>5}  {:<28} {:<8} {:<12} {}",
            job.job_id,
            truncate_string(&job.job_name, 28),
            if job.is_active() { "yes" } else { "no" },
            job.status_display(),
            format_optional(&job.last_run_time, PLACEHOLDER),
        );
    }
    out
}

pub fn job_run_summary(run: &JobRun) -> String {
    format!(
        "Run #{} of {}: {} ({}, processed {})",
        run.seq_no.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string()),
        format_optional(&run.job_name, "job"),
        format_optional(&run.status, "UNKNOWN"),
        format_optional(&run.execution_mode, "MANUAL"),
        format_date(run.processed_date),
    )
}

pub fn accounts_table(accounts: &[Account]) -> String {
    let mut out = format!(
        "{:>6}  {:<10} {:<24} {:>16}  {}\n",
        "ID", "TYPE", "CUSTOMER", "BALANCE", "STATUS"
    );
    for account in accounts {
        let _ = writeln!(
            out,
            "{:>6}  {:<10} {:<24} {:>16}  {}",
            account.account_id,
            format_optional(&account.account_type, PLACEHOLDER),
            truncate_string(&format_optional(&account.customer_name, PLACEHOLDER), 24),
            format_amount(account.balance),
            format_optional(&account.status, PLACEHOLDER),
        );
    }
    out
}

pub fn account_summary(account: &Account) -> String {
    format!(
        "{} account {} for {} (balance {}, {})",
        format_optional(&account.account_type, "unknown"),
        account.account_id,
        format_optional(&account.customer_name, "unknown customer"),
        format_amount(account.balance),
        format_optional(&account.status, PLACEHOLDER),
    )
}

pub fn customers_table(customers: &[Customer]) -> String {
    let mut out = format!(
        "{:>6}  {:<24} {:<28} {:<14} {}\n",
        "ID", "NAME", "EMAIL", "CITY", "STATUS"
    );
    for customer in customers {
        let _ = writeln!(
            out,
            "{:>6}  {:<24} {:<28} {:<14} {}",
            customer.customer_id,
            truncate_string(&customer.full_name(), 24),
            truncate_string(&format_optional(&customer.email, PLACEHOLDER), 28),
            format_optional(&customer.city, PLACEHOLDER),
            format_optional(&customer.status, PLACEHOLDER),
        );
    }
    out
}

pub fn customer_detail(customer: &Customer) -> String {
    let address = [
        customer.address_line1.as_deref(),
        customer.city.as_deref(),
        customer.state.as_deref(),
        customer.zip.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ");

    let mut out = String::new();
    let _ = writeln!(out, "Customer {} ({})", customer.customer_id, customer.full_name());
    let _ = writeln!(out, "  Email:    {}", format_optional(&customer.email, PLACEHOLDER));
    let _ = writeln!(out, "  Phone:    {}", format_optional(&customer.phone, PLACEHOLDER));
    let _ = writeln!(out, "  Born:     {}", format_date(customer.dob));
    let _ = writeln!(
        out,
        "  Address:  {}",
        if address.is_empty() { PLACEHOLDER } else { address.as_str() }
    );
    let _ = writeln!(out, "  KYC:      {}", format_optional(&customer.kyc_details, PLACEHOLDER));
    let _ = writeln!(out, "  Branch:   {}", format_optional(&customer.branch_name, PLACEHOLDER));
    let _ = writeln!(out, "  Status:   {}", format_optional(&customer.status, PLACEHOLDER));
    out
}

pub fn branches_table(branches: &[Branch]) -> String {
    let mut out = format!("{:>5}  {:<20} {:<14} {}\n", "ID", "NAME", "PHONE", "EMAIL");
    for branch in branches {
        let _ = writeln!(
            out,
            "{:>5}  {:<20} {:<14} {}",
            branch.branch_id,
            truncate_string(&format_optional(&branch.name, PLACEHOLDER), 20),
            format_optional(&branch.phone_number, PLACEHOLDER),
            format_optional(&branch.email, PLACEHOLDER),
        );
    }
    out
}

pub fn loans_table(loans: &[Loan]) -> String {
    let mut out = format!(
        "{:>6}  {:<10} {:<22} {:<8} {:>16}  {}\n",
        "ID", "LOAN NO", "CUSTOMER", "TYPE", "PRINCIPAL", "STATUS"
    );
    for loan in loans {
        let _ = writeln!(
            out,
            "{:>6}  {:<10} {:<22} {:<8} {:>16}  {}",
            loan.loan_id,
            format_optional(&loan.loan_no, PLACEHOLDER),
            truncate_string(&format_optional(&loan.customer_name, PLACEHOLDER), 22),
            format_optional(&loan.loan_type, PLACEHOLDER),
            format_amount(loan.principal),
            format_optional(&loan.status, PLACEHOLDER),
        );
    }
    out
}

pub fn loan_detail(loan: &Loan) -> String {
    let rate = loan
        .interest_rate
        .map(|r| format!("{:.2}%", r))
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let tenure = loan
        .tenure_months
        .map(|m| format!("{} months", m))
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let mut out = String::new();
    let _ = writeln!(out, "Loan {} ({})", loan.loan_id, format_optional(&loan.loan_no, "no number"));
    let _ = writeln!(out, "  Customer:   {}", format_optional(&loan.customer_name, PLACEHOLDER));
    let _ = writeln!(out, "  Branch:     {}", format_optional(&loan.branch_name, PLACEHOLDER));
    let _ = writeln!(out, "  Type:       {}", format_optional(&loan.loan_type, PLACEHOLDER));
    let _ = writeln!(out, "  Principal:  {}", format_amount(loan.principal));
    let _ = writeln!(out, "  Rate:       {}", rate);
    let _ = writeln!(out, "  Tenure:     {}", tenure);
    let _ = writeln!(out, "  Start:      {}", format_date(loan.start_date));
    let _ = writeln!(out, "  Maturity:   {}", format_date(loan.maturity_date));
    let _ = writeln!(out, "  Status:     {}", format_optional(&loan.status, PLACEHOLDER));
    out
}

pub fn collateral_summary(collateral: &Collateral) -> String {
    format!(
        "Collateral {} ({}) worth {} pledged on loan {}",
        collateral
            .collateral_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string()),
        format_optional(&collateral.collateral_type, "unknown type"),
        format_amount(collateral.estimated_value),
        collateral
            .loan_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string()),
    )
}

pub fn repayment_table(rows: &[RepaymentReportRow]) -> String {
    let mut out = format!(
        "{:>6}  {:<13} {:<13} {:>14} {:>7} {:>16} {:>14}\n",
        "LOAN", "DUE", "PAID ON", "PAID", "RATE", "BALANCE", "OUTSTANDING"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:>6}  {:<13} {:<13} {:>14} {:>7} {:>16} {:>14}",
            row.loan_id.map(|id| id.to_string()).unwrap_or_default(),
            format_date(row.due_date),
            format_date(row.payment_date),
            format_amount(row.amount_paid),
            row.rate_of_interest
                .map(|r| format!("{:.2}", r))
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            format_amount(row.balance_remaining),
            format_amount(row.outstanding),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Ñandú Ltd", 9), "Ñandú Ltd");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Some(1500.5)), "1,500.50");
        assert_eq!(format_amount(Some(250000.0)), "250,000.00");
        assert_eq!(format_amount(Some(999.999)), "1,000.00");
        assert_eq!(format_amount(Some(-1234567.8)), "-1,234,567.80");
        assert_eq!(format_amount(Some(0.0)), "0.00");
        assert_eq!(format_amount(None), "-");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(NaiveDate::from_ymd_opt(2024, 6, 1)), "Jun 01, 2024");
        assert_eq!(format_date(None), "-");
    }

    #[test]
    fn test_age_display() {
        assert_eq!(age_display(Duration::seconds(20)), "just now");
        assert_eq!(age_display(Duration::minutes(5)), "5m ago");
        assert_eq!(age_display(Duration::minutes(125)), "2h ago");
        assert_eq!(age_display(Duration::days(3)), "3d ago");
    }

    #[test]
    fn test_customer_detail_joins_address_parts() {
        let customer: Customer = serde_json::from_str(
            r#"{"customerId":8,"firstName":"Ravi","lastName":"Iyer","addressLine1":"12 MG Road","city":"Chennai","state":null,"zip":"600001"}"#,
        )
        .unwrap();
        let detail = customer_detail(&customer);
        assert!(detail.starts_with("Customer 8 (Ravi Iyer)"));
        assert!(detail.contains("Address:  12 MG Road, Chennai, 600001"));
        assert!(detail.contains("Email:    -"));
    }

    #[test]
    fn test_jobs_table_marks_never_run() {
        let jobs: Vec<JobDefinition> = serde_json::from_str(
            r#"[{"jobid":3,"jobName":"Billing","description":null,"cronExpression":null,"active":true,"apiEndpoint":null,"lastStatus":null,"lastRunTime":null}]"#,
        )
        .unwrap();
        let table = jobs_table(&jobs);
        let row = table.lines().nth(1).unwrap();
        assert!(row.contains("Billing"));
        assert!(row.contains("NEVER RUN"));
        assert!(row.contains("yes"));
    }
}
