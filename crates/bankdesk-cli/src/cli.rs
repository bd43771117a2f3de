//! Command-line definitions.

use std::path::PathBuf;

use bankdesk_core::models::StaffRole;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bankdesk", version, about = "Back-office client for the core banking API")]
pub struct Cli {
    /// Banking API base URL (overrides config and BANKDESK_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in as a staff user
    Login {
        #[arg(short, long, env = "BANKDESK_USERNAME")]
        username: Option<String>,
        /// Remember the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },
    /// End the local session
    Logout {
        /// Also remove the remembered password from the keychain
        #[arg(long)]
        forget: bool,
    },
    /// Show who is signed in
    Whoami,
    /// Scheduled job monitoring
    #[command(subcommand)]
    Jobs(JobsCommand),
    /// Account opening, closing, deposits and withdrawals
    #[command(subcommand)]
    Accounts(AccountsCommand),
    /// Customer onboarding and maintenance
    #[command(subcommand)]
    Customers(CustomersCommand),
    /// Loan origination and maintenance
    #[command(subcommand)]
    Loans(LoansCommand),
    /// Branch lookup
    #[command(subcommand)]
    Branches(BranchesCommand),
    /// Attach collateral to a loan
    #[command(subcommand)]
    Collateral(CollateralCommand),
    /// Staff user administration
    #[command(subcommand)]
    Staff(StaffCommand),
    /// Repayment reports
    #[command(subcommand)]
    Report(ReportCommand),
}

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// List job definitions and their last status
    List,
    /// Trigger a job now
    Run { job_id: i64 },
    /// Show execution history for a job
    History { job_id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    List,
    /// Open an account for an existing customer
    Open {
        #[arg(long = "customer")]
        customer_id: i64,
        #[arg(long = "branch")]
        branch_id: i64,
        /// e.g. SAVINGS or CURRENT
        #[arg(long = "type")]
        account_type: String,
        #[arg(long, default_value_t = 0.0)]
        balance: f64,
    },
    Close { account_id: i64 },
    Deposit { account_id: i64, amount: f64 },
    Withdraw { account_id: i64, amount: f64 },
}

#[derive(Debug, Subcommand)]
pub enum CustomersCommand {
    List,
    Show { customer_id: i64 },
    /// Onboard a new customer
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long = "branch")]
        branch_id: i64,
        #[command(flatten)]
        details: CustomerDetails,
    },
    /// Change fields of an existing customer; unset flags keep their value
    Update {
        customer_id: i64,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long = "branch")]
        branch_id: Option<i64>,
        #[arg(long)]
        status: Option<String>,
        #[command(flatten)]
        details: CustomerDetails,
    },
    Delete { customer_id: i64 },
}

#[derive(Debug, Default, Args)]
pub struct CustomerDetails {
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    pub dob: Option<NaiveDate>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub zip: Option<String>,
    #[arg(long)]
    pub kyc: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum LoansCommand {
    List,
    Show { loan_id: i64 },
    /// Originate a loan
    Create {
        #[arg(long = "customer")]
        customer_id: i64,
        #[arg(long = "branch")]
        branch_id: i64,
        /// e.g. HOME, PERSONAL, GOLD
        #[arg(long = "type")]
        loan_type: String,
        #[arg(long)]
        principal: f64,
        /// Annual rate in percent
        #[arg(long = "rate")]
        interest_rate: f64,
        #[arg(long = "tenure")]
        tenure_months: i32,
        /// Start date (YYYY-MM-DD)
        #[arg(long = "start")]
        start_date: NaiveDate,
    },
    /// Change loan terms; unset flags keep their value
    Update {
        loan_id: i64,
        #[arg(long = "type")]
        loan_type: Option<String>,
        #[arg(long)]
        principal: Option<f64>,
        #[arg(long = "rate")]
        interest_rate: Option<f64>,
        #[arg(long = "tenure")]
        tenure_months: Option<i32>,
        #[arg(long = "start")]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        status: Option<String>,
    },
    Delete { loan_id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum BranchesCommand {
    List,
}

#[derive(Debug, Subcommand)]
pub enum CollateralCommand {
    Add {
        #[arg(long = "loan")]
        loan_id: i64,
        #[arg(long = "type")]
        collateral_type: String,
        #[arg(long = "value")]
        estimated_value: f64,
        #[arg(long)]
        description: Option<String>,
        /// Pledge date (YYYY-MM-DD), defaults to server date
        #[arg(long)]
        pledged: Option<NaiveDate>,
    },
}

#[derive(Debug, Subcommand)]
pub enum StaffCommand {
    /// Create a staff user; the initial password is prompted for
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        /// ADMIN, MANAGER, OFFICER or AUDITOR
        #[arg(long)]
        role: StaffRole,
        #[arg(long)]
        branch: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Print the repayment report
    View(ReportArgs),
    /// Export the repayment report as PDF
    Pdf {
        #[command(flatten)]
        filter: ReportArgs,
        /// Output file, defaults to repayment_report_<loan|all>.pdf
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(long = "loan")]
    pub loan_id: Option<i64>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}
