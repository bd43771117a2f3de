//! Command handlers.
//!
//! Each invocation builds one `ApiClient` over a cookie-carrying transport,
//! restores the cookies and session saved by the previous run, executes a
//! single command and saves the cookie jar again.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use bankdesk_core::auth::CredentialStore;
use bankdesk_core::models::{
    CashAction, Customer, NewAccount, NewCollateral, NewCustomer, NewLoan, NewStaffUser,
    ReportFilter,
};
use bankdesk_core::{
    ApiClient, Config, FileSessionStore, RefreshError, SessionExpiredHandler, Transport,
};
use tracing::{debug, info, warn};

use crate::cli::{
    AccountsCommand, BranchesCommand, CollateralCommand, Command, CustomerDetails,
    CustomersCommand, JobsCommand, LoansCommand, ReportArgs, ReportCommand, StaffCommand,
};
use crate::output;

/// Environment variable holding the login password for non-interactive use
const PASSWORD_ENV: &str = "BANKDESK_PASSWORD";

/// Tells the operator the session is gone and how to start a new one.
struct ExpiredNotice;

impl SessionExpiredHandler for ExpiredNotice {
    fn session_expired(&self, reason: &RefreshError) {
        warn!(reason = %reason, "Session expired");
        eprintln!(
            "Your session has expired ({}). Run `bankdesk login` to sign in again.",
            reason
        );
    }
}

pub struct Context {
    config: Config,
    cache_dir: PathBuf,
    transport: Transport,
    api: ApiClient,
}

impl Context {
    pub fn open(config: Config, cache_dir: PathBuf) -> Result<Self> {
        let transport = Transport::new(&config.base_url, config.request_timeout())?;
        match transport.restore_cookies(&cache_dir) {
            Ok(restored) => debug!(restored, "Cookie jar loaded"),
            Err(e) => warn!(error = %e, "Ignoring unreadable cookie file"),
        }

        let session = Arc::new(FileSessionStore::open(&cache_dir)?);
        let api = ApiClient::new(
            &transport,
            session,
            Arc::new(ExpiredNotice),
            config.refresh_timeout(),
        );

        Ok(Self {
            config,
            cache_dir,
            transport,
            api,
        })
    }

    fn persist_cookies(&self) {
        if let Err(e) = self.transport.persist_cookies(&self.cache_dir) {
            warn!(error = %e, "Failed to save cookies");
        }
    }
}

/// Run one command. The cookie jar is saved afterwards whether or not the
/// command succeeded, except after logout.
pub async fn run(ctx: &mut Context, command: Command) -> Result<()> {
    let keep_cookies = !matches!(command, Command::Logout { .. });

    let result = match command {
        Command::Login { username, remember } => login(ctx, username, remember).await,
        Command::Logout { forget } => logout(ctx, forget),
        Command::Whoami => whoami(ctx),
        Command::Jobs(cmd) => jobs(ctx, cmd).await,
        Command::Accounts(cmd) => accounts(ctx, cmd).await,
        Command::Customers(cmd) => customers(ctx, cmd).await,
        Command::Loans(cmd) => loans(ctx, cmd).await,
        Command::Branches(BranchesCommand::List) => branches(ctx).await,
        Command::Collateral(cmd) => collateral(ctx, cmd).await,
        Command::Staff(cmd) => staff(ctx, cmd).await,
        Command::Report(cmd) => report(ctx, cmd).await,
    };

    if keep_cookies {
        ctx.persist_cookies();
    }
    result
}

// ===== Session =====

async fn login(ctx: &mut Context, username: Option<String>, remember: bool) -> Result<()> {
    let username = match username.or_else(|| ctx.config.last_username.clone()) {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => prompt("Username: ")?,
    };
    if username.is_empty() {
        bail!("A username is required");
    }

    let password = match std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .or_else(|| CredentialStore::get_password(&username))
    {
        Some(password) => password,
        None => rpassword::prompt_password(format!("Password for {}: ", username))
            .context("Failed to read password")?,
    };

    let display_name = ctx.api.login(&username, &password).await?;
    info!(username = %username, "Logged in");

    if remember {
        CredentialStore::store(&username, &password)?;
    }
    ctx.config.last_username = Some(username.clone());
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in as {}", display_name.as_deref().unwrap_or(&username));
    Ok(())
}

fn logout(ctx: &mut Context, forget: bool) -> Result<()> {
    ctx.api.logout()?;
    Transport::forget_cookies(&ctx.cache_dir)?;
    if forget {
        if let Some(username) = &ctx.config.last_username {
            CredentialStore::delete(username)?;
        }
    }
    println!("Logged out");
    Ok(())
}

fn whoami(ctx: &Context) -> Result<()> {
    match ctx.api.session().snapshot() {
        Some(data) => println!(
            "{} (token issued {})",
            data.display_name.as_deref().unwrap_or("unknown user"),
            output::age_display(data.age())
        ),
        None => println!("Not logged in"),
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

// ===== Operations =====

async fn jobs(ctx: &Context, cmd: JobsCommand) -> Result<()> {
    match cmd {
        JobsCommand::List => {
            let jobs = ctx.api.fetch_jobs().await?;
            print!("{}", output::jobs_table(&jobs));
        }
        JobsCommand::Run { job_id } => {
            let run = ctx.api.run_job(job_id).await?;
            println!("{}", output::job_run_summary(&run));
        }
        JobsCommand::History { job_id } => {
            let history = ctx.api.fetch_job_history(job_id).await?;
            if history.is_empty() {
                println!("No runs recorded for job {}", job_id);
            } else {
                println!("{}", serde_json::to_string_pretty(&history)?);
            }
        }
    }
    Ok(())
}

async fn accounts(ctx: &Context, cmd: AccountsCommand) -> Result<()> {
    let (account_id, action, amount) = match cmd {
        AccountsCommand::List => {
            let accounts = ctx.api.fetch_accounts().await?;
            print!("{}", output::accounts_table(&accounts));
            return Ok(());
        }
        AccountsCommand::Open {
            customer_id,
            branch_id,
            account_type,
            balance,
        } => {
            let account = ctx
                .api
                .create_account(&NewAccount::new(account_type, customer_id, branch_id, balance))
                .await?;
            println!("Opened {}", output::account_summary(&account));
            return Ok(());
        }
        AccountsCommand::Close { account_id } => {
            let account = ctx.api.close_account(account_id).await?;
            println!("Closed {}", output::account_summary(&account));
            return Ok(());
        }
        AccountsCommand::Deposit { account_id, amount } => (account_id, CashAction::Deposit, amount),
        AccountsCommand::Withdraw { account_id, amount } => {
            (account_id, CashAction::Withdraw, amount)
        }
    };

    let record = ctx.api.move_cash(account_id, action, amount).await?;
    let verb = match action {
        CashAction::Deposit => "Deposited",
        CashAction::Withdraw => "Withdrew",
    };
    println!("{} {} on account {}", verb, output::format_amount(Some(amount)), account_id);
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn customers(ctx: &Context, cmd: CustomersCommand) -> Result<()> {
    match cmd {
        CustomersCommand::List => {
            let customers = ctx.api.fetch_customers().await?;
            print!("{}", output::customers_table(&customers));
        }
        CustomersCommand::Show { customer_id } => {
            let customer = ctx.api.fetch_customer(customer_id).await?;
            print!("{}", output::customer_detail(&customer));
        }
        CustomersCommand::Create {
            first_name,
            last_name,
            branch_id,
            details,
        } => {
            let customer = ctx
                .api
                .create_customer(&NewCustomer {
                    first_name,
                    last_name,
                    email: details.email,
                    phone: details.phone,
                    dob: details.dob,
                    address_line1: details.address,
                    city: details.city,
                    state: details.state,
                    zip: details.zip,
                    kyc_details: details.kyc,
                    branch_id,
                })
                .await?;
            println!(
                "Onboarded customer {} ({})",
                customer.customer_id,
                customer.full_name()
            );
        }
        CustomersCommand::Update {
            customer_id,
            first_name,
            last_name,
            branch_id,
            status,
            details,
        } => {
            // The server replaces the whole record, so start from the current one.
            let mut customer = ctx.api.fetch_customer(customer_id).await?;
            overlay(&mut customer.first_name, first_name);
            overlay(&mut customer.last_name, last_name);
            overlay(&mut customer.branch_id, branch_id);
            overlay(&mut customer.status, status);
            apply_customer_details(&mut customer, details);

            let updated = ctx.api.update_customer(&customer).await?;
            print!("{}", output::customer_detail(&updated));
        }
        CustomersCommand::Delete { customer_id } => {
            let message = ctx.api.delete_customer(customer_id).await?;
            println!("{}", message.trim());
        }
    }
    Ok(())
}

fn apply_customer_details(customer: &mut Customer, details: CustomerDetails) {
    overlay(&mut customer.email, details.email);
    overlay(&mut customer.phone, details.phone);
    overlay(&mut customer.dob, details.dob);
    overlay(&mut customer.address_line1, details.address);
    overlay(&mut customer.city, details.city);
    overlay(&mut customer.state, details.state);
    overlay(&mut customer.zip, details.zip);
    overlay(&mut customer.kyc_details, details.kyc);
}

fn overlay<T>(field: &mut Option<T>, change: Option<T>) {
    if change.is_some() {
        *field = change;
    }
}

async fn branches(ctx: &Context) -> Result<()> {
    let branches = ctx.api.fetch_branches().await?;
    print!("{}", output::branches_table(&branches));
    Ok(())
}

async fn loans(ctx: &Context, cmd: LoansCommand) -> Result<()> {
    match cmd {
        LoansCommand::List => {
            let loans = ctx.api.fetch_loans().await?;
            print!("{}", output::loans_table(&loans));
        }
        LoansCommand::Show { loan_id } => {
            let loan = ctx.api.fetch_loan(loan_id).await?;
            print!("{}", output::loan_detail(&loan));
        }
        LoansCommand::Create {
            customer_id,
            branch_id,
            loan_type,
            principal,
            interest_rate,
            tenure_months,
            start_date,
        } => {
            let loan = ctx
                .api
                .create_loan(&NewLoan {
                    customer_id,
                    branch_id,
                    loan_type,
                    principal,
                    interest_rate,
                    tenure_months,
                    start_date,
                })
                .await?;
            print!("{}", output::loan_detail(&loan));
        }
        LoansCommand::Update {
            loan_id,
            loan_type,
            principal,
            interest_rate,
            tenure_months,
            start_date,
            status,
        } => {
            let mut loan = ctx.api.fetch_loan(loan_id).await?;
            overlay(&mut loan.loan_type, loan_type);
            overlay(&mut loan.principal, principal);
            overlay(&mut loan.interest_rate, interest_rate);
            overlay(&mut loan.tenure_months, tenure_months);
            overlay(&mut loan.start_date, start_date);
            overlay(&mut loan.status, status);

            let updated = ctx.api.update_loan(&loan).await?;
            print!("{}", output::loan_detail(&updated));
        }
        LoansCommand::Delete { loan_id } => {
            let message = ctx.api.delete_loan(loan_id).await?;
            println!("{}", message.trim());
        }
    }
    Ok(())
}

async fn collateral(ctx: &Context, cmd: CollateralCommand) -> Result<()> {
    let CollateralCommand::Add {
        loan_id,
        collateral_type,
        estimated_value,
        description,
        pledged,
    } = cmd;

    let collateral = ctx
        .api
        .add_collateral(&NewCollateral {
            loan_id,
            collateral_type,
            description,
            estimated_value,
            pledged_date: pledged,
        })
        .await?;
    println!("{}", output::collateral_summary(&collateral));
    Ok(())
}

async fn staff(ctx: &Context, cmd: StaffCommand) -> Result<()> {
    let StaffCommand::Create {
        username,
        first_name,
        last_name,
        email,
        phone,
        role,
        branch,
    } = cmd;

    let password = rpassword::prompt_password(format!("Initial password for {}: ", username))
        .context("Failed to read password")?;
    if password.is_empty() {
        bail!("The initial password must not be empty");
    }

    let user = NewStaffUser {
        username,
        first_name,
        last_name,
        email,
        phone_number: phone,
        role,
        password,
        branch_id: branch,
    };
    let created = ctx.api.create_staff_user(&user).await?;
    println!("Created {} user {}", user.role, user.username);
    debug!(response = %created, "Staff user created");
    Ok(())
}

async fn report(ctx: &Context, cmd: ReportCommand) -> Result<()> {
    match cmd {
        ReportCommand::View(args) => {
            let rows = ctx.api.fetch_repayment_report(&report_filter(args)).await?;
            if rows.is_empty() {
                println!("No repayments match the filter");
            } else {
                print!("{}", output::repayment_table(&rows));
            }
        }
        ReportCommand::Pdf { filter, out } => {
            let filter = report_filter(filter);
            let bytes = ctx.api.download_repayment_report_pdf(&filter).await?;
            let path = out.unwrap_or_else(|| PathBuf::from(filter.pdf_file_name()));
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} ({} bytes)", path.display(), bytes.len());
        }
    }
    Ok(())
}

fn report_filter(args: ReportArgs) -> ReportFilter {
    ReportFilter {
        loan_id: args.loan_id,
        start_date: args.from,
        end_date: args.to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankdesk_core::{Credential, SessionStore};
    use chrono::NaiveDate;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context_for(server: &MockServer, cache_dir: &std::path::Path) -> Context {
        let config = Config {
            base_url: server.uri(),
            ..Config::default()
        };
        Context::open(config, cache_dir.to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn test_rotated_cookie_is_saved_when_replay_fails() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        FileSessionStore::open(dir.path())
            .unwrap()
            .set(Credential::new("T1"))
            .unwrap();

        Mock::given(method("GET"))
            .and(path("/api/customers"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "refreshToken=r-rotated; Path=/api/auth; HttpOnly")
                    .set_body_json(serde_json::json!({ "accessToken": "T2" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/customers"))
            .and(header("authorization", "Bearer T2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut ctx = context_for(&server, dir.path());
        let result = run(&mut ctx, Command::Customers(CustomersCommand::List)).await;
        assert!(result.is_err());

        let saved = std::fs::read_to_string(dir.path().join("cookies.json")).unwrap();
        assert!(saved.contains("refreshToken=r-rotated"));

        // The next run starts from the refreshed token and the rotated cookie.
        let next = context_for(&server, dir.path());
        assert_eq!(next.api.session().get(), Some(Credential::new("T2")));
    }

    #[tokio::test]
    async fn test_corrupt_session_file_does_not_block_commands() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("session.json"), "{ truncated").unwrap();

        let mut ctx = context_for(&server, dir.path());
        assert!(ctx.api.session().get().is_none());
        run(&mut ctx, Command::Logout { forget: false }).await.unwrap();
    }

    #[test]
    fn test_update_flags_overlay_fetched_record() {
        let mut customer: Customer = serde_json::from_str(
            r#"{"customerId":8,"firstName":"Ravi","lastName":"Iyer","email":"ravi@bank.test","city":"Chennai","status":"ACTIVE","branchId":3}"#,
        )
        .unwrap();

        apply_customer_details(
            &mut customer,
            CustomerDetails {
                city: Some("Madurai".to_string()),
                zip: Some("625001".to_string()),
                ..CustomerDetails::default()
            },
        );
        overlay(&mut customer.status, None);

        assert_eq!(customer.city.as_deref(), Some("Madurai"));
        assert_eq!(customer.zip.as_deref(), Some("625001"));
        assert_eq!(customer.email.as_deref(), Some("ravi@bank.test"));
        assert_eq!(customer.status.as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn test_report_filter_from_args() {
        let filter = report_filter(ReportArgs {
            loan_id: Some(4),
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: None,
        });
        assert_eq!(filter.loan_id, Some(4));
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert!(filter.end_date.is_none());
        assert_eq!(filter.pdf_file_name(), "repayment_report_4.pdf");
    }
}
