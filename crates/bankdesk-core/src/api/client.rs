//! API client for the core banking REST API.
//!
//! Every call goes through `ApiClient::send`, which attaches the current
//! access token and, when the server answers 401/403, refreshes the token
//! once through the shared `RefreshCoordinator` and replays the request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::{ApiError, ApiRequest};
use crate::auth::{
    self, AuthClient, Credential, RefreshCoordinator, SessionExpiredHandler, SessionStore,
};
use crate::models::{
    Account, AmountRequest, Branch, CashAction, Collateral, Customer, JobDefinition, JobRun,
    Loan, NewAccount, NewCollateral, NewCustomer, NewLoan, NewStaffUser, RepaymentReportRow,
    ReportFilter,
};
use crate::transport::Transport;

/// API client for the core banking service.
/// Clone is cheap - the HTTP client, session and coordinator are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: AuthClient,
    session: Arc<dyn SessionStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(
        transport: &Transport,
        session: Arc<dyn SessionStore>,
        on_expired: Arc<dyn SessionExpiredHandler>,
        refresh_timeout: Duration,
    ) -> Self {
        let auth = AuthClient::new(transport);
        let coordinator = RefreshCoordinator::new(
            Arc::new(auth.clone()),
            session.clone(),
            on_expired,
        )
        .with_timeout(refresh_timeout);

        Self {
            client: transport.client().clone(),
            base_url: transport.base_url().clone(),
            auth,
            session,
            coordinator: Arc::new(coordinator),
        }
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Log in and store the issued credential. Returns the display name
    /// decoded from the token, if it carries one.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<String>, ApiError> {
        let credential = self.auth.login(username, password).await?;
        auth::establish(self.session.as_ref(), credential).map_err(Self::storage_error)
    }

    /// Drop the local session.
    pub fn logout(&self) -> Result<(), ApiError> {
        info!("Logging out");
        self.session.clear().map_err(Self::storage_error)
    }

    fn storage_error(e: anyhow::Error) -> ApiError {
        ApiError::SessionStorage(format!("{:#}", e))
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", path, e)))
    }

    /// Build and send one attempt of a request with the given credential.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        credential: Option<&Credential>,
    ) -> Result<Response, ApiError> {
        let mut builder = self
            .client
            .request(request.method().clone(), self.url(request.path())?)
            .headers(request.headers().clone());

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        match credential {
            Some(credential) => builder = builder.bearer_auth(credential.as_str()),
            None => debug!(path = request.path(), "No access token, sending unauthenticated"),
        }

        Ok(builder.send().await?)
    }

    /// Send a request, refreshing the access token and replaying once if
    /// the server rejects the current one.
    pub async fn send(&self, mut request: ApiRequest) -> Result<Response, ApiError> {
        let sent_with = request.credential().cloned().or_else(|| self.session.get());
        let response = self.dispatch(&request, sent_with.as_ref()).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if ApiError::is_auth_failure(status) && !request.is_retried() {
            request.mark_retried();
            let credential = match self.newer_credential(sent_with.as_ref()) {
                Some(current) => {
                    debug!(
                        path = request.path(),
                        "Rejected token already replaced, replaying with the current one"
                    );
                    current
                }
                None => {
                    debug!(
                        method = %request.method(),
                        path = request.path(),
                        status = status.as_u16(),
                        "Authentication rejected, obtaining fresh access token"
                    );
                    self.coordinator.obtain_fresh_credential().await?
                }
            };
            request.pin_credential(credential);

            let replay = self.dispatch(&request, request.credential()).await?;
            if ApiError::is_auth_failure(replay.status()) {
                warn!(
                    path = request.path(),
                    status = replay.status().as_u16(),
                    "Request rejected again after token refresh"
                );
            }
            return Self::check_response(replay).await;
        }

        Self::check_response(response).await
    }

    /// The session's credential, if a settled refresh has replaced the one a
    /// request was sent with. While a refresh is in flight the caller joins it.
    fn newer_credential(&self, sent_with: Option<&Credential>) -> Option<Credential> {
        if self.coordinator.is_refreshing() {
            return None;
        }
        self.session.get().filter(|current| Some(current) != sent_with)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    pub async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path().to_string();
        let response = self.send(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::Decode(format!("{}: {}", path, e))
        })
    }

    /// For endpoints that answer with a plain-text confirmation.
    pub async fn request_text(&self, request: ApiRequest) -> Result<String, ApiError> {
        let response = self.send(request).await?;
        Ok(response.text().await?)
    }

    pub async fn request_bytes(&self, request: ApiRequest) -> Result<Vec<u8>, ApiError> {
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn with_body<B: serde::Serialize>(request: ApiRequest, body: &B) -> Result<ApiRequest, ApiError> {
        request
            .json(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode request body: {}", e)))
    }

    // ===== Jobs =====

    /// Fetch all scheduled job definitions with their last run status
    pub async fn fetch_jobs(&self) -> Result<Vec<JobDefinition>, ApiError> {
        self.request_json(ApiRequest::get("/api/jobs/master")).await
    }

    /// Trigger a job run immediately
    pub async fn run_job(&self, job_id: i64) -> Result<JobRun, ApiError> {
        let request = Self::with_body(
            ApiRequest::post(format!("/api/jobs/run/{}", job_id)),
            &serde_json::json!({}),
        )?;
        self.request_json(request).await
    }

    /// Fetch execution history for a job
    pub async fn fetch_job_history(&self, job_id: i64) -> Result<Vec<serde_json::Value>, ApiError> {
        self.request_json(ApiRequest::get(format!("/api/jobs/history/{}", job_id)))
            .await
    }

    // ===== Accounts =====

    pub async fn fetch_accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.request_json(ApiRequest::get("/accounts")).await
    }

    /// Open an account for an existing customer
    pub async fn create_account(&self, account: &NewAccount) -> Result<Account, ApiError> {
        if !account.balance.is_finite() || account.balance < 0.0 {
            return Err(ApiError::InvalidRequest(format!(
                "opening balance must not be negative, got {}",
                account.balance
            )));
        }
        let request = Self::with_body(ApiRequest::post("/accounts"), account)?;
        self.request_json(request).await
    }

    pub async fn close_account(&self, account_id: i64) -> Result<Account, ApiError> {
        self.request_json(ApiRequest::put(format!("/accounts/{}/close", account_id)))
            .await
    }

    /// Deposit to or withdraw from an account. Returns the server's
    /// transaction record.
    pub async fn move_cash(
        &self,
        account_id: i64,
        action: CashAction,
        amount: f64,
    ) -> Result<serde_json::Value, ApiError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ApiError::InvalidRequest(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        let request = Self::with_body(
            ApiRequest::post(format!("/accounts/{}/{}", account_id, action.path_segment())),
            &AmountRequest { amount },
        )?;
        self.request_json(request).await
    }

    // ===== Customers =====

    pub async fn fetch_customers(&self) -> Result<Vec<Customer>, ApiError> {
        self.request_json(ApiRequest::get("/api/customers")).await
    }

    pub async fn fetch_customer(&self, customer_id: i64) -> Result<Customer, ApiError> {
        self.request_json(ApiRequest::get(format!("/api/customers/{}", customer_id)))
            .await
    }

    /// Onboard a new customer
    pub async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, ApiError> {
        let request = Self::with_body(ApiRequest::post("/api/customers"), customer)?;
        self.request_json(request).await
    }

    /// Replace a customer record. The server requires a branch.
    pub async fn update_customer(&self, customer: &Customer) -> Result<Customer, ApiError> {
        if customer.branch_id.is_none() {
            return Err(ApiError::InvalidRequest(format!(
                "customer {} has no branch",
                customer.customer_id
            )));
        }
        let request = Self::with_body(
            ApiRequest::put(format!("/api/customers/{}", customer.customer_id)),
            customer,
        )?;
        self.request_json(request).await
    }

    /// Returns the server's confirmation message.
    pub async fn delete_customer(&self, customer_id: i64) -> Result<String, ApiError> {
        self.request_text(ApiRequest::delete(format!("/api/customers/{}", customer_id)))
            .await
    }

    pub async fn fetch_branches(&self) -> Result<Vec<Branch>, ApiError> {
        self.request_json(ApiRequest::get("/branches")).await
    }

    // ===== Loans =====

    pub async fn fetch_loans(&self) -> Result<Vec<Loan>, ApiError> {
        self.request_json(ApiRequest::get("/api/loans")).await
    }

    pub async fn fetch_loan(&self, loan_id: i64) -> Result<Loan, ApiError> {
        self.request_json(ApiRequest::get(format!("/api/loans/{}", loan_id)))
            .await
    }

    /// Originate a loan
    pub async fn create_loan(&self, loan: &NewLoan) -> Result<Loan, ApiError> {
        if !loan.principal.is_finite() || loan.principal <= 0.0 || loan.tenure_months <= 0 {
            return Err(ApiError::InvalidRequest(
                "principal and tenure must be positive".to_string(),
            ));
        }
        let request = Self::with_body(ApiRequest::post("/api/loans"), loan)?;
        self.request_json(request).await
    }

    /// Replace a loan's terms. The server recomputes the maturity date.
    pub async fn update_loan(&self, loan: &Loan) -> Result<Loan, ApiError> {
        let missing = loan.missing_update_fields();
        if !missing.is_empty() {
            return Err(ApiError::InvalidRequest(format!(
                "loan {} is missing {}",
                loan.loan_id,
                missing.join(", ")
            )));
        }
        let request = Self::with_body(ApiRequest::put(format!("/api/loans/{}", loan.loan_id)), loan)?;
        self.request_json(request).await
    }

    pub async fn delete_loan(&self, loan_id: i64) -> Result<String, ApiError> {
        self.request_text(ApiRequest::delete(format!("/api/loans/{}", loan_id)))
            .await
    }

    /// Attach collateral to a loan
    pub async fn add_collateral(&self, collateral: &NewCollateral) -> Result<Collateral, ApiError> {
        let request = Self::with_body(ApiRequest::post("/api/collaterals"), collateral)?;
        self.request_json(request).await
    }

    // ===== Staff =====

    pub async fn create_staff_user(&self, user: &NewStaffUser) -> Result<serde_json::Value, ApiError> {
        let request = Self::with_body(ApiRequest::post("/api/staff/create"), user)?;
        self.request_json(request).await
    }

    // ===== Repayment Reports =====

    pub async fn fetch_repayment_report(
        &self,
        filter: &ReportFilter,
    ) -> Result<Vec<RepaymentReportRow>, ApiError> {
        self.request_json(filter.apply(ApiRequest::get("/api/repayments/report")))
            .await
    }

    /// Download the server-rendered PDF for the report
    pub async fn download_repayment_report_pdf(
        &self,
        filter: &ReportFilter,
    ) -> Result<Vec<u8>, ApiError> {
        let request = filter
            .apply(ApiRequest::get("/api/repayments/report/pdf"))
            .header(ACCEPT, HeaderValue::from_static("application/pdf"));
        let bytes = self.request_bytes(request).await?;
        debug!(bytes = bytes.len(), "Repayment report PDF received");
        Ok(bytes)
    }
}
