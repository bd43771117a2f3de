//! Repayment report rows and filters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::ApiRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentReportRow {
    #[serde(rename = "loanId")]
    pub loan_id: Option<i64>,
    #[serde(rename = "dueDate")]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "paymentDate")]
    pub payment_date: Option<NaiveDate>,
    #[serde(rename = "amountPaid")]
    pub amount_paid: Option<f64>,
    #[serde(rename = "rateofinterest")]
    pub rate_of_interest: Option<f64>,
    #[serde(rename = "balanceRemaining")]
    pub balance_remaining: Option<f64>,
    pub outstanding: Option<f64>,
}

/// Optional filters shared by the JSON and PDF report endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub loan_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportFilter {
    pub fn for_loan(loan_id: i64) -> Self {
        Self {
            loan_id: Some(loan_id),
            ..Self::default()
        }
    }

    pub fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query_opt("loanId", self.loan_id)
            .query_opt("startDate", self.start_date)
            .query_opt("endDate", self.end_date)
    }

    /// Download name used for the exported PDF.
    pub fn pdf_file_name(&self) -> String {
        match self.loan_id {
            Some(id) => format!("repayment_report_{}.pdf", id),
            None => "repayment_report_all.pdf".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_skips_empty_filters() {
        let filter = ReportFilter {
            loan_id: Some(9),
            start_date: None,
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31),
        };
        let request = filter.apply(ApiRequest::get("/api/repayments/report"));
        assert_eq!(
            request.query_pairs(),
            &[
                ("loanId".to_string(), "9".to_string()),
                ("endDate".to_string(), "2024-03-31".to_string()),
            ]
        );
    }

    #[test]
    fn test_pdf_file_name() {
        assert_eq!(ReportFilter::for_loan(12).pdf_file_name(), "repayment_report_12.pdf");
        assert_eq!(ReportFilter::default().pdf_file_name(), "repayment_report_all.pdf");
    }

    #[test]
    fn test_parse_report_row() {
        let json = r#"{"loanId":9,"dueDate":"2024-02-01","paymentDate":null,"amountPaid":0,"rateofinterest":8.5,"balanceRemaining":98000.25,"outstanding":2100}"#;
        let row: RepaymentReportRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.rate_of_interest, Some(8.5));
        assert!(row.payment_date.is_none());
    }
}
