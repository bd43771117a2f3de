use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A customer record as returned by `/api/customers`.
///
/// Updates are whole-record: the server overwrites every field with what is
/// sent, so an edit starts from the fetched record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "customerId")]
    pub customer_id: i64,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub dob: Option<NaiveDate>,
    #[serde(rename = "addressLine1")]
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    #[serde(rename = "kycDetails")]
    pub kyc_details: Option<String>,
    #[serde(rename = "createdAt", skip_serializing)]
    pub created_at: Option<NaiveDateTime>,
    pub status: Option<String>,
    #[serde(rename = "branchId")]
    pub branch_id: Option<i64>,
    #[serde(rename = "branchName", skip_serializing)]
    pub branch_name: Option<String>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Payload for onboarding a customer (`POST /api/customers`).
#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(rename = "addressLine1", skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(rename = "kycDetails", skip_serializing_if = "Option::is_none")]
    pub kyc_details: Option<String>,
    #[serde(rename = "branchId")]
    pub branch_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_skips_missing_parts() {
        let json = r#"{"customerId":1,"firstName":"Asha","lastName":null,"email":null,"phone":null,"dob":"1990-04-12","city":"Pune","status":"ACTIVE","branchName":null}"#;
        let customer: Customer = serde_json::from_str(json).unwrap();
        assert_eq!(customer.full_name(), "Asha");
        assert_eq!(customer.dob, NaiveDate::from_ymd_opt(1990, 4, 12));
    }

    #[test]
    fn test_parse_full_customer_record() {
        let json = r#"{"customerId":8,"firstName":"Ravi","lastName":"Iyer","email":"ravi@bank.test","phone":"9800000000","dob":"1985-11-02","addressLine1":"12 MG Road","city":"Chennai","state":"Tamil Nadu","zip":"600001","kycDetails":"PAN ABCDE1234F","createdAt":"2024-05-10T09:30:15","status":"ACTIVE","branchId":3,"branchName":"Anna Nagar"}"#;
        let customer: Customer = serde_json::from_str(json).unwrap();
        assert_eq!(customer.branch_id, Some(3));
        assert_eq!(customer.kyc_details.as_deref(), Some("PAN ABCDE1234F"));
        assert!(customer.created_at.is_some());
    }

    #[test]
    fn test_update_body_omits_server_owned_fields() {
        let json = r#"{"customerId":8,"firstName":"Ravi","lastName":"Iyer","createdAt":"2024-05-10T09:30:15","status":"ACTIVE","branchId":3,"branchName":"Anna Nagar"}"#;
        let customer: Customer = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&customer).unwrap();
        assert_eq!(value["branchId"], 3);
        assert!(value.get("createdAt").is_none());
        assert!(value.get("branchName").is_none());
    }

    #[test]
    fn test_new_customer_payload() {
        let customer = NewCustomer {
            first_name: "Meera".to_string(),
            last_name: "Das".to_string(),
            email: Some("meera@bank.test".to_string()),
            phone: None,
            dob: NaiveDate::from_ymd_opt(1992, 1, 30),
            address_line1: None,
            city: Some("Kolkata".to_string()),
            state: None,
            zip: None,
            kyc_details: None,
            branch_id: 2,
        };
        assert_eq!(
            serde_json::to_value(&customer).unwrap(),
            serde_json::json!({
                "firstName": "Meera",
                "lastName": "Das",
                "email": "meera@bank.test",
                "dob": "1992-01-30",
                "city": "Kolkata",
                "branchId": 2
            })
        );
    }
}
