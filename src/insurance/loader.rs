//! Load insurance policy records from CSV
//!
//! The CRM export renames columns over time (spaces vs underscores); serde
//! aliases coalesce the known variants onto canonical fields.

use super::types::PolicyRecord;
use chrono::NaiveDate;
use csv::Reader;
use std::error::Error;
use std::path::Path;

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "Lead_ID", alias = "LeadID")]
    lead_id: String,
    #[serde(rename = "Policy_Number", alias = "Policy Number")]
    policy_number: String,
    #[serde(rename = "Insurance_Lead_Name", alias = "Insurance Lead Name", default)]
    client_name: Option<String>,
    #[serde(rename = "Conversion_Date", alias = "Conversion/Lost Date")]
    conversion_date: String,
    #[serde(rename = "Policy_Start_Date", alias = "Policy Start Date", default)]
    policy_start: Option<String>,
    #[serde(rename = "Policy_End_Date", alias = "Policy End Date", default)]
    policy_end: Option<String>,
    #[serde(rename = "Renewal_Date", alias = "Renewal Date", default)]
    renewal_date: Option<String>,
    #[serde(rename = "Premium_Bf_GST", alias = "Premium B/f GST", default)]
    this_year_premium: Option<f64>,
    #[serde(rename = "Last_Year_Premium", alias = "Last Year Premium", default)]
    last_year_premium: Option<f64>,
    #[serde(rename = "Renewal_Notice_Premium", alias = "Renewal Notice Premium", default)]
    renewal_notice_premium: Option<f64>,
    #[serde(rename = "Insurance_Type", alias = "Policy Type", default)]
    policy_type: Option<String>,
    #[serde(rename = "Conversion_Status", alias = "Conversion Status", default)]
    conversion_status: Option<String>,
    #[serde(rename = "Processing_User_ID", alias = "Processing User ID", default)]
    processing_user_id: Option<String>,
    #[serde(rename = "Processing_User", alias = "Processing User", default)]
    processing_user_name: Option<String>,
    #[serde(rename = "Direct_Associate", alias = "Direct Associate", default)]
    direct_associate: Option<String>,
    #[serde(rename = "Deductible_In_Policy", alias = "Deductible In Policy", default)]
    deductible_in_policy: Option<String>,
    #[serde(rename = "Cashback_Amount", alias = "Cashback Amount", default)]
    cashback_amount: Option<f64>,
    #[serde(rename = "Eldest_Member_DOB", alias = "Eldest Member Age", default)]
    eldest_member_dob: Option<String>,
    #[serde(rename = "Company_Name", alias = "Company Name", default)]
    company_name: Option<String>,
}

fn parse_date(value: &Option<String>) -> Result<Option<NaiveDate>, Box<dyn Error>> {
    match value.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)),
        None => Ok(None),
    }
}

impl CsvRow {
    fn to_policy(self) -> Result<PolicyRecord, Box<dyn Error>> {
        let conversion_date =
            NaiveDate::parse_from_str(self.conversion_date.trim(), "%Y-%m-%d")?;
        let deductible_added = self
            .deductible_in_policy
            .as_deref()
            .map(|s| s.trim().to_lowercase().starts_with("yes"))
            .unwrap_or(false);
        Ok(PolicyRecord {
            lead_id: self.lead_id.trim().to_string(),
            policy_number: self.policy_number.trim().to_string(),
            client_name: self.client_name.filter(|s| !s.trim().is_empty()),
            conversion_date,
            policy_start: parse_date(&self.policy_start)?,
            policy_end: parse_date(&self.policy_end)?,
            renewal_date: parse_date(&self.renewal_date)?,
            this_year_premium: self.this_year_premium.unwrap_or(0.0),
            last_year_premium: self.last_year_premium.unwrap_or(0.0),
            renewal_notice_premium: self.renewal_notice_premium.unwrap_or(0.0),
            policy_type: self.policy_type.unwrap_or_default(),
            conversion_status: self.conversion_status.unwrap_or_default(),
            processing_user_id: self.processing_user_id.filter(|s| !s.trim().is_empty()),
            processing_user_name: self.processing_user_name.unwrap_or_default(),
            direct_associate: self.direct_associate.filter(|s| !s.trim().is_empty()),
            deductible_added,
            cashback_amount: self.cashback_amount.unwrap_or(0.0),
            eldest_member_dob: parse_date(&self.eldest_member_dob)?,
            company_name: self.company_name.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Load all policy records from a CSV file
pub fn load_policies<P: AsRef<Path>>(path: P) -> Result<Vec<PolicyRecord>, Box<dyn Error>> {
    let mut reader = Reader::from_path(path)?;
    let mut policies = Vec::new();
    for result in reader.deserialize() {
        let row: CsvRow = result?;
        policies.push(row.to_policy()?);
    }
    Ok(policies)
}

/// Load policy records from any reader
pub fn load_policies_from_reader<R: std::io::Read>(
    reader: R,
) -> Result<Vec<PolicyRecord>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut policies = Vec::new();
    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        policies.push(row.to_policy()?);
    }
    Ok(policies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_canonical_headers() {
        let csv = "\
Lead_ID,Policy_Number,Conversion_Date,Policy_Start_Date,Policy_End_Date,Premium_Bf_GST,Insurance_Type,Conversion_Status,Processing_User,Processing_User_ID,Deductible_In_Policy
L1,P1,2025-09-10,2025-09-15,2026-09-14,80000,Health,Converted,Sumit Chadha,E300,Yes - Added
";
        let policies = load_policies_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(policies.len(), 1);
        let p = &policies[0];
        assert_eq!(p.lead_id, "L1");
        assert_eq!(p.this_year_premium, 80_000.0);
        assert!(p.deductible_added);
        assert_eq!(p.processing_user_id.as_deref(), Some("E300"));
        assert_eq!(p.renewal_date, None);
    }

    #[test]
    fn test_missing_numerics_default_to_zero() {
        let csv = "\
Lead_ID,Policy_Number,Conversion_Date,Processing_User
L2,P2,2025-09-12,Asha Verma
";
        let policies = load_policies_from_reader(csv.as_bytes()).unwrap();
        let p = &policies[0];
        assert_eq!(p.this_year_premium, 0.0);
        assert_eq!(p.last_year_premium, 0.0);
        assert!(!p.deductible_added);
    }
}
