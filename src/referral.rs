//! Referral scoring
//!
//! Fixed point awards per referral scenario, with the investment
//! family-head penalty and independent inactivity gating of converter and
//! referrer.

use crate::config::store::SCHEMA_VERSION;
use crate::config::ReferralConfig;
use crate::identity::{title_case, Directory, SkipList};
use crate::window::Month;
use chrono::{NaiveDate, NaiveDateTime};
use csv::Reader;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralType {
    Insurance,
    Investment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralRole {
    Converter,
    Referrer,
}

/// One converted lead with its referral linkage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralLead {
    pub lead_id: String,
    pub referral_type: ReferralType,
    pub conversion_date: NaiveDate,
    pub converter_id: Option<String>,
    pub converter_name: String,
    #[serde(default)]
    pub referrer_id: Option<String>,
    #[serde(default)]
    pub referrer_name: Option<String>,
    /// Investment-only flags
    #[serde(default = "default_true")]
    pub is_family_head: bool,
    #[serde(default)]
    pub special_permission: bool,
}

fn default_true() -> bool {
    true
}

impl ReferralLead {
    pub fn month(&self) -> Month {
        Month::from_date(self.conversion_date)
    }

    fn is_self_sourced(&self) -> bool {
        match (&self.converter_id, &self.referrer_id) {
            (Some(c), Some(r)) => c == r,
            _ => false,
        }
    }
}

/// One referral award, keyed (lead_id, employee_id, referral_type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralRow {
    pub lead_id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub referral_type: ReferralType,
    pub role: ReferralRole,
    pub month: Month,
    pub points: f64,
    pub justification: String,
    pub schema_version: String,
    pub config_hash: String,
    pub updated_at: NaiveDateTime,
}

/// Score one lead into zero, one or two award rows.
/// Converter and referrer are gated independently; a 6-month-expired party
/// earns nothing even when the other side still does.
pub fn score_lead(
    cfg: &ReferralConfig,
    directory: &Directory,
    skip: &SkipList,
    lead: &ReferralLead,
    config_hash: &str,
    now: NaiveDateTime,
) -> Vec<ReferralRow> {
    let month = lead.month();

    // Investment penalty: non-family-head without special permission keeps
    // only a fraction of the points
    let inv_scale = if lead.referral_type == ReferralType::Investment
        && !lead.is_family_head
        && !lead.special_permission
    {
        cfg.investment.not_family_head_penalty_pct / 100.0
    } else {
        1.0
    };

    let (converter_points, referrer_points) = match lead.referral_type {
        ReferralType::Insurance => {
            if lead.is_self_sourced() {
                (cfg.insurance.self_sourced_points, 0.0)
            } else if lead.referrer_id.is_some() {
                (cfg.insurance.converter_points, cfg.insurance.referrer_points)
            } else {
                (0.0, 0.0)
            }
        }
        ReferralType::Investment => {
            if lead.is_self_sourced() {
                (cfg.investment.self_sourced_points * inv_scale, 0.0)
            } else if lead.referrer_id.is_some() {
                (0.0, cfg.investment.referrer_points * inv_scale)
            } else {
                (cfg.investment.converter_only_points * inv_scale, 0.0)
            }
        }
    };

    let mut rows = Vec::new();

    let mut push_award =
        |employee_id: &Option<String>, name: &str, role: ReferralRole, points: f64| {
            if points <= 0.0 {
                return;
            }
            let Some(id) = employee_id.as_deref().filter(|s| !s.trim().is_empty()) else {
                return;
            };
            if skip.contains(name) || !directory.eligible_for_month(id, month) {
                return;
            }
            let role_word = match role {
                ReferralRole::Converter => "conversion",
                ReferralRole::Referrer => "referral",
            };
            let kind = match lead.referral_type {
                ReferralType::Insurance => "insurance",
                ReferralType::Investment => "investment",
            };
            rows.push(ReferralRow {
                lead_id: lead.lead_id.clone(),
                employee_id: id.to_string(),
                employee_name: title_case(name),
                referral_type: lead.referral_type,
                role,
                month,
                points,
                justification: format!("{} pts for {} {} {}", points, kind, role_word, lead.lead_id),
                schema_version: SCHEMA_VERSION.to_string(),
                config_hash: config_hash.to_string(),
                updated_at: now,
            });
        };

    push_award(
        &lead.converter_id,
        &lead.converter_name,
        ReferralRole::Converter,
        converter_points,
    );
    if !lead.is_self_sourced() {
        let referrer_name = lead.referrer_name.clone().unwrap_or_default();
        push_award(
            &lead.referrer_id,
            &referrer_name,
            ReferralRole::Referrer,
            referrer_points,
        );
    }

    rows
}

/// Score a batch of leads
pub fn score_leads(
    cfg: &ReferralConfig,
    directory: &Directory,
    skip: &SkipList,
    leads: &[ReferralLead],
    config_hash: &str,
    now: NaiveDateTime,
) -> Vec<ReferralRow> {
    let rows: Vec<ReferralRow> = leads
        .iter()
        .flat_map(|lead| score_lead(cfg, directory, skip, lead, config_hash, now))
        .collect();
    info!("[Referral] Scored {} leads into {} awards", leads.len(), rows.len());
    rows
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Lead_ID")]
    lead_id: String,
    #[serde(rename = "Referral_Type")]
    referral_type: String,
    #[serde(rename = "Conversion_Date")]
    conversion_date: String,
    #[serde(rename = "Converter_ID", default)]
    converter_id: Option<String>,
    #[serde(rename = "Converter_Name", default)]
    converter_name: Option<String>,
    #[serde(rename = "Referrer_ID", default)]
    referrer_id: Option<String>,
    #[serde(rename = "Referrer_Name", default)]
    referrer_name: Option<String>,
    #[serde(rename = "Is_Family_Head", default)]
    is_family_head: Option<String>,
    #[serde(rename = "Special_Permission", default)]
    special_permission: Option<String>,
}

fn parse_flag(value: &Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "1" | "y"),
        None => default,
    }
}

/// Load referral leads from CSV
pub fn load_leads<P: AsRef<Path>>(path: P) -> Result<Vec<ReferralLead>, Box<dyn Error>> {
    let mut reader = Reader::from_path(path)?;
    let mut leads = Vec::new();
    for result in reader.deserialize() {
        let row: CsvRow = result?;
        let referral_type = match row.referral_type.trim().to_lowercase().as_str() {
            "insurance" => ReferralType::Insurance,
            "investment" => ReferralType::Investment,
            other => return Err(format!("unknown referral type: {}", other).into()),
        };
        leads.push(ReferralLead {
            lead_id: row.lead_id.trim().to_string(),
            referral_type,
            conversion_date: NaiveDate::parse_from_str(row.conversion_date.trim(), "%Y-%m-%d")?,
            converter_id: row.converter_id.filter(|s| !s.trim().is_empty()),
            converter_name: row.converter_name.unwrap_or_default(),
            referrer_id: row.referrer_id.filter(|s| !s.trim().is_empty()),
            referrer_name: row.referrer_name.filter(|s| !s.trim().is_empty()),
            is_family_head: parse_flag(&row.is_family_head, true),
            special_permission: parse_flag(&row.special_permission, false),
        });
    }
    Ok(leads)
}
