//! SIP/SWP document normalization
//!
//! Turns raw documents into one row per effective transaction:
//! - a fractioned document yields one row per fraction whose latest APPROVED
//!   validation falls inside the window, with reconciliation checked at the
//!   fraction level and the document level as fallback;
//! - an unfractioned document yields one row keyed on its own latest
//!   APPROVED validation.
//!
//! Scheme weights apply per the configured `apply_to` toggles.

use super::types::*;
use crate::config::{resolve_scheme_weight, SipWeights};
use chrono::NaiveDateTime;
use log::info;
use std::collections::HashMap;

/// Latest APPROVED validation timestamp within [start, end)
fn latest_approved(
    validations: &[Validation],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Option<NaiveDateTime> {
    validations
        .iter()
        .filter(|v| v.status == ValidationStatus::Approved)
        .map(|v| v.validated_at)
        .filter(|t| *t >= start && *t < end)
        .max()
}

fn weight_applies(weights: &SipWeights, txn_type: SipTxnType, txn_for: SipTxnFor) -> bool {
    let a = &weights.apply_to;
    match (txn_type, txn_for) {
        (SipTxnType::Sip, SipTxnFor::Registration) => a.sip_registration,
        (SipTxnType::Sip, SipTxnFor::Cancellation) => a.sip_cancellation,
        (SipTxnType::Swp, SipTxnFor::Registration) => a.swp_registration,
        (SipTxnType::Swp, SipTxnFor::Cancellation) => a.swp_cancellation,
    }
}

/// Normalize all documents against a scoring window.
/// `require_reconciled` keeps only RECONCILED / RECONCILED_WITH_MINOR rows.
pub fn normalize_documents(
    docs: &[SipDocument],
    window: (NaiveDateTime, NaiveDateTime),
    weights: &SipWeights,
    require_reconciled: bool,
) -> Vec<NormalizedTxn> {
    let (start, end) = window;
    let mut rows: Vec<NormalizedTxn> = Vec::new();

    for doc in docs {
        let rm_name = doc.rm_name.trim().to_string();

        if !doc.fractions.is_empty() {
            for fr in &doc.fractions {
                let Some(exec_dt) = latest_approved(&fr.validations, start, end) else {
                    continue;
                };
                // Reconciliation: fraction level first, document fallback
                let recon = fr.reconciliation_status.or(doc.reconciliation_status);
                if require_reconciled && !recon.map(|r| r.is_ok()).unwrap_or(false) {
                    continue;
                }
                let apply = weight_applies(weights, doc.transaction_type, doc.transaction_for);
                let weight = if apply {
                    resolve_scheme_weight(&weights.scheme_rules, &doc.scheme_name, exec_dt.date())
                } else {
                    1.0
                };
                rows.push(NormalizedTxn {
                    date: exec_dt,
                    amount: fr.amount * weight,
                    amount_raw: fr.amount,
                    scheme_name: doc.scheme_name.clone(),
                    weight,
                    txn_type: doc.transaction_type,
                    txn_for: doc.transaction_for,
                    rm_name: rm_name.clone(),
                    source: TxnSource::Fraction,
                    parent_id: doc.doc_id.clone(),
                    line_id: fr.line_id.clone(),
                });
            }
        } else {
            let Some(exec_dt) = latest_approved(&doc.validations, start, end) else {
                continue;
            };
            if require_reconciled
                && !doc.reconciliation_status.map(|r| r.is_ok()).unwrap_or(false)
            {
                continue;
            }
            let apply = weight_applies(weights, doc.transaction_type, doc.transaction_for);
            let weight = if apply {
                resolve_scheme_weight(&weights.scheme_rules, &doc.scheme_name, exec_dt.date())
            } else {
                1.0
            };
            rows.push(NormalizedTxn {
                date: exec_dt,
                amount: doc.amount * weight,
                amount_raw: doc.amount,
                scheme_name: doc.scheme_name.clone(),
                weight,
                txn_type: doc.transaction_type,
                txn_for: doc.transaction_for,
                rm_name: rm_name.clone(),
                source: TxnSource::Main,
                parent_id: doc.doc_id.clone(),
                line_id: doc.doc_id.clone(),
            });
        }
    }

    // Stable ordering, then last-wins per line id
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.line_id.cmp(&b.line_id)));
    let mut last_by_line: HashMap<String, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        last_by_line.insert(row.line_id.clone(), i);
    }
    let deduped: Vec<NormalizedTxn> = rows
        .iter()
        .enumerate()
        .filter(|(i, row)| last_by_line[&row.line_id] == *i)
        .map(|(_, row)| row.clone())
        .collect();

    info!(
        "[SIP Normalize] rows={} window={} → {}",
        deduped.len(),
        start,
        end
    );
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    fn window() -> (NaiveDateTime, NaiveDateTime) {
        (dt("2025-09-01"), dt("2025-10-01"))
    }

    fn approved(at: &str) -> Validation {
        Validation { status: ValidationStatus::Approved, validated_at: dt(at) }
    }

    fn pending(at: &str) -> Validation {
        Validation { status: ValidationStatus::Pending, validated_at: dt(at) }
    }

    fn doc(id: &str, amount: f64, validations: Vec<Validation>) -> SipDocument {
        SipDocument {
            doc_id: id.into(),
            rm_name: "Sagar Maini".into(),
            transaction_type: SipTxnType::Sip,
            transaction_for: SipTxnFor::Registration,
            amount,
            scheme_name: "Axis Bluechip".into(),
            reconciliation_status: Some(ReconStatus::Reconciled),
            validations,
            fractions: vec![],
        }
    }

    #[test]
    fn test_unfractioned_uses_latest_approved_in_window() {
        let d = doc(
            "T1",
            5000.0,
            vec![approved("2025-09-03"), approved("2025-09-20"), pending("2025-09-25")],
        );
        let rows = normalize_documents(&[d], window(), &SipWeights::default(), true);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, dt("2025-09-20"));
        assert_eq!(rows[0].amount, 5000.0);
    }

    #[test]
    fn test_out_of_window_or_unapproved_dropped() {
        let stale = doc("T1", 5000.0, vec![approved("2025-08-20")]);
        let unapproved = doc("T2", 5000.0, vec![pending("2025-09-10")]);
        let rows =
            normalize_documents(&[stale, unapproved], window(), &SipWeights::default(), true);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unreconciled_dropped_when_required() {
        let mut d = doc("T1", 5000.0, vec![approved("2025-09-10")]);
        d.reconciliation_status = Some(ReconStatus::Other);
        assert!(normalize_documents(&[d.clone()], window(), &SipWeights::default(), true)
            .is_empty());
        // Not required → kept
        assert_eq!(
            normalize_documents(&[d], window(), &SipWeights::default(), false).len(),
            1
        );
    }

    #[test]
    fn test_fractions_scored_independently() {
        let mut d = doc("T1", 10_000.0, vec![]);
        d.fractions = vec![
            Fraction {
                line_id: "T1-a".into(),
                amount: 6_000.0,
                reconciliation_status: Some(ReconStatus::Reconciled),
                validations: vec![approved("2025-09-05")],
            },
            Fraction {
                line_id: "T1-b".into(),
                amount: 4_000.0,
                reconciliation_status: None, // falls back to doc level
                validations: vec![approved("2025-09-12")],
            },
            Fraction {
                line_id: "T1-c".into(),
                amount: 1_000.0,
                reconciliation_status: Some(ReconStatus::Other),
                validations: vec![approved("2025-09-13")],
            },
        ];
        let rows = normalize_documents(&[d], window(), &SipWeights::default(), true);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line_id, "T1-a");
        assert_eq!(rows[1].line_id, "T1-b");
        assert_eq!(rows.iter().map(|r| r.amount).sum::<f64>(), 10_000.0);
    }

    #[test]
    fn test_scheme_weight_only_on_toggled_legs() {
        use crate::config::{MatchType, SchemeRule};
        let mut weights = SipWeights::default();
        weights.scheme_rules = vec![SchemeRule {
            keyword: "BLUECHIP".into(),
            match_type: MatchType::Contains,
            weight_pct: 50.0,
            start_date: None,
            end_date: None,
        }];

        // Registration is toggled on by default
        let reg = doc("T1", 10_000.0, vec![approved("2025-09-10")]);
        // Cancellation is toggled off by default
        let mut cancel = doc("T2", 10_000.0, vec![approved("2025-09-11")]);
        cancel.transaction_for = SipTxnFor::Cancellation;

        let rows = normalize_documents(&[reg, cancel], window(), &weights, true);
        assert_eq!(rows[0].amount, 5_000.0);
        assert_eq!(rows[0].amount_raw, 10_000.0);
        assert_eq!(rows[1].amount, 10_000.0);
    }
}
