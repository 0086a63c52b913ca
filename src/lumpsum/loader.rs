//! Load lumpsum transactions from CSV

use super::types::{Transaction, TxnType};
use chrono::NaiveDate;
use csv::Reader;
use std::error::Error;
use std::path::Path;

/// Raw CSV row matching the transaction export columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "RMName")]
    rm_name: String,
    #[serde(rename = "TransactionDate")]
    transaction_date: String,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Type")]
    txn_type: String,
    #[serde(rename = "SubCategory")]
    sub_category: Option<String>,
    #[serde(rename = "SchemeName")]
    scheme_name: Option<String>,
}

impl CsvRow {
    fn to_transaction(self) -> Result<Transaction, Box<dyn Error>> {
        let txn_type: TxnType = self.txn_type.parse()?;
        let transaction_date = NaiveDate::parse_from_str(self.transaction_date.trim(), "%Y-%m-%d")?;
        Ok(Transaction {
            rm_name: self.rm_name,
            transaction_date,
            amount: self.amount,
            txn_type,
            sub_category: self.sub_category.unwrap_or_default(),
            scheme_name: self.scheme_name.unwrap_or_default(),
        })
    }
}

/// Load all transactions from a CSV file
pub fn load_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>, Box<dyn Error>> {
    let mut reader = Reader::from_path(path)?;
    let mut transactions = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        transactions.push(row.to_transaction()?);
    }

    Ok(transactions)
}

/// Load transactions from any reader (e.g. string buffer, network stream)
pub fn load_transactions_from_reader<R: std::io::Read>(
    reader: R,
) -> Result<Vec<Transaction>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut transactions = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        transactions.push(row.to_transaction()?);
    }

    Ok(transactions)
}
