//! CSV spreadsheet contracts.
//!
//! Import sheets are matched by fuzzy header resolution: headers are
//! lowercased, stripped of non-alphanumerics, and a column matches when it
//! contains every keyword. "Dealer Code", "dealer_code" and "Dealer Code *"
//! all resolve to the same column, which mirrors how the sheets arrive from
//! the field.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use rust_decimal::Decimal;
use std::io::Read;

use crate::errors::ServiceError;

fn normalize(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Index of the first column whose normalized header contains every keyword.
pub fn find_column(headers: &StringRecord, keywords: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let normalized = normalize(h);
        keywords.iter().all(|kw| normalized.contains(kw))
    })
}

fn cell(record: &StringRecord, index: Option<usize>) -> Option<String> {
    let value = record.get(index?)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn decimal_cell(record: &StringRecord, index: Option<usize>) -> Option<Decimal> {
    cell(record, index).and_then(|v| v.parse().ok())
}

/// One row of the store upload sheet. `row_number` is 1-based including the
/// header, so the first data row is 2 (matching what users see in a sheet).
#[derive(Debug, Clone)]
pub struct StoreImportRow {
    pub row_number: usize,
    pub serial_no: Option<String>,
    pub dealer_code: Option<String>,
    pub vendor_code: Option<String>,
    pub store_name: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub address: Option<String>,
    pub width_ft: Option<Decimal>,
    pub height_ft: Option<Decimal>,
    pub board_type: Option<String>,
}

/// Headers for the downloadable store template (and the upload contract).
pub const STORE_TEMPLATE_HEADERS: [&str; 10] = [
    "Sr. No.",
    "Dealer Code",
    "Vendor Code & Name",
    "Dealer's Name",
    "City",
    "District",
    "Dealer's Address",
    "Width (Ft.)",
    "Height (Ft.)",
    "Dealer Board Type",
];

pub fn read_store_rows<R: Read>(input: R) -> Result<Vec<StoreImportRow>, ServiceError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader
        .headers()
        .map_err(|e| ServiceError::InvalidInput(format!("Parsing Error: {e}")))?
        .clone();

    let serial_col = find_column(&headers, &["sr", "no"]);
    let dealer_col = find_column(&headers, &["dealer", "code"]);
    let vendor_col = find_column(&headers, &["vendor", "code"]);
    let name_col = find_column(&headers, &["dealer", "name"]);
    let city_col = find_column(&headers, &["city"]);
    let district_col = find_column(&headers, &["district"]);
    let address_col = find_column(&headers, &["address"]);
    let width_col = find_column(&headers, &["width"]);
    let height_col = find_column(&headers, &["height"]);
    let board_col = find_column(&headers, &["board", "type"]);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ServiceError::InvalidInput(format!("Parsing Error: {e}")))?;
        rows.push(StoreImportRow {
            row_number: index + 2,
            serial_no: cell(&record, serial_col),
            dealer_code: cell(&record, dealer_col),
            vendor_code: cell(&record, vendor_col),
            store_name: cell(&record, name_col),
            city: cell(&record, city_col),
            district: cell(&record, district_col),
            address: cell(&record, address_col),
            width_ft: decimal_cell(&record, width_col),
            height_ft: decimal_cell(&record, height_col),
            board_type: cell(&record, board_col),
        });
    }
    Ok(rows)
}

/// One row of the per-user roster assignment sheet. The `Status` column is
/// informational only; preconditions run against the database state.
#[derive(Debug, Clone)]
pub struct AssignmentRow {
    pub row_number: usize,
    pub store_id: Option<String>,
    pub client_code: Option<String>,
    pub status: Option<String>,
}

pub const ASSIGNMENT_HEADERS: [&str; 3] = ["Store ID", "Client Code", "Status"];

pub fn read_assignment_rows<R: Read>(input: R) -> Result<Vec<AssignmentRow>, ServiceError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader
        .headers()
        .map_err(|e| ServiceError::InvalidInput(format!("Parsing Error: {e}")))?
        .clone();

    let store_col = find_column(&headers, &["store", "id"]);
    let client_col = find_column(&headers, &["client", "code"]);
    let status_col = find_column(&headers, &["status"]);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ServiceError::InvalidInput(format!("Parsing Error: {e}")))?;
        rows.push(AssignmentRow {
            row_number: index + 2,
            store_id: cell(&record, store_col),
            client_code: cell(&record, client_col),
            status: cell(&record, status_col),
        });
    }
    Ok(rows)
}

/// One row of the user upload sheet.
#[derive(Debug, Clone)]
pub struct UserImportRow {
    pub row_number: usize,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Comma-separated role codes.
    pub roles: Option<String>,
}

pub const USER_TEMPLATE_HEADERS: [&str; 4] = ["Name", "Email", "Password", "Roles"];

pub fn read_user_rows<R: Read>(input: R) -> Result<Vec<UserImportRow>, ServiceError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader
        .headers()
        .map_err(|e| ServiceError::InvalidInput(format!("Parsing Error: {e}")))?
        .clone();

    let name_col = find_column(&headers, &["name"]);
    let email_col = find_column(&headers, &["email"]);
    let password_col = find_column(&headers, &["password"]);
    let roles_col = find_column(&headers, &["role"]);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ServiceError::InvalidInput(format!("Parsing Error: {e}")))?;
        rows.push(UserImportRow {
            row_number: index + 2,
            name: cell(&record, name_col),
            email: cell(&record, email_col),
            password: cell(&record, password_col),
            roles: cell(&record, roles_col),
        });
    }
    Ok(rows)
}

/// Serialise a header row plus data rows into CSV bytes.
pub fn write_rows(
    headers: &[&str],
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<Vec<u8>, ServiceError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(headers)
        .map_err(|e| ServiceError::InternalError(e.to_string()))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| ServiceError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_header_matching() {
        let headers = StringRecord::from(vec![
            "Sr. No.",
            "Dealer Code",
            "Dealer's Name",
            "Width (Ft.)",
        ]);
        assert_eq!(find_column(&headers, &["dealer", "code"]), Some(1));
        assert_eq!(find_column(&headers, &["dealer", "name"]), Some(2));
        assert_eq!(find_column(&headers, &["width"]), Some(3));
        assert_eq!(find_column(&headers, &["height"]), None);
    }

    #[test]
    fn store_rows_are_parsed_with_row_numbers() {
        let csv = "Sr. No.,Dealer Code,Vendor Code & Name,Dealer's Name,City,District,Dealer's Address,Width (Ft.),Height (Ft.),Dealer Board Type\n\
            1,DLR001,V1 Vendor,Elora Art,Mumbai,Mumbai Suburban,12 MG Road,10,8,Flex\n\
            2,,V2,No Code,Pune,Haveli,,12,6,ACP\n";
        let rows = read_store_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].dealer_code.as_deref(), Some("DLR001"));
        assert_eq!(rows[0].width_ft, Some(Decimal::from(10)));
        assert_eq!(rows[1].row_number, 3);
        assert_eq!(rows[1].dealer_code, None);
        assert_eq!(rows[1].address, None);
    }

    #[test]
    fn assignment_rows_tolerate_missing_optional_columns() {
        let csv = "Store ID,Status\nMUMMUMDLR001,UPLOADED\n";
        let rows = read_assignment_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].store_id.as_deref(), Some("MUMMUMDLR001"));
        assert_eq!(rows[0].client_code, None);
    }

    #[test]
    fn written_rows_round_trip() {
        let bytes = write_rows(
            &["Store Name", "Dealer Code"],
            vec![vec!["Elora Art".to_string(), "DLR001".to_string()]],
        )
        .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Store Name,Dealer Code\n"));
        assert!(text.contains("Elora Art,DLR001"));
    }
}
