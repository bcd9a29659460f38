/// Fixed locations and schema for the credit card fraud pipeline.
/// The slot keys and the column lists below are the pipeline's contract:
/// every stage hands off exactly these artifacts at exactly these keys,
/// and the transformed artifact must match the destination schema.

/// Default source of the dataset snapshot.
pub const SOURCE_URL: &str =
    "https://raw.githubusercontent.com/mohamedmagdy841/credit-card-fraud/main/data/credit_card_fraud.csv";

/// Bucket holding both object-store slots.
pub const DEFAULT_BUCKET: &str = "credit-card-fraud-bucket";

/// Staging slot: the raw artifact exactly as fetched.
pub const STAGING_KEY: &str = "staging/credit_card_fraud.csv";

/// Transformed slot: the cleaned artifact ready for loading.
pub const TRANSFORMED_KEY: &str = "transformed/transformed_credit_card_fraud.csv";

// Local artifact file names under the working data directory
pub const RAW_FILE: &str = "credit_card_fraud.csv";
pub const TRANSFORMED_FILE: &str = "transformed_credit_card_fraud.csv";

/// Destination table in the warehouse.
pub const TABLE_NAME: &str = "credit_card_fraud";

/// Header of the synthetic row identifier column in the transformed artifact.
pub const ROW_ID_HEADER: &str = "Rowid";

/// Relational column name of the row identifier (primary key).
pub const ROW_ID_COLUMN: &str = "rowid";

/// Sensitive or low-value source columns removed during transformation.
/// The transform fails if any of these is absent from the input.
pub const DROPPED_COLUMNS: &[&str] = &[
    "Merchant Category Code (MCC)",
    "CVV Code (Hashed or Encrypted)",
    "Transaction Response Code",
    "Previous Transactions",
    "User Account Information",
    "Transaction Notes",
];

/// A surviving source column: its header in the artifacts, its identifier
/// in the destination table, and its SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub header: &'static str,
    pub column: &'static str,
    pub sql_type: &'static str,
}

/// Destination schema in artifact order (the row identifier comes first and
/// is not listed here).
pub const TABLE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { header: "Transaction Date and Time", column: "transaction_at", sql_type: "TEXT" },
    ColumnSpec { header: "Transaction Amount", column: "amount", sql_type: "NUMERIC" },
    ColumnSpec { header: "Cardholder Name", column: "cardholder_name", sql_type: "TEXT" },
    ColumnSpec { header: "Card Number (Hashed or Encrypted)", column: "card_number_hash", sql_type: "TEXT" },
    ColumnSpec { header: "Merchant Name", column: "merchant_name", sql_type: "TEXT" },
    ColumnSpec { header: "Transaction Location (City or ZIP Code)", column: "transaction_location", sql_type: "TEXT" },
    ColumnSpec { header: "Transaction Currency", column: "currency", sql_type: "TEXT" },
    ColumnSpec { header: "Card Type", column: "card_type", sql_type: "TEXT" },
    ColumnSpec { header: "Card Expiration Date", column: "card_expiration", sql_type: "TEXT" },
    ColumnSpec { header: "Transaction ID", column: "transaction_id", sql_type: "TEXT" },
    ColumnSpec { header: "Fraud Flag or Label", column: "fraud_flag", sql_type: "INT" },
    ColumnSpec { header: "Transaction Source", column: "transaction_source", sql_type: "TEXT" },
    ColumnSpec { header: "IP Address", column: "ip_address", sql_type: "TEXT" },
    ColumnSpec { header: "Device Information", column: "device_info", sql_type: "TEXT" },
];

/// Columns of the post-load verification query, in projection order.
pub const VERIFICATION_COLUMNS: &[&str] =
    &["transaction_at", "amount", "cardholder_name", "card_type"];

/// Row limit of the verification query.
pub const VERIFICATION_LIMIT: usize = 10;

/// Look up a surviving column by its relational identifier.
pub fn spec_for_column(column: &str) -> Option<&'static ColumnSpec> {
    TABLE_COLUMNS.iter().find(|c| c.column == column)
}

/// Look up a surviving column by its artifact header.
pub fn spec_for_header(header: &str) -> Option<&'static ColumnSpec> {
    TABLE_COLUMNS.iter().find(|c| c.header == header)
}
