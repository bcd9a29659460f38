use crate::app::ports::Warehouse;
use crate::config::DbConfig;
use crate::constants::{
    self, ROW_ID_COLUMN, TABLE_COLUMNS, TABLE_NAME, VERIFICATION_COLUMNS, VERIFICATION_LIMIT,
};
use crate::error::{EtlError, Result};
use crate::types::{Sample, Table};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info};

/// PostgreSQL warehouse adapter. A connection is acquired and released
/// within each operation; the Loader stage is the only caller and holds no
/// connection of its own.
pub struct PgWarehouse {
    config: DbConfig,
}

impl PgWarehouse {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> Result<Client> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.config.host)
            .port(self.config.port)
            .user(&self.config.user)
            .password(&self.config.password)
            .dbname(&self.config.database);
        let (client, connection) = pg.connect(NoTls).await?;
        // The connection task drives the socket and ends when the client drops
        tokio::spawn(connection);
        Ok(client)
    }

    fn create_table_sql() -> String {
        let columns: Vec<String> = TABLE_COLUMNS
            .iter()
            .map(|c| format!("{} {}", c.column, c.sql_type))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({} INT PRIMARY KEY, {})",
            TABLE_NAME,
            ROW_ID_COLUMN,
            columns.join(", ")
        )
    }

    /// All parameters bind as text; empty fields become NULL and typed
    /// columns are cast server-side.
    fn insert_sql() -> String {
        let mut columns = vec![ROW_ID_COLUMN.to_string()];
        columns.extend(TABLE_COLUMNS.iter().map(|c| c.column.to_string()));

        let mut placeholders = vec!["NULLIF($1, '')::INT".to_string()];
        for (i, spec) in TABLE_COLUMNS.iter().enumerate() {
            let n = i + 2;
            let placeholder = match spec.sql_type {
                "TEXT" => format!("NULLIF(${}, '')", n),
                other => format!("NULLIF(${}, '')::{}", n, other),
            };
            placeholders.push(placeholder);
        }
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            TABLE_NAME,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn verification_sql() -> String {
        let projection: Vec<String> = VERIFICATION_COLUMNS
            .iter()
            .map(|column| {
                // Cast typed columns so every sampled value comes back as text
                match constants::spec_for_column(column).map(|s| s.sql_type) {
                    Some("TEXT") | None => column.to_string(),
                    Some(_) => format!("{}::TEXT AS {}", column, column),
                }
            })
            .collect();
        format!(
            "SELECT {} FROM {} ORDER BY {} LIMIT {}",
            projection.join(", "),
            TABLE_NAME,
            ROW_ID_COLUMN,
            VERIFICATION_LIMIT
        )
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn replace_all(&self, table: &Table) -> Result<u64> {
        let mut client = self.connect().await?;
        client.execute(Self::create_table_sql().as_str(), &[]).await?;
        debug!("Ensured table {} exists", TABLE_NAME);

        // Truncate and reload atomically; a failed load leaves the previous
        // contents in place instead of an empty or half-written table.
        let tx = client.transaction().await?;
        tx.execute(format!("TRUNCATE TABLE {}", TABLE_NAME).as_str(), &[])
            .await?;
        let stmt = tx.prepare(Self::insert_sql().as_str()).await?;
        for row in &table.rows {
            let params: Vec<&(dyn ToSql + Sync)> =
                row.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
            tx.execute(&stmt, &params).await?;
        }
        tx.commit().await?;

        info!("Replaced {} with {} rows", TABLE_NAME, table.row_count());
        Ok(table.row_count() as u64)
    }

    async fn verification_sample(&self) -> Result<Sample> {
        let client = self.connect().await?;
        let rows = client.query(Self::verification_sql().as_str(), &[]).await?;
        let sampled = rows
            .iter()
            .map(|row| {
                (0..VERIFICATION_COLUMNS.len())
                    .map(|i| {
                        row.try_get::<_, Option<String>>(i)
                            .map(|value| value.unwrap_or_default())
                    })
                    .collect::<std::result::Result<Vec<String>, _>>()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Sample {
            columns: VERIFICATION_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: sampled,
        })
    }
}

/// In-memory warehouse for tests: holds the last loaded artifact whole.
pub struct InMemoryWarehouse {
    state: Mutex<Option<Table>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    pub fn row_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .as_ref()
            .map(Table::row_count)
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> Option<Table> {
        self.state.lock().unwrap().clone()
    }
}

impl Default for InMemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn replace_all(&self, table: &Table) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        *state = Some(table.clone());
        Ok(table.row_count() as u64)
    }

    async fn verification_sample(&self) -> Result<Sample> {
        let state = self.state.lock().unwrap();
        let columns: Vec<String> = VERIFICATION_COLUMNS.iter().map(|c| c.to_string()).collect();
        let Some(table) = state.as_ref() else {
            return Ok(Sample { columns, rows: vec![] });
        };
        let indices: Vec<usize> = VERIFICATION_COLUMNS
            .iter()
            .map(|column| {
                let spec = constants::spec_for_column(column).ok_or_else(|| {
                    EtlError::SchemaMismatch(format!("Unknown verification column: {}", column))
                })?;
                table.column_index(spec.header).ok_or_else(|| {
                    EtlError::SchemaMismatch(format!("Column {} missing from artifact", spec.header))
                })
            })
            .collect::<Result<_>>()?;
        let rows = table
            .rows
            .iter()
            .take(VERIFICATION_LIMIT)
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Sample { columns, rows })
    }
}
