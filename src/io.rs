//! Flat-file persistence (CSV): user tables in, result tables out.
//!
//! User table columns: `user_id`, one column per schema feature, and one
//! `<arm type>_pref` column per catalog arm.  Extra columns are ignored.  An empty
//! feature cell leaves the feature unset, which the driver rejects before simulating.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::{ArmCatalog, FeatureSchema, OutputTable, UserRecord};

const ID_COLUMN: &str = "user_id";

fn pref_column(kind: &str) -> String {
    format!("{kind}_pref")
}

fn column_index(headers: &csv::StringRecord, name: &str) -> std::result::Result<usize, ConfigError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| ConfigError::MissingColumn(name.to_string()))
}

fn parse_cell<T: std::str::FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    row: usize,
    column: &str,
) -> std::result::Result<Option<T>, ConfigError> {
    let raw = record.get(idx).unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::MalformedValue {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Parse a user table from any reader.
pub fn read_users_from<R: Read>(
    reader: R,
    schema: &FeatureSchema,
    catalog: &ArmCatalog,
) -> Result<Vec<UserRecord>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let id_idx = column_index(&headers, ID_COLUMN)?;
    let feature_cols = schema
        .names()
        .iter()
        .map(|n| column_index(&headers, n).map(|i| (n.as_str(), i)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let pref_cols = catalog
        .kinds()
        .into_iter()
        .map(|k| {
            let col = pref_column(k);
            column_index(&headers, &col).map(|i| (k, col, i))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut users = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        // Ids are written as integers, but tolerate a float rendering like `12.0`.
        let id = match parse_cell::<u64>(&record, id_idx, row, ID_COLUMN) {
            Ok(Some(id)) => id,
            Ok(None) => {
                return Err(ConfigError::MalformedValue {
                    row,
                    column: ID_COLUMN.to_string(),
                    value: String::new(),
                }
                .into())
            }
            Err(e) => match parse_cell::<f64>(&record, id_idx, row, ID_COLUMN)? {
                Some(v) if v >= 0.0 && v.fract() == 0.0 => v as u64,
                _ => return Err(e.into()),
            },
        };
        let mut user = UserRecord::new(id);
        for (name, idx) in &feature_cols {
            if let Some(v) = parse_cell::<f64>(&record, *idx, row, name)? {
                user.features.insert((*name).to_string(), v);
            }
        }
        for (kind, col, idx) in &pref_cols {
            if let Some(v) = parse_cell::<f64>(&record, *idx, row, col)? {
                user.set_preference(*kind, v);
            }
        }
        users.push(user);
    }
    Ok(users)
}

pub fn read_users(
    path: impl AsRef<Path>,
    schema: &FeatureSchema,
    catalog: &ArmCatalog,
) -> Result<Vec<UserRecord>> {
    read_users_from(File::open(path)?, schema, catalog)
}

/// Write a user table (features and hidden preferences) to any writer.
pub fn write_users_to<W: Write>(
    writer: W,
    users: &[UserRecord],
    schema: &FeatureSchema,
    catalog: &ArmCatalog,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let kinds = catalog.kinds();

    let mut header = vec![ID_COLUMN.to_string()];
    header.extend(schema.names().iter().cloned());
    header.extend(kinds.iter().map(|k| pref_column(k)));
    wtr.write_record(&header)?;

    for u in users {
        let mut row = vec![u.id.to_string()];
        for name in schema.names() {
            row.push(u.feature(name).map(|v| v.to_string()).unwrap_or_default());
        }
        for kind in &kinds {
            row.push(u.preference(kind).map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_users(
    path: impl AsRef<Path>,
    users: &[UserRecord],
    schema: &FeatureSchema,
    catalog: &ArmCatalog,
) -> Result<()> {
    write_users_to(File::create(path)?, users, schema, catalog)
}

/// Write the per-user output table to any writer.
pub fn write_results_to<W: Write>(writer: W, table: &OutputTable) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in &table.rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_results(path: impl AsRef<Path>, table: &OutputTable) -> Result<()> {
    write_results_to(File::create(path)?, table)
}
