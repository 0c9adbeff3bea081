//! Reference tables: specimen-to-prep and operator name-to-login.
//!
//! Both are plain CSV files maintained next to the records. Loading either
//! one is mandatory; an empty or missing table would silently push every
//! slice into the unknown prep.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Resolves a specimen (slice) name to its preparation name.
pub trait PrepLookup {
    /// Returns `None` when the specimen is not known.
    fn prep_for(&self, specimen: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct SpecimenRow {
    specimen_name: String,
    prep_name: String,
}

/// Specimen-to-prep mapping backed by a `specimen_name,prep_name` CSV.
#[derive(Debug, Clone, Default)]
pub struct SpecimenTable {
    entries: HashMap<String, String>,
}

impl SpecimenTable {
    /// Load the table from a CSV file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open specimen table: {}", path.display()))?;

        let mut entries = HashMap::new();
        for row in reader.deserialize() {
            let row: SpecimenRow = row
                .with_context(|| format!("Failed to parse specimen table: {}", path.display()))?;
            entries.insert(row.specimen_name.trim().to_string(), row.prep_name.trim().to_string());
        }

        debug!("Loaded {} specimen mappings from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for SpecimenTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl PrepLookup for SpecimenTable {
    fn prep_for(&self, specimen: &str) -> Option<String> {
        self.entries.get(specimen).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct UserRow {
    name: String,
    login: String,
    #[serde(default)]
    p_user: String,
}

/// Operator directory backed by a `name,login,p_user` CSV.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    name_to_login: HashMap<String, String>,
    login_to_user: HashMap<String, String>,
}

impl UserTable {
    /// Load the table from a CSV file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open user table: {}", path.display()))?;

        let mut rows = Vec::new();
        for row in reader.deserialize() {
            let row: UserRow =
                row.with_context(|| format!("Failed to parse user table: {}", path.display()))?;
            rows.push(row);
        }

        let table = Self::from_rows(rows);
        debug!(
            "Loaded {} operators from {}",
            table.name_to_login.len(),
            path.display()
        );
        Ok(table)
    }

    fn from_rows(rows: Vec<UserRow>) -> Self {
        let mut table = Self::default();
        for row in rows {
            let login = row.login.trim().to_string();
            table
                .name_to_login
                .insert(row.name.trim().to_string(), login.clone());
            if !row.p_user.trim().is_empty() {
                table.login_to_user.insert(login, row.p_user.trim().to_string());
            }
        }
        table
    }

    /// Build a table from `(name, login)` pairs.
    pub fn from_pairs<I, N, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, L)>,
        N: Into<String>,
        L: Into<String>,
    {
        Self::from_rows(
            pairs
                .into_iter()
                .map(|(name, login)| UserRow {
                    name: name.into(),
                    login: login.into(),
                    p_user: String::new(),
                })
                .collect(),
        )
    }

    /// Login for an operator display name.
    pub fn login_for(&self, name: &str) -> Option<&str> {
        self.name_to_login.get(name).map(String::as_str)
    }

    /// Remap a display name to its login; unknown values pass through unchanged.
    pub fn resolve<'a>(&'a self, operator: &'a str) -> &'a str {
        self.login_for(operator).unwrap_or(operator)
    }

    /// Short display tag for a login, when one is recorded.
    pub fn display_for(&self, login: &str) -> Option<&str> {
        self.login_to_user.get(login).map(String::as_str)
    }
}
