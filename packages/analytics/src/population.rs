//! Child population table loaded from open-data CSV.
//!
//! The file has a header row followed by `municipality,children` rows. Rows
//! whose count does not parse are logged and skipped. The table is loaded
//! once at startup and only read afterwards.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::AnalyticsError;
use crate::sources::PopulationSource;

/// Preschool-age child counts keyed by municipality name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationTable {
    children: BTreeMap<String, i64>,
}

impl PopulationTable {
    /// Loads the table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the file cannot be opened or is not
    /// valid CSV.
    pub fn from_path(path: &Path) -> Result<Self, AnalyticsError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        log::info!(
            "Loaded population data for {} municipalities from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parses the table from any CSV reader.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the input is not valid CSV.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AnalyticsError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut children = BTreeMap::new();
        for result in csv_reader.records() {
            let record = result?;
            let Some(municipality) = record.get(0) else {
                continue;
            };
            match record.get(1).map(str::parse::<i64>) {
                Some(Ok(count)) => {
                    children.insert(municipality.to_string(), count);
                }
                _ => {
                    log::warn!(
                        "Skipping population row for '{municipality}': invalid child count {:?}",
                        record.get(1)
                    );
                }
            }
        }

        Ok(Self { children })
    }

    /// Number of municipalities in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for PopulationTable {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        Self {
            children: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl PopulationSource for PopulationTable {
    fn population_of(&self, municipality: &str) -> Option<i64> {
        self.children.get(municipality).copied()
    }
}
