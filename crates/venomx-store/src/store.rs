//! SQLite-backed reference data store.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::{debug, info};
use venomx_core::{AntivenomRecord, AntivenomType, FacilityRecord, SpeciesRecord, StockMatch};

use crate::seed::SeedData;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Lock error")]
    Lock,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid seed data: {0}")]
    Seed(#[from] serde_json::Error),
}

/// Which antivenoms a stock query should match.
#[derive(Debug, Clone, PartialEq)]
pub enum StockFilter {
    /// Antivenoms with a target mapping to this species.
    Species(i64),
    /// Antivenoms of one product family.
    AntivenomType(AntivenomType),
    /// Case-insensitive substring match on the product name.
    AntivenomName(String),
}

const SPECIES_COLUMNS: &str =
    "snake_id, scientific_name, common_name, fang_type, description, danger_level, image_url";

// Available stock only: verified, located facilities; positive, unexpired batches.
// Batches of one product at one facility collapse into a single row.
const STOCK_SELECT: &str = r#"
    SELECT f.facility_id, f.facility_name, f.facility_type, f.region, f.province,
           f.city_municipality, f.address, f.latitude, f.longitude, f.contact_number,
           f.facility_email, f.is_verified,
           a.antivenom_id, a.product_name, a.manufacturer, a.antivenom_type,
           SUM(s.quantity), MIN(s.expiration_date),
           (SELECT GROUP_CONCAT(sn.scientific_name, '|')
              FROM antivenom_snake_targets t
              JOIN snakes sn ON sn.snake_id = t.snake_id
             WHERE t.antivenom_id = a.antivenom_id)
      FROM facility_antivenom_stock s
      JOIN facilities f ON f.facility_id = s.facility_id
      JOIN antivenoms a ON a.antivenom_id = s.antivenom_id
     WHERE s.quantity > 0
       AND f.is_verified = 1
       AND f.latitude IS NOT NULL
       AND f.longitude IS NOT NULL
       AND (s.expiration_date IS NULL OR s.expiration_date > date('now'))
"#;

const STOCK_GROUPING: &str =
    " GROUP BY f.facility_id, a.antivenom_id ORDER BY f.facility_id, a.antivenom_id";

/// SQLite-backed store for species, facilities and antivenom stock.
pub struct VenomStore {
    conn: Mutex<Connection>,
}

impl VenomStore {
    /// Opens (or creates) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("Database initialized at {}", path.display());
        Ok(store)
    }

    /// Creates an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS snakes (
                snake_id INTEGER PRIMARY KEY,
                scientific_name TEXT NOT NULL UNIQUE,
                common_name TEXT,
                fang_type TEXT,
                description TEXT,
                danger_level TEXT,
                image_url TEXT
            );

            CREATE TABLE IF NOT EXISTS facilities (
                facility_id INTEGER PRIMARY KEY,
                facility_name TEXT NOT NULL,
                facility_type TEXT NOT NULL,
                region TEXT,
                province TEXT,
                city_municipality TEXT,
                address TEXT,
                latitude REAL,
                longitude REAL,
                contact_number TEXT,
                facility_email TEXT,
                is_verified INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS antivenoms (
                antivenom_id INTEGER PRIMARY KEY,
                product_name TEXT NOT NULL,
                manufacturer TEXT,
                antivenom_type TEXT
            );

            CREATE TABLE IF NOT EXISTS facility_antivenom_stock (
                stock_id INTEGER PRIMARY KEY AUTOINCREMENT,
                facility_id INTEGER NOT NULL REFERENCES facilities(facility_id),
                antivenom_id INTEGER NOT NULL REFERENCES antivenoms(antivenom_id),
                quantity INTEGER NOT NULL CHECK (quantity >= 0),
                expiration_date TEXT,
                batch_no TEXT
            );

            CREATE TABLE IF NOT EXISTS antivenom_snake_targets (
                antivenom_id INTEGER NOT NULL REFERENCES antivenoms(antivenom_id),
                snake_id INTEGER NOT NULL REFERENCES snakes(snake_id),
                PRIMARY KEY (antivenom_id, snake_id)
            );

            CREATE INDEX IF NOT EXISTS idx_stock_antivenom ON facility_antivenom_stock(antivenom_id);
            CREATE INDEX IF NOT EXISTS idx_stock_facility ON facility_antivenom_stock(facility_id);
            CREATE INDEX IF NOT EXISTS idx_targets_snake ON antivenom_snake_targets(snake_id);
            "#,
        )?;

        Ok(())
    }

    /// True when no species and no facilities have been loaded.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let count: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM snakes) + (SELECT COUNT(*) FROM facilities)",
            [],
            |r| r.get(0),
        )?;
        Ok(count == 0)
    }

    /// Inserts a seed document in one transaction.
    pub fn seed(&self, data: &SeedData) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let tx = conn.transaction()?;

        for s in &data.snakes {
            tx.execute(
                "INSERT INTO snakes (snake_id, scientific_name, common_name, fang_type, description, danger_level, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    s.snake_id,
                    s.scientific_name,
                    s.common_name,
                    s.fang_type,
                    s.description,
                    s.danger_level,
                    s.image_url
                ],
            )?;
        }
        for f in &data.facilities {
            tx.execute(
                "INSERT INTO facilities (facility_id, facility_name, facility_type, region, province,
                     city_municipality, address, latitude, longitude, contact_number, facility_email, is_verified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    f.facility_id,
                    f.facility_name,
                    f.facility_type,
                    f.region,
                    f.province,
                    f.city_municipality,
                    f.address,
                    f.latitude,
                    f.longitude,
                    f.contact_number,
                    f.facility_email,
                    f.is_verified
                ],
            )?;
        }
        for a in &data.antivenoms {
            tx.execute(
                "INSERT INTO antivenoms (antivenom_id, product_name, manufacturer, antivenom_type)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    a.antivenom_id,
                    a.product_name,
                    a.manufacturer,
                    a.antivenom_type.map(|t| t.as_str())
                ],
            )?;
        }
        for s in &data.stock {
            tx.execute(
                "INSERT INTO facility_antivenom_stock (facility_id, antivenom_id, quantity, expiration_date, batch_no)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![s.facility_id, s.antivenom_id, s.quantity, s.expiration_date, s.batch_no],
            )?;
        }
        for t in &data.targets {
            tx.execute(
                "INSERT OR IGNORE INTO antivenom_snake_targets (antivenom_id, snake_id) VALUES (?1, ?2)",
                params![t.antivenom_id, t.snake_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Seeds from a JSON file if the database is empty. Returns the number
    /// of species loaded (0 when seeding was skipped).
    pub fn seed_from_file(&self, path: impl AsRef<Path>) -> Result<usize, StoreError> {
        if !self.is_empty()? {
            info!("Database already has reference data, skipping seed");
            return Ok(0);
        }

        let path = path.as_ref();
        info!("Seeding reference data from {}", path.display());
        let content = fs::read_to_string(path)?;
        let data: SeedData = serde_json::from_str(&content)?;
        self.seed(&data)?;

        info!(
            snakes = data.snakes.len(),
            facilities = data.facilities.len(),
            antivenoms = data.antivenoms.len(),
            stock = data.stock.len(),
            "Seeded reference data"
        );
        Ok(data.snakes.len())
    }

    /// All species ordered by scientific name.
    pub fn list_species(&self) -> Result<Vec<SpeciesRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SPECIES_COLUMNS} FROM snakes ORDER BY scientific_name"
        ))?;
        let rows = stmt.query_map([], species_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Species with at least one antivenom target mapping, ordered by common name.
    pub fn species_with_antivenom(&self) -> Result<Vec<SpeciesRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SPECIES_COLUMNS} FROM snakes
              WHERE snake_id IN (SELECT snake_id FROM antivenom_snake_targets)
              ORDER BY common_name, scientific_name"
        ))?;
        let rows = stmt.query_map([], species_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Extremely and highly venomous species, ordered by scientific name.
    pub fn medically_significant_species(&self) -> Result<Vec<SpeciesRecord>, StoreError> {
        Ok(self
            .list_species()?
            .into_iter()
            .filter(SpeciesRecord::is_medically_significant)
            .collect())
    }

    pub fn species_by_id(&self, snake_id: i64) -> Result<Option<SpeciesRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let species = conn
            .query_row(
                &format!("SELECT {SPECIES_COLUMNS} FROM snakes WHERE snake_id = ?1"),
                params![snake_id],
                species_from_row,
            )
            .optional()?;
        Ok(species)
    }

    /// Case-insensitive exact match on the scientific name.
    pub fn species_by_scientific_name(
        &self,
        name: &str,
    ) -> Result<Option<SpeciesRecord>, StoreError> {
        self.species_where("scientific_name", name)
    }

    /// Case-insensitive exact match on the common name.
    pub fn species_by_common_name(&self, name: &str) -> Result<Option<SpeciesRecord>, StoreError> {
        self.species_where("common_name", name)
    }

    /// Resolves a classifier label or scientific name: scientific name first,
    /// then common name. `None` means the species is unknown.
    pub fn find_species(&self, label: &str) -> Result<Option<SpeciesRecord>, StoreError> {
        if let Some(species) = self.species_by_scientific_name(label)? {
            return Ok(Some(species));
        }
        self.species_by_common_name(label)
    }

    fn species_where(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<SpeciesRecord>, StoreError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let species = conn
            .query_row(
                &format!(
                    "SELECT {SPECIES_COLUMNS} FROM snakes WHERE {column} = ?1 COLLATE NOCASE
                      ORDER BY snake_id LIMIT 1"
                ),
                params![value],
                species_from_row,
            )
            .optional()?;
        Ok(species)
    }

    /// Available stock matching `filter`, one row per (facility, antivenom).
    pub fn stock_matches(&self, filter: &StockFilter) -> Result<Vec<StockMatch>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let matches = match filter {
            StockFilter::Species(snake_id) => {
                let sql = format!(
                    "{STOCK_SELECT} AND a.antivenom_id IN
                        (SELECT antivenom_id FROM antivenom_snake_targets WHERE snake_id = ?1)
                     {STOCK_GROUPING}"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![snake_id], stock_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            StockFilter::AntivenomType(kind) => {
                let sql = format!("{STOCK_SELECT} AND a.antivenom_type = ?1 {STOCK_GROUPING}");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![kind.as_str()], stock_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            StockFilter::AntivenomName(name) => {
                let sql = format!(
                    "{STOCK_SELECT} AND LOWER(a.product_name) LIKE ?1 ESCAPE '\\' {STOCK_GROUPING}"
                );
                let pattern = format!("%{}%", escape_like(&name.trim().to_lowercase()));
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![pattern], stock_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        debug!(?filter, rows = matches.len(), "Stock query complete");
        Ok(matches)
    }
}

fn species_from_row(row: &Row<'_>) -> rusqlite::Result<SpeciesRecord> {
    Ok(SpeciesRecord {
        snake_id: row.get(0)?,
        scientific_name: row.get(1)?,
        common_name: row.get(2)?,
        fang_type: row.get(3)?,
        description: row.get(4)?,
        danger_level: row.get(5)?,
        image_url: row.get(6)?,
    })
}

fn stock_from_row(row: &Row<'_>) -> rusqlite::Result<StockMatch> {
    let facility = FacilityRecord {
        facility_id: row.get(0)?,
        facility_name: row.get(1)?,
        facility_type: row.get(2)?,
        region: row.get(3)?,
        province: row.get(4)?,
        city_municipality: row.get(5)?,
        address: row.get(6)?,
        latitude: row.get(7)?,
        longitude: row.get(8)?,
        contact_number: row.get(9)?,
        facility_email: row.get(10)?,
        is_verified: row.get(11)?,
    };
    let antivenom_type: Option<String> = row.get(15)?;
    let antivenom = AntivenomRecord {
        antivenom_id: row.get(12)?,
        product_name: row.get(13)?,
        manufacturer: row.get(14)?,
        antivenom_type: antivenom_type.and_then(|t| t.parse().ok()),
    };
    let targets: Option<String> = row.get(18)?;
    let mut target_species: Vec<String> = targets
        .map(|t| t.split('|').map(str::to_string).collect())
        .unwrap_or_default();
    target_species.sort();

    Ok(StockMatch {
        facility,
        antivenom,
        quantity: row.get(16)?,
        expiration_date: row.get(17)?,
        target_species,
    })
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
