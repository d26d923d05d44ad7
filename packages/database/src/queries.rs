//! Kindergarten record queries.
//!
//! The analytics layer only ever calls [`fetch_all_kindergartens`]; the
//! remaining functions back the record CRUD endpoints.

use moosicbox_json_utils::database::ToValue as _;
use preschool_kindergarten_models::{KindergartenRecord, KindergartenType, NewKindergarten};
use switchy_database::{Database, DatabaseValue, Row};

use crate::DbError;

const SELECT_COLUMNS: &str =
    "SELECT id, name, kind, city, municipality, max_capacity, enrolled FROM kindergartens";

/// Records inserted into an empty store.
fn seed_records() -> Vec<NewKindergarten> {
    vec![
        NewKindergarten {
            name: "Plavi Cuperak".to_string(),
            kind: KindergartenType::State,
            city: "Beograd".to_string(),
            municipality: "Zvezdara".to_string(),
            max_capacity: 120,
            enrolled: 95,
        },
        NewKindergarten {
            name: "Sumica".to_string(),
            kind: KindergartenType::Private,
            city: "Beograd".to_string(),
            municipality: "Vozdovac".to_string(),
            max_capacity: 60,
            enrolled: 58,
        },
    ]
}

fn row_to_record(row: &Row) -> Result<KindergartenRecord, DbError> {
    let id: String = row.to_value("id").unwrap_or_default();
    let kind: String = row.to_value("kind").unwrap_or_default();
    let kind = kind.parse::<KindergartenType>().map_err(|_| DbError::Conversion {
        message: format!("Unknown kindergarten type '{kind}' on record {id}"),
    })?;

    Ok(KindergartenRecord {
        name: row.to_value("name").unwrap_or_default(),
        kind,
        city: row.to_value("city").unwrap_or_default(),
        municipality: row.to_value("municipality").unwrap_or_default(),
        max_capacity: integer_column(row, "max_capacity", &id)?,
        enrolled: integer_column(row, "enrolled", &id)?,
        id,
    })
}

/// Reads a count column, rejecting values that are not integers.
fn integer_column(row: &Row, column: &str, id: &str) -> Result<i64, DbError> {
    row.to_value(column).map_err(|e| DbError::Conversion {
        message: format!("Column {column} on record {id} is not an integer: {e:?}"),
    })
}

fn record_params(id: &str, new: &NewKindergarten) -> [DatabaseValue; 7] {
    [
        DatabaseValue::String(id.to_string()),
        DatabaseValue::String(new.name.clone()),
        DatabaseValue::String(new.kind.as_ref().to_string()),
        DatabaseValue::String(new.city.clone()),
        DatabaseValue::String(new.municipality.clone()),
        DatabaseValue::Int64(new.max_capacity),
        DatabaseValue::Int64(new.enrolled),
    ]
}

/// Reads every kindergarten record.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row holds an unknown type.
pub async fn fetch_all_kindergartens(
    db: &dyn Database,
) -> Result<Vec<KindergartenRecord>, DbError> {
    let rows = db
        .query_raw_params(&format!("{SELECT_COLUMNS} ORDER BY id"), &[])
        .await?;

    log::debug!("Fetched {} kindergarten rows", rows.len());

    rows.iter().map(row_to_record).collect()
}

/// Looks up a single kindergarten by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn get_kindergarten(
    db: &dyn Database,
    id: &str,
) -> Result<Option<KindergartenRecord>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("{SELECT_COLUMNS} WHERE id = $1"),
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    rows.first().map(row_to_record).transpose()
}

/// Inserts a new kindergarten under a freshly generated id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub async fn insert_kindergarten(
    db: &dyn Database,
    new: NewKindergarten,
) -> Result<KindergartenRecord, DbError> {
    let id = uuid::Uuid::new_v4().to_string();

    db.exec_raw_params(
        "INSERT INTO kindergartens (id, name, kind, city, municipality, max_capacity, enrolled)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
        &record_params(&id, &new),
    )
    .await?;

    Ok(new.into_record(id))
}

/// Replaces every field of an existing kindergarten.
///
/// Returns `None` if no record has the given id.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails.
pub async fn update_kindergarten(
    db: &dyn Database,
    id: &str,
    new: NewKindergarten,
) -> Result<Option<KindergartenRecord>, DbError> {
    let updated = db
        .exec_raw_params(
            "UPDATE kindergartens
             SET name = $2, kind = $3, city = $4, municipality = $5,
                 max_capacity = $6, enrolled = $7
             WHERE id = $1",
            &record_params(id, &new),
        )
        .await?;

    Ok((updated > 0).then(|| new.into_record(id.to_string())))
}

/// Deletes a kindergarten. Returns `false` if no record had the given id.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails.
pub async fn delete_kindergarten(db: &dyn Database, id: &str) -> Result<bool, DbError> {
    let deleted = db
        .exec_raw_params(
            "DELETE FROM kindergartens WHERE id = $1",
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    Ok(deleted > 0)
}

/// Returns the number of stored kindergartens.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn count_kindergartens(db: &dyn Database) -> Result<u64, DbError> {
    let rows = db
        .query_raw_params("SELECT COUNT(*) as cnt FROM kindergartens", &[])
        .await?;

    let count: i64 = rows.first().map_or(0, |r| r.to_value("cnt").unwrap_or(0));

    #[allow(clippy::cast_sign_loss)]
    Ok(count as u64)
}

/// Inserts the sample records if the store is empty.
///
/// Returns how many records were inserted.
///
/// # Errors
///
/// Returns [`DbError`] if counting or inserting fails.
pub async fn seed_if_empty(db: &dyn Database) -> Result<usize, DbError> {
    if count_kindergartens(db).await? > 0 {
        return Ok(0);
    }

    let seed = seed_records();
    let inserted = seed.len();
    for new in seed {
        insert_kindergarten(db, new).await?;
    }

    log::info!("Seeded record store with {inserted} kindergartens");
    Ok(inserted)
}
