use async_trait::async_trait;
use deadpool_postgres::Pool;
use evrec_types::geo::LatLng;
use evrec_types::model::{ChargerType, Station};

use crate::{DrError, Result};

/// Station master-data contract: CRUD at the repository boundary,
/// read-only from the pipeline's perspective at request time.
///
/// A charger-count update method is intentionally absent here: charger
/// counts flow through telemetry, not a catalog mutation, so there is no
/// meaningful write path for it on this repository.
#[async_trait]
pub trait StationRepository: Send + Sync {
    async fn find_by_id(&self, station_id: &str) -> Result<Option<Station>>;
    async fn find_all(&self) -> Result<Vec<Station>>;
}

pub struct PgStationRepository {
    pool: Pool,
}

impl PgStationRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_station(row: &tokio_postgres::Row) -> Result<Station> {
        let charger_types_raw: Vec<String> = row.try_get("charger_types").map_err(DrError::from)?;
        let charger_types = charger_types_raw
            .iter()
            .filter_map(|s| match s.as_str() {
                "fast" => Some(ChargerType::Fast),
                "standard" => Some(ChargerType::Standard),
                _ => None,
            })
            .collect();

        Ok(Station {
            station_id: row.try_get("station_id").map_err(DrError::from)?,
            name: row.try_get("name").map_err(DrError::from)?,
            address: row.try_get("address").map_err(DrError::from)?,
            location: LatLng::new(
                row.try_get("latitude").map_err(DrError::from)?,
                row.try_get("longitude").map_err(DrError::from)?,
            ),
            total_chargers: row.try_get::<_, i32>("total_chargers").map_err(DrError::from)? as u32,
            charger_types,
            max_capacity: row.try_get("max_capacity").map_err(DrError::from)?,
            region: row.try_get("region").map_err(DrError::from)?,
            grid_id: row.try_get("grid_id").map_err(DrError::from)?,
        })
    }
}

#[async_trait]
impl StationRepository for PgStationRepository {
    async fn find_by_id(&self, station_id: &str) -> Result<Option<Station>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT station_id, name, address, latitude, longitude, total_chargers, \
                 charger_types, max_capacity, region, grid_id FROM stations WHERE station_id = $1",
                &[&station_id],
            )
            .await?;
        row.as_ref().map(Self::row_to_station).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Station>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT station_id, name, address, latitude, longitude, total_chargers, \
                 charger_types, max_capacity, region, grid_id FROM stations",
                &[],
            )
            .await?;
        rows.iter().map(Self::row_to_station).collect()
    }
}
