//! Event rows before and after clustering

use super::field::OptionalField;

/// Label assigned to points outside every dense region
pub const NOISE_LABEL: i32 = -1;

/// One normalized input row.
///
/// Coordinates are degrees and always within bounds once the loader hands
/// the record out.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,
    /// Casualty count
    pub severity: OptionalField<i64>,
    /// Event year
    pub year: OptionalField<i64>,
    /// Region label
    pub region: OptionalField<String>,
}

impl EventRecord {
    /// Record with coordinates only; every optional column absent from the schema
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            severity: OptionalField::NotInSchema,
            year: OptionalField::NotInSchema,
            region: OptionalField::NotInSchema,
        }
    }

    /// Whether both coordinates are finite and within the geographic bounds
    pub fn has_valid_coordinates(&self) -> bool {
        coordinates_in_bounds(self.latitude, self.longitude)
    }
}

/// Inclusive geographic bounds check; NaN fails
pub fn coordinates_in_bounds(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// A record with its cluster label
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteredPoint {
    pub record: EventRecord,
    /// Cluster id, or [`NOISE_LABEL`]
    pub cluster_id: i32,
}

impl ClusteredPoint {
    pub fn is_noise(&self) -> bool {
        self.cluster_id == NOISE_LABEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(coordinates_in_bounds(90.0, 180.0));
        assert!(coordinates_in_bounds(-90.0, -180.0));
        assert!(!coordinates_in_bounds(90.0001, 0.0));
        assert!(!coordinates_in_bounds(0.0, -180.5));
        assert!(!coordinates_in_bounds(f64::NAN, 0.0));
        assert!(!coordinates_in_bounds(0.0, f64::INFINITY));
    }

    #[test]
    fn test_new_record_has_no_optional_columns() {
        let record = EventRecord::new(10.0, 20.0);
        assert!(record.has_valid_coordinates());
        assert!(!record.severity.in_schema());
        assert!(!record.year.in_schema());
        assert!(!record.region.in_schema());
    }

    #[test]
    fn test_noise_point() {
        let point = ClusteredPoint {
            record: EventRecord::new(0.0, 0.0),
            cluster_id: NOISE_LABEL,
        };
        assert!(point.is_noise());
    }
}
