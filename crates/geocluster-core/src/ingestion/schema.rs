//! Mapping from logical fields to physical columns

use crate::error::{Error, Result};

/// A field the pipeline understands, independent of how the input names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalField {
    Latitude,
    Longitude,
    Severity,
    Year,
    Region,
}

impl LogicalField {
    pub const ALL: [LogicalField; 5] = [
        LogicalField::Latitude,
        LogicalField::Longitude,
        LogicalField::Severity,
        LogicalField::Year,
        LogicalField::Region,
    ];

    /// Accepted column names, highest priority first
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            LogicalField::Latitude => &["latitude", "Latitude", "lat", "LATITUDE"],
            LogicalField::Longitude => &["longitude", "Longitude", "lon", "LONGITUDE"],
            LogicalField::Severity => &["nkill", "NKILL"],
            LogicalField::Year => &["iyear"],
            LogicalField::Region => &["region_txt", "region"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogicalField::Latitude => "latitude",
            LogicalField::Longitude => "longitude",
            LogicalField::Severity => "severity",
            LogicalField::Year => "year",
            LogicalField::Region => "region",
        }
    }

    /// Position of the first candidate present in `headers`
    fn locate(&self, headers: &[String]) -> Option<usize> {
        self.candidates()
            .iter()
            .find_map(|candidate| headers.iter().position(|h| h == candidate))
    }
}

/// Logical field to column index, resolved once per input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub latitude: usize,
    pub longitude: usize,
    pub severity: Option<usize>,
    pub year: Option<usize>,
    pub region: Option<usize>,
    /// Physical names of the resolved columns, in `LogicalField::ALL` order
    names: Vec<Option<String>>,
}

impl ColumnMap {
    /// Resolve a header row. Fails when either coordinate has no matching column.
    pub fn resolve(headers: &[String]) -> Result<Self> {
        let latitude = LogicalField::Latitude.locate(headers);
        let longitude = LogicalField::Longitude.locate(headers);

        let (latitude, longitude) = match (latitude, longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            (None, None) => return Err(Error::schema("latitude/longitude", headers)),
            (None, Some(_)) => return Err(Error::schema("latitude", headers)),
            (Some(_), None) => return Err(Error::schema("longitude", headers)),
        };

        let severity = LogicalField::Severity.locate(headers);
        let year = LogicalField::Year.locate(headers);
        let region = LogicalField::Region.locate(headers);

        let names = [Some(latitude), Some(longitude), severity, year, region]
            .iter()
            .map(|idx| idx.map(|i| headers[i].clone()))
            .collect();

        Ok(Self {
            latitude,
            longitude,
            severity,
            year,
            region,
            names,
        })
    }

    /// Column index for a logical field, if the input has one
    pub fn index_of(&self, field: LogicalField) -> Option<usize> {
        match field {
            LogicalField::Latitude => Some(self.latitude),
            LogicalField::Longitude => Some(self.longitude),
            LogicalField::Severity => self.severity,
            LogicalField::Year => self.year,
            LogicalField::Region => self.region,
        }
    }

    /// Physical column name a logical field was resolved to
    pub fn column_name(&self, field: LogicalField) -> Option<&str> {
        let pos = LogicalField::ALL.iter().position(|f| *f == field)?;
        self.names[pos].as_deref()
    }

    pub fn has(&self, field: LogicalField) -> bool {
        self.index_of(field).is_some()
    }
}
