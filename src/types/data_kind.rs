//! Defines the kinds of raw data the pipeline retrieves and integrates, the cities
//! they are published for, and the column layout each kind arrives in.

use std::fmt;

/// The kind of raw data published by the competition endpoint.
///
/// Each kind lives in its own directory under `raw_data/<city>/` and has its own
/// measurement columns once integrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Hourly pollutant concentrations per monitoring station (PM2.5, PM10, NO2).
    AirQuality,
    /// Hourly weather readings on the synthetic forecast grid.
    Grid,
    /// Hourly weather readings from observatory stations (Beijing only).
    Meteorology,
}

impl DataKind {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            DataKind::AirQuality => "airquality",
            DataKind::Grid => "grid",
            DataKind::Meteorology => "meteorology",
        }
    }

    /// Names of the measurement columns after integration, in output order.
    pub fn measurement_columns(&self) -> &'static [&'static str] {
        match self {
            DataKind::AirQuality => &["PM2.5", "PM10", "NO2"],
            DataKind::Grid | DataKind::Meteorology => &[
                "temperature",
                "pressure",
                "humidity",
                "wind_direction",
                "wind_speed",
            ],
        }
    }

    /// Maps the column names of a live day file to their integrated names.
    ///
    /// The first two entries are always the station id and timestamp. Columns of the
    /// day file that are not listed here (`id`, `weather`, CO/O3/SO2) are dropped.
    pub(crate) fn live_column_mapping(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            DataKind::AirQuality => vec![
                ("station_id", "station_id"),
                ("time", "utc_time"),
                ("PM25_Concentration", "PM2.5"),
                ("PM10_Concentration", "PM10"),
                ("NO2_Concentration", "NO2"),
            ],
            DataKind::Grid | DataKind::Meteorology => vec![
                ("station_id", "station_id"),
                ("time", "utc_time"),
                ("temperature", "temperature"),
                ("pressure", "pressure"),
                ("humidity", "humidity"),
                ("wind_direction", "wind_direction"),
                ("wind_speed", "wind_speed"),
            ],
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// A city covered by the competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum City {
    Beijing,
    London,
}

impl City {
    /// Directory name under `raw_data/`.
    pub fn name(&self) -> &'static str {
        match self {
            City::Beijing => "beijing",
            City::London => "london",
        }
    }

    /// Abbreviation used by the endpoint and in raw file names.
    pub fn code(&self) -> &'static str {
        match self {
            City::Beijing => "bj",
            City::London => "ld",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Every (data kind, city) pair the retrieval stage downloads, in retrieval order.
pub const RETRIEVAL_PAIRS: [(DataKind, City); 5] = [
    (DataKind::Meteorology, City::Beijing),
    (DataKind::AirQuality, City::Beijing),
    (DataKind::Grid, City::Beijing),
    (DataKind::AirQuality, City::London),
    (DataKind::Grid, City::London),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_mapping_starts_with_key_columns() {
        for kind in [DataKind::AirQuality, DataKind::Grid, DataKind::Meteorology] {
            let mapping = kind.live_column_mapping();
            assert_eq!(mapping[0].1, "station_id");
            assert_eq!(mapping[1].1, "utc_time");
            let measurements: Vec<&str> = mapping[2..].iter().map(|(_, to)| *to).collect();
            assert_eq!(measurements, kind.measurement_columns());
        }
    }

    #[test]
    fn display_uses_path_segment() {
        assert_eq!(DataKind::AirQuality.to_string(), "airquality");
        assert_eq!(City::London.code(), "ld");
        assert_eq!(City::Beijing.to_string(), "beijing");
    }
}
