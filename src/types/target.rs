//! The pollutants the pipeline produces labels and features for.

use std::fmt;

/// A pollutant whose next-hour value is being forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Fine particulate matter, column `PM2.5`.
    Pm25,
    /// Coarse particulate matter, column `PM10`.
    Pm10,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Pm25, Target::Pm10];

    /// Name of the measurement column holding this pollutant.
    pub fn column(&self) -> &'static str {
        match self {
            Target::Pm25 => "PM2.5",
            Target::Pm10 => "PM10",
        }
    }

    /// Name of the label column produced by the labeling stage.
    pub fn label_column(&self) -> String {
        format!("{}_label", self.column())
    }

    /// Tag used in labeled file names (`london_PM25_hist_data_w_label.csv`).
    pub fn file_tag(&self) -> &'static str {
        match self {
            Target::Pm25 => "PM25",
            Target::Pm10 => "PM10",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}
