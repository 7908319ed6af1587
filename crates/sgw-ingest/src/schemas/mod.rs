//! Document shape validation
//!
//! Each parameter maps to one [`DocumentShape`]. Validation deserializes the
//! merged document into its typed model and serializes it back, so stored
//! payloads only carry the fields the model knows about.

pub mod weather;

use crate::error::{IngestError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use weather::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentShape {
    StationReadings,
    TwoHourForecast,
    TwentyFourHourOutlook,
    FourDayOutlook,
    Lightning,
    Wbgt,
    UvIndex,
    Pm25,
    Psi,
}

impl DocumentShape {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StationReadings => "station-readings",
            Self::TwoHourForecast => "two-hour-forecast",
            Self::TwentyFourHourOutlook => "twenty-four-hour-outlook",
            Self::FourDayOutlook => "four-day-outlook",
            Self::Lightning => "lightning",
            Self::Wbgt => "wbgt",
            Self::UvIndex => "uv-index",
            Self::Pm25 => "pm25",
            Self::Psi => "psi",
        }
    }

    /// Check a document against this shape and return its normalized form
    pub fn validate(&self, document: Value) -> Result<Value> {
        match self {
            Self::StationReadings => normalize::<StationReadingsData>(*self, document),
            Self::TwoHourForecast => normalize::<TwoHourForecastData>(*self, document),
            Self::TwentyFourHourOutlook => {
                normalize::<TwentyFourHourOutlookData>(*self, document)
            },
            Self::FourDayOutlook | Self::Lightning | Self::Wbgt | Self::UvIndex => {
                normalize::<RecordsData>(*self, document)
            },
            Self::Pm25 => normalize::<Pm25Data>(*self, document),
            Self::Psi => normalize::<PsiData>(*self, document),
        }
    }
}

impl std::fmt::Display for DocumentShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize<T: DeserializeOwned + Serialize>(shape: DocumentShape, document: Value) -> Result<Value> {
    let typed: T = serde_json::from_value(document)
        .map_err(|e| IngestError::validation(shape.name(), e.to_string()))?;
    Ok(serde_json::to_value(typed)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rainfall() -> Value {
        json!({
            "stations": [{
                "id": "S77",
                "deviceId": "S77",
                "name": "Alexandra Road",
                "location": {"latitude": 1.2937, "longitude": 103.8125}
            }],
            "readings": [{
                "timestamp": "2024-12-01T00:00:00+08:00",
                "data": [{"stationId": "S77", "value": 0.2}]
            }],
            "readingType": "TB1 Rainfall 5 Minute Total F",
            "readingUnit": "mm",
            "extra": "dropped"
        })
    }

    #[test]
    fn test_station_readings_normalized() {
        let normalized = DocumentShape::StationReadings.validate(rainfall()).unwrap();
        assert_eq!(normalized["readingUnit"], "mm");
        assert_eq!(normalized["stations"][0]["deviceId"], "S77");
        assert_eq!(normalized["readings"][0]["data"][0]["value"], 0.2);
        assert!(normalized.get("extra").is_none());
    }

    #[test]
    fn test_missing_field_is_validation_error() {
        let mut doc = rainfall();
        doc.as_object_mut().unwrap().remove("readingType");
        let err = DocumentShape::StationReadings.validate(doc).unwrap_err();
        match err {
            IngestError::Validation { shape, message } => {
                assert_eq!(shape, "station-readings");
                assert!(message.contains("readingType"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_loose_records_shape() {
        let doc = json!({"records": [{"datetime": "2024-12-01T08:00:00+08:00", "item": {}}]});
        let normalized = DocumentShape::Wbgt.validate(doc.clone()).unwrap();
        assert_eq!(normalized, doc);
        assert!(DocumentShape::Lightning.validate(json!({"items": []})).is_err());
    }

    #[test]
    fn test_pm25_shape() {
        let doc = json!({
            "regionMetadata": [{
                "name": "west",
                "labelLocation": {"latitude": 1.357, "longitude": 103.7}
            }],
            "items": [{
                "date": "2024-12-01",
                "updatedTimestamp": "2024-12-01T01:00:00+08:00",
                "timestamp": "2024-12-01T01:00:00+08:00",
                "readings": {"pm25_one_hourly": {
                    "west": 10.0, "east": 11.0, "central": 12.0, "south": 13.0, "north": 14.0
                }}
            }]
        });
        let normalized = DocumentShape::Pm25.validate(doc).unwrap();
        assert_eq!(normalized["items"][0]["readings"]["pm25_one_hourly"]["north"], 14.0);
    }

    #[test]
    fn test_two_hour_forecast_shape() {
        let doc = json!({
            "area_metadata": [{
                "name": "Ang Mo Kio",
                "label_location": {"latitude": 1.375, "longitude": 103.839}
            }],
            "items": [{"update_timestamp": "2024-12-01T00:00:00+08:00", "forecasts": []}]
        });
        assert!(DocumentShape::TwoHourForecast.validate(doc).is_ok());
    }
}
