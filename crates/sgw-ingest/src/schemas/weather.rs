//! Typed document shapes returned by the weather endpoints
//!
//! Field names follow the API; unknown fields are dropped on normalization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedReadings {
    pub timestamp: String,
    pub data: Vec<Map<String, Value>>,
}

/// Station readings: temperature, rainfall, humidity, wind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationReadingsData {
    pub stations: Vec<Station>,
    pub readings: Vec<TimestampedReadings>,
    #[serde(rename = "readingType")]
    pub reading_type: String,
    #[serde(rename = "readingUnit")]
    pub reading_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaMetadata {
    pub name: String,
    pub label_location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoHourForecastData {
    pub area_metadata: Vec<AreaMetadata>,
    pub items: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueRange {
    pub low: f64,
    pub high: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidPeriod {
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wind {
    pub speed: ValueRange,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlookGeneral {
    pub temperature: ValueRange,
    #[serde(rename = "relativeHumidity")]
    pub relative_humidity: ValueRange,
    pub forecast: ForecastText,
    #[serde(rename = "validPeriod")]
    pub valid_period: ValidPeriod,
    pub wind: Wind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionForecasts {
    pub west: ForecastText,
    pub east: ForecastText,
    pub central: ForecastText,
    pub south: ForecastText,
    pub north: ForecastText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlookPeriod {
    #[serde(rename = "timePeriod")]
    pub time_period: ValidPeriod,
    pub regions: RegionForecasts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwentyFourHourOutlookRecord {
    pub date: String,
    #[serde(rename = "updatedTimestamp")]
    pub updated_timestamp: String,
    pub general: OutlookGeneral,
    pub periods: Vec<OutlookPeriod>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwentyFourHourOutlookData {
    pub records: Vec<TwentyFourHourOutlookRecord>,
}

/// Loosely typed record collections: four-day outlook, lightning, WBGT, UV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsData {
    pub records: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionMetadata {
    pub name: String,
    #[serde(rename = "labelLocation")]
    pub label_location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionValues {
    pub west: f64,
    pub east: f64,
    pub central: f64,
    pub south: f64,
    pub north: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pm25Readings {
    pub pm25_one_hourly: RegionValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pm25Item {
    pub date: String,
    #[serde(rename = "updatedTimestamp")]
    pub updated_timestamp: String,
    pub timestamp: String,
    pub readings: Pm25Readings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pm25Data {
    #[serde(rename = "regionMetadata")]
    pub region_metadata: Vec<RegionMetadata>,
    pub items: Vec<Pm25Item>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsiReadings {
    pub o3_sub_index: RegionValues,
    pub no2_one_hour_max: RegionValues,
    pub o3_eight_hour_max: RegionValues,
    pub psi_twenty_four_hourly: RegionValues,
    pub pm10_twenty_four_hourly: RegionValues,
    pub pm10_sub_index: RegionValues,
    pub pm25_twenty_four_hourly: RegionValues,
    pub so2_sub_index: RegionValues,
    pub pm25_sub_index: RegionValues,
    pub so2_twenty_four_hourly: RegionValues,
    pub co_eight_hour_max: RegionValues,
    pub co_sub_index: RegionValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsiItem {
    pub date: String,
    #[serde(rename = "updatedTimestamp")]
    pub updated_timestamp: String,
    pub timestamp: String,
    pub readings: PsiReadings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsiData {
    #[serde(rename = "regionMetadata")]
    pub region_metadata: Vec<RegionMetadata>,
    pub items: Vec<PsiItem>,
}
