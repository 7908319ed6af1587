//! Parameter routing
//!
//! Maps each supported weather parameter to its endpoint, the document shape
//! its payload is validated against, and the data kind it is stored under.

use crate::api::endpoints::EndpointSpec;
use crate::api::session::IngestionSession;
use crate::error::{IngestError, Result};
use crate::schemas::DocumentShape;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sgw_common::DataKind;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Query argument carrying the requested day
pub const DATE_QUERY_PARAM: &str = "date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Parameter {
    Temperature,
    Rainfall,
    Humidity,
    WindSpeed,
    WindDirection,
    TwoHourForecast,
    TwentyFourHourForecast,
    FourDayForecast,
    Wbgt,
    Lightning,
    Pm25,
    Psi,
    UvIndex,
}

/// Everything needed to fetch, validate and store one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub parameter: Parameter,
    pub endpoint: EndpointSpec,
    pub shape: DocumentShape,
    pub kind: DataKind,
}

impl Parameter {
    pub const ALL: [Parameter; 13] = [
        Parameter::Temperature,
        Parameter::Rainfall,
        Parameter::Humidity,
        Parameter::WindSpeed,
        Parameter::WindDirection,
        Parameter::TwoHourForecast,
        Parameter::TwentyFourHourForecast,
        Parameter::FourDayForecast,
        Parameter::Wbgt,
        Parameter::Lightning,
        Parameter::Pm25,
        Parameter::Psi,
        Parameter::UvIndex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Rainfall => "rainfall",
            Self::Humidity => "humidity",
            Self::WindSpeed => "wind-speed",
            Self::WindDirection => "wind-direction",
            Self::TwoHourForecast => "two-hour-forecast",
            Self::TwentyFourHourForecast => "twenty-four-hour-forecast",
            Self::FourDayForecast => "four-day-forecast",
            Self::Wbgt => "wbgt",
            Self::Lightning => "lightning",
            Self::Pm25 => "pm25",
            Self::Psi => "psi",
            Self::UvIndex => "uv-index",
        }
    }

    pub fn endpoint(&self) -> EndpointSpec {
        match self {
            Self::Temperature => EndpointSpec::new("/air-temperature"),
            Self::Rainfall => EndpointSpec::new("/rainfall"),
            Self::Humidity => EndpointSpec::new("/relative-humidity"),
            Self::WindSpeed => EndpointSpec::new("/wind-speed"),
            Self::WindDirection => EndpointSpec::new("/wind-direction"),
            Self::TwoHourForecast => EndpointSpec::new("/two-hr-forecast"),
            Self::TwentyFourHourForecast => EndpointSpec::new("/twenty-four-hr-forecast"),
            Self::FourDayForecast => EndpointSpec::new("/four-day-outlook"),
            Self::Wbgt => EndpointSpec::with_query("/weather", &[("api", "wbgt")]),
            Self::Lightning => EndpointSpec::with_query("/weather", &[("api", "lightning")]),
            Self::Pm25 => EndpointSpec::new("/pm25"),
            Self::Psi => EndpointSpec::new("/psi"),
            Self::UvIndex => EndpointSpec::new("/uv"),
        }
    }

    pub fn shape(&self) -> DocumentShape {
        match self {
            Self::Temperature
            | Self::Rainfall
            | Self::Humidity
            | Self::WindSpeed
            | Self::WindDirection => DocumentShape::StationReadings,
            Self::TwoHourForecast => DocumentShape::TwoHourForecast,
            Self::TwentyFourHourForecast => DocumentShape::TwentyFourHourOutlook,
            Self::FourDayForecast => DocumentShape::FourDayOutlook,
            Self::Wbgt => DocumentShape::Wbgt,
            Self::Lightning => DocumentShape::Lightning,
            Self::Pm25 => DocumentShape::Pm25,
            Self::Psi => DocumentShape::Psi,
            Self::UvIndex => DocumentShape::UvIndex,
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            Self::TwoHourForecast | Self::TwentyFourHourForecast | Self::FourDayForecast => {
                DataKind::Forecast
            },
            _ => DataKind::Reading,
        }
    }

    pub fn route(&self) -> Route {
        Route {
            parameter: *self,
            endpoint: self.endpoint(),
            shape: self.shape(),
            kind: self.kind(),
        }
    }
}

impl FromStr for Parameter {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        Parameter::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| IngestError::UnsupportedParameter(s.to_string()))
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a parameter name to its route
pub fn dispatch(name: &str) -> Result<Route> {
    Ok(name.parse::<Parameter>()?.route())
}

/// Fetch one day of a parameter, merge all its pages and validate the result
#[instrument(skip(session), fields(parameter = %parameter))]
pub async fn fetch_parameter(
    session: &IngestionSession,
    parameter: Parameter,
    date: NaiveDate,
) -> Result<Value> {
    let route = parameter.route();

    let mut query = route.endpoint.query_pairs();
    query.push((DATE_QUERY_PARAM.to_string(), date.format("%Y-%m-%d").to_string()));

    let document = session.fetcher().fetch(route.endpoint.path, &query).await?;
    let normalized = route.shape.validate(document)?;

    debug!(shape = %route.shape, "Document validated");
    Ok(normalized)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for parameter in Parameter::ALL {
            assert_eq!(parameter.as_str().parse::<Parameter>().unwrap(), parameter);
            assert_eq!(
                serde_json::to_value(parameter).unwrap(),
                serde_json::Value::String(parameter.as_str().to_string())
            );
        }
    }

    #[test]
    fn test_unknown_parameter_is_unsupported() {
        let err = dispatch("snowfall").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedParameter(ref p) if p == "snowfall"));
    }

    #[test]
    fn test_routes() {
        let wbgt = dispatch("wbgt").unwrap();
        assert_eq!(wbgt.endpoint.path, "/weather");
        assert_eq!(wbgt.endpoint.query, &[("api", "wbgt")]);
        assert_eq!(wbgt.kind, DataKind::Reading);

        let outlook = dispatch("four-day-forecast").unwrap();
        assert_eq!(outlook.endpoint.path, "/four-day-outlook");
        assert_eq!(outlook.shape, DocumentShape::FourDayOutlook);
        assert_eq!(outlook.kind, DataKind::Forecast);

        assert_eq!(dispatch("temperature").unwrap().endpoint.path, "/air-temperature");
        assert_eq!(dispatch("uv-index").unwrap().endpoint.path, "/uv");
    }

    #[test]
    fn test_forecast_kinds() {
        let forecasts: Vec<_> =
            Parameter::ALL.iter().filter(|p| p.kind() == DataKind::Forecast).collect();
        assert_eq!(forecasts.len(), 3);
    }
}
