//! The flight itinerary schema, as returned by the PNR conversion service,
//! together with a typed model of it.
//!
//! The root document is `{"flightData": {"names", "flights", "meta"}}`; each
//! flight leg carries departure/arrival airport records and a flight-detail
//! record whose `co2` entry is an open string → number mapping.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::cast::{cast_into, uncast_from};
use crate::error::{Result, SchemaError};
use crate::ir::{Additional, FieldSpec, Ty};
use crate::registry::SchemaRegistry;

pub const ROOT: &str = "FlightDataSet";

static REGISTRY: Lazy<Result<SchemaRegistry, SchemaError>> = Lazy::new(build_registry);

/// Process-wide flight registry, built on first use.
pub fn registry() -> Result<&'static SchemaRegistry, SchemaError> {
    REGISTRY.as_ref().map_err(Clone::clone)
}

fn closed<const N: usize>(fields: [FieldSpec; N]) -> Ty {
    Ty::object(fields, Additional::Reject)
}

fn strings<const N: usize>(names: [&str; N]) -> Ty {
    closed(names.map(|n| FieldSpec::same(n, Ty::string())))
}

pub fn build_registry() -> Result<SchemaRegistry, SchemaError> {
    let registry = SchemaRegistry::new()
        .with(ROOT, closed([FieldSpec::same("flightData", Ty::reference("FlightData"))]))?
        .with("FlightData", closed([
            FieldSpec::same("names", Ty::array(Ty::Any)),
            FieldSpec::same("flights", Ty::array(Ty::reference("Flight"))),
            FieldSpec::same("meta", Ty::reference("Meta")),
        ]))?
        .with("Flight", closed([
            FieldSpec::same("dep", Ty::reference("Arr")),
            FieldSpec::same("arr", Ty::reference("Arr")),
            FieldSpec::same("flt", Ty::reference("Flt")),
        ]))?
        .with("Arr", strings([
            "airportname", "cityname", "countryname", "airportcode",
            "latitude", "longitude", "timezone", "timezoneshort",
        ]))?
        .with("Flt", closed([
            FieldSpec::same("flightNo", Ty::string()),
            FieldSpec::same("iatacode", Ty::string()),
            FieldSpec::same("name", Ty::string()),
            FieldSpec::same("operated_by", Ty::string()),
            FieldSpec::same("cabin", Ty::string()),
            FieldSpec::same("class", Ty::string()),
            FieldSpec::same("aircraft", Ty::string()),
            FieldSpec::same("departure", Ty::reference("Arrival")),
            FieldSpec::same("arrival", Ty::reference("Arrival")),
            FieldSpec::same("transit_time", Ty::reference("TransitTime")),
            FieldSpec::same("duration", Ty::reference("Duration")),
            FieldSpec::same("distance", Ty::reference("Distance")),
            FieldSpec::same("co2", Ty::map(Ty::number())),
            FieldSpec::same("svg-logo-high-res", Ty::string()),
            FieldSpec::same("png-logo-low-res", Ty::string()),
        ]))?
        .with("Arrival", strings(["day", "string", "hr12", "hr24", "UTC", "tz"]))?
        .with("Distance", closed([
            FieldSpec::same("miles", Ty::number()),
            FieldSpec::same("km", Ty::number()),
        ]))?
        .with("Duration", strings(["minutes", "hours"]))?
        .with("TransitTime", closed(
            ["minutes", "hours", "days", "months"].map(|n| FieldSpec::same(n, Ty::optional(Ty::number()))),
        ))?
        .with("Meta", closed([FieldSpec::same("pnr", Ty::Null)]))?;
    registry.check_references()?;
    Ok(registry)
}

// ------------------------------ Typed model -------------------------------- //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightDataSet {
    pub flight_data: FlightData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightData {
    pub names: Vec<Value>,
    pub flights: Vec<Flight>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub dep: Airport,
    pub arr: Airport,
    pub flt: FlightDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub airportname: String,
    pub cityname: String,
    pub countryname: String,
    pub airportcode: String,
    pub latitude: String,
    pub longitude: String,
    pub timezone: String,
    pub timezoneshort: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightDetail {
    #[serde(rename = "flightNo")]
    pub flight_no: String,
    pub iatacode: String,
    pub name: String,
    pub operated_by: String,
    pub cabin: String,
    pub class: String,
    pub aircraft: String,
    pub departure: Moment,
    pub arrival: Moment,
    pub transit_time: TransitTime,
    pub duration: Duration,
    pub distance: Distance,
    pub co2: IndexMap<String, Number>,
    #[serde(rename = "svg-logo-high-res")]
    pub svg_logo_high_res: String,
    #[serde(rename = "png-logo-low-res")]
    pub png_logo_low_res: String,
}

/// A departure or arrival instant, pre-rendered by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub day: String,
    pub string: String,
    pub hr12: String,
    pub hr24: String,
    #[serde(rename = "UTC")]
    pub utc: String,
    pub tz: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub miles: Number,
    pub km: Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    pub minutes: String,
    pub hours: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months: Option<Number>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub pnr: (),
}

impl FlightDataSet {
    pub fn flight_count(&self) -> usize {
        self.flight_data.flights.len()
    }

    /// An itinerary without flights is treated as a failed conversion.
    pub fn is_empty(&self) -> bool {
        self.flight_data.flights.is_empty()
    }
}

/// Text ↔ typed itinerary.
pub struct Convert;

impl Convert {
    pub fn to_flight_data_set(json: &str) -> Result<FlightDataSet> {
        cast_into(registry()?, json, ROOT)
    }

    pub fn flight_data_set_to_json(value: &FlightDataSet) -> Result<String> {
        uncast_from(registry()?, value, ROOT)
    }
}

/// City part of an IANA zone name: `America/New_York` → `New York`.
pub fn city_from_timezone(zone: &str) -> Option<String> {
    let city = zone.split('/').nth(1)?;
    Some(city.replacen('_', " ", 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::{cast, uncast};
    use crate::error::{Error, ValidationErrorKind};
    use serde_json::json;

    fn airport(code: &str, zone: &str) -> Value {
        json!({
            "airportname": format!("{code} International"),
            "cityname": "City",
            "countryname": "Country",
            "airportcode": code,
            "latitude": "4.70",
            "longitude": "-74.14",
            "timezone": zone,
            "timezoneshort": "COT"
        })
    }

    fn moment() -> Value {
        json!({
            "day": "Mon", "string": "Mon 04 Mar", "hr12": "7:05am",
            "hr24": "07:05", "UTC": "2024-03-04T12:05:00Z", "tz": "-05:00"
        })
    }

    fn flt() -> Value {
        json!({
            "flightNo": "AV 24",
            "iatacode": "AV",
            "name": "Avianca",
            "operated_by": "",
            "cabin": "Economy",
            "class": "Y",
            "aircraft": "Airbus A320",
            "departure": moment(),
            "arrival": moment(),
            "transit_time": {"hours": 2},
            "duration": {"minutes": "35", "hours": "5"},
            "distance": {"miles": 2442, "km": 3930},
            "co2": {"economy": 301.2, "premium": 482},
            "svg-logo-high-res": "https://example.com/av.svg",
            "png-logo-low-res": "https://example.com/av.png"
        })
    }

    fn itinerary(flights: Vec<Value>) -> Value {
        json!({"flightData": {"names": [], "flights": flights, "meta": {"pnr": null}}})
    }

    #[test]
    fn empty_itinerary_casts() {
        let doc = itinerary(vec![]);
        let out = cast(registry().unwrap(), &doc.to_string(), ROOT).unwrap();
        assert_eq!(out, doc);

        let typed = Convert::to_flight_data_set(&doc.to_string()).unwrap();
        assert!(typed.is_empty());
    }

    #[test]
    fn full_leg_casts_and_round_trips() {
        let leg = json!({"dep": airport("BOG", "America/Bogota"), "arr": airport("JFK", "America/New_York"), "flt": flt()});
        let doc = itinerary(vec![leg]);
        let text = doc.to_string();

        let internal = cast(registry().unwrap(), &text, ROOT).unwrap();
        assert_eq!(internal, doc);
        let back = uncast(registry().unwrap(), &internal, ROOT).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&back).unwrap(), doc);

        let typed = Convert::to_flight_data_set(&text).unwrap();
        assert_eq!(typed.flight_count(), 1);
        let detail = &typed.flight_data.flights[0].flt;
        assert_eq!(detail.flight_no, "AV 24");
        assert_eq!(detail.transit_time, TransitTime { hours: Some(Number::from(2)), ..TransitTime::default() });
        assert_eq!(detail.co2.keys().collect::<Vec<_>>(), vec!["economy", "premium"]);

        let again = Convert::flight_data_set_to_json(&typed).unwrap();
        assert_eq!(Convert::to_flight_data_set(&again).unwrap(), typed);
    }

    #[test]
    fn typed_layer_keeps_wire_numbers_as_written() {
        let leg = json!({"dep": airport("BOG", "America/Bogota"), "arr": airport("JFK", "America/New_York"), "flt": flt()});
        let doc = itinerary(vec![leg]);

        let typed = Convert::to_flight_data_set(&doc.to_string()).unwrap();
        let detail = &typed.flight_data.flights[0].flt;
        assert_eq!(detail.distance.miles, Number::from(2442));
        assert_eq!(detail.co2["premium"], Number::from(482));

        let again = Convert::flight_data_set_to_json(&typed).unwrap();
        assert!(!again.contains("2442.0"), "{again}");
        assert!(!again.contains("482.0"), "{again}");
        assert!(again.contains("301.2"));
        assert_eq!(serde_json::from_str::<Value>(&again).unwrap(), doc);
    }

    #[test]
    fn missing_flight_number_is_reported_at_its_path() {
        let mut detail = flt();
        detail.as_object_mut().unwrap().remove("flightNo");
        let doc = itinerary(vec![json!({"dep": airport("BOG", "America/Bogota"), "arr": airport("JFK", "America/New_York"), "flt": detail})]);

        let err = cast(registry().unwrap(), &doc.to_string(), ROOT).unwrap_err();
        let Error::Validation(e) = err else { panic!("expected a validation error") };
        assert_eq!(e.path.to_string(), "flightData.flights[0].flt.flightNo");
        assert!(matches!(e.kind, ValidationErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn co2_accepts_numbers_only() {
        let mut detail = flt();
        detail["co2"] = json!({"economy": "a lot"});
        let doc = itinerary(vec![json!({"dep": airport("BOG", "America/Bogota"), "arr": airport("JFK", "America/New_York"), "flt": detail})]);
        let err = cast(registry().unwrap(), &doc.to_string(), ROOT).unwrap_err();
        assert_eq!(err.validation().unwrap().path.to_string(), "flightData.flights[0].flt.co2.economy");
    }

    #[test]
    fn pnr_must_be_null() {
        let doc = json!({"flightData": {"names": [], "flights": [], "meta": {"pnr": "ABC123"}}});
        assert!(cast(registry().unwrap(), &doc.to_string(), ROOT).is_err());
    }

    #[test]
    fn timezone_city() {
        assert_eq!(city_from_timezone("America/New_York").as_deref(), Some("New York"));
        assert_eq!(city_from_timezone("America/Argentina/Buenos_Aires").as_deref(), Some("Argentina"));
        assert_eq!(city_from_timezone("UTC"), None);
    }
}
