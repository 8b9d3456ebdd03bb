use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Lowest air temperature recorded on Earth, in Celsius.
pub const MIN_CELSIUS: f64 = -89.0;
/// Highest air temperature recorded on Earth, in Celsius.
pub const MAX_CELSIUS: f64 = 58.0;
/// Offset between Celsius and Kelvin.
pub const KELVIN_OFFSET: f64 = 273.15;

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + KELVIN_OFFSET
}

/// A Brazilian postal code (CEP): exactly 8 ASCII digits, stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    /// Validates `raw` without trimming or reformatting it.
    pub fn new(raw: &str) -> Result<Self, Error> {
        if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidFormat)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PostalCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for PostalCode {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Place name resolved from a postal code.
///
/// An empty `name` is the "not found" marker: the lookup itself succeeded but
/// the provider knows no such code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    #[serde(rename = "cep")]
    pub postal_code: String,
    #[serde(rename = "localidade", default)]
    pub name: String,
}

impl Locality {
    pub fn found(postal_code: &PostalCode, name: impl Into<String>) -> Self {
        Self { postal_code: postal_code.as_str().to_string(), name: name.into() }
    }

    pub fn not_found(postal_code: &PostalCode) -> Self {
        Self::found(postal_code, String::new())
    }

    pub fn is_not_found(&self) -> bool {
        self.name.is_empty()
    }
}

/// Current conditions as reported by the weather provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentWeather {
    pub celsius: f64,
}

/// Temperature for a locality in all three scales, unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureReading {
    locality: String,
    celsius: f64,
    fahrenheit: f64,
    kelvin: f64,
}

impl TemperatureReading {
    /// Both range ends are rejected.
    pub fn new(locality: &str, celsius: f64) -> Result<Self, Error> {
        let locality = locality.trim();
        if locality.is_empty() {
            return Err(Error::InvalidLocality);
        }

        if celsius.is_nan() || celsius <= MIN_CELSIUS || celsius >= MAX_CELSIUS {
            return Err(Error::OutOfRange(celsius));
        }

        Ok(Self {
            locality: locality.to_string(),
            celsius,
            fahrenheit: celsius_to_fahrenheit(celsius),
            kelvin: celsius_to_kelvin(celsius),
        })
    }

    pub fn locality(&self) -> &str {
        &self.locality
    }

    pub fn celsius(&self) -> f64 {
        self.celsius
    }

    pub fn fahrenheit(&self) -> f64 {
        self.fahrenheit
    }

    pub fn kelvin(&self) -> f64 {
        self.kelvin
    }
}

/// Final payload returned by the weather hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub city: String,
    #[serde(rename = "tempC")]
    pub temp_c: f64,
    #[serde(rename = "tempF")]
    pub temp_f: f64,
    #[serde(rename = "tempK")]
    pub temp_k: f64,
}

impl From<TemperatureReading> for LookupResult {
    fn from(reading: TemperatureReading) -> Self {
        Self {
            temp_c: round2(reading.celsius),
            temp_f: round2(reading.fahrenheit),
            temp_k: round2(reading.kelvin),
            city: reading.locality,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round1(value: f64) -> f64 {
        (value * 10.0).round() / 10.0
    }

    #[test]
    fn postal_code_accepts_eight_digits_unchanged() {
        for raw in ["13000001", "00000000", "99999999", "01001000"] {
            let code = PostalCode::new(raw).expect("8 digits must be accepted");
            assert_eq!(code.as_str(), raw);
        }
    }

    #[test]
    fn postal_code_rejects_everything_else() {
        let invalid = [
            "",
            "1300000",
            "1300000z",
            "130000010",
            "13000001012345678",
            "#30000010",
            "13000001$",
            "^#3000001",
            "'3000001",
            "\"3000001",
            "130000-01",
            "130000-010",
            "ABCDEFGH",
            " 13000001",
            "13000001 ",
            "1300000\n",
            "１３０００００１",
        ];

        for raw in invalid {
            let err = PostalCode::new(raw).unwrap_err();
            assert!(matches!(err, Error::InvalidFormat), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn postal_code_parses_via_from_str() {
        let code: PostalCode = "01001000".parse().unwrap();
        assert_eq!(code.to_string(), "01001000");
        assert!("0100100".parse::<PostalCode>().is_err());
    }

    #[test]
    fn temperature_reading_table() {
        let valid = [
            ("Ribeirão Preto", 57.999),
            ("Toronto", -88.999),
            ("San Luis", 0.0),
            ("São Paulo", 22.0),
            ("  Campinas ", 24.5),
        ];

        for (locality, celsius) in valid {
            let reading = TemperatureReading::new(locality, celsius).expect("valid reading");

            assert_eq!(reading.locality(), locality.trim());
            assert!((round1(reading.celsius()) - round1(celsius)).abs() < 0.1);
            assert!((round1(reading.fahrenheit()) - round1(celsius * 1.8 + 32.0)).abs() < 0.1);
            assert!((round1(reading.kelvin()) - round1(celsius + 273.15)).abs() < 0.1);
        }
    }

    #[test]
    fn temperature_reading_rejects_blank_locality_first() {
        for (locality, celsius) in [("  ", 58.001), ("", -89.001), ("", 22.3), (" ", 17.9)] {
            let err = TemperatureReading::new(locality, celsius).unwrap_err();
            assert!(matches!(err, Error::InvalidLocality));
        }
    }

    #[test]
    fn temperature_reading_rejects_out_of_range_and_boundaries() {
        for celsius in [58.001, -89.001, 58.0, -89.0, 100.0, f64::NAN] {
            let err = TemperatureReading::new("Osasco", celsius).unwrap_err();
            assert!(matches!(err, Error::OutOfRange(_)), "{celsius} should be rejected");
        }
    }

    #[test]
    fn lookup_result_survives_json() {
        let reading = TemperatureReading::new("São Paulo", 22.0).unwrap();
        let result = LookupResult::from(reading);

        assert_eq!(
            result,
            LookupResult {
                city: "São Paulo".to_string(),
                temp_c: 22.0,
                temp_f: 71.6,
                temp_k: 295.15,
            }
        );

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"city":"São Paulo","tempC":22.0,"tempF":71.6,"tempK":295.15}"#);

        let back: LookupResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn locality_json_shape() {
        let code = PostalCode::new("01001000").unwrap();
        let locality = Locality::found(&code, "São Paulo");

        let json = serde_json::to_value(&locality).unwrap();
        assert_eq!(json, serde_json::json!({"cep": "01001000", "localidade": "São Paulo"}));
        assert!(!locality.is_not_found());
        assert!(Locality::not_found(&code).is_not_found());
    }
}
