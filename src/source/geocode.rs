use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::FetchError;
use crate::config::{GeocoderSettings, Provider};

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// Address → coordinate. `Ok(None)` means the provider knows no such place.
pub trait Geocoder: Sync {
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coord>, FetchError>> + Send;
}

// ── Nominatim ──

pub struct Nominatim {
    client: reqwest::Client,
    search_url: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl Nominatim {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Nominatim {
            client,
            search_url: format!("{}/search", base_url.trim_end_matches('/')),
        })
    }
}

impl Geocoder for Nominatim {
    async fn geocode(&self, address: &str) -> Result<Option<Coord>, FetchError> {
        let places: Vec<NominatimPlace> = self
            .client
            .get(&self.search_url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(address, hits = places.len(), "nominatim");
        first_place(&places)
    }
}

fn first_place(places: &[NominatimPlace]) -> Result<Option<Coord>, FetchError> {
    let Some(place) = places.first() else {
        return Ok(None);
    };
    let parse = |v: &str| {
        v.parse::<f64>()
            .map_err(|_| FetchError::Provider(format!("nominatim returned coordinate {:?}", v)))
    };
    Ok(Some(Coord {
        lat: parse(&place.lat)?,
        lon: parse(&place.lon)?,
    }))
}

// ── Google ──

pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLatLng,
}

#[derive(Debug, Deserialize)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

impl GoogleGeocoder {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(GoogleGeocoder {
            client,
            api_key: api_key.to_string(),
        })
    }
}

impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coord>, FetchError> {
        let response: GoogleResponse = self
            .client
            .get(GOOGLE_GEOCODE_URL)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(address, status = %response.status, "google geocode");
        first_result(response)
    }
}

fn first_result(response: GoogleResponse) -> Result<Option<Coord>, FetchError> {
    match response.status.as_str() {
        "OK" => Ok(response.results.first().map(|r| Coord {
            lat: r.geometry.location.lat,
            lon: r.geometry.location.lng,
        })),
        "ZERO_RESULTS" => Ok(None),
        other => Err(FetchError::Provider(format!(
            "google geocoding {}: {}",
            other,
            response.error_message.unwrap_or_default()
        ))),
    }
}

// ── Selection ──

/// The provider chosen in `[geocoder]`.
pub enum AnyGeocoder {
    Nominatim(Nominatim),
    Google(GoogleGeocoder),
}

impl AnyGeocoder {
    /// Expects settings already validated; a missing Google key becomes an empty key.
    pub fn from_settings(settings: &GeocoderSettings) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        Ok(match settings.provider {
            Provider::Nominatim => AnyGeocoder::Nominatim(Nominatim::new(
                &settings.nominatim_url,
                &settings.user_agent,
                timeout,
            )?),
            Provider::Google => AnyGeocoder::Google(GoogleGeocoder::new(
                settings.api_key.as_deref().unwrap_or_default(),
                timeout,
            )?),
        })
    }
}

impl Geocoder for AnyGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coord>, FetchError> {
        match self {
            AnyGeocoder::Nominatim(g) => g.geocode(address).await,
            AnyGeocoder::Google(g) => g.geocode(address).await,
        }
    }
}

// ── Tests ──
