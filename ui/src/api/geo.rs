use serde::Deserialize;

use super::{encode_segment, http::decode, ApiError, GeoBackend};

/// Client for the third-party geography lookup service.
#[derive(Clone, Debug)]
pub struct GeoClient {
    http: reqwest::Client,
    base_url: String,
}

/// The service has answered both as a bare list and wrapped in `data`,
/// with entries either plain strings or objects carrying a `name`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlaceList {
    Bare(Vec<Place>),
    Wrapped { data: Vec<Place> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Place {
    Name(String),
    Named { name: String },
}

impl PlaceList {
    fn into_names(self) -> Vec<String> {
        let places = match self {
            PlaceList::Bare(p) | PlaceList::Wrapped { data: p } => p,
        };
        places
            .into_iter()
            .map(|p| match p {
                Place::Name(name) | Place::Named { name } => name.trim().to_string(),
            })
            .filter(|n| !n.is_empty())
            .collect()
    }
}

impl GeoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn names(&self, path: String) -> Result<Vec<String>, ApiError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        let list: PlaceList = decode(resp).await?;
        Ok(list.into_names())
    }
}

impl GeoBackend for GeoClient {
    async fn divisions(&self) -> Result<Vec<String>, ApiError> {
        self.names("/divisions".to_string()).await
    }

    async fn districts(&self, division: &str) -> Result<Vec<String>, ApiError> {
        self.names(format!("/divisions/{}/districts", encode_segment(division)))
            .await
    }

    async fn wards(&self, district: &str) -> Result<Vec<String>, ApiError> {
        self.names(format!("/districts/{}/wards", encode_segment(district)))
            .await
    }

    async fn areas(&self, ward: &str) -> Result<Vec<String>, ApiError> {
        self.names(format!("/wards/{}/areas", encode_segment(ward)))
            .await
    }
}
