use crate::api::Api;
use crate::config::DEFAULT_DISCOVERY_URL;
use crate::descriptor::{ApiDefinition, ServiceDescriptor};
use crate::error::{DiscoveryError, Result};
use crate::http::{ErrorObject, Transport};
use crate::request::HttpRequest;
use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Serialize;
use std::fmt;
use std::io::{BufReader, Read};
use url::Url;

const ENVELOPE_DATA: &str = "data";
const ENVELOPE_ERROR: &str = "error";

/// Discovery document for one API, as returned by the describe endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryDocument {
    api_name: String,
    api_definition: ApiDefinition,
    legacy_service: Option<ServiceDescriptor>,
}

impl DiscoveryDocument {
    pub fn new(api_name: impl Into<String>, api_definition: ApiDefinition) -> Self {
        let legacy_service = api_definition.first().map(|(_, service)| service.clone());
        Self {
            api_name: api_name.into(),
            api_definition,
            legacy_service,
        }
    }

    /// Fetches the discovery document for `api_name` from the default endpoint.
    ///
    /// An API the service doesn't know about yields an empty definition, not
    /// an error.
    pub fn load<T>(transport: &T, api_name: &str) -> Result<Self>
    where
        T: Transport + ?Sized,
    {
        Self::load_from(transport, DEFAULT_DISCOVERY_URL, api_name)
    }

    pub fn load_from<T>(transport: &T, endpoint: &str, api_name: &str) -> Result<Self>
    where
        T: Transport + ?Sized,
    {
        let url = discovery_url(endpoint, api_name)?;
        let body = transport.get(&url)?;
        Self::from_reader(api_name, body)
    }

    /// Parses a describe response, skipping ahead to the `api_name` entry.
    ///
    /// A JSON-C `data` envelope is unwrapped; a top-level `error` object is
    /// returned as [`DiscoveryError::Api`].
    pub fn from_reader<R: Read>(api_name: &str, reader: R) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_reader(BufReader::new(reader));
        let lookup = ApiLookup { api_name }.deserialize(&mut de)?;
        de.end()?;

        let api_definition = match lookup {
            Lookup::Found(definition) => definition,
            Lookup::Failed(err) => return Err(err.into()),
            Lookup::Missing => ApiDefinition::default(),
        };
        Ok(Self::new(api_name, api_definition))
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn api_definition(&self) -> &ApiDefinition {
        &self.api_definition
    }

    /// Service definition of the first version in the document.
    pub fn legacy_service(&self) -> Option<&ServiceDescriptor> {
        self.legacy_service.as_ref()
    }

    pub fn api(&self, version: &str) -> Option<Api<'_>> {
        let (version, service) = self.api_definition.iter().find(|(v, _)| *v == version)?;
        Some(Api::new(&self.api_name, version, service))
    }

    pub fn default_api(&self) -> Option<Api<'_>> {
        let (version, service) = self.api_definition.first()?;
        Some(Api::new(&self.api_name, version, service))
    }

    /// Builds a request against the first version of the API.
    pub fn build_request<P>(&self, identifier: &str, parameters: &P) -> Result<HttpRequest>
    where
        P: Serialize + ?Sized,
    {
        self.default_api()
            .ok_or_else(|| DiscoveryError::NoServiceDefinition(self.api_name.clone()))?
            .build_request(identifier, parameters)
    }
}

pub fn discovery_url(endpoint: &str, api_name: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut().append_pair("api", api_name);
    Ok(url)
}

enum Lookup {
    Found(ApiDefinition),
    Failed(ErrorObject),
    Missing,
}

/// Walks a describe response object, ignoring everything but the entry
/// keyed by `api_name`.
struct ApiLookup<'a> {
    api_name: &'a str,
}

impl<'de> DeserializeSeed<'de> for ApiLookup<'_> {
    type Value = Lookup;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Lookup, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for ApiLookup<'_> {
    type Value = Lookup;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a discovery response object")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Lookup, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut result = Lookup::Missing;
        while let Some(key) = map.next_key::<String>()? {
            if !matches!(result, Lookup::Missing) {
                map.next_value::<IgnoredAny>()?;
            } else if key == self.api_name {
                result = Lookup::Found(map.next_value()?);
            } else if key == ENVELOPE_DATA {
                result = map.next_value_seed(ApiLookup {
                    api_name: self.api_name,
                })?;
            } else if key == ENVELOPE_ERROR {
                result = Lookup::Failed(map.next_value()?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(result)
    }
}
