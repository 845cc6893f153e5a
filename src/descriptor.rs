use crate::error::{DiscoveryError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// All versions of one API, in document order.
///
/// The first entry is the default service definition used by callers that
/// don't name a version.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ApiDefinition {
    versions: IndexMap<String, ServiceDescriptor>,
}

impl ApiDefinition {
    pub fn get(&self, version: &str) -> Option<&ServiceDescriptor> {
        self.versions.get(version)
    }

    /// Version zero, if the document defined any version at all.
    pub fn first(&self) -> Option<(&str, &ServiceDescriptor)> {
        self.versions
            .get_index(0)
            .map(|(version, service)| (version.as_str(), service))
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceDescriptor)> {
        self.versions
            .iter()
            .map(|(version, service)| (version.as_str(), service))
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl FromIterator<(String, ServiceDescriptor)> for ApiDefinition {
    fn from_iter<T: IntoIterator<Item = (String, ServiceDescriptor)>>(iter: T) -> Self {
        Self {
            versions: iter.into_iter().collect(),
        }
    }
}

/// One version of an API.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ServiceDescriptor {
    /// Base URL for the service endpoint.
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "resources", default, deserialize_with = "null_as_empty")]
    pub resources: HashMap<String, ResourceDescriptor>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ResourceDescriptor {
    #[serde(rename = "methods", default, deserialize_with = "null_as_empty")]
    pub methods: HashMap<String, MethodDescriptor>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MethodDescriptor {
    /// Path relative to the service base URL.
    #[serde(rename = "pathUrl")]
    pub path_url: String,
    #[serde(rename = "httpMethod")]
    pub http_method: String,
    #[serde(rename = "methodType", default)]
    pub method_type: MethodType,
    #[serde(rename = "parameters", default, deserialize_with = "null_as_empty")]
    pub parameters: HashMap<String, ParameterDescriptor>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MethodType {
    #[default]
    Rest,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterDescriptor {
    #[serde(rename = "required", default)]
    pub required: bool,
}

/// Reads an absent or `null` map as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Splits `resourceName.methodName` at the first dot.
pub fn split_method_identifier(identifier: &str) -> Result<(&str, &str)> {
    identifier
        .split_once('.')
        .ok_or_else(|| DiscoveryError::InvalidMethodIdentifier(identifier.to_string()))
}

impl ServiceDescriptor {
    /// Looks up a method by `resourceName.methodName`.
    ///
    /// Unknown resources and methods are reported as `Ok(None)`; only an
    /// identifier without a dot is an error.
    pub fn resolve_method(&self, identifier: &str) -> Result<Option<&MethodDescriptor>> {
        let (resource_name, method_name) = split_method_identifier(identifier)?;
        Ok(self
            .resources
            .get(resource_name)
            .and_then(|resource| resource.methods.get(method_name)))
    }

    /// Like [`resolve_method`](Self::resolve_method), but absence is an error.
    pub fn method(&self, identifier: &str) -> Result<&MethodDescriptor> {
        self.resolve_method(identifier)?
            .ok_or_else(|| DiscoveryError::MethodNotFound(identifier.to_string()))
    }

    pub fn resource_url(&self, identifier: &str) -> Result<String> {
        let method = self.method(identifier)?;
        Ok(format!("{}{}", self.base_url, method.path_url))
    }
}

impl MethodDescriptor {
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|(_, param)| param.required)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE_JSON: &str = r##"{
        "baseUrl": "http://host/api/",
        "resources": {
            "resA": {
                "methods": {
                    "methodX": {
                        "pathUrl": "items",
                        "httpMethod": "GET",
                        "parameters": {
                            "q": { "required": true },
                            "max-results": {}
                        }
                    },
                    "a.b": {
                        "pathUrl": "nested",
                        "httpMethod": "POST"
                    }
                }
            },
            "res": {
                "methods": {
                    "a.b": {
                        "pathUrl": "dotted",
                        "httpMethod": "DELETE",
                        "methodType": "rest"
                    }
                }
            }
        }
    }"##;

    fn service() -> ServiceDescriptor {
        serde_json::from_str(SERVICE_JSON).unwrap()
    }

    #[test]
    fn test_parse_service_descriptor() {
        let service = service();
        assert_eq!(service.base_url, "http://host/api/");
        assert_eq!(service.resources.len(), 2);

        let method = &service.resources["resA"].methods["methodX"];
        assert_eq!(method.path_url, "items");
        assert_eq!(method.http_method, "GET");
        assert_eq!(method.method_type, MethodType::Rest);
        assert!(method.parameters["q"].required);
        assert!(!method.parameters["max-results"].required);
    }

    #[test]
    fn test_missing_maps_default_to_empty() {
        let service: ServiceDescriptor =
            serde_json::from_str(r#"{"baseUrl": "http://host/"}"#).unwrap();
        assert!(service.resources.is_empty());

        let resource: ResourceDescriptor = serde_json::from_str("{}").unwrap();
        assert!(resource.methods.is_empty());
    }

    #[test]
    fn test_null_maps_read_as_empty() {
        let service: ServiceDescriptor =
            serde_json::from_str(r#"{"baseUrl": "http://host/", "resources": null}"#).unwrap();
        assert!(service.resources.is_empty());

        let resource: ResourceDescriptor = serde_json::from_str(r#"{"methods": null}"#).unwrap();
        assert!(resource.methods.is_empty());

        let method: MethodDescriptor = serde_json::from_str(
            r#"{"pathUrl": "items", "httpMethod": "GET", "parameters": null}"#,
        )
        .unwrap();
        assert!(method.parameters.is_empty());
    }

    #[test]
    fn test_resolve_method() {
        let service = service();
        let method = service.resolve_method("resA.methodX").unwrap().unwrap();
        assert_eq!(method, &service.resources["resA"].methods["methodX"]);
    }

    #[test]
    fn test_resolve_unknown_is_absent() {
        let service = service();
        assert!(service.resolve_method("missing.methodX").unwrap().is_none());
        assert!(service.resolve_method("resA.missing").unwrap().is_none());
    }

    #[test]
    fn test_resolve_splits_at_first_dot() {
        let service = service();
        let method = service.resolve_method("res.a.b").unwrap().unwrap();
        assert_eq!(method.path_url, "dotted");

        let method = service.resolve_method("resA.a.b").unwrap().unwrap();
        assert_eq!(method.path_url, "nested");
    }

    #[test]
    fn test_resolve_without_dot_fails() {
        let err = service().resolve_method("resA").unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidMethodIdentifier(id) if id == "resA"));
    }

    #[test]
    fn test_method_not_found() {
        let err = service().method("resA.nope").unwrap_err();
        assert!(matches!(err, DiscoveryError::MethodNotFound(id) if id == "resA.nope"));
    }

    #[test]
    fn test_resource_url() {
        assert_eq!(
            service().resource_url("resA.methodX").unwrap(),
            "http://host/api/items"
        );
    }

    #[test]
    fn test_service_round_trip() {
        let service = service();
        let encoded = serde_json::to_string(&service).unwrap();
        let decoded: ServiceDescriptor = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, service);

        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["baseUrl"], "http://host/api/");
        assert_eq!(
            value["resources"]["resA"]["methods"]["methodX"]["parameters"]["q"]["required"],
            true
        );
        assert_eq!(
            value["resources"]["res"]["methods"]["a.b"]["methodType"],
            "rest"
        );
    }

    #[test]
    fn test_api_definition_keeps_document_order() {
        let api: ApiDefinition = serde_json::from_str(
            r#"{
                "v2": {"baseUrl": "http://host/v2/"},
                "v1": {"baseUrl": "http://host/v1/"},
                "beta": {"baseUrl": "http://host/beta/"}
            }"#,
        )
        .unwrap();

        assert_eq!(api.versions().collect::<Vec<_>>(), vec!["v2", "v1", "beta"]);
        let (version, service) = api.first().unwrap();
        assert_eq!(version, "v2");
        assert_eq!(service.base_url, "http://host/v2/");
        assert_eq!(api.get("beta").unwrap().base_url, "http://host/beta/");
    }

    #[test]
    fn test_required_parameters() {
        let service = service();
        let method = &service.resources["resA"].methods["methodX"];
        assert_eq!(method.required_parameters().collect::<Vec<_>>(), vec!["q"]);
    }
}
