use crate::descriptor::ServiceDescriptor;
use crate::error::{DiscoveryError, Result};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Map, Value};
use url::Url;
use urlencoding::encode;

/// A request built from a discovery method, ready for a [`Transport`](crate::http::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn to_json(&self) -> Value {
        json!({
            "method": self.method.as_str(),
            "url": self.url.as_str(),
            "body": self.body,
        })
    }
}

/// Builds the request for `identifier` (`resourceName.methodName`) on `service`.
///
/// `parameters` must serialize to a JSON object (or null). Path placeholders
/// such as `{userId}` are filled first; what remains goes to the query string
/// for body-less verbs and to a JSON body otherwise.
pub fn build_request<P>(
    service: &ServiceDescriptor,
    identifier: &str,
    parameters: &P,
) -> Result<HttpRequest>
where
    P: Serialize + ?Sized,
{
    let descriptor = service.method(identifier)?;
    let method = parse_http_method(&descriptor.http_method)?;
    let mut params = parameter_map(parameters)?;

    let mut required = descriptor.required_parameters().collect::<Vec<_>>();
    required.sort_unstable();
    for name in required {
        if params.get(name).map_or(true, Value::is_null) {
            return Err(DiscoveryError::MissingParameter {
                method: identifier.to_string(),
                name: name.to_string(),
            });
        }
    }

    let path = expand_path(&descriptor.path_url, &mut params, identifier)?;
    let mut url = Url::parse(&format!("{}{}", service.base_url, path))?;

    let body = if has_body(&method) {
        (!params.is_empty()).then(|| Value::Object(params))
    } else {
        let query = query_pairs(&params);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &query {
                pairs.append_pair(k, v);
            }
        }
        None
    };

    Ok(HttpRequest { method, url, body })
}

fn parse_http_method(raw: &str) -> Result<Method> {
    raw.trim()
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| DiscoveryError::InvalidHttpMethod(raw.to_string()))
}

fn has_body(method: &Method) -> bool {
    ![Method::GET, Method::DELETE, Method::HEAD, Method::OPTIONS].contains(method)
}

fn parameter_map<P>(parameters: &P) -> Result<Map<String, Value>>
where
    P: Serialize + ?Sized,
{
    match serde_json::to_value(parameters)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(DiscoveryError::InvalidParameters(value_kind(&other).to_string())),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Replaces `{name}` placeholders with percent-encoded parameter values,
/// removing each consumed parameter from `params`.
fn expand_path(
    template: &str,
    params: &mut Map<String, Value>,
    identifier: &str,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        let value = params
            .remove(name)
            .and_then(|v| scalar_string(&v))
            .ok_or_else(|| DiscoveryError::MissingParameter {
                method: identifier.to_string(),
                name: name.to_string(),
            })?;
        out.push_str(&rest[..start]);
        out.push_str(&encode(&value));
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (name, value) in params {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(v) = scalar_string(item) {
                        out.push((name.clone(), v));
                    }
                }
            }
            other => {
                if let Some(v) = scalar_string(other) {
                    out.push((name.clone(), v));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn service() -> ServiceDescriptor {
        serde_json::from_str(
            r##"{
                "baseUrl": "http://host/api/",
                "resources": {
                    "resA": {
                        "methods": {
                            "methodX": {
                                "pathUrl": "items",
                                "httpMethod": "GET"
                            },
                            "get": {
                                "pathUrl": "items/{itemId}",
                                "httpMethod": "get",
                                "parameters": { "itemId": { "required": true } }
                            },
                            "insert": {
                                "pathUrl": "users/{userId}/items",
                                "httpMethod": "POST",
                                "parameters": {
                                    "userId": { "required": true },
                                    "title": { "required": true }
                                }
                            },
                            "broken": {
                                "pathUrl": "x",
                                "httpMethod": "NOT A VERB"
                            }
                        }
                    }
                }
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn test_build_get_request() {
        let request = build_request(&service(), "resA.methodX", &json!({"q": "val"})).unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.as_str(), "http://host/api/items?q=val");
        assert_eq!(request.url.path(), "/api/items");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_no_parameters_leaves_query_empty() {
        let request = build_request(&service(), "resA.methodX", &()).unwrap();
        assert_eq!(request.url.as_str(), "http://host/api/items");
        assert_eq!(request.url.query(), None);
    }

    #[test]
    fn test_query_value_rendering() {
        let request = build_request(
            &service(),
            "resA.methodX",
            &json!({"tag": ["a", "b"], "max": 10, "pretty": true, "skip": null}),
        )
        .unwrap();
        let pairs = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect::<Vec<_>>();
        assert!(pairs.contains(&("tag".to_string(), "a".to_string())));
        assert!(pairs.contains(&("tag".to_string(), "b".to_string())));
        assert!(pairs.contains(&("max".to_string(), "10".to_string())));
        assert!(pairs.contains(&("pretty".to_string(), "true".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "skip"));
    }

    #[test]
    fn test_path_placeholder_is_encoded() {
        let mut params = HashMap::new();
        params.insert("itemId", "a b/c");
        let request = build_request(&service(), "resA.get", &params).unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.as_str(), "http://host/api/items/a%20b%2Fc");
        assert_eq!(request.url.query(), None);
    }

    #[test]
    fn test_post_moves_parameters_to_body() {
        let request = build_request(
            &service(),
            "resA.insert",
            &json!({"userId": 42, "title": "hello"}),
        )
        .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.as_str(), "http://host/api/users/42/items");
        assert_eq!(request.body, Some(json!({"title": "hello"})));
    }

    #[test]
    fn test_missing_required_parameter() {
        let err = build_request(&service(), "resA.insert", &json!({"userId": "me"})).unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::MissingParameter { ref method, ref name }
                if method == "resA.insert" && name == "title"
        ));
    }

    #[test]
    fn test_null_required_parameter_counts_as_missing() {
        let err = build_request(&service(), "resA.get", &json!({"itemId": null})).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingParameter { .. }));
    }

    #[test]
    fn test_unknown_method_fails() {
        let err = build_request(&service(), "resA.missing", &()).unwrap_err();
        assert!(matches!(err, DiscoveryError::MethodNotFound(_)));

        let err = build_request(&service(), "nodot", &()).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidMethodIdentifier(_)));
    }

    #[test]
    fn test_invalid_http_method() {
        let err = build_request(&service(), "resA.broken", &()).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidHttpMethod(m) if m == "NOT A VERB"));
    }

    #[test]
    fn test_non_object_parameters_rejected() {
        let err = build_request(&service(), "resA.methodX", &json!([1, 2])).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidParameters(kind) if kind == "an array"));
    }

    #[test]
    fn test_to_json() {
        let request = build_request(&service(), "resA.methodX", &()).unwrap();
        assert_eq!(
            request.to_json(),
            json!({"method": "GET", "url": "http://host/api/items", "body": null})
        );
    }
}
