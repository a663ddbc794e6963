//! Wire types and the transport seam.

use async_trait::async_trait;
use heroql_core::{ExecutionError, ExecutionResult, Fingerprint, OperationDescriptor, Variables};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GraphQL request body.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub query: String,
    pub variables: Variables,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl Request {
    pub fn new(operation: &OperationDescriptor, variables: &Variables) -> Self {
        Self {
            query: operation.text().to_string(),
            variables: variables.clone(),
            operation_name: operation.name().map(str::to_string),
        }
    }

    /// Rebuilds the request a cache entry was produced by.
    pub fn from_fingerprint(fingerprint: &Fingerprint) -> Self {
        Self {
            query: fingerprint.text().to_string(),
            variables: fingerprint.bound_variables().clone(),
            operation_name: fingerprint.operation_name().map(str::to_string),
        }
    }
}

/// A GraphQL response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQLError>>,
}

/// One entry of a response's `errors` list.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<Value>>,
    #[serde(default)]
    pub extensions: Option<Map<String, Value>>,
}

impl Response {
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    pub fn errors(messages: &[&str]) -> Self {
        Self {
            data: None,
            errors: Some(
                messages
                    .iter()
                    .map(|message| GraphQLError {
                        message: message.to_string(),
                        path: None,
                        extensions: None,
                    })
                    .collect(),
            ),
        }
    }

    /// Extracts `data`. A non-empty `errors` list fails even when partial
    /// data is present.
    pub fn into_data(self) -> ExecutionResult<Value> {
        if let Some(errors) = self.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(ExecutionError::server(&messages));
        }
        match self.data {
            Some(Value::Null) | None => Err(ExecutionError::new(
                heroql_core::ErrorCode::NoData,
                "No data in response",
            )),
            Some(data) => Ok(data),
        }
    }
}

/// Sends a request to the GraphQL endpoint.
///
/// Implementations report transport failures (unreachable endpoint, non-2xx
/// status, undecodable body) as errors and return well-formed responses as
/// they are, `errors` included.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &Request) -> ExecutionResult<Response>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use heroql_core::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let op = OperationDescriptor::parse(
            "query readHeroById($id:Int!){heroById(id:$id){id,name}}",
        )
        .unwrap();
        let request = Request::new(&op, &Variables::new().with("id", 12));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "query": "query readHeroById($id:Int!){heroById(id:$id){id,name}}",
                "variables": {"id": 12},
                "operationName": "readHeroById"
            })
        );
    }

    #[test]
    fn test_request_from_fingerprint_keeps_operation_name() {
        let op = OperationDescriptor::parse(
            "query readHeroesWithTerm($term:String!){herowithterm(term:$term){nodes{id,name}}}",
        )
        .unwrap();
        let variables = Variables::new().with("term", "ma");
        let rebuilt = Request::from_fingerprint(&Fingerprint::new(&op, &variables));

        assert_eq!(
            serde_json::to_value(&rebuilt).unwrap(),
            serde_json::to_value(Request::new(&op, &variables)).unwrap()
        );
        assert_eq!(rebuilt.operation_name.as_deref(), Some("readHeroesWithTerm"));
    }

    #[test]
    fn test_anonymous_request_omits_operation_name() {
        let op = OperationDescriptor::parse("{allHeroes{nodes{id}}}").unwrap();
        let json = serde_json::to_value(Request::new(&op, &Variables::new())).unwrap();
        assert_eq!(json, json!({"query": "{allHeroes{nodes{id}}}", "variables": {}}));
    }

    #[test]
    fn test_response_into_data() {
        let response: Response = serde_json::from_str(r#"{"data":{"hello":"world"}}"#).unwrap();
        assert_eq!(response.into_data().unwrap(), json!({"hello": "world"}));

        let response: Response =
            serde_json::from_str(r#"{"data":null,"errors":[{"message":"boom","path":["hero"]}]}"#)
                .unwrap();
        let err = response.into_data().unwrap_err();
        assert_eq!(err.code, ErrorCode::ServerError);
        assert_eq!(err.message, "boom");

        let response: Response = serde_json::from_str(r#"{"errors":[]}"#).unwrap();
        assert_eq!(response.into_data().unwrap_err().code, ErrorCode::NoData);
    }
}
