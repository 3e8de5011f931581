//! FHIR `Parameters` resource builder
//!
//! Operations such as `$match`, `$validate`, `$member-add` and `$bulk-match`
//! take their arguments as a `Parameters` resource. Each built resource gets
//! a synthetic id taken from the nanosecond wall clock.

use super::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// A `Parameters` resource under construction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameters {
    #[serde(rename = "resourceType")]
    resource_type: &'static str,
    id: String,
    parameter: Vec<Parameter>,
}

/// One named operation argument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(flatten)]
    pub value: ParameterValue,
}

/// Typed value of an operation argument
///
/// Serializes to the FHIR `value[x]` (or `resource`) member name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParameterValue {
    #[serde(rename = "resource")]
    Resource(Value),
    #[serde(rename = "valueCode")]
    Code(String),
    #[serde(rename = "valueInteger")]
    Integer(i64),
    #[serde(rename = "valueBoolean")]
    Boolean(bool),
    #[serde(rename = "valueReference")]
    Reference {
        reference: String,
        #[serde(rename = "type")]
        target_type: String,
    },
}

impl Parameters {
    /// Starts an empty `Parameters` resource with a fresh synthetic id
    pub fn new() -> Self {
        Self {
            resource_type: "Parameters",
            id: synthetic_id(),
            parameter: Vec::new(),
        }
    }

    /// Appends a parameter
    pub fn with(mut self, name: impl Into<String>, value: ParameterValue) -> Self {
        self.parameter.push(Parameter {
            name: name.into(),
            value,
        });
        self
    }

    /// Appends a parameter only when `value` is a non-empty string
    pub fn with_code_opt(self, name: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(code) if !code.is_empty() => {
                self.with(name, ParameterValue::Code(code.to_string()))
            }
            _ => self,
        }
    }

    /// Synthetic id of this resource
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parameters in insertion order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameter
    }

    /// Renders the resource as JSON
    pub fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the `resource` parameter for a patient search criterion.
///
/// The criterion's own members are kept and `resourceType` is forced to
/// `Patient`.
pub fn patient_criteria(criteria: &Value) -> ParameterValue {
    let mut resource = serde_json::Map::new();
    resource.insert("resourceType".to_string(), Value::from("Patient"));
    if let Value::Object(fields) = criteria {
        for (key, value) in fields {
            if key != "resourceType" {
                resource.insert(key.clone(), value.clone());
            }
        }
    }
    ParameterValue::Resource(Value::Object(resource))
}

fn synthetic_id() -> String {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .map(|n| n.to_string())
        .unwrap_or_else(|| now.timestamp_micros().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_parameters_shape() {
        let params = Parameters::new();
        let id = params.id().to_string();
        let value = params.into_value().unwrap();

        assert_eq!(value["resourceType"], "Parameters");
        assert_eq!(value["id"], id);
        assert_eq!(value["parameter"], json!([]));
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_value_member_names() {
        let value = Parameters::new()
            .with("mode", ParameterValue::Code("create".to_string()))
            .with("count", ParameterValue::Integer(3))
            .with("onlyCertainMatches", ParameterValue::Boolean(false))
            .with(
                "resource",
                ParameterValue::Resource(json!({"resourceType": "Patient"})),
            )
            .into_value()
            .unwrap();

        let parameter = value["parameter"].as_array().unwrap();
        assert_eq!(parameter[0], json!({"name": "mode", "valueCode": "create"}));
        assert_eq!(parameter[1], json!({"name": "count", "valueInteger": 3}));
        assert_eq!(
            parameter[2],
            json!({"name": "onlyCertainMatches", "valueBoolean": false})
        );
        assert_eq!(
            parameter[3],
            json!({"name": "resource", "resource": {"resourceType": "Patient"}})
        );
    }

    #[test]
    fn test_reference_value() {
        let value = Parameters::new()
            .with(
                "patientReference",
                ParameterValue::Reference {
                    reference: "Patient/123".to_string(),
                    target_type: "Patient".to_string(),
                },
            )
            .into_value()
            .unwrap();

        assert_eq!(
            value["parameter"][0],
            json!({
                "name": "patientReference",
                "valueReference": {"reference": "Patient/123", "type": "Patient"}
            })
        );
    }

    #[test]
    fn test_with_code_opt_skips_empty() {
        let params = Parameters::new()
            .with_code_opt("mode", None)
            .with_code_opt("profile", Some(""))
            .with_code_opt("profile", Some("http://example.org/profile"));

        assert_eq!(params.parameters().len(), 1);
        assert_eq!(params.parameters()[0].name, "profile");
    }

    #[test]
    fn test_patient_criteria_forces_resource_type() {
        let criteria = json!({"resourceType": "Person", "birthDate": "1970-01-01"});
        let ParameterValue::Resource(resource) = patient_criteria(&criteria) else {
            panic!("expected resource parameter");
        };
        assert_eq!(resource["resourceType"], "Patient");
        assert_eq!(resource["birthDate"], "1970-01-01");
    }
}
