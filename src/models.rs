//! Response wrappers. Each keeps the decoded JSON object untouched and adds
//! convenience accessors over the fields HERE documents.

use serde_json::Value;

use crate::http::JsonObject;

fn array_of_objects<'a>(data: &'a JsonObject, key: &str) -> Vec<&'a JsonObject> {
    data.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficFlowResponse {
    pub data: JsonObject,
    pub request_id: String,
}

impl TrafficFlowResponse {
    pub fn new(data: JsonObject, request_id: impl Into<String>) -> Self {
        Self {
            data,
            request_id: request_id.into(),
        }
    }

    pub fn flows(&self) -> Vec<&JsonObject> {
        array_of_objects(&self.data, "flows")
    }

    /// `freeFlowSpeed` of every flow entry that has one.
    pub fn free_flow_speeds(&self) -> Vec<f64> {
        self.speeds("freeFlowSpeed")
    }

    /// `expectedSpeed` of every flow entry that has one.
    pub fn expected_speeds(&self) -> Vec<f64> {
        self.speeds("expectedSpeed")
    }

    fn speeds(&self, key: &str) -> Vec<f64> {
        self.flows()
            .into_iter()
            .filter_map(|flow| flow.get(key).and_then(Value::as_f64))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficIncidentResponse {
    pub data: JsonObject,
    pub request_id: String,
}

impl TrafficIncidentResponse {
    pub fn new(data: JsonObject, request_id: impl Into<String>) -> Self {
        Self {
            data,
            request_id: request_id.into(),
        }
    }

    pub fn incidents(&self) -> Vec<&JsonObject> {
        array_of_objects(&self.data, "incidents")
    }

    pub fn incident_count(&self) -> usize {
        self.incidents().len()
    }

    pub fn incidents_by_type(&self, incident_type: &str) -> Vec<&JsonObject> {
        self.incidents()
            .into_iter()
            .filter(|inc| inc.get("type").and_then(Value::as_str) == Some(incident_type))
            .collect()
    }

    /// Incidents whose `criticality` is `critical`, in any casing.
    pub fn critical_incidents(&self) -> Vec<&JsonObject> {
        self.incidents()
            .into_iter()
            .filter(|inc| {
                inc.get("criticality")
                    .and_then(Value::as_str)
                    .is_some_and(|c| c.eq_ignore_ascii_case("critical"))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityResponse {
    pub data: JsonObject,
    pub request_id: String,
}

impl AvailabilityResponse {
    pub fn new(data: JsonObject, request_id: impl Into<String>) -> Self {
        Self {
            data,
            request_id: request_id.into(),
        }
    }

    /// `false` unless the payload says otherwise.
    pub fn available(&self) -> bool {
        self.data
            .get("available")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn coverage_areas(&self) -> Vec<&JsonObject> {
        array_of_objects(&self.data, "coverage")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_flow_accessors() {
        let resp = TrafficFlowResponse::new(
            object(json!({
                "flows": [
                    {"freeFlowSpeed": 50.0, "expectedSpeed": 42.5},
                    {"freeFlowSpeed": 30},
                    {"other": true}
                ]
            })),
            "rid",
        );
        assert_eq!(resp.flows().len(), 3);
        assert_eq!(resp.free_flow_speeds(), vec![50.0, 30.0]);
        assert_eq!(resp.expected_speeds(), vec![42.5]);
        assert_eq!(resp.request_id, "rid");
    }

    #[test]
    fn test_missing_arrays_are_empty() {
        let flow = TrafficFlowResponse::new(JsonObject::new(), "rid");
        assert!(flow.flows().is_empty());
        assert!(flow.free_flow_speeds().is_empty());

        let incidents = TrafficIncidentResponse::new(object(json!({"incidents": "nope"})), "rid");
        assert_eq!(incidents.incident_count(), 0);
    }

    #[test]
    fn test_incident_filters() {
        let resp = TrafficIncidentResponse::new(
            object(json!({
                "incidents": [
                    {"type": "accident", "criticality": "CRITICAL"},
                    {"type": "construction", "criticality": "minor"},
                    {"type": "accident"}
                ]
            })),
            "rid",
        );
        assert_eq!(resp.incident_count(), 3);
        assert_eq!(resp.incidents_by_type("accident").len(), 2);
        assert!(resp.incidents_by_type("roadClosure").is_empty());
        let critical = resp.critical_incidents();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].get("type"), Some(&json!("accident")));
    }

    #[test]
    fn test_availability_accessors() {
        let resp = AvailabilityResponse::new(
            object(json!({"available": true, "coverage": [{"country": "DE"}]})),
            "rid",
        );
        assert!(resp.available());
        assert_eq!(resp.coverage_areas().len(), 1);

        let empty = AvailabilityResponse::new(object(json!({"available": "yes"})), "rid");
        assert!(!empty.available());
        assert!(empty.coverage_areas().is_empty());
    }
}
