//! Response envelope shared by every connector endpoint.

use serde::{Deserialize, Deserializer};

/// Envelope wrapping every JSON answer of the connector.
///
/// Only `output` carries endpoint-specific data; the return/reason codes are
/// kept for diagnostics.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Overall return code (0 on success)
    #[serde(rename = "overallRC", default)]
    pub overall_rc: i32,
    /// Return code of the failing module
    #[serde(default)]
    pub rc: i32,
    /// Reason code
    #[serde(default)]
    pub rs: i32,
    /// Error message, empty on success
    #[serde(default)]
    pub errmsg: String,
    /// Identifier of the module that produced the answer
    #[serde(rename = "modID", default)]
    pub mod_id: Option<i32>,
    /// Endpoint payload
    pub output: T,
}

/// Accept a JSON string, number or null where the connector is inconsistent
/// about the type of a field (VLAN ids, queue limits).
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "lenient_string", default)]
        value: String,
    }

    #[test]
    fn test_envelope_with_null_mod_id() {
        let json = r#"{"overallRC":0,"rc":0,"rs":0,"errmsg":"","modID":null,"output":[]}"#;
        let resp: ApiResponse<Vec<String>> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.overall_rc, 0);
        assert!(resp.mod_id.is_none());
        assert!(resp.output.is_empty());
    }

    #[test]
    fn test_lenient_string_variants() {
        let s: Probe = serde_json::from_str(r#"{"value":"0100"}"#).unwrap();
        assert_eq!(s.value, "0100");
        let n: Probe = serde_json::from_str(r#"{"value":8}"#).unwrap();
        assert_eq!(n.value, "8");
        let null: Probe = serde_json::from_str(r#"{"value":null}"#).unwrap();
        assert_eq!(null.value, "");
        let missing: Probe = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(missing.value, "");
    }
}
