use serde::{Deserialize, Serialize};

/// Opaque attestation payload tagged with the attestor it is meant for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationData {
    /// Name of the attestor that should process `data`
    #[serde(rename = "type")]
    pub data_type: String,

    /// Raw attestor-specific payload
    #[serde(default)]
    pub data: Vec<u8>,
}

impl AttestationData {
    /// Create attestation data for the given attestor type
    #[must_use]
    pub fn new(data_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            data_type: data_type.into(),
            data: data.into(),
        }
    }
}

/// Inbound message of an attestation exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRequest {
    pub attestation_data: AttestationData,
}

impl AttestationRequest {
    #[must_use]
    pub const fn new(attestation_data: AttestationData) -> Self {
        Self { attestation_data }
    }
}

/// Outbound message of an attestation exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationResponse {
    /// Always true when sent; failures abort the exchange instead
    pub valid: bool,

    /// Base SPIFFE ID for the attested node
    pub base_spiffe_id: String,
}

/// Payload sent by the Istio node agent.
///
/// Both fields are required. `token` may carry a `Bearer ` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedData {
    /// Kubernetes service account token
    pub token: String,

    /// Trust domain of the issued identity, used verbatim
    #[serde(rename = "trustDomain")]
    pub trust_domain: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attested_data_uses_camel_case_trust_domain() {
        let data: AttestedData =
            serde_json::from_str(r#"{"token":"Bearer abc","trustDomain":"example.org"}"#).unwrap();
        assert_eq!(data.token, "Bearer abc");
        assert_eq!(data.trust_domain, "example.org");
    }

    #[test]
    fn attested_data_requires_both_fields() {
        assert!(serde_json::from_str::<AttestedData>(r#"{"token":"abc"}"#).is_err());
        assert!(serde_json::from_str::<AttestedData>(r#"{"trustDomain":"example.org"}"#).is_err());
    }
}
