//! # Presentation Exchange
//!
//! The subset of [DIF Presentation Exchange] used to tell a Wallet which
//! credential to present, and to read back how the Wallet satisfied the
//! request.
//!
//! [DIF Presentation Exchange]: https://identity.foundation/presentation-exchange/spec/v2.0.0

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A Presentation Definition is used by a Verifier to articulate proofs
/// required. The proofs help the Verifier decide how to interact with the
/// Holder providing the proofs.
///
/// <https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-definition>
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PresentationDefinition {
    /// A unique ID for the desired context.
    pub id: String,

    /// Input Descriptors describe the information a Verifier requires from the
    /// Holder.
    pub input_descriptors: Vec<InputDescriptor>,

    /// If present, a human-friendly, distinctive designation for the
    /// Presentation Definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// If present, it MUST describe the purpose for which the Presentation
    /// Definition is being used for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// Claim formats the Verifier can process, keyed by format designation
    /// (`jwt_vp`, `ldp_vp`, etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<HashMap<String, ClaimFormat>>,
}

impl PresentationDefinition {
    /// Build a definition requesting a single credential of type
    /// `credential_type`, presented either as a JWT or as a Linked Data VP.
    #[must_use]
    pub fn for_credential(id: impl Into<String>, credential_type: &str) -> Self {
        let field = Field {
            path: vec!["$.type".to_string(), "$.vc.type".to_string()],
            filter: Some(Filter {
                type_: "string".to_string(),
                value: FilterValue::Pattern(credential_type.to_string()),
            }),
            ..Field::default()
        };

        Self {
            id: id.into(),
            input_descriptors: vec![InputDescriptor {
                id: format!("{}-descriptor", credential_type.to_lowercase()),
                name: None,
                purpose: Some("Identify the signer of the document".to_string()),
                format: None,
                constraints: Constraints {
                    fields: Some(vec![field]),
                    limit_disclosure: None,
                },
            }],
            name: None,
            purpose: Some("Sign a document".to_string()),
            format: Some(HashMap::from([
                ("jwt_vp".to_string(), ClaimFormat::alg(&["EdDSA", "ES256", "ES256K"])),
                ("ldp_vp".to_string(), ClaimFormat {
                    alg: None,
                    proof_type: Some(vec!["Ed25519Signature2020".to_string()]),
                }),
            ])),
        }
    }
}

/// Input Descriptors describe the information a Verifier requires from the
/// Holder. All Input Descriptors MUST be satisfied, unless otherwise specified.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InputDescriptor {
    /// An identifier that does not conflict with the id of any other Input
    /// Descriptor in the same Presentation Definition.
    pub id: String,

    /// If set, it SHOULD be a human-friendly name that describes what the
    /// target schema represents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// If present, its value MUST describe the purpose for which the Claim's
    /// data is being requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// Constrains submission of this input to a subset of the top-level
    /// formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<HashMap<String, ClaimFormat>>,

    /// Contraints specify constraints on data values, and an explanation why a
    /// certain item or set of data is being requested.
    pub constraints: Constraints,
}

/// A registered Claim Format Designation object used to inform the Holder of
/// a Claim format the Verifier can process.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClaimFormat {
    /// An array of one or more algorithmic identifiers, e.g. `["EdDSA",
    /// "ES256K"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<Vec<String>>,

    /// An array of one or more proof type identifiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_type: Option<Vec<String>>,
}

impl ClaimFormat {
    fn alg(algs: &[&str]) -> Self {
        Self {
            alg: Some(algs.iter().map(ToString::to_string).collect()),
            proof_type: None,
        }
    }
}

/// Contraints specify constraints on data values, and an explanation why a
/// certain item or set of data is being requested.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Constraints {
    /// Fields are used to specify attributes of credential data the Verifier
    /// requires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,

    /// If present, one of "required" or "preferred".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_disclosure: Option<String>,
}

/// Fields are used to specify attributes of credential data the Verifier
/// requires.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Field {
    /// If present, it MUST be unique from every other field object’s id
    /// property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// One or more `JSONPath` expressions that select a target value from the
    /// input, evaluated in order.
    pub path: Vec<String>,

    /// If present, a JSON Schema descriptor used to filter against the
    /// values returned from evaluation of the `JSONPath` expressions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    /// If present, its MUST describe the purpose for which the field is being
    /// requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// If present, indicates whether the field is optional. Defaults to
    /// false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// A JSON Schema descriptor used to filter against the values returned from evaluation
/// of the `JSONPath` expressions in the path array.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    /// The type of filter to apply.
    #[serde(rename = "type")]
    pub type_: String,

    /// The value of the filter to apply.
    #[serde(flatten)]
    pub value: FilterValue,
}

/// `FilterValue` represents the type and value of a `JSONPath` filter.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterValue {
    /// The value of the filter is a constant.
    Const(String),

    /// The value of the filter is a regular expression.
    Pattern(String),
}

impl Default for FilterValue {
    fn default() -> Self {
        Self::Const(String::new())
    }
}

/// A Presentation Submission expresses how proofs presented to the Verifier
/// satisfy the Presentation Definition.
///
/// <https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission>
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PresentationSubmission {
    /// The `id` MUST be a unique identifier, such as a UUID.
    pub id: String,

    /// The value of this property MUST be the id value of the Presentation
    /// Definition this submission fulfills.
    pub definition_id: String,

    /// An array of Input Descriptor Mapping Objects.
    pub descriptor_map: Vec<DescriptorMap>,
}

/// An Input Descriptor Mapping Object is used to map an Input Descriptor to a
/// Verifiable Credential or a JSON Web Token.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DescriptorMap {
    /// MUST match the Input Descriptor id in the Presentation Definition.
    pub id: String,

    /// Denotes the data format of the Claim.
    pub format: String,

    /// A `JSONPath` string expression that indicates the Claim submitted.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_json() {
        let def = PresentationDefinition::for_credential("def-1", "SwissEID");
        let json = serde_json::to_value(&def).expect("should serialize");

        assert_eq!(json["id"], "def-1");
        let descriptor = &json["input_descriptors"][0];
        assert_eq!(descriptor["id"], "swisseid-descriptor");
        insta::assert_json_snapshot!(descriptor["constraints"], @r#"
        {
          "fields": [
            {
              "filter": {
                "pattern": "SwissEID",
                "type": "string"
              },
              "path": [
                "$.type",
                "$.vc.type"
              ]
            }
          ]
        }
        "#);
        assert_eq!(json["format"]["jwt_vp"]["alg"][0], "EdDSA");
    }
}
