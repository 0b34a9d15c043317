//! Ordered claim sets carried inside access tokens.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Unique token identifier.
pub const JTI: &str = "jti";
/// Identifier of the authenticated principal.
pub const UNIQUE_NAME: &str = "unique_name";
/// Deployment-defined informational payload.
pub const INFO: &str = "info";
/// Marker set on every successfully issued token.
pub const SUCCESS: &str = "success";
/// Tag naming the system that issued the token.
pub const TOKEN_IDP: &str = "token_idp";
pub const NOT_BEFORE: &str = "nbf";
pub const EXPIRES: &str = "exp";
pub const ISSUED_AT: &str = "iat";
pub const ISSUER: &str = "iss";
pub const AUDIENCE: &str = "aud";

/// Type tag of a claim value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimValueType {
    String,
    Boolean,
    Integer,
    Json,
}

impl ClaimValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimValueType::String => "string",
            ClaimValueType::Boolean => "boolean",
            ClaimValueType::Integer => "integer",
            ClaimValueType::Json => "json",
        }
    }
}

/// A single claim value.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Json(Value),
}

impl ClaimValue {
    pub fn value_type(&self) -> ClaimValueType {
        match self {
            ClaimValue::String(_) => ClaimValueType::String,
            ClaimValue::Boolean(_) => ClaimValueType::Boolean,
            ClaimValue::Integer(_) => ClaimValueType::Integer,
            ClaimValue::Json(_) => ClaimValueType::Json,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ClaimValue::String(s) => Value::String(s.clone()),
            ClaimValue::Boolean(b) => Value::Bool(*b),
            ClaimValue::Integer(n) => Value::from(*n),
            ClaimValue::Json(v) => v.clone(),
        }
    }

    fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => ClaimValue::String(s),
            Value::Bool(b) => ClaimValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ClaimValue::Integer(i),
                None => ClaimValue::Json(Value::Number(n)),
            },
            other => ClaimValue::Json(other),
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        ClaimValue::String(s.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(s: String) -> Self {
        ClaimValue::String(s)
    }
}

impl From<bool> for ClaimValue {
    fn from(b: bool) -> Self {
        ClaimValue::Boolean(b)
    }
}

impl From<i64> for ClaimValue {
    fn from(n: i64) -> Self {
        ClaimValue::Integer(n)
    }
}

/// A named claim.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub name: String,
    pub value: ClaimValue,
}

/// Claims in attachment order.
///
/// Names are unique: pushing an existing name replaces the value in place,
/// matching how a JSON object payload can only hold one value per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet {
    claims: Vec<Claim>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a claim, keeping the position of an existing claim with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<ClaimValue>) {
        let name = name.into();
        let value = value.into();
        match self.claims.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.value = value,
            None => self.claims.push(Claim { name, value }),
        }
    }

    /// Builder-style variant of [`ClaimSet::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.claims.iter().find(|c| c.name == name).map(|c| &c.value)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ClaimValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(ClaimValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(ClaimValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.claims.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl Serialize for ClaimSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.claims.len()))?;
        for claim in &self.claims {
            map.serialize_entry(&claim.name, &claim.value.to_json())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ClaimSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ClaimSetVisitor;

        impl<'de> Visitor<'de> for ClaimSetVisitor {
            type Value = ClaimSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object of claims")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ClaimSet, A::Error> {
                let mut set = ClaimSet::new();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    set.push(name, ClaimValue::from_json(value));
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(ClaimSetVisitor)
    }
}

/// Rewrite every object key of a serialized value to camelCase.
pub fn camel_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (camel_case(&k), camel_case_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(camel_case_keys).collect()),
        other => other,
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for segment in key.split('_').filter(|s| !s.is_empty()) {
        let mut chars = segment.chars();
        let Some(first) = chars.next() else { continue };
        if out.is_empty() {
            // Lowercase a leading run of capitals: "ID" -> "id", "URLPath" -> "urlPath".
            let rest: Vec<char> = chars.collect();
            out.extend(first.to_lowercase());
            let mut i = 0;
            while i < rest.len()
                && rest[i].is_uppercase()
                && rest.get(i + 1).map_or(true, |c| c.is_uppercase())
            {
                out.extend(rest[i].to_lowercase());
                i += 1;
            }
            out.extend(&rest[i..]);
        } else {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claims_serialize_in_attachment_order() {
        let claims = ClaimSet::new()
            .with(JTI, "abc")
            .with(UNIQUE_NAME, "alice")
            .with(SUCCESS, true)
            .with(EXPIRES, 1_700_000_000i64);

        let json = serde_json::to_string(&claims).unwrap();
        assert_eq!(
            json,
            r#"{"jti":"abc","unique_name":"alice","success":true,"exp":1700000000}"#
        );
    }

    #[test]
    fn test_deserialize_keeps_order_and_types() {
        let raw = r#"{"token_idp":"x","info":{"a":1},"success":true,"nbf":5}"#;
        let claims: ClaimSet = serde_json::from_str(raw).unwrap();

        assert_eq!(claims.names(), vec!["token_idp", "info", "success", "nbf"]);
        assert_eq!(claims.get(INFO).unwrap().value_type(), ClaimValueType::Json);
        assert_eq!(claims.get_bool(SUCCESS), Some(true));
        assert_eq!(claims.get_i64(NOT_BEFORE), Some(5));
        assert_eq!(claims.get_str(TOKEN_IDP), Some("x"));
    }

    #[test]
    fn test_push_replaces_in_place() {
        let mut claims = ClaimSet::new().with("a", "1").with("b", "2");
        claims.push("a", "3");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims.names(), vec!["a", "b"]);
        assert_eq!(claims.get_str("a"), Some("3"));
    }

    #[test]
    fn test_camel_case_keys() {
        let value = json!({
            "service_name": "svc",
            "Version": "1.0",
            "ID": 7,
            "nested": [{ "max_items": 3 }],
            "already": true
        });
        let converted = camel_case_keys(value);
        assert_eq!(
            converted,
            json!({
                "serviceName": "svc",
                "version": "1.0",
                "id": 7,
                "nested": [{ "maxItems": 3 }],
                "already": true
            })
        );
    }
}
