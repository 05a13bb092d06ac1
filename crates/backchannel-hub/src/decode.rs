//! Typed decoding of reply payloads.
//!
//! Clients in the wild disagree about casing, so structural decode here
//! matches struct fields case-insensitively. serde matches field names
//! exactly, so [`from_value_ci`] runs the target type against a
//! deserializer adapter that re-keys JSON maps using the struct's static
//! field list, recursively. Payloads may also arrive as a JSON string
//! that itself embeds JSON, or as a bare scalar.

use serde::de::value::StringDeserializer;
use serde::de::{DeserializeOwned, DeserializeSeed, Error as _, MapAccess, SeqAccess, Visitor};
use serde::Deserializer;
use serde_json::{Map, Value};

use crate::error::{HubError, Result};

/// Decode a reply payload into `T`.
///
/// Accepts the payload already structured, as a JSON string embedding
/// JSON, or as a scalar.
///
/// # Errors
///
/// Returns `HubError::Decode` when the payload does not match `T` under
/// case-insensitive field matching.
pub fn decode_payload<T: DeserializeOwned>(payload: Value) -> Result<T> {
    match from_value_ci(payload.clone()) {
        Ok(decoded) => Ok(decoded),
        Err(direct_err) => {
            // A string payload may be JSON encoded one level deeper.
            if let Value::String(text) = &payload {
                if let Ok(embedded) = serde_json::from_str::<Value>(text) {
                    return from_value_ci(embedded)
                        .map_err(|e| HubError::Decode(e.to_string()));
                }
            }
            Err(HubError::Decode(direct_err.to_string()))
        }
    }
}

/// Deserialize `T` from a JSON value with case-insensitive struct field
/// matching.
///
/// # Errors
///
/// Returns the underlying serde error when the value does not match `T`.
pub fn from_value_ci<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    T::deserialize(CiValue(value))
}

/// A `Deserializer` over `serde_json::Value` that re-keys maps against
/// the target struct's known field names.
struct CiValue(Value);

impl<'de> Deserializer<'de> for CiValue {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> serde_json::Result<V::Value> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(CiMap::new(map, &[])),
            Value::Array(items) => visitor.visit_seq(CiSeq::new(items)),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> serde_json::Result<V::Value> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(CiMap::new(map, fields)),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> serde_json::Result<V::Value> {
        if self.0.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> serde_json::Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> serde_json::Result<V::Value> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

struct CiMap {
    entries: serde_json::map::IntoIter,
    fields: &'static [&'static str],
    value: Option<Value>,
}

impl CiMap {
    fn new(map: Map<String, Value>, fields: &'static [&'static str]) -> Self {
        Self {
            entries: map.into_iter(),
            fields,
            value: None,
        }
    }

    /// Rewrite a wire key to the struct's spelling when it matches a
    /// known field case-insensitively. Exact matches always win.
    fn canonical(&self, key: String) -> String {
        if self.fields.is_empty() || self.fields.contains(&key.as_str()) {
            return key;
        }
        self.fields
            .iter()
            .find(|field| field.eq_ignore_ascii_case(&key))
            .map_or(key, |field| (*field).to_string())
    }
}

impl<'de> MapAccess<'de> for CiMap {
    type Error = serde_json::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> serde_json::Result<Option<K::Value>> {
        match self.entries.next() {
            Some((key, value)) => {
                self.value = Some(value);
                let key = self.canonical(key);
                seed.deserialize(StringDeserializer::new(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> serde_json::Result<V::Value> {
        let value = self
            .value
            .take()
            .ok_or_else(|| serde_json::Error::custom("value requested before key"))?;
        seed.deserialize(CiValue(value))
    }

    fn size_hint(&self) -> Option<usize> {
        self.entries.size_hint().1
    }
}

struct CiSeq {
    items: std::vec::IntoIter<Value>,
}

impl CiSeq {
    fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<'de> SeqAccess<'de> for CiSeq {
    type Error = serde_json::Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> serde_json::Result<Option<T::Value>> {
        match self.items.next() {
            Some(value) => seed.deserialize(CiValue(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        self.items.size_hint().1
    }
}
