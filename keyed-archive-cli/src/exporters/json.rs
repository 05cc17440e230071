use base64::{prelude::BASE64_STANDARD, Engine};
use json::{object, object::Object, JsonValue};

use keyed_archive::util::keyed_archive::models::{Archivable, Dictionary};

use crate::{
    app::error::RuntimeError,
    exporters::exporter::{Reader, Writer},
};

/// Largest integer an `f64` holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.;

/// Renders values as JSON and reads JSON documents back into values
pub struct JSON {
    /// Spaces used to indent pretty printed output
    pub spaces: u16,
}

impl Default for JSON {
    fn default() -> Self {
        Self { spaces: 4 }
    }
}

impl Writer for JSON {
    fn format_value(&self, value: &Archivable) -> String {
        to_json(value).pretty(self.spaces)
    }
}

impl Reader for JSON {
    fn parse_value(&self, text: &str) -> Result<Archivable, RuntimeError> {
        let document = json::parse(text).map_err(RuntimeError::InvalidJson)?;
        from_json(&document)
    }
}

/// Convert a value to JSON; byte buffers become base64 and dates become RFC 3339 strings
pub fn to_json(value: &Archivable) -> JsonValue {
    match value {
        Archivable::Dictionary(dict) => {
            let mut object = Object::with_capacity(dict.len());
            for (key, item) in dict.iter() {
                object.insert(&json_key(key), to_json(item));
            }
            JsonValue::Object(object)
        }
        Archivable::Array(items) => JsonValue::Array(items.iter().map(to_json).collect()),
        Archivable::Set(set) => JsonValue::Array(set.iter().map(to_json).collect()),
        Archivable::Data(bytes) => BASE64_STANDARD.encode(bytes).into(),
        Archivable::Date(date) => date.to_rfc3339().into(),
        Archivable::Error(error) => object! {
            code: error.code,
            domain: error.domain.as_str(),
            user_info: to_json(&error.user_info),
        },
        Archivable::TapMessage(message) => to_json(message.payload()),
        Archivable::String(text) => text.as_str().into(),
        Archivable::Integer(_) => match value.as_signed_integer() {
            Some(int) => int.into(),
            None => value.as_unsigned_integer().map_or(JsonValue::Null, JsonValue::from),
        },
        Archivable::Boolean(flag) => (*flag).into(),
        Archivable::Real(real) => (*real).into(),
        Archivable::Null => JsonValue::Null,
    }
}

/// JSON object keys are strings; other keys are written as compact JSON
fn json_key(key: &Archivable) -> String {
    match key {
        Archivable::String(text) => text.clone(),
        other => to_json(other).dump(),
    }
}

/// Convert a JSON document to a value.
///
/// Numbers with a fractional part become [`Archivable::Real`] and `null` becomes
/// [`Archivable::Null`]; the encoder rejects both.
pub fn from_json(value: &JsonValue) -> Result<Archivable, RuntimeError> {
    match value {
        JsonValue::Null => Ok(Archivable::Null),
        JsonValue::Short(text) => Ok(text.as_str().into()),
        JsonValue::String(text) => Ok(text.as_str().into()),
        JsonValue::Boolean(flag) => Ok((*flag).into()),
        JsonValue::Number(_) => number_from_json(value),
        JsonValue::Array(items) => items
            .iter()
            .map(from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Archivable::Array),
        JsonValue::Object(object) => object
            .iter()
            .map(|(key, item)| Ok((Archivable::from(key), from_json(item)?)))
            .collect::<Result<Dictionary, _>>()
            .map(Archivable::Dictionary),
    }
}

fn number_from_json(value: &JsonValue) -> Result<Archivable, RuntimeError> {
    let real = value
        .as_f64()
        .filter(|real| real.is_finite())
        .ok_or_else(|| RuntimeError::UnsupportedJson(value.dump()))?;
    if real.fract() != 0. {
        return Ok(Archivable::Real(real));
    }

    value
        .as_i64()
        .map(Archivable::from)
        .or_else(|| value.as_u64().map(Archivable::from))
        .or_else(|| (real.abs() <= MAX_SAFE_INTEGER).then(|| Archivable::from(real as i64)))
        .ok_or_else(|| RuntimeError::UnsupportedJson(value.dump()))
}

#[cfg(test)]
mod tests {
    use json::JsonValue;
    use keyed_archive::{
        message_types::ns_error::ArchivedError,
        util::{
            dates::reference_epoch,
            keyed_archive::models::{Archivable, Dictionary},
        },
    };

    use crate::{
        app::error::RuntimeError,
        exporters::{
            exporter::{Reader, Writer},
            json::{to_json, JSON},
        },
    };

    #[test]
    fn can_parse_document() {
        let value = JSON::default()
            .parse_value(r#"{"code": 1, "domain": "com.example", "info": [1, 2, 3]}"#)
            .unwrap();

        let mut expected = Dictionary::new();
        expected.insert("code".into(), 1.into());
        expected.insert("domain".into(), "com.example".into());
        expected.insert(
            "info".into(),
            Archivable::Array(vec![1.into(), 2.into(), 3.into()]),
        );
        assert_eq!(value, Archivable::from(expected));
    }

    #[test]
    fn can_parse_numbers() {
        let exporter = JSON::default();
        assert_eq!(exporter.parse_value("-7").unwrap(), Archivable::from(-7));
        assert_eq!(
            exporter.parse_value("18446744073709551615").unwrap(),
            Archivable::from(u64::MAX)
        );
        assert_eq!(exporter.parse_value("1.5").unwrap(), Archivable::Real(1.5));
    }

    #[test]
    fn can_parse_null() {
        assert!(JSON::default().parse_value("null").unwrap().is_null());
    }

    #[test]
    fn cant_parse_invalid() {
        let result = JSON::default().parse_value("{\"code\": ");
        assert!(matches!(result, Err(RuntimeError::InvalidJson(_))));
    }

    #[test]
    fn can_write_data_and_dates() {
        let value = Archivable::Array(vec![
            vec![0xdeu8, 0xad, 0xbe, 0xef].into(),
            reference_epoch().into(),
        ]);

        assert_eq!(
            to_json(&value),
            json::array!["3q2+7w==", "2001-01-01T00:00:00+00:00"]
        );
    }

    #[test]
    fn can_write_non_string_keys() {
        let mut dict = Dictionary::new();
        dict.insert(1.into(), "launchd".into());

        assert_eq!(to_json(&dict.into()), json::object! { "1": "launchd" });
    }

    #[test]
    fn can_write_error() {
        let mut info = Dictionary::new();
        info.insert("NSLocalizedDescription".into(), "Denied".into());
        let error = ArchivedError::new(4, "DTXMessage", info.into());

        let expected = json::object! {
            code: 4,
            domain: "DTXMessage",
            user_info: { NSLocalizedDescription: "Denied" },
        };
        assert_eq!(to_json(&error.into()), expected);
    }

    #[test]
    fn can_write_pretty() {
        let mut dict = Dictionary::new();
        dict.insert("pid".into(), 1.into());

        let exporter = JSON { spaces: 2 };
        assert_eq!(exporter.format_value(&dict.into()), "{\n  \"pid\": 1\n}");
    }

    #[test]
    fn can_write_null() {
        assert_eq!(to_json(&Archivable::Null), JsonValue::Null);
    }
}
