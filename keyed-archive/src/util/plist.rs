/*!
 Checked accessors for fields of archived objects.

 Every archived object is a [`Dictionary`] in the `$objects` table. These helpers read a single
 field and fail with [`DecodeError::TypeMismatch`] when the field is missing or holds the wrong
 kind of data.
*/

use plist::{Dictionary, Integer, Uid, Value};

use crate::error::decode::DecodeError;

/// Read a reference to another object
pub fn extract_uid_key(payload: &Dictionary, key: &str) -> Result<Uid, DecodeError> {
    match payload.get(key) {
        Some(Value::Uid(uid)) => Ok(*uid),
        _ => Err(DecodeError::mismatch(key, "uid")),
    }
}

/// Read an array in which every item is a reference to another object
pub fn extract_uid_array(payload: &Dictionary, key: &str) -> Result<Vec<Uid>, DecodeError> {
    extract_array_key(payload, key)?
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Uid(uid) => Ok(*uid),
            _ => Err(DecodeError::mismatch(format!("{key}[{idx}]"), "uid")),
        })
        .collect()
}

/// Read an array in which every item is a string
pub fn extract_string_array(payload: &Dictionary, key: &str) -> Result<Vec<String>, DecodeError> {
    extract_array_key(payload, key)?
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_string()
                .map(String::from)
                .ok_or_else(|| DecodeError::mismatch(format!("{key}[{idx}]"), "string"))
        })
        .collect()
}

/// Read an array of arbitrary values
pub fn extract_array_key<'a>(
    payload: &'a Dictionary,
    key: &str,
) -> Result<&'a Vec<Value>, DecodeError> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::mismatch(key, "array"))
}

/// Read a nested dictionary
pub fn extract_dictionary<'a>(
    payload: &'a Dictionary,
    key: &str,
) -> Result<&'a Dictionary, DecodeError> {
    payload
        .get(key)
        .and_then(Value::as_dictionary)
        .ok_or_else(|| DecodeError::mismatch(key, "dictionary"))
}

/// Read a string
pub fn extract_string_key<'a>(payload: &'a Dictionary, key: &str) -> Result<&'a str, DecodeError> {
    payload
        .get(key)
        .and_then(Value::as_string)
        .ok_or_else(|| DecodeError::mismatch(key, "string"))
}

/// Read raw bytes
pub fn extract_bytes_key<'a>(payload: &'a Dictionary, key: &str) -> Result<&'a [u8], DecodeError> {
    payload
        .get(key)
        .and_then(Value::as_data)
        .ok_or_else(|| DecodeError::mismatch(key, "data"))
}

/// Read an integer of any width
pub fn extract_int_key(payload: &Dictionary, key: &str) -> Result<Integer, DecodeError> {
    match payload.get(key) {
        Some(Value::Integer(int)) => Ok(*int),
        _ => Err(DecodeError::mismatch(key, "integer")),
    }
}

/// Read a double-precision float
pub fn extract_real_key(payload: &Dictionary, key: &str) -> Result<f64, DecodeError> {
    payload
        .get(key)
        .and_then(Value::as_real)
        .ok_or_else(|| DecodeError::mismatch(key, "real"))
}

#[cfg(test)]
mod tests {
    use plist::{Dictionary, Uid, Value};

    use crate::{
        error::decode::DecodeError,
        util::plist::{extract_real_key, extract_string_array, extract_uid_array, extract_uid_key},
    };

    fn payload() -> Dictionary {
        let mut payload = Dictionary::new();
        payload.insert("$class".to_string(), Value::Uid(Uid::new(3)));
        payload.insert(
            "NS.objects".to_string(),
            Value::Array(vec![Value::Uid(Uid::new(4)), Value::Uid(Uid::new(5))]),
        );
        payload.insert(
            "$classes".to_string(),
            Value::Array(vec![Value::from("NSArray"), Value::from("NSObject")]),
        );
        payload.insert("NS.time".to_string(), Value::Real(1.5));
        payload
    }

    #[test]
    fn can_extract_uid() {
        assert_eq!(extract_uid_key(&payload(), "$class").unwrap(), Uid::new(3));
    }

    #[test]
    fn can_extract_uid_array() {
        assert_eq!(
            extract_uid_array(&payload(), "NS.objects").unwrap(),
            vec![Uid::new(4), Uid::new(5)]
        );
    }

    #[test]
    fn can_extract_string_array() {
        assert_eq!(
            extract_string_array(&payload(), "$classes").unwrap(),
            vec!["NSArray".to_string(), "NSObject".to_string()]
        );
    }

    #[test]
    fn can_extract_real() {
        assert_eq!(extract_real_key(&payload(), "NS.time").unwrap(), 1.5);
    }

    #[test]
    fn cant_extract_wrong_kind() {
        let result = extract_uid_array(&payload(), "$classes");
        assert!(matches!(result, Err(DecodeError::TypeMismatch(field, _)) if field == "$classes[0]"));

        let result = extract_real_key(&payload(), "$class");
        assert!(matches!(result, Err(DecodeError::TypeMismatch(field, _)) if field == "$class"));
    }

    #[test]
    fn cant_extract_missing() {
        let result = extract_uid_key(&payload(), "NS.keys");
        assert!(matches!(result, Err(DecodeError::TypeMismatch(field, kind)) if field == "NS.keys" && kind == "uid"));
    }
}
