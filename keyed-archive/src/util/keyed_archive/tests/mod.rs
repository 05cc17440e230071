use std::{env::current_dir, fs::File, io::Read};

use plist::{Dictionary as PlistDictionary, Uid, Value};


/// Read an archive from `test_data/archives`
fn read_archive(name: &str) -> Vec<u8> {
    let archive_path = current_dir()
        .unwrap()
        .as_path()
        .join("test_data/archives")
        .join(name);
    let mut file = File::open(archive_path).unwrap();
    let mut bytes = vec![];
    file.read_to_end(&mut bytes).unwrap();
    bytes
}

/// Wrap a hand-built objects table in an archive root
fn build_archive(objects: Vec<Value>, root: u64) -> Value {
    let mut top = PlistDictionary::new();
    top.insert("root".to_string(), Value::Uid(Uid::new(root)));

    let mut archive = PlistDictionary::new();
    archive.insert("$archiver".to_string(), Value::from("NSKeyedArchiver"));
    archive.insert("$objects".to_string(), Value::Array(objects));
    archive.insert("$top".to_string(), Value::Dictionary(top));
    archive.insert("$version".to_string(), Value::Integer(100_000.into()));
    Value::Dictionary(archive)
}

/// A class descriptor object
fn class(classes: &[&str]) -> Value {
    let mut payload = PlistDictionary::new();
    payload.insert(
        "$classes".to_string(),
        Value::Array(classes.iter().map(|name| Value::from(*name)).collect()),
    );
    payload.insert("$classname".to_string(), Value::from(classes[0]));
    Value::Dictionary(payload)
}

/// An object of the given class with the given fields
fn instance(class: u64, fields: Vec<(&str, Value)>) -> Value {
    let mut payload = PlistDictionary::new();
    payload.insert("$class".to_string(), Value::Uid(Uid::new(class)));
    fields.into_iter().for_each(|(key, value)| {
        payload.insert(key.to_string(), value);
    });
    Value::Dictionary(payload)
}

/// An array of references
fn uids(indexes: &[u64]) -> Value {
    Value::Array(indexes.iter().copied().map(uid).collect())
}

/// A single reference
fn uid(idx: u64) -> Value {
    Value::Uid(Uid::new(idx))
}
