/*!
 Rebuilds [`Archivable`] data from `NSKeyedArchiver` archives.

 The archive is a flat `$objects` table in which composite objects refer to each other by index.
 Decoding starts at `$top.root` and follows those references, dispatching on the class of each
 composite object.
*/

use std::{io::Cursor, time::SystemTime};

use chrono::DateTime;
use plist::{Dictionary as PlistDictionary, Uid, Value};

use crate::{
    error::decode::DecodeError,
    message_types::{ns_error::ArchivedError, tap::TapMessage},
    util::{
        dates::from_reference_seconds,
        keyed_archive::{
            archiver::{ArchiveOptions, KeyedArchiver, ARCHIVER, ARCHIVER_VERSION},
            classes::{ClassKind, ClassRegistry},
            models::{Archivable, ArchiveNode, ClassDescriptor, Dictionary, Leaf, Set},
        },
        plist::{extract_array_key, extract_dictionary, extract_uid_key},
    },
};

impl KeyedArchiver {
    /// Decode a binary or XML property list keyed archive
    pub fn decode(&self, bytes: &[u8]) -> Result<Archivable, DecodeError> {
        let root =
            Value::from_reader(Cursor::new(bytes)).map_err(DecodeError::MalformedArchive)?;
        self.unarchive(&root)
    }

    /// Decode an archive root that has already been parsed
    pub fn unarchive(&self, root: &Value) -> Result<Archivable, DecodeError> {
        let archive = root
            .as_dictionary()
            .ok_or_else(|| DecodeError::mismatch("archive", "dictionary"))?;
        check_header(archive);

        let objects = extract_array_key(archive, "$objects")?;
        let top = extract_uid_key(extract_dictionary(archive, "$top")?, "root")?;

        let mut table = ObjectTable::new(objects, self.options);
        let result = table.resolve(top);
        tracing::debug!(
            "Unarchived {} objects into {} values",
            objects.len(),
            table.produced
        );
        result
    }
}

/// Archives from other producers may differ here; decoding continues either way
fn check_header(archive: &PlistDictionary) {
    match archive.get("$archiver").and_then(Value::as_string) {
        Some(ARCHIVER) => {}
        other => tracing::warn!("Unexpected archiver {other:?}, expected {ARCHIVER}"),
    }
    match archive.get("$version").and_then(Value::as_unsigned_integer) {
        Some(ARCHIVER_VERSION) => {}
        other => {
            tracing::warn!("Unexpected archive version {other:?}, expected {ARCHIVER_VERSION}")
        }
    }
}

/// The objects of a single archive, along with the state needed to walk them safely
#[derive(Debug)]
struct ObjectTable<'a> {
    /// The `$objects` array; a [`Uid`] is an index into it
    objects: &'a [Value],
    registry: ClassRegistry,
    /// Objects currently being resolved, used to detect reference cycles
    resolving: Vec<bool>,
    /// Objects referenced from more than one place
    shared: Vec<bool>,
    /// Resolved shared objects and the number of values each one expands to
    resolved: Vec<Option<(Archivable, usize)>>,
    /// How many objects deep the current resolution is
    depth: usize,
    max_depth: usize,
    /// How many values have been produced so far, counting every copy of a shared object
    produced: usize,
    max_objects: usize,
}

impl<'a> ObjectTable<'a> {
    fn new(objects: &'a [Value], options: ArchiveOptions) -> Self {
        Self {
            objects,
            registry: options.registry,
            resolving: vec![false; objects.len()],
            shared: count_references(objects)
                .into_iter()
                .map(|count| count > 1)
                .collect(),
            resolved: vec![None; objects.len()],
            depth: 0,
            max_depth: options.max_depth,
            produced: 0,
            max_objects: options.max_objects,
        }
    }

    /// Get the object a reference points to
    fn get(&self, uid: Uid) -> Result<(usize, &'a Value), DecodeError> {
        let idx = usize::try_from(uid.get())
            .map_err(|_| DecodeError::MalformedRoot(usize::MAX, self.objects.len()))?;
        let objects = self.objects;
        objects
            .get(idx)
            .map(|object| (idx, object))
            .ok_or(DecodeError::MalformedRoot(idx, objects.len()))
    }

    /// Build the native value for the object a reference points to
    fn resolve(&mut self, uid: Uid) -> Result<Archivable, DecodeError> {
        let (idx, object) = self.get(uid)?;
        if let Some((value, weight)) = &self.resolved[idx] {
            self.produced = self.produced.saturating_add(*weight);
            if self.produced > self.max_objects {
                return Err(DecodeError::ObjectLimitExceeded(self.max_objects));
            }
            return Ok(value.clone());
        }
        if self.resolving[idx] {
            return Err(DecodeError::CyclicReference(idx));
        }
        if self.depth >= self.max_depth {
            return Err(DecodeError::DepthExceeded(self.max_depth));
        }

        let before = self.produced;
        self.resolving[idx] = true;
        self.depth += 1;
        let result = self.resolve_object(idx, object);
        self.depth -= 1;
        self.resolving[idx] = false;
        let value = result?;

        self.produced = self.produced.saturating_add(1);
        if self.produced > self.max_objects {
            return Err(DecodeError::ObjectLimitExceeded(self.max_objects));
        }
        if self.shared[idx] {
            self.resolved[idx] = Some((value.clone(), self.produced - before));
        }
        Ok(value)
    }

    fn resolve_object(&mut self, idx: usize, object: &'a Value) -> Result<Archivable, DecodeError> {
        match object {
            Value::Dictionary(payload) => self.resolve_instance(idx, payload),
            Value::Data(bytes) => Ok(Archivable::Data(bytes.clone())),
            Value::Date(date) => Ok(Archivable::Date(DateTime::from(SystemTime::from(*date)))),
            other => Leaf::from_plist(other, idx).map(Archivable::from),
        }
    }

    /// Resolve an object that has a `$class`
    fn resolve_instance(
        &mut self,
        idx: usize,
        payload: &'a PlistDictionary,
    ) -> Result<Archivable, DecodeError> {
        if payload.contains_key("$classes") {
            return Err(DecodeError::mismatch(
                format!("$objects[{idx}]"),
                "instance, found class descriptor",
            ));
        }

        let class = extract_uid_key(payload, "$class")?;
        let descriptor = self.class_descriptor(class)?;
        let name = descriptor
            .most_derived()
            .ok_or_else(|| DecodeError::mismatch("$classes", "non-empty array"))?;
        let entry = self
            .registry
            .lookup(name)
            .ok_or_else(|| DecodeError::UnknownClass(name.to_string()))?;
        tracing::trace!("Object {idx} is {name}, read as {:?}", entry.kind);

        match ArchiveNode::from_instance(entry.kind, class, payload)? {
            ArchiveNode::Dictionary { keys, values, .. } => {
                let mut dict = Dictionary::with_capacity(keys.len());
                for (key, value) in keys.into_iter().zip(values) {
                    let key = self.resolve(key)?;
                    let value = self.resolve(value)?;
                    dict.insert(key, value);
                }
                Ok(Archivable::Dictionary(dict))
            }
            ArchiveNode::Sequence { values, .. } if entry.kind == ClassKind::Set => {
                let mut set = Set::new();
                for item in values {
                    set.insert(self.resolve(item)?);
                }
                Ok(Archivable::Set(set))
            }
            ArchiveNode::Sequence { values, .. } => values
                .into_iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Archivable::Array),
            ArchiveNode::Data { bytes, .. } => Ok(Archivable::Data(bytes)),
            ArchiveNode::Date { time, .. } => from_reference_seconds(time)
                .map(Archivable::Date)
                .ok_or_else(|| DecodeError::mismatch("NS.time", "timestamp")),
            ArchiveNode::Error {
                code,
                domain,
                user_info,
                ..
            } => {
                let code = code
                    .as_signed()
                    .ok_or_else(|| DecodeError::mismatch("NSCode", "signed integer"))?;
                let domain = match self.resolve(domain)? {
                    Archivable::String(domain) => domain,
                    _ => return Err(DecodeError::mismatch("NSDomain", "string")),
                };
                let user_info = self.resolve(user_info)?;
                Ok(Archivable::Error(ArchivedError::new(code, domain, user_info)))
            }
            ArchiveNode::TapMessage { payload, .. } => {
                Ok(Archivable::TapMessage(TapMessage::new(self.resolve(payload)?)))
            }
            ArchiveNode::Class(_) | ArchiveNode::Leaf(_) => Err(DecodeError::mismatch(
                format!("$objects[{idx}]"),
                "instance",
            )),
        }
    }

    /// Read the class descriptor a `$class` reference points to
    fn class_descriptor(&self, class: Uid) -> Result<ClassDescriptor, DecodeError> {
        match self.get(class)? {
            (_, Value::Dictionary(payload)) => ClassDescriptor::from_plist(payload),
            (idx, _) => Err(DecodeError::mismatch(
                format!("$objects[{idx}]"),
                "class descriptor",
            )),
        }
    }
}

/// Count how many times each object is referenced by the other objects
fn count_references(objects: &[Value]) -> Vec<usize> {
    let mut counts = vec![0; objects.len()];
    let mut mark = |value: &Value| {
        if let Value::Uid(uid) = value {
            if let Some(count) = usize::try_from(uid.get())
                .ok()
                .and_then(|idx| counts.get_mut(idx))
            {
                *count += 1;
            }
        }
    };

    for payload in objects.iter().filter_map(Value::as_dictionary) {
        for value in payload.values() {
            match value {
                Value::Array(items) => items.iter().for_each(&mut mark),
                other => mark(other),
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use plist::{Dictionary as PlistDictionary, Uid, Value};

    use crate::{
        error::decode::DecodeError,
        util::keyed_archive::{archiver::KeyedArchiver, models::Archivable},
    };

    fn archive(objects: Vec<Value>, root: u64) -> Value {
        let mut top = PlistDictionary::new();
        top.insert("root".to_string(), Value::Uid(Uid::new(root)));

        let mut archive = PlistDictionary::new();
        archive.insert("$archiver".to_string(), Value::from("NSKeyedArchiver"));
        archive.insert("$objects".to_string(), Value::Array(objects));
        archive.insert("$top".to_string(), Value::Dictionary(top));
        archive.insert("$version".to_string(), Value::Integer(100_000.into()));
        Value::Dictionary(archive)
    }

    #[test]
    fn can_unarchive_scalar_root() {
        let root = archive(vec![Value::from("$null"), Value::Integer(7.into())], 1);
        let result = KeyedArchiver::new().unarchive(&root).unwrap();
        assert_eq!(result, Archivable::from(7));
    }

    #[test]
    fn can_unarchive_null_root() {
        let root = archive(vec![Value::from("$null")], 0);
        let result = KeyedArchiver::new().unarchive(&root).unwrap();
        assert!(result.is_null());
    }

    #[test]
    fn cant_unarchive_root_out_of_range() {
        let root = archive(vec![Value::from("$null")], 5);
        let result = KeyedArchiver::new().unarchive(&root);
        assert!(matches!(result, Err(DecodeError::MalformedRoot(5, 1))));
    }

    #[test]
    fn cant_unarchive_empty_objects() {
        let root = archive(vec![], 0);
        let result = KeyedArchiver::new().unarchive(&root);
        assert!(matches!(result, Err(DecodeError::MalformedRoot(0, 0))));
    }

    #[test]
    fn cant_unarchive_without_top() {
        let mut root = PlistDictionary::new();
        root.insert("$objects".to_string(), Value::Array(vec![]));
        let result = KeyedArchiver::new().unarchive(&Value::Dictionary(root));
        assert!(matches!(result, Err(DecodeError::TypeMismatch(field, _)) if field == "$top"));
    }

    #[test]
    fn cant_unarchive_non_dictionary() {
        let result = KeyedArchiver::new().unarchive(&Value::from("archive"));
        assert!(matches!(result, Err(DecodeError::TypeMismatch(field, _)) if field == "archive"));
    }

    #[test]
    fn cant_decode_garbage() {
        let result = KeyedArchiver::new().decode(b"bplist00garbage");
        assert!(matches!(result, Err(DecodeError::MalformedArchive(_))));
    }
}
