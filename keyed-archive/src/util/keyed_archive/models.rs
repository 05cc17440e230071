/*!
 Data structures used to represent keyed archives, both as native Rust data and as the nodes stored in the `$objects` table.
*/

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use plist::{Dictionary as PlistDictionary, Integer, Uid, Value};

use crate::{
    error::decode::DecodeError,
    message_types::{ns_error::ArchivedError, tap::TapMessage},
    util::{
        dates::to_reference_seconds,
        keyed_archive::classes::{ClassEntry, ClassKind},
        plist::{
            extract_bytes_key, extract_int_key, extract_real_key, extract_string_array,
            extract_string_key, extract_uid_array, extract_uid_key,
        },
    },
};

/// The string stored at index `0` of every archive, standing in for `nil`
pub const NULL_SENTINEL: &str = "$null";

/// Native data that can be stored in, or read from, a keyed archive
#[derive(Debug, Clone, PartialEq)]
pub enum Archivable {
    /// An `NSDictionary` or `NSMutableDictionary`
    Dictionary(Dictionary),
    /// An `NSSet` or `NSMutableSet`
    Set(Set),
    /// An `NSArray` or `NSMutableArray`
    Array(Vec<Archivable>),
    /// An `NSData` buffer
    Data(Vec<u8>),
    /// An `NSDate`
    Date(DateTime<Utc>),
    /// An `NSError` returned by a device service
    Error(ArchivedError),
    /// A `DTTapMessage` or `DTSysmonTapMessage` telemetry record
    TapMessage(TapMessage),
    /// Text data
    String(String),
    /// Signed and unsigned integers of any width
    Integer(Integer),
    Boolean(bool),
    /// Floating point numbers; these can be read from an archive but not written to one
    Real(f64),
    /// The `$null` sentinel; this can be read from an archive but not written to one
    Null,
}

impl Archivable {
    /// A short name for the kind of data held, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Archivable::Dictionary(_) => "dictionary",
            Archivable::Set(_) => "set",
            Archivable::Array(_) => "array",
            Archivable::Data(_) => "data",
            Archivable::Date(_) => "date",
            Archivable::Error(_) => "error",
            Archivable::TapMessage(_) => "tap message",
            Archivable::String(_) => "string",
            Archivable::Integer(_) => "integer",
            Archivable::Boolean(_) => "boolean",
            Archivable::Real(_) => "real",
            Archivable::Null => "null",
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Archivable::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Archivable::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Archivable]> {
        match self {
            Archivable::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Archivable::Data(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Archivable::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ArchivedError> {
        match self {
            Archivable::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_tap_message(&self) -> Option<&TapMessage> {
        match self {
            Archivable::TapMessage(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Archivable::String(text) => Some(text),
            _ => None,
        }
    }

    /// Get the integer as an [`i64`], if it fits
    pub fn as_signed_integer(&self) -> Option<i64> {
        match self {
            Archivable::Integer(int) => int.as_signed(),
            _ => None,
        }
    }

    /// Get the integer as a [`u64`], if it fits
    pub fn as_unsigned_integer(&self) -> Option<u64> {
        match self {
            Archivable::Integer(int) => int.as_unsigned(),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Archivable::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Archivable::Real(num) => Some(*num),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Archivable::Null)
    }
}

impl From<&str> for Archivable {
    fn from(text: &str) -> Self {
        Archivable::String(text.to_string())
    }
}

impl From<String> for Archivable {
    fn from(text: String) -> Self {
        Archivable::String(text)
    }
}

impl From<bool> for Archivable {
    fn from(flag: bool) -> Self {
        Archivable::Boolean(flag)
    }
}

impl From<i32> for Archivable {
    fn from(int: i32) -> Self {
        Archivable::Integer(Integer::from(int))
    }
}

impl From<i64> for Archivable {
    fn from(int: i64) -> Self {
        Archivable::Integer(Integer::from(int))
    }
}

impl From<u64> for Archivable {
    fn from(int: u64) -> Self {
        Archivable::Integer(Integer::from(int))
    }
}

/// Bytes become an `NSData` buffer, not an array of integers
impl From<Vec<u8>> for Archivable {
    fn from(bytes: Vec<u8>) -> Self {
        Archivable::Data(bytes)
    }
}

impl From<Vec<Archivable>> for Archivable {
    fn from(items: Vec<Archivable>) -> Self {
        Archivable::Array(items)
    }
}

impl From<Dictionary> for Archivable {
    fn from(dict: Dictionary) -> Self {
        Archivable::Dictionary(dict)
    }
}

impl From<Set> for Archivable {
    fn from(set: Set) -> Self {
        Archivable::Set(set)
    }
}

impl From<DateTime<Utc>> for Archivable {
    fn from(date: DateTime<Utc>) -> Self {
        Archivable::Date(date)
    }
}

impl From<ArchivedError> for Archivable {
    fn from(error: ArchivedError) -> Self {
        Archivable::Error(error)
    }
}

impl From<TapMessage> for Archivable {
    fn from(message: TapMessage) -> Self {
        Archivable::TapMessage(message)
    }
}

/// The hashable form of scalar values, used to index [`Dictionary`] keys and [`Set`] items
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ScalarKey {
    String(String),
    Integer(Integer),
    Boolean(bool),
}

impl ScalarKey {
    fn from_value(value: &Archivable) -> Option<Self> {
        match value {
            Archivable::String(text) => Some(ScalarKey::String(text.clone())),
            Archivable::Integer(int) => Some(ScalarKey::Integer(*int)),
            Archivable::Boolean(flag) => Some(ScalarKey::Boolean(*flag)),
            _ => None,
        }
    }
}

/// A mapping of unique keys to values.
///
/// Keys are compared by value. Entries keep the order they were inserted in, but that
/// order is not part of equality and is not preserved by the archive format. String,
/// integer, and boolean keys are found through a hashed index; other keys are found by
/// comparing against every entry.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<(Archivable, Archivable)>,
    /// Positions in `entries` of the scalar keys
    index: HashMap<ScalarKey, usize>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a value, returning the value previously stored under an equal key
    pub fn insert(&mut self, key: Archivable, value: Archivable) -> Option<Archivable> {
        let scalar = ScalarKey::from_value(&key);
        let position = match &scalar {
            Some(scalar) => self.index.get(scalar).copied(),
            None => self.scan(&key),
        };

        match position.and_then(|idx| self.entries.get_mut(idx)) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                if let Some(scalar) = scalar {
                    self.index.insert(scalar, self.entries.len());
                }
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Archivable) -> Option<&Archivable> {
        let position = match ScalarKey::from_value(key) {
            Some(scalar) => self.index.get(&scalar).copied(),
            None => self.scan(key),
        };
        position
            .and_then(|idx| self.entries.get(idx))
            .map(|(_, value)| value)
    }

    /// Get the value stored under a string key
    pub fn get_key(&self, key: &str) -> Option<&Archivable> {
        self.index
            .get(&ScalarKey::String(key.to_string()))
            .and_then(|idx| self.entries.get(*idx))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Archivable, &Archivable)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    /// Find a key that has no hashed form
    fn scan(&self, key: &Archivable) -> Option<usize> {
        self.entries.iter().position(|(existing, _)| existing == key)
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl FromIterator<(Archivable, Archivable)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Archivable, Archivable)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        iter.into_iter().for_each(|(key, value)| {
            dict.insert(key, value);
        });
        dict
    }
}

impl IntoIterator for Dictionary {
    type Item = (Archivable, Archivable);
    type IntoIter = std::vec::IntoIter<(Archivable, Archivable)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A collection of unique values, compared without regard to order
#[derive(Debug, Clone, Default)]
pub struct Set {
    items: Vec<Archivable>,
    /// The scalar items, hashed
    index: HashSet<ScalarKey>,
}

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning `false` if an equal value was already present
    pub fn insert(&mut self, item: Archivable) -> bool {
        match ScalarKey::from_value(&item) {
            Some(scalar) => {
                if !self.index.insert(scalar) {
                    return false;
                }
            }
            None if self.items.contains(&item) => return false,
            None => {}
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, item: &Archivable) -> bool {
        match ScalarKey::from_value(item) {
            Some(scalar) => self.index.contains(&scalar),
            None => self.items.contains(item),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Archivable> {
        self.items.iter()
    }
}

impl PartialEq for Set {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|item| other.contains(item))
    }
}

impl FromIterator<Archivable> for Set {
    fn from_iter<T: IntoIterator<Item = Archivable>>(iter: T) -> Self {
        let mut set = Set::new();
        iter.into_iter().for_each(|item| {
            set.insert(item);
        });
        set
    }
}

impl IntoIterator for Set {
    type Item = Archivable;
    type IntoIter = std::vec::IntoIter<Archivable>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// The `$classes` and `$classname` record that describes the type of an archived object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassDescriptor {
    /// Class names in order of inheritance, most-derived first
    pub classes: Vec<String>,
    /// The name of the class
    pub class_name: String,
}

impl ClassDescriptor {
    /// The class name that decoding dispatches on
    pub fn most_derived(&self) -> Option<&str> {
        self.classes.first().map(String::as_str)
    }

    pub(crate) fn from_plist(payload: &PlistDictionary) -> Result<Self, DecodeError> {
        let classes = extract_string_array(payload, "$classes")?;
        if classes.is_empty() {
            return Err(DecodeError::mismatch("$classes", "non-empty array"));
        }
        Ok(Self {
            classes,
            class_name: extract_string_key(payload, "$classname")?.to_string(),
        })
    }

    fn to_plist(&self) -> Value {
        let mut payload = PlistDictionary::new();
        payload.insert(
            "$classes".to_string(),
            Value::Array(self.classes.iter().cloned().map(Value::String).collect()),
        );
        payload.insert(
            "$classname".to_string(),
            Value::String(self.class_name.clone()),
        );
        Value::Dictionary(payload)
    }
}

impl From<&ClassEntry> for ClassDescriptor {
    fn from(entry: &ClassEntry) -> Self {
        Self {
            classes: entry.classes.iter().map(|name| name.to_string()).collect(),
            class_name: entry.class_name.to_string(),
        }
    }
}

/// Scalar data stored directly in the `$objects` table
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// The `$null` sentinel
    Null,
    String(String),
    Integer(Integer),
    Boolean(bool),
    Real(f64),
}

impl Leaf {
    /// Read a scalar from the objects table; `idx` names the object in errors
    pub(crate) fn from_plist(value: &Value, idx: usize) -> Result<Self, DecodeError> {
        match value {
            Value::String(text) if text == NULL_SENTINEL => Ok(Leaf::Null),
            Value::String(text) => Ok(Leaf::String(text.clone())),
            Value::Integer(int) => Ok(Leaf::Integer(*int)),
            Value::Boolean(flag) => Ok(Leaf::Boolean(*flag)),
            Value::Real(num) => Ok(Leaf::Real(*num)),
            _ => Err(DecodeError::mismatch(format!("$objects[{idx}]"), "scalar")),
        }
    }

    fn to_plist(&self) -> Value {
        match self {
            Leaf::Null => Value::String(NULL_SENTINEL.to_string()),
            Leaf::String(text) => Value::String(text.clone()),
            Leaf::Integer(int) => Value::Integer(*int),
            Leaf::Boolean(flag) => Value::Boolean(*flag),
            Leaf::Real(num) => Value::Real(*num),
        }
    }
}

impl From<Leaf> for Archivable {
    fn from(leaf: Leaf) -> Self {
        match leaf {
            Leaf::Null => Archivable::Null,
            Leaf::String(text) => Archivable::String(text),
            Leaf::Integer(int) => Archivable::Integer(int),
            Leaf::Boolean(flag) => Archivable::Boolean(flag),
            Leaf::Real(num) => Archivable::Real(num),
        }
    }
}

/// An item in the `$objects` table of a keyed archive.
///
/// Every composite node holds a `class` reference to a [`ArchiveNode::Class`] node.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveNode {
    /// Describes the type of composite nodes
    Class(ClassDescriptor),
    /// Parallel arrays of references, where `keys[i]` maps to `values[i]`
    Dictionary {
        class: Uid,
        keys: Vec<Uid>,
        values: Vec<Uid>,
    },
    /// References to the items of an array or set
    Sequence { class: Uid, values: Vec<Uid> },
    /// A byte buffer stored inline
    Data { class: Uid, bytes: Vec<u8> },
    /// Seconds since the reference epoch, stored inline
    Date { class: Uid, time: f64 },
    /// An error code stored inline, with references to the domain and user info
    Error {
        class: Uid,
        code: Integer,
        domain: Uid,
        user_info: Uid,
    },
    /// A reference to the payload of a tap message
    TapMessage { class: Uid, payload: Uid },
    /// Scalar data
    Leaf(Leaf),
}

impl ArchiveNode {
    /// Read the fields an instance of `kind` must have from an archived object
    pub(crate) fn from_instance(
        kind: ClassKind,
        class: Uid,
        payload: &PlistDictionary,
    ) -> Result<Self, DecodeError> {
        Ok(match kind {
            ClassKind::Dictionary => {
                let keys = extract_uid_array(payload, "NS.keys")?;
                let values = extract_uid_array(payload, "NS.objects")?;
                if keys.len() != values.len() {
                    return Err(DecodeError::mismatch(
                        "NS.keys",
                        format!("array of length {}", values.len()),
                    ));
                }
                ArchiveNode::Dictionary {
                    class,
                    keys,
                    values,
                }
            }
            ClassKind::Array | ClassKind::Set => ArchiveNode::Sequence {
                class,
                values: extract_uid_array(payload, "NS.objects")?,
            },
            ClassKind::Data => ArchiveNode::Data {
                class,
                bytes: extract_bytes_key(payload, "NS.data")?.to_vec(),
            },
            ClassKind::Date => ArchiveNode::Date {
                class,
                time: extract_real_key(payload, "NS.time")?,
            },
            ClassKind::Error => ArchiveNode::Error {
                class,
                code: extract_int_key(payload, "NSCode")?,
                domain: extract_uid_key(payload, "NSDomain")?,
                user_info: extract_uid_key(payload, "NSUserInfo")?,
            },
            ClassKind::TapMessage => ArchiveNode::TapMessage {
                class,
                payload: extract_uid_key(payload, "DTTapMessagePlist")?,
            },
        })
    }

    /// Build a date node from an absolute timestamp
    pub(crate) fn date(class: Uid, date: &DateTime<Utc>) -> Self {
        ArchiveNode::Date {
            class,
            time: to_reference_seconds(date),
        }
    }

    /// Convert the node to the property list value stored in `$objects`
    pub fn to_plist(&self) -> Value {
        let mut payload = PlistDictionary::new();
        match self {
            ArchiveNode::Class(descriptor) => return descriptor.to_plist(),
            ArchiveNode::Leaf(leaf) => return leaf.to_plist(),
            ArchiveNode::Dictionary {
                class,
                keys,
                values,
            } => {
                payload.insert("$class".to_string(), Value::Uid(*class));
                payload.insert("NS.keys".to_string(), uid_array(keys));
                payload.insert("NS.objects".to_string(), uid_array(values));
            }
            ArchiveNode::Sequence { class, values } => {
                payload.insert("$class".to_string(), Value::Uid(*class));
                payload.insert("NS.objects".to_string(), uid_array(values));
            }
            ArchiveNode::Data { class, bytes } => {
                payload.insert("$class".to_string(), Value::Uid(*class));
                payload.insert("NS.data".to_string(), Value::Data(bytes.clone()));
            }
            ArchiveNode::Date { class, time } => {
                payload.insert("$class".to_string(), Value::Uid(*class));
                payload.insert("NS.time".to_string(), Value::Real(*time));
            }
            ArchiveNode::Error {
                class,
                code,
                domain,
                user_info,
            } => {
                payload.insert("$class".to_string(), Value::Uid(*class));
                payload.insert("NSCode".to_string(), Value::Integer(*code));
                payload.insert("NSDomain".to_string(), Value::Uid(*domain));
                payload.insert("NSUserInfo".to_string(), Value::Uid(*user_info));
            }
            ArchiveNode::TapMessage { class, payload: message } => {
                payload.insert("$class".to_string(), Value::Uid(*class));
                payload.insert("DTTapMessagePlist".to_string(), Value::Uid(*message));
            }
        }
        Value::Dictionary(payload)
    }
}

fn uid_array(uids: &[Uid]) -> Value {
    Value::Array(uids.iter().copied().map(Value::Uid).collect())
}
