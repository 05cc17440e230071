/*!
 Builds `NSKeyedArchiver` archives from [`Archivable`] data.
*/

use plist::{Dictionary as PlistDictionary, Integer, Uid, Value};

use crate::{
    error::encode::EncodeError,
    util::keyed_archive::{
        classes::{ClassKind, ClassRegistry},
        interner::ObjectInterner,
        models::{Archivable, ArchiveNode, Dictionary, Leaf},
    },
};

/// The value of `$archiver`
pub const ARCHIVER: &str = "NSKeyedArchiver";
/// The value of `$version`
pub const ARCHIVER_VERSION: u64 = 100_000;
/// Default limit on how deeply objects may nest when decoding; safe on a 2 MiB thread stack
pub const DEFAULT_MAX_DEPTH: usize = 128;
/// Default limit on how many values a decoded graph may expand to
pub const DEFAULT_MAX_OBJECTS: usize = 1 << 20;

/// Settings for a [`KeyedArchiver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// The classes recognized when decoding
    pub registry: ClassRegistry,
    /// How many objects deep decoding may recurse before giving up
    pub max_depth: usize,
    /// How many values decoding may produce, counting every copy of a shared object
    pub max_objects: usize,
}

impl ArchiveOptions {
    pub fn with_registry(mut self, registry: ClassRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            registry: ClassRegistry::standard(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_objects: DEFAULT_MAX_OBJECTS,
        }
    }
}

/// Encodes and decodes keyed archives.
///
/// Encoding borrows the archiver mutably because it fills an [`ObjectInterner`] that lives
/// for the duration of one call; decoding builds its own table for each call. Use one
/// archiver per thread.
///
/// # Example
///
/// ```
/// use keyed_archive::util::keyed_archive::{archiver::KeyedArchiver, models::{Archivable, Dictionary}};
///
/// let mut archiver = KeyedArchiver::new();
///
/// let mut dict = Dictionary::new();
/// dict.insert("pid".into(), 1.into());
/// let value = Archivable::from(dict);
///
/// let bytes = archiver.encode(&value).unwrap();
/// assert_eq!(archiver.decode(&bytes).unwrap(), value);
/// ```
#[derive(Debug, Default)]
pub struct KeyedArchiver {
    pub(crate) options: ArchiveOptions,
    interner: ObjectInterner,
}

impl KeyedArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ArchiveOptions) -> Self {
        Self {
            options,
            interner: ObjectInterner::new(),
        }
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// Encode a value as a binary property list keyed archive
    pub fn encode(&mut self, object: &Archivable) -> Result<Vec<u8>, EncodeError> {
        let root = self.archive(object)?;

        let mut bytes = vec![];
        root.to_writer_binary(&mut bytes)
            .map_err(EncodeError::Serialization)?;
        Ok(bytes)
    }

    /// Build the archive root for a value without serializing it
    pub fn archive(&mut self, object: &Archivable) -> Result<Value, EncodeError> {
        let result = self.build_root(object);
        self.interner.reset();
        result
    }

    fn build_root(&mut self, object: &Archivable) -> Result<Value, EncodeError> {
        self.interner.intern(ArchiveNode::Leaf(Leaf::Null));
        let root = self.archive_object(object)?;
        tracing::debug!(
            "Archived {} as {} objects",
            object.kind(),
            self.interner.len()
        );

        let mut top = PlistDictionary::new();
        top.insert("root".to_string(), Value::Uid(root));

        let mut archive = PlistDictionary::new();
        archive.insert("$archiver".to_string(), Value::String(ARCHIVER.to_string()));
        archive.insert("$objects".to_string(), Value::Array(self.interner.snapshot()));
        archive.insert("$top".to_string(), Value::Dictionary(top));
        archive.insert(
            "$version".to_string(),
            Value::Integer(Integer::from(ARCHIVER_VERSION)),
        );
        Ok(Value::Dictionary(archive))
    }

    /// Add a value and everything it contains to the objects table.
    ///
    /// Children are registered before the node that holds them.
    fn archive_object(&mut self, object: &Archivable) -> Result<Uid, EncodeError> {
        match object {
            Archivable::Dictionary(dict) => self.archive_dictionary(dict),
            Archivable::Array(items) => {
                let class = self.interner.intern_class(ClassKind::Array);
                let values = self.archive_all(items.iter())?;
                Ok(self.interner.intern(ArchiveNode::Sequence { class, values }))
            }
            Archivable::Set(set) => {
                let class = self.interner.intern_class(ClassKind::Set);
                let values = self.archive_all(set.iter())?;
                Ok(self.interner.intern(ArchiveNode::Sequence { class, values }))
            }
            Archivable::Data(bytes) => {
                let class = self.interner.intern_class(ClassKind::Data);
                Ok(self.interner.intern(ArchiveNode::Data {
                    class,
                    bytes: bytes.clone(),
                }))
            }
            Archivable::Date(date) => {
                let class = self.interner.intern_class(ClassKind::Date);
                Ok(self.interner.intern(ArchiveNode::date(class, date)))
            }
            Archivable::Error(error) => {
                let class = self.interner.intern_class(ClassKind::Error);
                let domain = self
                    .interner
                    .intern(ArchiveNode::Leaf(Leaf::String(error.domain.clone())));
                let user_info = match error.user_info.as_ref() {
                    Archivable::Null => self.interner.intern(ArchiveNode::Leaf(Leaf::Null)),
                    other => self.archive_object(other)?,
                };
                Ok(self.interner.intern(ArchiveNode::Error {
                    class,
                    code: Integer::from(error.code),
                    domain,
                    user_info,
                }))
            }
            Archivable::TapMessage(message) => {
                let class = self.interner.intern_class(ClassKind::TapMessage);
                let payload = self.archive_object(message.payload())?;
                Ok(self
                    .interner
                    .intern(ArchiveNode::TapMessage { class, payload }))
            }
            Archivable::String(text) => Ok(self
                .interner
                .intern(ArchiveNode::Leaf(Leaf::String(text.clone())))),
            Archivable::Integer(int) => {
                Ok(self.interner.intern(ArchiveNode::Leaf(Leaf::Integer(*int))))
            }
            Archivable::Boolean(flag) => {
                Ok(self.interner.intern(ArchiveNode::Leaf(Leaf::Boolean(*flag))))
            }
            Archivable::Real(_) | Archivable::Null => {
                Err(EncodeError::UnsupportedType(object.kind()))
            }
        }
    }

    /// Entries are written in the dictionary's iteration order, which carries no meaning;
    /// two archives of equal dictionaries may differ byte for byte.
    fn archive_dictionary(&mut self, dict: &Dictionary) -> Result<Uid, EncodeError> {
        let class = self.interner.intern_class(ClassKind::Dictionary);
        let mut keys = Vec::with_capacity(dict.len());
        let mut values = Vec::with_capacity(dict.len());
        for (key, value) in dict.iter() {
            keys.push(self.archive_object(key)?);
            values.push(self.archive_object(value)?);
        }
        Ok(self.interner.intern(ArchiveNode::Dictionary {
            class,
            keys,
            values,
        }))
    }

    fn archive_all<'a>(
        &mut self,
        items: impl Iterator<Item = &'a Archivable>,
    ) -> Result<Vec<Uid>, EncodeError> {
        items.map(|item| self.archive_object(item)).collect()
    }
}
