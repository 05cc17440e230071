/*!
 The table of archived classes this crate knows how to read and write.

 Each entry pairs a class name and its inheritance chain with the [`ClassKind`] that determines how
 objects of that class are built. Decoding looks entries up by the most-derived name in an
 object's `$classes`; encoding always writes the immutable form of each kind.
*/

/// How instances of an archived class are represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// `NS.keys` and `NS.objects`
    Dictionary,
    /// `NS.objects`, ordered
    Array,
    /// `NS.objects`, unordered and unique
    Set,
    /// `NS.data`
    Data,
    /// `NS.time`
    Date,
    /// `NSCode`, `NSDomain`, and `NSUserInfo`
    Error,
    /// `DTTapMessagePlist`
    TapMessage,
}

/// A static description of an archived class
#[derive(Debug, PartialEq, Eq)]
pub struct ClassEntry {
    /// The name written to `$classname`
    pub class_name: &'static str,
    /// The inheritance chain written to `$classes`, most-derived first
    pub classes: &'static [&'static str],
    /// The native kind decoded from, or encoded as, this class
    pub kind: ClassKind,
    /// Whether this is the `NSMutable` variant of its kind
    pub mutable: bool,
}

impl ClassEntry {
    const fn new(
        class_name: &'static str,
        classes: &'static [&'static str],
        kind: ClassKind,
        mutable: bool,
    ) -> Self {
        Self {
            class_name,
            classes,
            kind,
            mutable,
        }
    }
}

pub static NS_MUTABLE_DICTIONARY: ClassEntry = ClassEntry::new(
    "NSMutableDictionary",
    &["NSMutableDictionary", "NSDictionary", "NSObject"],
    ClassKind::Dictionary,
    true,
);
pub static NS_DICTIONARY: ClassEntry = ClassEntry::new(
    "NSDictionary",
    &["NSDictionary", "NSObject"],
    ClassKind::Dictionary,
    false,
);
pub static NS_MUTABLE_ARRAY: ClassEntry = ClassEntry::new(
    "NSMutableArray",
    &["NSMutableArray", "NSArray", "NSObject"],
    ClassKind::Array,
    true,
);
pub static NS_ARRAY: ClassEntry =
    ClassEntry::new("NSArray", &["NSArray", "NSObject"], ClassKind::Array, false);
pub static NS_MUTABLE_SET: ClassEntry = ClassEntry::new(
    "NSMutableSet",
    &["NSMutableSet", "NSSet", "NSObject"],
    ClassKind::Set,
    true,
);
pub static NS_SET: ClassEntry =
    ClassEntry::new("NSSet", &["NSSet", "NSObject"], ClassKind::Set, false);
/// The mutable data entry, registered with the `NSMutableArray` chain.
///
/// Lookups for `NSMutableArray` resolve to [`NS_MUTABLE_ARRAY`] first, and `NSMutableData`
/// is not found at all.
pub static NS_MUTABLE_DATA_ARRAY_CHAIN: ClassEntry = ClassEntry::new(
    "NSMutableArray",
    &["NSMutableArray", "NSArray", "NSObject"],
    ClassKind::Data,
    true,
);
pub static NS_MUTABLE_DATA: ClassEntry = ClassEntry::new(
    "NSMutableData",
    &["NSMutableData", "NSData", "NSObject"],
    ClassKind::Data,
    true,
);
pub static NS_DATA: ClassEntry =
    ClassEntry::new("NSData", &["NSData", "NSObject"], ClassKind::Data, false);
pub static NS_DATE: ClassEntry =
    ClassEntry::new("NSDate", &["NSDate", "NSObject"], ClassKind::Date, false);
pub static NS_ERROR: ClassEntry =
    ClassEntry::new("NSError", &["NSError", "NSObject"], ClassKind::Error, false);
pub static DT_TAP_MESSAGE: ClassEntry = ClassEntry::new(
    "DTTapMessage",
    &["DTTapMessage", "NSObject"],
    ClassKind::TapMessage,
    false,
);
pub static DT_SYSMON_TAP_MESSAGE: ClassEntry = ClassEntry::new(
    "DTSysmonTapMessage",
    &["DTSysmonTapMessage", "DTTapMessage", "NSObject"],
    ClassKind::TapMessage,
    false,
);

static STANDARD_CLASSES: [&ClassEntry; 12] = [
    &NS_MUTABLE_DICTIONARY,
    &NS_DICTIONARY,
    &NS_MUTABLE_ARRAY,
    &NS_ARRAY,
    &NS_MUTABLE_DATA_ARRAY_CHAIN,
    &NS_DATA,
    &NS_DATE,
    &NS_ERROR,
    &NS_SET,
    &NS_MUTABLE_SET,
    &DT_TAP_MESSAGE,
    &DT_SYSMON_TAP_MESSAGE,
];

static CORRECTED_CLASSES: [&ClassEntry; 12] = [
    &NS_MUTABLE_DICTIONARY,
    &NS_DICTIONARY,
    &NS_MUTABLE_ARRAY,
    &NS_ARRAY,
    &NS_MUTABLE_DATA,
    &NS_DATA,
    &NS_DATE,
    &NS_ERROR,
    &NS_SET,
    &NS_MUTABLE_SET,
    &DT_TAP_MESSAGE,
    &DT_SYSMON_TAP_MESSAGE,
];

/// A read-only table of [`ClassEntry`] records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRegistry {
    entries: &'static [&'static ClassEntry],
}

impl ClassRegistry {
    /// The registry used by default, where `NSMutableData` is registered with the
    /// `NSMutableArray` chain and so is not recognized when decoding
    pub fn standard() -> Self {
        Self {
            entries: &STANDARD_CLASSES,
        }
    }

    /// A registry where `NSMutableData` is registered with its own chain and decodes as bytes
    pub fn corrected() -> Self {
        Self {
            entries: &CORRECTED_CLASSES,
        }
    }

    /// Find the entry for a most-derived class name; the first matching entry wins
    pub fn lookup(&self, name: &str) -> Option<&'static ClassEntry> {
        self.entries
            .iter()
            .copied()
            .find(|entry| entry.classes.first() == Some(&name))
    }

    /// The entry written when encoding values of the given kind
    pub fn descriptor(kind: ClassKind) -> &'static ClassEntry {
        match kind {
            ClassKind::Dictionary => &NS_DICTIONARY,
            ClassKind::Array => &NS_ARRAY,
            ClassKind::Set => &NS_SET,
            ClassKind::Data => &NS_DATA,
            ClassKind::Date => &NS_DATE,
            ClassKind::Error => &NS_ERROR,
            ClassKind::TapMessage => &DT_TAP_MESSAGE,
        }
    }
}

impl Default for ClassRegistry {
    /// The default registry is [`ClassRegistry::standard`].
    fn default() -> Self {
        Self::standard()
    }
}
