/*!
 Prints the raw `$objects` table of an archive without resolving any references.

 Class descriptors are annotated with the kind they decode as under the selected registry.
*/

use std::io::Cursor;

use plist::Value;

use keyed_archive::{
    error::decode::DecodeError,
    util::{
        keyed_archive::classes::ClassRegistry,
        plist::{extract_array_key, extract_dictionary},
    },
};

use crate::app::error::RuntimeError;

/// Number of bytes shown before a buffer is truncated
const DATA_PREVIEW: usize = 8;

/// Renders the header and object table of an archive, one object per line
#[derive(Default)]
pub struct Inspect {
    /// The classes used to annotate `$classes` records
    pub registry: ClassRegistry,
}

impl Inspect {
    pub fn format_archive(&self, bytes: &[u8]) -> Result<String, RuntimeError> {
        let root = Value::from_reader(Cursor::new(bytes))
            .map_err(|why| RuntimeError::DecodeError(DecodeError::MalformedArchive(why)))?;
        self.format_root(&root)
    }

    pub fn format_root(&self, root: &Value) -> Result<String, RuntimeError> {
        let archive = root.as_dictionary().ok_or_else(|| {
            RuntimeError::DecodeError(DecodeError::TypeMismatch(
                "archive".to_string(),
                "dictionary".to_string(),
            ))
        })?;
        let objects = extract_array_key(archive, "$objects").map_err(RuntimeError::DecodeError)?;
        let top = extract_dictionary(archive, "$top").map_err(RuntimeError::DecodeError)?;

        let mut out = String::new();
        for key in ["$archiver", "$version"] {
            if let Some(value) = archive.get(key) {
                out.push_str(&format!("{key}: {}\n", describe(value)));
            }
        }
        for (key, value) in top {
            out.push_str(&format!("$top.{key}: {}\n", describe(value)));
        }
        out.push_str(&format!("$objects: {}\n", objects.len()));

        let width = objects.len().saturating_sub(1).to_string().len();
        for (idx, object) in objects.iter().enumerate() {
            out.push_str(&format!("{idx:>width$}  {}", describe(object)));
            if let Some(note) = self.annotate(object) {
                out.push_str(&format!(" ({note})"));
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Describe how a class record decodes, if the object is one
    fn annotate(&self, object: &Value) -> Option<String> {
        let name = object
            .as_dictionary()?
            .get("$classes")?
            .as_array()?
            .first()?
            .as_string()?;

        Some(match self.registry.lookup(name) {
            Some(entry) if entry.mutable => format!("mutable {:?}", entry.kind),
            Some(entry) => format!("{:?}", entry.kind),
            None => "unknown class".to_string(),
        })
    }
}

/// Describe a property list value on a single line; references are shown as `@index`
fn describe(value: &Value) -> String {
    match value {
        Value::Uid(uid) => format!("@{}", uid.get()),
        Value::String(text) => format!("{text:?}"),
        Value::Integer(int) => match int.as_signed() {
            Some(int) => int.to_string(),
            None => int.as_unsigned().unwrap_or_default().to_string(),
        },
        Value::Real(real) => format!("{real:?}"),
        Value::Boolean(flag) => flag.to_string(),
        Value::Data(bytes) => {
            let preview = bytes
                .iter()
                .take(DATA_PREVIEW)
                .map(|byte| format!("{byte:02x}"))
                .collect::<String>();
            let more = if bytes.len() > DATA_PREVIEW { "..." } else { "" };
            format!("<{} bytes {preview}{more}>", bytes.len())
        }
        Value::Date(date) => date.to_xml_format(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(describe).collect::<Vec<_>>().join(", ")
        ),
        Value::Dictionary(dict) => format!(
            "{{{}}}",
            dict.iter()
                .map(|(key, item)| format!("{key}: {}", describe(item)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        _ => "<unknown>".to_string(),
    }
}
