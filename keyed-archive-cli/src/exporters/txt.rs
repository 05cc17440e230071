use keyed_archive::{
    message_types::{ns_error::ArchivedError, tap::TapMessage},
    util::keyed_archive::models::{Archivable, Dictionary},
};

use crate::exporters::exporter::Writer;

/// Number of bytes shown before a buffer is truncated
const DATA_PREVIEW: usize = 16;

/// Renders values as an indented tree
pub struct TXT {
    /// Spaces added for each level of nesting
    pub indent: usize,
}

impl Default for TXT {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

impl Writer for TXT {
    fn format_value(&self, value: &Archivable) -> String {
        let mut out = String::new();
        self.write_value(value, 0, &mut out);
        out
    }
}

impl TXT {
    fn write_value(&self, value: &Archivable, depth: usize, out: &mut String) {
        match value {
            Archivable::Dictionary(dict) => self.write_dictionary("", dict, depth, out),
            Archivable::Array(items) => self.write_items("[", "]", items.iter(), depth, out),
            Archivable::Set(set) => self.write_items("Set {", "}", set.iter(), depth, out),
            Archivable::Data(bytes) => out.push_str(&format_data(bytes)),
            Archivable::Date(date) => out.push_str(&date.to_rfc3339()),
            Archivable::Error(error) => self.write_error(error, depth, out),
            Archivable::TapMessage(message) => self.write_tap_message(message, depth, out),
            Archivable::String(text) => out.push_str(&format!("{text:?}")),
            Archivable::Integer(_) => match value.as_signed_integer() {
                Some(int) => out.push_str(&int.to_string()),
                None => out.push_str(
                    &value.as_unsigned_integer().unwrap_or_default().to_string(),
                ),
            },
            Archivable::Boolean(flag) => out.push_str(&flag.to_string()),
            Archivable::Real(real) => out.push_str(&format!("{real:?}")),
            Archivable::Null => out.push_str("null"),
        }
    }

    fn write_dictionary(&self, label: &str, dict: &Dictionary, depth: usize, out: &mut String) {
        if dict.is_empty() {
            out.push_str(&format!("{label}{{}}"));
            return;
        }

        out.push_str(&format!("{label}{{\n"));
        for (key, value) in dict.iter() {
            self.push_indent(depth + 1, out);
            self.write_value(key, depth + 1, out);
            out.push_str(": ");
            self.write_value(value, depth + 1, out);
            out.push('\n');
        }
        self.push_indent(depth, out);
        out.push('}');
    }

    fn write_items<'a>(
        &self,
        open: &str,
        close: &str,
        items: impl Iterator<Item = &'a Archivable>,
        depth: usize,
        out: &mut String,
    ) {
        let mut items = items.peekable();
        if items.peek().is_none() {
            out.push_str(open);
            out.push_str(close);
            return;
        }

        out.push_str(open);
        out.push('\n');
        for item in items {
            self.push_indent(depth + 1, out);
            self.write_value(item, depth + 1, out);
            out.push('\n');
        }
        self.push_indent(depth, out);
        out.push_str(close);
    }

    fn write_error(&self, error: &ArchivedError, depth: usize, out: &mut String) {
        out.push_str("Error {\n");
        self.push_indent(depth + 1, out);
        out.push_str(&format!("code: {}\n", error.code));
        self.push_indent(depth + 1, out);
        out.push_str(&format!("domain: {:?}\n", error.domain));
        self.push_indent(depth + 1, out);
        out.push_str("user_info: ");
        self.write_value(&error.user_info, depth + 1, out);
        out.push('\n');
        self.push_indent(depth, out);
        out.push('}');
    }

    fn write_tap_message(&self, message: &TapMessage, depth: usize, out: &mut String) {
        match message.message() {
            Some(dict) => self.write_dictionary("TapMessage ", dict, depth, out),
            None => {
                out.push_str("TapMessage ");
                self.write_value(message.payload(), depth, out);
            }
        }
    }

    fn push_indent(&self, depth: usize, out: &mut String) {
        out.extend(std::iter::repeat(' ').take(depth * self.indent));
    }
}

/// Summarize a byte buffer, showing the first few bytes as hex
fn format_data(bytes: &[u8]) -> String {
    let mut preview = bytes
        .iter()
        .take(DATA_PREVIEW)
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ");
    if bytes.len() > DATA_PREVIEW {
        preview.push_str(" ...");
    }

    match bytes.len() {
        0 => "<0 bytes>".to_string(),
        1 => format!("<1 byte: {preview}>"),
        len => format!("<{len} bytes: {preview}>"),
    }
}

#[cfg(test)]
mod tests {
    use keyed_archive::{
        message_types::{ns_error::ArchivedError, tap::TapMessage},
        util::{
            dates::reference_epoch,
            keyed_archive::models::{Archivable, Dictionary},
        },
    };

    use crate::exporters::{exporter::Writer, txt::TXT};

    #[test]
    fn can_format_scalars() {
        let exporter = TXT::default();
        assert_eq!(exporter.format_value(&"launchd".into()), "\"launchd\"");
        assert_eq!(exporter.format_value(&(-3).into()), "-3");
        assert_eq!(exporter.format_value(&true.into()), "true");
        assert_eq!(exporter.format_value(&Archivable::Real(0.5)), "0.5");
        assert_eq!(exporter.format_value(&Archivable::Null), "null");
    }

    #[test]
    fn can_format_nested() {
        let exporter = TXT::default();
        let mut dict = Dictionary::new();
        dict.insert(
            "Processes".into(),
            Archivable::Array(vec!["launchd".into(), 1.into()]),
        );

        let expected = "{\n    \"Processes\": [\n        \"launchd\"\n        1\n    ]\n}";
        assert_eq!(exporter.format_value(&dict.into()), expected);
    }

    #[test]
    fn can_format_empty_containers() {
        let exporter = TXT::default();
        assert_eq!(exporter.format_value(&Dictionary::new().into()), "{}");
        assert_eq!(exporter.format_value(&Archivable::Array(vec![])), "[]");
    }

    #[test]
    fn can_format_data() {
        let exporter = TXT { indent: 2 };
        assert_eq!(exporter.format_value(&Vec::<u8>::new().into()), "<0 bytes>");
        assert_eq!(exporter.format_value(&vec![0xabu8].into()), "<1 byte: ab>");

        let long: Vec<u8> = (0..20).collect();
        assert_eq!(
            exporter.format_value(&long.into()),
            "<20 bytes: 00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f ...>"
        );
    }

    #[test]
    fn can_format_date() {
        let exporter = TXT::default();
        assert_eq!(
            exporter.format_value(&reference_epoch().into()),
            "2001-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn can_format_error() {
        let exporter = TXT { indent: 2 };
        let error = ArchivedError::new(4, "DTXMessage", Archivable::Null);

        let expected = "Error {\n  code: 4\n  domain: \"DTXMessage\"\n  user_info: null\n}";
        assert_eq!(exporter.format_value(&error.into()), expected);
    }

    #[test]
    fn can_format_tap_message() {
        let exporter = TXT { indent: 2 };
        let mut sample = Dictionary::new();
        sample.insert("Type".into(), 7.into());

        let message = TapMessage::new(sample.into());
        assert_eq!(
            exporter.format_value(&message.into()),
            "TapMessage {\n  \"Type\": 7\n}"
        );
    }
}
