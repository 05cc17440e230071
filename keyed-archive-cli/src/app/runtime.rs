use std::{
    fs,
    io::{stdout, Write},
    path::Path,
};

use keyed_archive::util::keyed_archive::archiver::KeyedArchiver;

use crate::{
    app::{
        error::RuntimeError,
        options::{Action, ExportType, Options},
    },
    exporters::{
        exporter::{Reader, Writer},
        inspect::Inspect,
        json::JSON,
        txt::TXT,
    },
};

/// Stores the application state and handles application lifecycle
pub struct Config {
    /// App configuration options
    pub options: Options,
    /// The archiver used for every archive this run touches
    archiver: KeyedArchiver,
}

impl Config {
    /// Create a new instance of the application
    pub fn new(options: Options) -> Self {
        let archiver = KeyedArchiver::with_options(options.archive_options);
        Config { options, archiver }
    }

    /// Run the requested action, writing any text it produces to stdout
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        let text = self.render()?;
        if !text.is_empty() {
            let mut out = stdout().lock();
            writeln!(out, "{}", text.trim_end())
                .map_err(|why| RuntimeError::CreateError(why, "stdout".into()))?;
        }
        Ok(())
    }

    /// Run the requested action and return the text it produces
    pub fn render(&mut self) -> Result<String, RuntimeError> {
        match &self.options.action {
            Action::Decode { input, format } => {
                let bytes = read_file(input)?;
                let value = self
                    .archiver
                    .decode(&bytes)
                    .map_err(RuntimeError::DecodeError)?;
                tracing::debug!("Decoded {} from {}", value.kind(), input.display());

                Ok(match format {
                    ExportType::Txt => TXT::default().format_value(&value),
                    ExportType::Json => JSON::default().format_value(&value),
                })
            }
            Action::Encode { input, output } => {
                let text = fs::read_to_string(input)
                    .map_err(|why| RuntimeError::DiskError(why, input.clone()))?;
                let value = JSON::default().parse_value(&text)?;
                let bytes = self
                    .archiver
                    .encode(&value)
                    .map_err(RuntimeError::EncodeError)?;

                fs::write(output, &bytes)
                    .map_err(|why| RuntimeError::CreateError(why, output.clone()))?;
                tracing::info!("Wrote {} bytes to {}", bytes.len(), output.display());
                Ok(String::new())
            }
            Action::Inspect { input } => Inspect {
                registry: self.options.archive_options.registry,
            }
            .format_archive(&read_file(input)?),
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, RuntimeError> {
    fs::read(path).map_err(|why| RuntimeError::DiskError(why, path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use std::{env::temp_dir, fs, path::PathBuf, process};

    use keyed_archive::{
        error::{decode::DecodeError, encode::EncodeError},
        util::keyed_archive::{
            archiver::ArchiveOptions, classes::ClassRegistry, models::Archivable,
        },
    };

    use crate::app::{
        error::RuntimeError,
        options::{Action, ExportType, Options},
        runtime::Config,
    };

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../keyed-archive/test_data/archives"))
            .join(name)
    }

    fn scratch(name: &str) -> PathBuf {
        temp_dir().join(format!("keyed-archive-{}-{name}", process::id()))
    }

    fn decode_options(input: PathBuf, format: ExportType) -> Options {
        Options {
            action: Action::Decode { input, format },
            archive_options: ArchiveOptions::default(),
        }
    }

    #[test]
    fn can_decode_txt() {
        let mut config = Config::new(decode_options(fixture("ErrorReply.plist"), ExportType::Txt));
        let output = config.render().unwrap();

        assert!(output.starts_with("Error {"));
        assert!(output.contains("code: 4"));
        assert!(output.contains("\"Unable to start service\""));
    }

    #[test]
    fn can_decode_json() {
        let mut config = Config::new(decode_options(fixture("SysmonTap.plist"), ExportType::Json));
        let output = config.render().unwrap();

        let document = json::parse(&output).unwrap();
        assert_eq!(document["Type"], 7);
        assert_eq!(document["Processes"]["1"][0], "launchd");
    }

    #[test]
    fn cant_decode_mutable_data_by_default() {
        let mut config = Config::new(decode_options(fixture("MutableData.plist"), ExportType::Txt));
        let result = config.render();

        assert!(matches!(
            result,
            Err(RuntimeError::DecodeError(DecodeError::UnknownClass(name))) if name == "NSMutableData"
        ));
    }

    #[test]
    fn can_decode_mutable_data_with_corrected_classes() {
        let mut options = decode_options(fixture("MutableData.plist"), ExportType::Txt);
        options.archive_options = options
            .archive_options
            .with_registry(ClassRegistry::corrected());

        let output = Config::new(options).render().unwrap();
        assert!(output.starts_with("<256 bytes: 00 01 02"));
    }

    #[test]
    fn cant_decode_missing_file() {
        let mut config = Config::new(decode_options(fixture("Missing.plist"), ExportType::Txt));
        assert!(matches!(config.render(), Err(RuntimeError::DiskError(_, _))));
    }

    #[test]
    fn can_inspect() {
        let mut config = Config::new(Options {
            action: Action::Inspect {
                input: fixture("UnknownClass.plist"),
            },
            archive_options: ArchiveOptions::default(),
        });
        let output = config.render().unwrap();

        assert!(output.starts_with("$archiver: \"NSKeyedArchiver\""));
        assert!(output.contains("\"NSURL\""));
    }

    #[test]
    fn can_encode_json() {
        let input = scratch("encode.json");
        let output = scratch("encode.plist");
        fs::write(
            &input,
            r#"{"code": 1, "domain": "com.example", "info": [1, 2, 3]}"#,
        )
        .unwrap();

        let mut config = Config::new(Options {
            action: Action::Encode {
                input: input.clone(),
                output: output.clone(),
            },
            archive_options: ArchiveOptions::default(),
        });
        assert_eq!(config.render().unwrap(), "");

        let value = keyed_archive::decode(&fs::read(&output).unwrap()).unwrap();
        let dict = value.as_dictionary().unwrap();
        assert_eq!(dict.get_key("domain"), Some(&Archivable::from("com.example")));
        assert_eq!(
            dict.get_key("info").and_then(Archivable::as_array).map(<[_]>::len),
            Some(3)
        );

        let _ = fs::remove_file(input);
        let _ = fs::remove_file(output);
    }

    #[test]
    fn cant_encode_json_real() {
        let input = scratch("real.json");
        fs::write(&input, r#"{"cpu": 0.25}"#).unwrap();

        let mut config = Config::new(Options {
            action: Action::Encode {
                input: input.clone(),
                output: scratch("real.plist"),
            },
            archive_options: ArchiveOptions::default(),
        });
        assert!(matches!(
            config.render(),
            Err(RuntimeError::EncodeError(EncodeError::UnsupportedType("real")))
        ));

        let _ = fs::remove_file(input);
    }
}
