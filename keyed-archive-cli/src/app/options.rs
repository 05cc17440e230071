use std::{fmt::Display, path::PathBuf};

use clap::{command, value_parser, Arg, ArgAction, ArgMatches, Command};

use keyed_archive::util::keyed_archive::{
    archiver::{ArchiveOptions, DEFAULT_MAX_DEPTH},
    classes::ClassRegistry,
};

use crate::app::error::RuntimeError;

/// Subcommand names
pub const SUBCOMMAND_DECODE: &str = "decode";
pub const SUBCOMMAND_ENCODE: &str = "encode";
pub const SUBCOMMAND_INSPECT: &str = "inspect";

/// Option names
pub const OPTION_INPUT: &str = "input";
pub const OPTION_FORMAT: &str = "format";
pub const OPTION_OUTPUT: &str = "output";
pub const OPTION_CORRECTED_CLASSES: &str = "corrected-classes";
pub const OPTION_MAX_DEPTH: &str = "max-depth";

/// Other CLI text
pub const SUPPORTED_FILE_TYPES: &str = "txt, json";
pub const ABOUT: &str = concat!(
    "The `keyed-archive` binary decodes, encodes, and inspects NSKeyedArchiver files\n",
    "such as the payloads exchanged with iOS developer services."
);

/// The formats a decoded archive can be printed as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportType {
    /// Indented plain text
    Txt,
    /// Pretty printed JSON
    Json,
}

impl ExportType {
    /// Given user's input, return a variant if the input matches one
    pub fn from_cli(format: &str) -> Option<Self> {
        match format.to_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl Display for ExportType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportType::Txt => write!(fmt, "txt"),
            ExportType::Json => write!(fmt, "json"),
        }
    }
}

/// What the application was asked to do
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Print the contents of an archive
    Decode { input: PathBuf, format: ExportType },
    /// Build an archive from a JSON document
    Encode { input: PathBuf, output: PathBuf },
    /// Print the raw objects table of an archive
    Inspect { input: PathBuf },
}

#[derive(Debug, PartialEq, Eq)]
pub struct Options {
    /// The subcommand to run
    pub action: Action,
    /// Settings passed to the archiver
    pub archive_options: ArchiveOptions,
}

impl Options {
    pub fn from_args(args: &ArgMatches) -> Result<Self, RuntimeError> {
        let registry = if args.get_flag(OPTION_CORRECTED_CLASSES) {
            ClassRegistry::corrected()
        } else {
            ClassRegistry::standard()
        };

        let max_depth = args
            .get_one::<usize>(OPTION_MAX_DEPTH)
            .copied()
            .unwrap_or(DEFAULT_MAX_DEPTH);
        if max_depth == 0 {
            return Err(RuntimeError::InvalidOptions(format!(
                "Option --{OPTION_MAX_DEPTH} must be at least 1"
            )));
        }

        let action = match args.subcommand() {
            Some((SUBCOMMAND_DECODE, sub_args)) => {
                let format = match sub_args.get_one::<String>(OPTION_FORMAT) {
                    Some(format) => ExportType::from_cli(format).ok_or_else(|| {
                        RuntimeError::InvalidOptions(format!(
                            "{format} is not a valid export type! Must be one of <{SUPPORTED_FILE_TYPES}>"
                        ))
                    })?,
                    None => ExportType::Txt,
                };
                Action::Decode {
                    input: input_path(sub_args)?,
                    format,
                }
            }
            Some((SUBCOMMAND_ENCODE, sub_args)) => Action::Encode {
                input: input_path(sub_args)?,
                output: sub_args
                    .get_one::<PathBuf>(OPTION_OUTPUT)
                    .cloned()
                    .ok_or_else(|| {
                        RuntimeError::InvalidOptions(format!(
                            "Option --{OPTION_OUTPUT} is required to encode"
                        ))
                    })?,
            },
            Some((SUBCOMMAND_INSPECT, sub_args)) => Action::Inspect {
                input: input_path(sub_args)?,
            },
            _ => {
                return Err(RuntimeError::InvalidOptions(format!(
                    "Expected one of `{SUBCOMMAND_DECODE}`, `{SUBCOMMAND_ENCODE}`, or `{SUBCOMMAND_INSPECT}`"
                )))
            }
        };

        Ok(Options {
            action,
            archive_options: ArchiveOptions::default()
                .with_registry(registry)
                .with_max_depth(max_depth),
        })
    }
}

fn input_path(args: &ArgMatches) -> Result<PathBuf, RuntimeError> {
    args.get_one::<PathBuf>(OPTION_INPUT)
        .cloned()
        .ok_or_else(|| RuntimeError::InvalidOptions("No input file provided".to_string()))
}

fn input_arg(help: &'static str) -> Arg {
    Arg::new(OPTION_INPUT)
        .help(help)
        .required(true)
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
}

/// Build the command line interface
pub fn get_command() -> Command {
    command!()
        .about(ABOUT)
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new(OPTION_CORRECTED_CLASSES)
                .long(OPTION_CORRECTED_CLASSES)
                .help("Decode NSMutableData as bytes instead of rejecting it as an unknown class")
                .action(ArgAction::SetTrue)
                .global(true)
                .display_order(100),
        )
        .arg(
            Arg::new(OPTION_MAX_DEPTH)
                .long(OPTION_MAX_DEPTH)
                .help(format!(
                    "Stop decoding objects nested deeper than this many levels\nIf omitted, the default is {DEFAULT_MAX_DEPTH}"
                ))
                .value_name("N")
                .value_parser(value_parser!(usize))
                .global(true)
                .display_order(101),
        )
        .subcommand(
            Command::new(SUBCOMMAND_DECODE)
                .about("Decode an archive and print its contents")
                .arg(input_arg("Path to a binary or XML keyed archive"))
                .arg(
                    Arg::new(OPTION_FORMAT)
                        .short('f')
                        .long(OPTION_FORMAT)
                        .help("Specify a single file format to print")
                        .value_name(SUPPORTED_FILE_TYPES)
                        .default_value("txt"),
                ),
        )
        .subcommand(
            Command::new(SUBCOMMAND_ENCODE)
                .about("Encode a JSON document as a binary keyed archive")
                .arg(input_arg("Path to a JSON document"))
                .arg(
                    Arg::new(OPTION_OUTPUT)
                        .short('o')
                        .long(OPTION_OUTPUT)
                        .help("Path to write the archive to")
                        .required(true)
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new(SUBCOMMAND_INSPECT)
                .about("Print the raw objects table of an archive")
                .arg(input_arg("Path to a binary or XML keyed archive")),
        )
}

/// Parse arguments from the command line
pub fn from_command_line() -> ArgMatches {
    get_command().get_matches()
}

#[cfg(test)]
mod arg_tests {
    use std::path::PathBuf;

    use keyed_archive::util::keyed_archive::{
        archiver::{ArchiveOptions, DEFAULT_MAX_DEPTH},
        classes::ClassRegistry,
    };

    use crate::app::{
        error::RuntimeError,
        options::{get_command, Action, ExportType, Options},
    };

    fn parse(args: &[&str]) -> Result<Options, RuntimeError> {
        let matches = get_command().try_get_matches_from(args).unwrap();
        Options::from_args(&matches)
    }

    #[test]
    fn can_build_command() {
        get_command().debug_assert();
    }

    #[test]
    fn can_parse_decode_defaults() {
        let options = parse(&["keyed-archive", "decode", "reply.plist"]).unwrap();

        let expected = Options {
            action: Action::Decode {
                input: PathBuf::from("reply.plist"),
                format: ExportType::Txt,
            },
            archive_options: ArchiveOptions::default(),
        };
        assert_eq!(options, expected);
    }

    #[test]
    fn can_parse_decode_json() {
        let options = parse(&["keyed-archive", "decode", "reply.plist", "-f", "JSON"]).unwrap();
        assert!(matches!(
            options.action,
            Action::Decode {
                format: ExportType::Json,
                ..
            }
        ));
    }

    #[test]
    fn cant_parse_decode_bad_format() {
        let options = parse(&["keyed-archive", "decode", "reply.plist", "-f", "html"]);
        assert!(matches!(options, Err(RuntimeError::InvalidOptions(_))));
    }

    #[test]
    fn can_parse_encode() {
        let options = parse(&["keyed-archive", "encode", "in.json", "-o", "out.plist"]).unwrap();
        assert_eq!(
            options.action,
            Action::Encode {
                input: PathBuf::from("in.json"),
                output: PathBuf::from("out.plist"),
            }
        );
    }

    #[test]
    fn cant_parse_encode_without_output() {
        let matches = get_command().try_get_matches_from(["keyed-archive", "encode", "in.json"]);
        assert!(matches.is_err());
    }

    #[test]
    fn can_parse_global_options_after_subcommand() {
        let options = parse(&[
            "keyed-archive",
            "inspect",
            "reply.plist",
            "--corrected-classes",
            "--max-depth",
            "16",
        ])
        .unwrap();

        assert_eq!(options.archive_options.registry, ClassRegistry::corrected());
        assert_eq!(options.archive_options.max_depth, 16);
    }

    #[test]
    fn can_parse_global_options_before_subcommand() {
        let options = parse(&["keyed-archive", "--max-depth", "3", "inspect", "reply.plist"]).unwrap();
        assert_eq!(options.archive_options.max_depth, 3);
        assert_eq!(options.archive_options.registry, ClassRegistry::standard());
    }

    #[test]
    fn cant_parse_zero_depth() {
        let options = parse(&["keyed-archive", "inspect", "reply.plist", "--max-depth", "0"]);
        assert!(matches!(options, Err(RuntimeError::InvalidOptions(_))));
    }

    #[test]
    fn can_use_default_depth() {
        let options = parse(&["keyed-archive", "inspect", "reply.plist"]).unwrap();
        assert_eq!(options.archive_options.max_depth, DEFAULT_MAX_DEPTH);
    }
}
