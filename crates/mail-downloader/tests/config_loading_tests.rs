//! Table-driven tests for loading, validating and resolving configuration.

use std::io::Write;

use mail_downloader::config::{load_config, load_config_from_str, validate_config};
use mail_downloader::pipeline::PipelineConfig;

/// A single config loading test case.
struct ConfigTestCase {
    name: &'static str,
    yaml: &'static str,
    should_succeed: bool,
    /// Expected error substring when loading or validation fails.
    expected_error: Option<&'static str>,
}

const BASE: &str = "imap:\n  server: imap.example.com\n  username: me\n  password: pw\n";

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        yaml: "range:\n  from: 2024-01-01\n  to: 2024-02-01\n",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        yaml: "range:\n  from: 2024-01-01\n  to: 2024-02-01\n\
               attachments:\n  mimetypes: [\"application/pdf\", \"image/\"]\n\
               mails:\n  subjects: [\"invoice, paid\", receipt]\n\
               output:\n  directory: /tmp/mails\n\
               renderer:\n  command: /usr/local/bin/wkhtmltopdf\n  landscape: true\n  pageSize: A4\n\
               charsets:\n  aliases:\n    x-mac-roman: macintosh\n\
               fetch:\n  channelCapacity: 8\n",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "missing_range",
        yaml: "",
        should_succeed: false,
        expected_error: Some("range.from is required"),
    },
    ConfigTestCase {
        name: "inverted_range",
        yaml: "range:\n  from: 2024-02-01\n  to: 2024-01-01\n",
        should_succeed: false,
        expected_error: Some("must be before"),
    },
    ConfigTestCase {
        name: "equal_range",
        yaml: "range:\n  from: 2024-02-01\n  to: 2024-02-01\n",
        should_succeed: false,
        expected_error: Some("must be before"),
    },
    ConfigTestCase {
        name: "unknown_charset_target",
        yaml: "range:\n  from: 2024-01-01\n  to: 2024-02-01\n\
               charsets:\n  aliases:\n    odd: not-a-charset\n",
        should_succeed: false,
        expected_error: Some("unknown encoding"),
    },
    ConfigTestCase {
        name: "unknown_field",
        yaml: "range:\n  from: 2024-01-01\n  to: 2024-02-01\nworkers: 4\n",
        should_succeed: false,
        expected_error: Some("unknown field"),
    },
    ConfigTestCase {
        name: "bad_date",
        yaml: "range:\n  from: 2024-13-01\n  to: 2024-02-01\n",
        should_succeed: false,
        expected_error: Some("parse"),
    },
];

fn load_and_validate(yaml: &str) -> Result<(), String> {
    let config = load_config_from_str(yaml).map_err(|e| e.to_string())?;
    validate_config(&config).map_err(|e| e.to_string())
}

#[test]
fn config_table() {
    for case in CONFIG_TESTS {
        let yaml = format!("{}{}", BASE, case.yaml);
        let result = load_and_validate(&yaml);

        match (case.should_succeed, result) {
            (true, Ok(())) => {}
            (true, Err(e)) => panic!("{}: expected success, got {}", case.name, e),
            (false, Ok(())) => panic!("{}: expected failure", case.name),
            (false, Err(e)) => {
                if let Some(expected) = case.expected_error {
                    assert!(
                        e.contains(expected),
                        "{}: expected error containing '{}', got '{}'",
                        case.name,
                        expected,
                        e
                    );
                }
            }
        }
    }
}

#[test]
fn config_file_resolves_to_pipeline_settings() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}range:\n  from: 2024-03-01\n  to: 2024-04-01\n\
         mails:\n  subjects: [receipt]\n\
         charsets:\n  aliases:\n    x-latin: latin1\n",
        BASE
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    validate_config(&config).unwrap();
    let pipeline_config = PipelineConfig::from_config(&config).unwrap();

    assert_eq!(pipeline_config.imap.mailbox, "INBOX");
    assert!(pipeline_config.subjects.matches("Your Receipt"));
    assert!(!pipeline_config.subjects.matches("Newsletter"));
    assert!(pipeline_config.mimetypes.matches("anything/at-all"));

    let registry = pipeline_config.charset_registry().unwrap();
    assert!(registry.is_registered("x-latin"));
    assert!(registry.is_registered("ansi"));
}
