//! Result loader: one JSON document from a file or standard input.

use log::debug;
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

/// Where the result document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Path(PathBuf),
    Stdin,
}

impl InputSource {
    /// `None` or `-` reads standard input.
    pub fn from_arg(arg: Option<PathBuf>) -> Self {
        match arg {
            Some(path) if path.as_os_str() != "-" => InputSource::Path(path),
            _ => InputSource::Stdin,
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Path(path) => write!(f, "{}", path.display()),
            InputSource::Stdin => f.write_str("<stdin>"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {source_name}")]
    Io {
        source_name: String,
        #[source]
        source: io::Error,
    },

    #[error("exception decoding JSON from {source_name}")]
    Decode {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and decode the document behind `source`.
pub fn read_document(source: &InputSource) -> Result<Value, LoadError> {
    debug!("loading result document from {source}");
    match source {
        InputSource::Path(path) => {
            let file = File::open(path).map_err(|e| LoadError::Io {
                source_name: source.to_string(),
                source: e,
            })?;
            parse_document(BufReader::new(file), &source.to_string())
        }
        InputSource::Stdin => parse_document(io::stdin().lock(), &source.to_string()),
    }
}

/// Decode one JSON document from any reader. Syntax errors and I/O errors
/// while reading are both reported as decode failures.
pub fn parse_document<R: Read>(reader: R, source_name: &str) -> Result<Value, LoadError> {
    serde_json::from_reader(reader).map_err(|e| {
        if e.is_io() {
            LoadError::Io {
                source_name: source_name.to_string(),
                source: io::Error::new(io::ErrorKind::Other, e),
            }
        } else {
            LoadError::Decode {
                source_name: source_name.to_string(),
                source: e,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn decodes_from_reader() {
        let value = parse_document(r#"{"symbol": "jpm"}"#.as_bytes(), "test").unwrap();
        assert_eq!(value["symbol"], "jpm");
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = parse_document(r#"{"symbol": "jpm""#.as_bytes(), "test").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
        assert!(err.to_string().starts_with("exception decoding JSON from test"));
    }

    #[test]
    fn reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"indicator": "MACD"}}"#).unwrap();
        let value = read_document(&InputSource::Path(file.path().to_path_buf())).unwrap();
        assert_eq!(value["indicator"], "MACD");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_document(&InputSource::Path("/nonexistent/result.json".into())).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn dash_means_stdin() {
        assert_eq!(InputSource::from_arg(Some("-".into())), InputSource::Stdin);
        assert_eq!(InputSource::from_arg(None), InputSource::Stdin);
        assert_eq!(
            InputSource::from_arg(Some("out.json".into())),
            InputSource::Path("out.json".into())
        );
    }
}
