use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid UTF-8 (try the utf-8-lossy encoding)", .path.display())]
    InvalidUtf8 { path: PathBuf },
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

/// How the raw bytes of a source file are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// Invalid sequences are replaced with U+FFFD instead of failing the load.
    Utf8Lossy,
}

impl FromStr for TextEncoding {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-8-lossy" | "utf8-lossy" | "lossy" => Ok(TextEncoding::Utf8Lossy),
            other => Err(LoadError::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "utf-8"),
            TextEncoding::Utf8Lossy => write!(f, "utf-8-lossy"),
        }
    }
}

/// A source text file, read verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source: PathBuf,
    pub encoding: TextEncoding,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            encoding: TextEncoding::Utf8,
        }
    }

    /// True when the document carries no content worth indexing.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Read a file from disk into a single [`Document`].
pub async fn load_document(path: impl AsRef<Path>, encoding: TextEncoding) -> Result<Document, LoadError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let text = match encoding {
        TextEncoding::Utf8 => String::from_utf8(bytes).map_err(|_| LoadError::InvalidUtf8 {
            path: path.to_path_buf(),
        })?,
        TextEncoding::Utf8Lossy => String::from_utf8_lossy(&bytes).into_owned(),
    };

    log::info!("Loaded {} ({} characters, {})", path.display(), text.chars().count(), encoding);

    Ok(Document {
        text,
        source: path.to_path_buf(),
        encoding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_reads_raw_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "  line one\nline two  ").unwrap();

        let doc = load_document(file.path(), TextEncoding::Utf8).await.unwrap();
        assert_eq!(doc.text, "  line one\nline two  ");
        assert_eq!(doc.source, file.path());
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let err = load_document("/definitely/not/here.txt", TextEncoding::Utf8)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_strict_vs_lossy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'o', b'k', 0xff, b'!']).unwrap();

        let strict = load_document(file.path(), TextEncoding::Utf8).await;
        assert!(matches!(strict, Err(LoadError::InvalidUtf8 { .. })));

        let lossy = load_document(file.path(), TextEncoding::Utf8Lossy).await.unwrap();
        assert_eq!(lossy.text, "ok\u{FFFD}!");
    }

    #[test]
    fn test_encoding_labels() {
        assert_eq!("UTF-8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("utf-8-lossy".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8Lossy);
        assert!(matches!(
            "big5".parse::<TextEncoding>(),
            Err(LoadError::UnsupportedEncoding(_))
        ));
    }
}
