use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "img2pdf";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Environment variable that overrides the per-user data directory
pub const DATA_DIR_ENV: &str = "IMG2PDF_DATA_DIR";

/// Paper size and orientation preferences for PDF output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    #[serde(alias = "PaperSize")]
    pub paper_size: PaperSize,
    #[serde(alias = "Orientation")]
    pub orientation: Orientation,
}

/// Per-user directory holding the settings file and logs
pub fn default_data_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }

    let base = if cfg!(windows) {
        std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
    } else if cfg!(target_os = "macos") {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    } else {
        std::env::var_os("XDG_DATA_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share"))
            })
    };

    base.map(|dir| dir.join(APP_DIR_NAME))
}

/// JSON-backed storage for [`PdfSettings`] at a fixed path
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store inside `data_dir` under the standard file name
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when the file is missing or invalid.
    ///
    /// Failures are logged, never returned.
    pub async fn load(&self) -> PdfSettings {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings file at {}, using defaults", self.path.display());
                return PdfSettings::default();
            }
            Err(e) => {
                log::error!("Failed to read settings {}: {}", self.path.display(), e);
                return PdfSettings::default();
            }
        };

        match serde_json::from_slice::<PdfSettings>(&bytes) {
            Ok(settings) => {
                log::debug!(
                    "Loaded settings: paper {}, orientation {}",
                    settings.paper_size,
                    settings.orientation
                );
                settings
            }
            Err(e) => {
                log::error!("Failed to parse settings {}: {}", self.path.display(), e);
                PdfSettings::default()
            }
        }
    }

    /// Save settings, replacing any existing file
    pub async fn save(&self, settings: &PdfSettings) -> Result<()> {
        let result = self.write(settings).await;
        if let Err(e) = &result {
            log::error!("Failed to save settings {}: {}", self.path.display(), e);
        }
        result
    }

    async fn write(&self, settings: &PdfSettings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| ComposeError::Settings(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

mod serde_impls {
    use super::*;
    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;
    use std::marker::PhantomData;
    use std::str::FromStr;

    impl Serialize for PaperSize {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(self.name())
        }
    }

    impl Serialize for Orientation {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(self.name())
        }
    }

    /// Enum stored either by name or, in older files, by ordinal
    trait NamedOrdinal: FromStr + Sized {
        const EXPECTING: &'static str;
        const FALLBACK: Self;

        fn from_ordinal(ordinal: u64) -> Option<Self>;
    }

    impl NamedOrdinal for PaperSize {
        const EXPECTING: &'static str = "a paper size name or ordinal";
        const FALLBACK: Self = PaperSize::A4;

        fn from_ordinal(ordinal: u64) -> Option<Self> {
            PaperSize::from_ordinal(ordinal)
        }
    }

    impl NamedOrdinal for Orientation {
        const EXPECTING: &'static str = "an orientation name or ordinal";
        const FALLBACK: Self = Orientation::Automatic;

        fn from_ordinal(ordinal: u64) -> Option<Self> {
            Orientation::from_ordinal(ordinal)
        }
    }

    struct NamedOrdinalVisitor<T>(PhantomData<T>);

    impl<T: NamedOrdinal + fmt::Debug> Visitor<'_> for NamedOrdinalVisitor<T> {
        type Value = T;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str(T::EXPECTING)
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<T, E>
        where
            E: de::Error,
        {
            Ok(T::from_str(value).unwrap_or_else(|_| {
                log::warn!("Unrecognized setting {:?}, using {:?}", value, T::FALLBACK);
                T::FALLBACK
            }))
        }

        fn visit_u64<E>(self, value: u64) -> std::result::Result<T, E>
        where
            E: de::Error,
        {
            Ok(T::from_ordinal(value).unwrap_or_else(|| {
                log::warn!("Unrecognized setting ordinal {}, using {:?}", value, T::FALLBACK);
                T::FALLBACK
            }))
        }

        fn visit_i64<E>(self, value: i64) -> std::result::Result<T, E>
        where
            E: de::Error,
        {
            match u64::try_from(value) {
                Ok(ordinal) => self.visit_u64(ordinal),
                Err(_) => Err(de::Error::invalid_value(
                    de::Unexpected::Signed(value),
                    &self,
                )),
            }
        }
    }

    impl<'de> Deserialize<'de> for PaperSize {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(NamedOrdinalVisitor(PhantomData))
        }
    }

    impl<'de> Deserialize<'de> for Orientation {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(NamedOrdinalVisitor(PhantomData))
        }
    }
}
