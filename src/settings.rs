//! Runtime settings, read from environment knobs and overridden by the command line.

use std::{
    collections::BTreeMap,
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Result};

pub const NAME: &str = "bomshell";
pub const DOTENV_FILE: &str = ".bomshell";

const CACHE_KNOB: &str = "BOM_CACHE";
const OVERWRITE_KNOB: &str = "BOM_OVERWRITE_EXISTING_SPATIAL_DATA";
const FTP_TIMEOUT_KNOB: &str = "BOM_FTP_TIMEOUT";
const HTTP_TIMEOUT_KNOB: &str = "BOM_HTTP_TIMEOUT";

/// Records every knob that was read together with its default.
#[derive(Debug, Default, Clone)]
pub struct Knobs {
    register: BTreeMap<String, String>,
}

impl Knobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_string(&mut self, name: &str, default: &str) -> String {
        self.register.insert(name.to_string(), default.to_string());
        env::var(name).unwrap_or_else(|_| default.to_string())
    }

    pub fn get_int(&mut self, name: &str, default: u64) -> Result<u64> {
        self.register.insert(name.to_string(), default.to_string());
        match env::var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| anyhow!("{} must be an integer, got '{}'", name, value)),
            Err(_) => Ok(default),
        }
    }

    pub fn get_bool(&mut self, name: &str, default: bool) -> Result<bool> {
        self.register.insert(name.to_string(), default.to_string());
        match env::var(name) {
            Ok(value) => parse_bool(&value)
                .ok_or_else(|| anyhow!("{} must be a boolean, got '{}'", name, value)),
            Err(_) => Ok(default),
        }
    }

    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.register
    }

    /// One `#NAME=default` line per knob, sorted by name.
    pub fn describe(&self) -> String {
        self.register
            .iter()
            .map(|(knob, default)| format!("#{}={}", knob, default))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub cache: PathBuf,
    pub overwrite: bool,
    pub ftp_timeout: Duration,
    pub http_timeout: Duration,
}

impl Settings {
    /// Loads the `.bomshell` dotenv file, if any, then reads every knob.
    pub fn load(knobs: &mut Knobs) -> Result<Self> {
        if let Err(e) = dotenvy::from_filename(DOTENV_FILE) {
            if !e.not_found() {
                return Err(anyhow!("Failed to load {}: {}", DOTENV_FILE, e));
            }
        }

        Self::from_knobs(knobs)
    }

    pub fn from_knobs(knobs: &mut Knobs) -> Result<Self> {
        let default_cache = default_cache_dir();
        let cache = knobs.get_string(CACHE_KNOB, &default_cache.to_string_lossy());
        let overwrite = knobs.get_bool(OVERWRITE_KNOB, false)?;
        let ftp_timeout = knobs.get_int(FTP_TIMEOUT_KNOB, 5)?;
        let http_timeout = knobs.get_int(HTTP_TIMEOUT_KNOB, 10)?;

        Ok(Settings {
            cache: PathBuf::from(cache),
            overwrite,
            ftp_timeout: Duration::from_secs(ftp_timeout),
            http_timeout: Duration::from_secs(http_timeout),
        })
    }

    /// Settings rooted at `cache`, with knob defaults for everything else.
    pub fn with_cache(cache: &Path) -> Self {
        Settings {
            cache: cache.to_path_buf(),
            overwrite: false,
            ftp_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
        }
    }

    pub fn spatial_cache(&self) -> PathBuf {
        self.cache.join("spatial_cache")
    }

    pub fn spatial_db(&self) -> PathBuf {
        self.cache.join("spatial.sqlite")
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(NAME)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_string_default() {
        let mut knobs = Knobs::new();
        assert_eq!(knobs.get_string("BOMSHELL_TEST_STRING_UNSET", "hello"), "hello");
    }

    #[test]
    fn should_return_string_from_env() {
        env::set_var("BOMSHELL_TEST_STRING_SET", "from_env");
        let mut knobs = Knobs::new();
        assert_eq!(knobs.get_string("BOMSHELL_TEST_STRING_SET", "default"), "from_env");
    }

    #[test]
    fn should_parse_int_from_env() {
        env::set_var("BOMSHELL_TEST_INT_SET", "99");
        let mut knobs = Knobs::new();
        assert_eq!(knobs.get_int("BOMSHELL_TEST_INT_SET", 1).unwrap(), 99);
        assert_eq!(knobs.get_int("BOMSHELL_TEST_INT_UNSET", 42).unwrap(), 42);
    }

    #[test]
    fn should_reject_bad_int() {
        env::set_var("BOMSHELL_TEST_INT_BAD", "lots");
        let mut knobs = Knobs::new();
        let err = knobs.get_int("BOMSHELL_TEST_INT_BAD", 1).unwrap_err();
        assert!(err.to_string().contains("BOMSHELL_TEST_INT_BAD"));
    }

    #[test]
    fn should_parse_bools() {
        env::set_var("BOMSHELL_TEST_BOOL_SET", "True");
        env::set_var("BOMSHELL_TEST_BOOL_OFF", "off");
        env::set_var("BOMSHELL_TEST_BOOL_BAD", "maybe");
        let mut knobs = Knobs::new();
        assert!(knobs.get_bool("BOMSHELL_TEST_BOOL_SET", false).unwrap());
        assert!(!knobs.get_bool("BOMSHELL_TEST_BOOL_OFF", true).unwrap());
        assert!(!knobs.get_bool("BOMSHELL_TEST_BOOL_UNSET", false).unwrap());
        assert!(knobs.get_bool("BOMSHELL_TEST_BOOL_BAD", false).is_err());
    }

    #[test]
    fn should_register_defaults() {
        let mut knobs = Knobs::new();
        knobs.get_string("BOMSHELL_TEST_REG_STR", "mydefault");
        knobs.get_int("BOMSHELL_TEST_REG_INT", 7).unwrap();
        knobs.get_bool("BOMSHELL_TEST_REG_BOOL", true).unwrap();

        let defaults = knobs.defaults();
        assert_eq!(defaults["BOMSHELL_TEST_REG_STR"], "mydefault");
        assert_eq!(defaults["BOMSHELL_TEST_REG_INT"], "7");
        assert_eq!(defaults["BOMSHELL_TEST_REG_BOOL"], "true");
    }

    #[test]
    fn should_describe_sorted() {
        let mut knobs = Knobs::new();
        knobs.get_string("ZZZ_BOMSHELL_KNOB", "z");
        knobs.get_string("AAA_BOMSHELL_KNOB", "a");
        knobs.get_int("AAA_BOMSHELL_INT", 10).unwrap();

        let output = knobs.describe();
        assert_eq!(
            output,
            "#AAA_BOMSHELL_INT=10\n#AAA_BOMSHELL_KNOB=a\n#ZZZ_BOMSHELL_KNOB=z"
        );
    }

    #[test]
    fn should_derive_cache_paths() {
        let settings = Settings::with_cache(Path::new("/tmp/bom"));
        assert_eq!(settings.spatial_cache(), PathBuf::from("/tmp/bom/spatial_cache"));
        assert_eq!(settings.spatial_db(), PathBuf::from("/tmp/bom/spatial.sqlite"));
    }

    #[test]
    fn should_register_all_settings_knobs() {
        let mut knobs = Knobs::new();
        Settings::from_knobs(&mut knobs).unwrap();
        let defaults = knobs.defaults();
        assert!(defaults.contains_key(CACHE_KNOB));
        assert_eq!(defaults[OVERWRITE_KNOB], "false");
        assert_eq!(defaults[FTP_TIMEOUT_KNOB], "5");
        assert_eq!(defaults[HTTP_TIMEOUT_KNOB], "10");
    }
}
