// Environment variable loading

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;

/// Default prefix for tweetcap environment variables
pub const ENV_PREFIX: &str = "TWEETCAP";

/// Collects prefixed variables as lowercase keys with the prefix removed,
/// so `TWEETCAP_LOG_LEVEL` becomes `log_level`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Read matching variables from the process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn load(&self) -> HashMap<String, String> {
        self.collect_os(env::vars_os())
    }

    /// Like [`collect`](Self::collect), skipping pairs that are not valid UTF-8
    pub fn collect_os<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        self.collect(
            vars.into_iter()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?))),
        )
    }

    /// Read matching variables from any key/value source
    pub fn collect<I, K, V>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| self.strip(key.as_ref()).map(|k| (k, value.into())))
            .collect()
    }

    fn strip(&self, key: &str) -> Option<String> {
        let rest = key.strip_prefix(&self.prefix)?.strip_prefix('_')?;
        if rest.is_empty() {
            return None;
        }
        Some(rest.to_lowercase())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(ENV_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // std::env::set_var is unsafe in edition 2024; these tests feed
    // variables through `collect` instead.

    #[test]
    fn test_prefix_is_stripped() {
        let loader = EnvLoader::default();
        let vars = loader.collect([
            ("TWEETCAP_LOG_LEVEL", "debug"),
            ("TWEETCAP_REQUEST_TIMEOUT_MS", "2500"),
            ("PATH", "/usr/bin"),
            ("TWEETCAPX_OTHER", "ignored"),
            ("TWEETCAP_", "ignored"),
        ]);

        assert_eq!(vars.len(), 2);
        assert_eq!(vars["log_level"], "debug");
        assert_eq!(vars["request_timeout_ms"], "2500");
    }

    #[test]
    fn test_custom_prefix() {
        let loader = EnvLoader::new("CAPTURE");
        let vars = loader.collect([("CAPTURE_USER_AGENT", "bot"), ("TWEETCAP_USER_AGENT", "x")]);

        assert_eq!(vars.len(), 1);
        assert_eq!(vars["user_agent"], "bot");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_pairs_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let loader = EnvLoader::default();
        let vars = loader.collect_os([
            (OsString::from("UNRELATED"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from("TWEETCAP_USER_AGENT"), OsString::from_vec(vec![0xff])),
            (OsString::from_vec(b"TWEETCAP_\xff".to_vec()), OsString::from("x")),
            (OsString::from("TWEETCAP_LOG_LEVEL"), OsString::from("warn")),
        ]);

        assert_eq!(vars.len(), 1);
        assert_eq!(vars["log_level"], "warn");
    }

    #[test]
    fn test_process_env_never_yields_foreign_keys() {
        let loader = EnvLoader::new("TWEETCAP_TEST_NONEXISTENT_99999");
        assert!(loader.load().is_empty());
    }
}
