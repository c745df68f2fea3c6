//! test-bot configuration handling
//!
//! The server publishes an INI-style document describing each Firebug
//! release: which test list to run and where to fetch the firebug/fbtest
//! extension archives. The same parser also reads the browser's own
//! `application.ini` for the compatibility pref.

use std::collections::HashMap;

use crate::common::{Error, Result};

/// Name of the config artifact, both on the server and in the working dir
pub const CONFIG_FILE: &str = "test-bot.config";

/// Server-relative location of the config artifact
pub const CONFIG_URL_PATH: &str = "releases/firebug/test-bot.config";

/// A parsed INI-style document.
///
/// Section names are case-sensitive; option names are case-insensitive
/// (stored lowercased). Both `key = value` and `key: value` forms are
/// accepted, and lines starting with `;` or `#` are comments.
#[derive(Debug, Default)]
pub struct IniDoc {
    sections: HashMap<String, HashMap<String, String>>,
}

impl IniDoc {
    pub fn parse(input: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current: Option<String> = None;

        for raw in input.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim().to_string();
                sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }
            let Some(section) = &current else { continue };
            let split = line
                .char_indices()
                .find(|&(_, c)| c == '=' || c == ':')
                .map(|(i, _)| i);
            if let Some(i) = split {
                let key = line[..i].trim().to_lowercase();
                let value = line[i + 1..].trim().to_string();
                if !key.is_empty() {
                    if let Some(s) = sections.get_mut(section) {
                        s.insert(key, value);
                    }
                }
            }
        }

        Self { sections }
    }

    /// Look up an option, case-insensitive on the option name
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(&key.to_lowercase())
            .map(String::as_str)
    }
}

/// The fetched test-bot config, with accessors for one Firebug version
#[derive(Debug)]
pub struct TestBotConfig {
    doc: IniDoc,
}

impl TestBotConfig {
    pub fn parse(input: &str) -> Self {
        Self {
            doc: IniDoc::parse(input),
        }
    }

    fn require(&self, version: &str, key: &str) -> Result<&str> {
        let section = section_name(version);
        self.doc.get(&section, key).ok_or_else(|| {
            Error::Config(format!("Missing '{}' in section '{}'", key, section))
        })
    }

    /// Default test list for a Firebug version
    pub fn test_list(&self, version: &str) -> Result<&str> {
        self.require(version, "TEST_LIST")
    }

    /// URL of the firebug extension archive
    pub fn firebug_xpi(&self, version: &str) -> Result<&str> {
        self.require(version, "FIREBUG_XPI")
    }

    /// URL of the fbtest harness archive
    pub fn fbtest_xpi(&self, version: &str) -> Result<&str> {
        self.require(version, "FBTEST_XPI")
    }

    /// Firefox versions a Firebug release should be tested against (batch mode)
    pub fn firefox_versions(&self, version: &str) -> Result<Vec<String>> {
        Ok(self
            .require(version, "FIREFOX_VERSION")?
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect())
    }
}

/// Config section for a Firebug version, e.g. "Firebug1.7"
pub fn section_name(version: &str) -> String {
    format!("Firebug{}", version)
}

/// Normalize a server path to exactly one trailing slash
pub fn normalize_serverpath(serverpath: &str) -> String {
    format!("{}/", serverpath.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
; test-bot config
[Firebug1.7]
TEST_LIST = http://getfirebug.com/tests/content/testlists/firebug1.7.html
FIREBUG_XPI = http://getfirebug.com/releases/firebug/1.7/firebug-1.7.0.xpi
FBTEST_XPI: http://getfirebug.com/releases/fbtest/1.7/fbtest-1.7.xpi
FIREFOX_VERSION = 3.5,3.6, 3.7

[Firebug1.6]
TEST_LIST = http://getfirebug.com/tests/content/testlists/firebug1.6.html
";

    #[test]
    fn test_parses_sections_and_keys() {
        let config = TestBotConfig::parse(SAMPLE);
        assert_eq!(
            config.test_list("1.7").unwrap(),
            "http://getfirebug.com/tests/content/testlists/firebug1.7.html"
        );
        assert_eq!(
            config.fbtest_xpi("1.7").unwrap(),
            "http://getfirebug.com/releases/fbtest/1.7/fbtest-1.7.xpi"
        );
    }

    #[test]
    fn test_option_names_are_case_insensitive() {
        let doc = IniDoc::parse("[App]\nVersion = 3.6.13\n");
        assert_eq!(doc.get("App", "version"), Some("3.6.13"));
        assert_eq!(doc.get("App", "VERSION"), Some("3.6.13"));
        assert_eq!(doc.get("app", "version"), None);
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let config = TestBotConfig::parse(SAMPLE);
        let err = config.firebug_xpi("1.6").unwrap_err();
        assert!(err.to_string().contains("FIREBUG_XPI"));
        assert!(err.to_string().contains("Firebug1.6"));
    }

    #[test]
    fn test_firefox_versions_split_and_trimmed() {
        let config = TestBotConfig::parse(SAMPLE);
        assert_eq!(
            config.firefox_versions("1.7").unwrap(),
            vec!["3.5", "3.6", "3.7"]
        );
    }

    #[test]
    fn test_serverpath_normalized_to_single_slash() {
        assert_eq!(normalize_serverpath("https://getfirebug.com"), "https://getfirebug.com/");
        assert_eq!(normalize_serverpath("https://getfirebug.com//"), "https://getfirebug.com/");
    }
}
