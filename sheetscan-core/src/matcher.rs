/// Extensions matched when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &[".xls", ".xlsx"];

/// Case-insensitive filename suffix test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMatcher {
    /// Lowercased suffixes, each starting with a dot
    suffixes: Vec<String>,
}

impl ExtensionMatcher {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().to_lowercase();
            if ext.is_empty() || ext == "." {
                continue;
            }
            let suffix = if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            };
            if !suffixes.contains(&suffix) {
                suffixes.push(suffix);
            }
        }
        Self { suffixes }
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }
}

impl Default for ExtensionMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_spreadsheets_case_insensitively() {
        let matcher = ExtensionMatcher::default();
        assert!(matcher.matches("Report.XLS"));
        assert!(matcher.matches("q.xlsx"));
        assert!(matcher.matches("Budget.XlSx"));
        assert!(!matcher.matches("report.doc"));
        assert!(!matcher.matches("xls"));
        assert!(!matcher.matches("notes.xls.txt"));
    }

    #[test]
    fn test_normalizes_configured_extensions() {
        let matcher = ExtensionMatcher::new(["CSV", ".tsv", " ", "csv"]);
        assert_eq!(matcher.suffixes(), &[".csv".to_string(), ".tsv".to_string()]);
        assert!(matcher.matches("data.CSV"));
        assert!(!matcher.matches("datacsv"));
    }

    #[test]
    fn test_empty_matcher_matches_nothing() {
        let matcher = ExtensionMatcher::new(Vec::<String>::new());
        assert!(!matcher.matches("a.xls"));
    }
}
