use std::fmt;

/// One placeholder occurrence that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// The key as written inside the token, trimmed.
    pub key: String,
    /// The full token text that was left in the output.
    pub token: String,
    /// Where the token sits, e.g. `Sheet1!B4` or `word/header1.xml`.
    pub location: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unresolved placeholder '{}' at {} (left as {})",
            self.key, self.location, self.token
        )
    }
}

/// Resolution warnings collected during one fill, in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an unresolved token and logs it.
    pub fn unresolved(&mut self, key: &str, token: &str, location: &str) {
        let warning = Warning {
            key: key.to_string(),
            token: token.to_string(),
            location: location.to_string(),
        };
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    /// Distinct missing keys, first occurrence order.
    pub fn missing_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for w in &self.warnings {
            if !keys.contains(&w.key.as_str()) {
                keys.push(&w.key);
            }
        }
        keys
    }
}
