//! Host OS family detection used to pick an account backend.

use std::fmt;

const OS_RELEASE: &str = "/etc/os-release";

/// Detected platform: a primary id (e.g. `ubuntu`) plus the families it
/// declares itself compatible with (e.g. `debian`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Platform {
    pub id: String,
    pub like: Vec<String>,
}

impl Platform {
    /// A platform with no declared relatives, as given by configuration.
    pub fn named(id: &str) -> Self {
        Self {
            id: id.trim().to_ascii_lowercase(),
            like: Vec::new(),
        }
    }

    pub fn detect() -> Self {
        if std::env::consts::OS == "freebsd" {
            return Self::named("freebsd");
        }
        match std::fs::read_to_string(OS_RELEASE) {
            Ok(text) => Self::from_os_release(&text),
            Err(_) => Self::named(std::env::consts::OS),
        }
    }

    /// Parse the `ID` and `ID_LIKE` keys of an os-release file.
    pub fn from_os_release(text: &str) -> Self {
        let mut id = String::new();
        let mut like = Vec::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            match key.trim() {
                "ID" => id = value.to_ascii_lowercase(),
                "ID_LIKE" => {
                    like = value
                        .split_whitespace()
                        .map(str::to_ascii_lowercase)
                        .collect()
                }
                _ => {}
            }
        }
        if id.is_empty() {
            id = "linux".to_string();
        }
        Self { id, like }
    }

    /// All identifiers, most specific first.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.like.iter().map(String::as_str))
    }

    pub fn matches(&self, supported: &[&str]) -> bool {
        self.families().any(|f| supported.contains(&f))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.like.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} (like {})", self.id, self.like.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ubuntu_is_like_debian() {
        let p = Platform::from_os_release(
            "NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\nVERSION_ID=\"24.04\"\n",
        );
        assert_eq!(p.id, "ubuntu");
        assert!(p.matches(&["debian", "centos"]));
        assert_eq!(p.to_string(), "ubuntu (like debian)");
    }

    #[test]
    fn quoted_multi_value_id_like() {
        let p = Platform::from_os_release("ID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\n");
        assert_eq!(p.like, vec!["rhel", "centos", "fedora"]);
        assert!(p.matches(&["centos"]));
    }

    #[test]
    fn arch_matches_nothing_listed() {
        let p = Platform::from_os_release("ID=arch\n");
        assert!(!p.matches(&["debian", "centos"]));
        assert!(!p.matches(&["freebsd"]));
    }

    #[test]
    fn named_normalizes_case() {
        assert_eq!(Platform::named(" FreeBSD ").id, "freebsd");
    }
}
