//! Typed records for the account (`passwd`) and group files and their
//! colon-delimited line codec.

use crate::error::FormatErrorKind;

/// Accounts with a uid below this value are system accounts.
pub const SYSTEM_ID_THRESHOLD: u32 = 1000;

/// A record that occupies exactly one line of a directory file.
pub trait Record: Clone + std::fmt::Debug {
    /// Number of colon-separated fields on a line.
    const FIELDS: usize;
    /// Human readable record kind, used in error messages.
    const KIND: &'static str;

    fn from_fields(fields: &[&str]) -> Result<Self, FormatErrorKind>;

    fn to_line(&self) -> String;

    /// Unique key within the file.
    fn name(&self) -> &str;

    fn parse_line(line: &str) -> Result<Self, FormatErrorKind> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != Self::FIELDS {
            return Err(FormatErrorKind::FieldCount {
                expected: Self::FIELDS,
                found: fields.len(),
            });
        }
        if fields[0].is_empty() {
            return Err(FormatErrorKind::EmptyName);
        }
        Self::from_fields(&fields)
    }
}

/// One line of the account file:
/// `login:password:uid:gid:comment:home:shell`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountEntry {
    pub name: String,
    /// Kept verbatim; usually `x` pointing at the shadow file.
    pub password: String,
    pub uid: u32,
    pub gid: u32,
    pub comment: String,
    pub home: String,
    pub shell: String,
}

impl AccountEntry {
    pub fn is_system(&self) -> bool {
        self.uid < SYSTEM_ID_THRESHOLD
    }

    pub fn is_regular(&self) -> bool {
        !self.is_system()
    }
}

impl Record for AccountEntry {
    const FIELDS: usize = 7;
    const KIND: &'static str = "account";

    fn from_fields(f: &[&str]) -> Result<Self, FormatErrorKind> {
        Ok(Self {
            name: f[0].to_string(),
            password: f[1].to_string(),
            uid: parse_id("uid", f[2])?,
            gid: parse_id("gid", f[3])?,
            comment: f[4].to_string(),
            home: f[5].to_string(),
            shell: f[6].to_string(),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.name, self.password, self.uid, self.gid, self.comment, self.home, self.shell
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One line of the group file: `name:password:gid:member1,member2,...`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub password: String,
    pub gid: u32,
    /// Members in file order; an empty member field is an empty list.
    pub members: Vec<String>,
}

impl GroupEntry {
    pub fn is_system(&self) -> bool {
        self.gid < SYSTEM_ID_THRESHOLD
    }

    pub fn has_member(&self, login: &str) -> bool {
        self.members.iter().any(|m| m == login)
    }
}

impl Record for GroupEntry {
    const FIELDS: usize = 4;
    const KIND: &'static str = "group";

    fn from_fields(f: &[&str]) -> Result<Self, FormatErrorKind> {
        // Split without filtering so that odd spacing like "a,,b" survives a save.
        let members = if f[3].is_empty() {
            Vec::new()
        } else {
            f[3].split(',').map(str::to_string).collect()
        };
        Ok(Self {
            name: f[0].to_string(),
            password: f[1].to_string(),
            gid: parse_id("gid", f[2])?,
            members,
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.name,
            self.password,
            self.gid,
            self.members.join(",")
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Parse a comma separated member list typed by a user, dropping blanks.
pub fn parse_member_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_id(field: &'static str, value: &str) -> Result<u32, FormatErrorKind> {
    let id: u32 = value.parse().map_err(|_| FormatErrorKind::InvalidId {
        field,
        value: value.to_string(),
    })?;
    // "+5" or "007" would parse but not survive a save unchanged.
    if id.to_string() != value {
        return Err(FormatErrorKind::NonCanonicalId {
            field,
            value: value.to_string(),
        });
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_line_parses_all_fields() {
        let a = AccountEntry::parse_line("jdoe:x:1000:1000:John Doe,,,:/home/jdoe:/bin/zsh").unwrap();
        assert_eq!(a.name, "jdoe");
        assert_eq!(a.password, "x");
        assert_eq!(a.uid, 1000);
        assert_eq!(a.gid, 1000);
        assert_eq!(a.comment, "John Doe,,,");
        assert_eq!(a.home, "/home/jdoe");
        assert_eq!(a.shell, "/bin/zsh");
        assert!(a.is_regular());
    }

    #[test]
    fn account_line_keeps_empty_fields() {
        let line = "nobody::65534:65534:::";
        let a = AccountEntry::parse_line(line).unwrap();
        assert_eq!(a.password, "");
        assert_eq!(a.shell, "");
        assert_eq!(a.to_line(), line);
    }

    #[test]
    fn account_line_rejects_wrong_field_count() {
        let err = AccountEntry::parse_line("root:x:0:0:root:/root").unwrap_err();
        assert_eq!(err, FormatErrorKind::FieldCount { expected: 7, found: 6 });
    }

    #[test]
    fn account_line_rejects_bad_ids() {
        assert!(matches!(
            AccountEntry::parse_line("a:x:abc:0:::"),
            Err(FormatErrorKind::InvalidId { field: "uid", .. })
        ));
        assert!(matches!(
            AccountEntry::parse_line("a:x:0:007:::"),
            Err(FormatErrorKind::NonCanonicalId { field: "gid", .. })
        ));
        assert_eq!(
            AccountEntry::parse_line(":x:0:0:::"),
            Err(FormatErrorKind::EmptyName)
        );
    }

    #[test]
    fn system_threshold_boundary() {
        let mut a = AccountEntry::parse_line("svc:x:999:999:::").unwrap();
        assert!(a.is_system());
        a.uid = SYSTEM_ID_THRESHOLD;
        assert!(a.is_regular());
    }

    #[test]
    fn group_line_members() {
        let g = GroupEntry::parse_line("wheel:x:998:root,jdoe").unwrap();
        assert_eq!(g.members, vec!["root".to_string(), "jdoe".to_string()]);
        assert!(g.has_member("jdoe"));
        assert!(g.is_system());

        let empty = GroupEntry::parse_line("root:x:0:").unwrap();
        assert!(empty.members.is_empty());
        assert_eq!(empty.to_line(), "root:x:0:");

        let odd = GroupEntry::parse_line("odd:x:5:a,,b,").unwrap();
        assert_eq!(odd.to_line(), "odd:x:5:a,,b,");
    }

    #[test]
    fn member_list_input_is_trimmed() {
        assert_eq!(parse_member_list(" alice, ,bob,"), vec!["alice", "bob"]);
        assert!(parse_member_list("").is_empty());
    }
}
