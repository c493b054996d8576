use serde::{Deserialize, Serialize};

/// Account role. Exactly one of these three values per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    /// Whether a user with this role may access content gated at `required`.
    /// Admin covers everything, teachers cover student content.
    pub fn can_access(&self, required: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::Teacher => matches!(required, Role::Teacher | Role::Student),
            Role::Student => matches!(required, Role::Student),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.can_access(Role::Student));
        assert!(Role::Admin.can_access(Role::Teacher));
        assert!(Role::Teacher.can_access(Role::Student));
        assert!(!Role::Teacher.can_access(Role::Admin));
        assert!(!Role::Student.can_access(Role::Teacher));
        assert!(Role::Student.can_access(Role::Student));
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        let r: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(r, Role::Admin);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!(Role::from_str("student"), Some(Role::Student));
        assert_eq!(Role::from_str("principal"), None);
    }
}
