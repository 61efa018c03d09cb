//! Session and actor records

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Identity returned by the auth service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Remote session as persisted in local storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as unix seconds
    pub expires_at: i64,
    pub user: AuthUser,
}

impl Session {
    /// A session is expired once `now` reaches its expiry timestamp
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        now_secs >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(crate::util::now_secs())
    }
}

/// The signed-in admin with a resolved role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub email: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: i64) -> Session {
        Session {
            access_token: "t".into(),
            refresh_token: None,
            expires_at,
            user: AuthUser {
                id: "u1".into(),
                email: "a@b.co".into(),
            },
        }
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let s = session(1_000);
        assert!(!s.is_expired_at(999));
        assert!(s.is_expired_at(1_000));
        assert!(s.is_expired_at(1_001));
    }

    #[test]
    fn test_refresh_token_is_optional() {
        let s: Session = serde_json::from_str(
            r#"{"access_token":"x","expires_at":5,"user":{"id":"1","email":"e@x.io"}}"#,
        )
        .unwrap();
        assert!(s.refresh_token.is_none());
    }
}
