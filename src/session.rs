//! Typed session record carried inside the encrypted `cryptsession` cookie.

use serde::{Deserialize, Serialize};

/// Client-side session state.
///
/// Serialized as a compact JSON object: `{"username":"alice"}` once a ticket
/// has been validated, `{}` otherwise. Unknown members are ignored on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

impl Session {
    /// The only constructor that yields an authenticated session.
    pub fn authenticated<S: Into<String>>(username: S) -> Self {
        Session { username: Some(username.into()) }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.username().is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_session_serializes_compactly() {
        let s = Session::authenticated("alice");
        assert_eq!(s.to_json().unwrap(), r#"{"username":"alice"}"#);
        assert!(s.is_authenticated());
        assert_eq!(s.username(), Some("alice"));
    }

    #[test]
    fn empty_session_is_empty_object() {
        let s = Session::default();
        assert_eq!(s.to_json().unwrap(), "{}");
        assert!(!s.is_authenticated());
    }

    #[test]
    fn empty_username_is_not_authenticated() {
        let s = Session::from_json(r#"{"username":""}"#).unwrap();
        assert!(!s.is_authenticated());
        assert_eq!(s.username(), None);
    }

    #[test]
    fn extra_members_are_ignored() {
        let s = Session::from_json(r#"{"username":"bob","theme":"dark"}"#).unwrap();
        assert_eq!(s, Session::authenticated("bob"));
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(Session::from_json("[]").is_err());
        assert!(Session::from_json(r#"{"username":42}"#).is_err());
    }
}
