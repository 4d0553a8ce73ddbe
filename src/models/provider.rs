//! Provider catalog models.
//!
//! A catalog entry describes one transport provider: what kinds it can
//! process, its selection priority, and the typed configuration parameters
//! its runtime implementation resolves at batch start.

use serde::{Deserialize, Serialize};

use crate::models::message::MessageKind;

/// Typed configuration parameter (parameter-type name → string value)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderParameter {
    pub name: String,
    pub value: String,
}

/// Provider catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: i64,
    /// Unique catalog name
    pub name: String,
    pub can_process_mail: bool,
    pub can_process_text: bool,
    /// Ascending ordering for the matcher; lower wins
    pub priority: i32,
    pub is_disabled: bool,
    /// Opaque selector identifying which runtime contract implementation
    /// to instantiate for this entry
    pub implementation: String,
    /// Ordered parameter set; first match wins on lookup
    pub parameters: Vec<ProviderParameter>,
}

impl Provider {
    /// Whether this provider is capable of processing the given kind
    pub fn can_process(&self, kind: MessageKind) -> bool {
        match kind {
            MessageKind::Mail => self.can_process_mail,
            MessageKind::Text => self.can_process_text,
        }
    }

    /// Looks up a configuration parameter by name
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// NewProvider insert model
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub can_process_mail: bool,
    pub can_process_text: bool,
    pub priority: i32,
    pub is_disabled: bool,
    pub implementation: String,
    pub parameters: Vec<ProviderParameter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Provider {
        Provider {
            id: 1,
            name: "primary-smtp".to_string(),
            can_process_mail: true,
            can_process_text: false,
            priority: 10,
            is_disabled: false,
            implementation: "smtp".to_string(),
            parameters: vec![
                ProviderParameter {
                    name: "smtp-server".to_string(),
                    value: "mail.example.com".to_string(),
                },
                ProviderParameter {
                    name: "smtp-server".to_string(),
                    value: "shadowed.example.com".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_capability_by_kind() {
        let provider = entry();
        assert!(provider.can_process(MessageKind::Mail));
        assert!(!provider.can_process(MessageKind::Text));
    }

    #[test]
    fn test_parameter_first_match_wins() {
        let provider = entry();
        assert_eq!(provider.parameter("smtp-server"), Some("mail.example.com"));
        assert_eq!(provider.parameter("smtp-user"), None);
    }
}
