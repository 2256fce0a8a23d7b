//! Greeting message template.

use serde::Deserialize;

const NAME_PLACEHOLDER: &str = "{name}";

/// Subject/body template; `{name}` is replaced with the person's name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GreetingTemplate {
    pub subject: String,
    pub body: String,
}

impl Default for GreetingTemplate {
    fn default() -> Self {
        Self {
            subject: "Happy Birthday!".to_string(),
            body: "Dear {name},\n\nHappy birthday! May your life be filled with joy and success.\n\n-- Birthday Manager".to_string(),
        }
    }
}

/// Rendered greeting ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub subject: String,
    pub body: String,
}

impl GreetingTemplate {
    pub fn render(&self, name: &str) -> Greeting {
        let name = name.trim();
        Greeting {
            subject: self.subject.replace(NAME_PLACEHOLDER, name),
            body: self.body.replace(NAME_PLACEHOLDER, name),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("subject cannot be empty".to_string());
        }
        if self.body.trim().is_empty() {
            return Err("body cannot be empty".to_string());
        }
        Ok(())
    }
}
