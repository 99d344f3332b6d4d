use std::fmt;
use std::str::FromStr;

use gatehouse_core::Choice;

/// What the user picked on the "Model/auth choice" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChoice {
    AnthropicOAuth,
    OpenAiCodexOAuth,
    GoogleAntigravityOAuth,
    AnthropicApiKey,
    /// Local LM Studio endpoint; no handshake.
    LmStudio,
    Skip,
}

impl AuthChoice {
    pub const ALL: [AuthChoice; 6] = [
        AuthChoice::AnthropicOAuth,
        AuthChoice::OpenAiCodexOAuth,
        AuthChoice::GoogleAntigravityOAuth,
        AuthChoice::AnthropicApiKey,
        AuthChoice::LmStudio,
        AuthChoice::Skip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AuthChoice::AnthropicOAuth => "oauth",
            AuthChoice::OpenAiCodexOAuth => "openai-codex",
            AuthChoice::GoogleAntigravityOAuth => "antigravity",
            AuthChoice::AnthropicApiKey => "api-key",
            AuthChoice::LmStudio => "lmstudio",
            AuthChoice::Skip => "skip",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AuthChoice::AnthropicOAuth => "Anthropic OAuth (Claude Pro/Max)",
            AuthChoice::OpenAiCodexOAuth => "OpenAI Codex (ChatGPT OAuth)",
            AuthChoice::GoogleAntigravityOAuth => {
                "Google Antigravity (Claude Opus 4.5, Gemini 3, etc.)"
            }
            AuthChoice::AnthropicApiKey => "Anthropic API key",
            AuthChoice::LmStudio => "Minimax M2.1 (LM Studio)",
            AuthChoice::Skip => "Skip for now",
        }
    }

    /// Options for the select prompt, in display order.
    pub fn choices() -> Vec<Choice> {
        Self::ALL
            .iter()
            .map(|c| Choice::new(c.as_str(), c.label()))
            .collect()
    }
}

impl fmt::Display for AuthChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown auth choice '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_parse_back() {
        for choice in AuthChoice::choices() {
            let parsed: AuthChoice = choice.value.parse().expect("parse");
            assert_eq!(parsed.as_str(), choice.value);
        }
        assert!("nope".parse::<AuthChoice>().is_err());
    }
}
