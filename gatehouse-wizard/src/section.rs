use std::fmt;
use std::str::FromStr;

use gatehouse_core::Choice;

/// Independently selectable part of the configure wizard, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Workspace,
    Model,
    Gateway,
    Daemon,
    Health,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Workspace,
        Section::Model,
        Section::Gateway,
        Section::Daemon,
        Section::Health,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Workspace => "workspace",
            Section::Model => "model",
            Section::Gateway => "gateway",
            Section::Daemon => "daemon",
            Section::Health => "health",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Workspace => "Workspace",
            Section::Model => "Model/auth",
            Section::Gateway => "Gateway config",
            Section::Daemon => "Gateway daemon",
            Section::Health => "Health check",
        }
    }

    /// Sections whose answers end up in the config file.
    pub fn writes_config(self) -> bool {
        matches!(self, Section::Workspace | Section::Model | Section::Gateway)
    }

    pub fn choices() -> Vec<Choice> {
        Self::ALL
            .iter()
            .map(|s| Choice::new(s.as_str(), s.label()))
            .collect()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == lower)
            .ok_or_else(|| {
                format!("unknown section '{s}'; expected: workspace, model, gateway, daemon, health")
            })
    }
}

/// Deduplicate and put sections in run order, whatever order they were given in.
pub fn normalize(sections: impl IntoIterator<Item = Section>) -> Vec<Section> {
    let mut out: Vec<Section> = sections.into_iter().collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Section::Workspace, true)]
    #[case(Section::Model, true)]
    #[case(Section::Gateway, true)]
    #[case(Section::Daemon, false)]
    #[case(Section::Health, false)]
    fn config_writing_sections(#[case] section: Section, #[case] writes: bool) {
        assert_eq!(section.writes_config(), writes);
    }

    #[test]
    fn parse_and_normalize() {
        let parsed: Vec<Section> = ["health", "Gateway", "health", "workspace"]
            .iter()
            .map(|s| s.parse().expect("section"))
            .collect();
        assert_eq!(
            normalize(parsed),
            vec![Section::Workspace, Section::Gateway, Section::Health]
        );
        assert!("skills".parse::<Section>().is_err());
    }
}
