use std::fmt;

use serde::{Deserialize, Serialize};

/// Social-comparison framing shown before a block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConditionKind {
    High,
    Low,
    Control,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::High => "High",
            ConditionKind::Low => "Low",
            ConditionKind::Control => "Control",
        }
    }

    /// Control blocks show no comparison element at all.
    pub fn shows_comparison(&self) -> bool {
        !matches!(self, ConditionKind::Control)
    }

    /// The peer-recall question only makes sense after a comparison was shown.
    pub fn requires_recall(&self) -> bool {
        self.shows_comparison()
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub kind: ConditionKind,
    pub reference_text: String,
}

impl Condition {
    pub fn new(kind: ConditionKind, reference_text: impl Into<String>) -> Self {
        Self {
            kind,
            reference_text: reference_text.into(),
        }
    }

    pub fn control() -> Self {
        Self::new(ConditionKind::Control, "")
    }

    /// Text for the block intro, or `None` when the comparison element must be
    /// suppressed entirely.
    pub fn comparison_text(&self) -> Option<&str> {
        if self.kind.shows_comparison() && !self.reference_text.is_empty() {
            Some(self.reference_text.as_str())
        } else {
            None
        }
    }

    /// The three framings used by the default deployment.
    pub fn default_set() -> Vec<Condition> {
        vec![
            Condition::new(
                ConditionKind::High,
                "In a previous session, a Fulbright student completed 30 matrices and earned 30,000 VND in this same task.",
            ),
            Condition::new(
                ConditionKind::Low,
                "In a previous session, a Fulbright student completed 10 matrices and earned 10,000 VND in this same task.",
            ),
            Condition::control(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_suppresses_comparison_even_with_text() {
        let odd = Condition::new(ConditionKind::Control, "should never render");
        assert_eq!(odd.comparison_text(), None);
        assert!(!ConditionKind::Control.requires_recall());
    }

    #[test]
    fn framed_conditions_show_text_and_need_recall() {
        for condition in Condition::default_set()
            .into_iter()
            .filter(|c| c.kind != ConditionKind::Control)
        {
            assert!(condition.comparison_text().is_some());
            assert!(condition.kind.requires_recall());
        }
    }

    #[test]
    fn serializes_kind_as_plain_name() {
        let json = serde_json::to_string(&Condition::control()).unwrap();
        assert_eq!(json, r#"{"kind":"Control","referenceText":""}"#);
    }
}
