use serde::{Deserialize, Serialize};

/// DISC personality color reported by the user's onboarding quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonalityColor {
    #[serde(alias = "Red", alias = "RED")]
    Red,
    #[serde(alias = "Yellow", alias = "YELLOW")]
    Yellow,
    #[serde(alias = "Green", alias = "GREEN")]
    Green,
    #[default]
    #[serde(alias = "Blue", alias = "BLUE")]
    Blue,
}

impl PersonalityColor {
    pub const ALL: [Self; 4] = [Self::Red, Self::Yellow, Self::Green, Self::Blue];

    /// Case-insensitive parse. Unknown values yield `None`; the normalizer
    /// maps that to the default color.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Yellow => "Yellow",
            Self::Green => "Green",
            Self::Blue => "Blue",
        }
    }

    pub fn disc(self) -> &'static str {
        match self {
            Self::Red => "Dominant (D)",
            Self::Yellow => "Influential (I)",
            Self::Green => "Steady (S)",
            Self::Blue => "Conscientious (C)",
        }
    }

    pub fn tone_adjustment(self) -> &'static str {
        match self {
            Self::Red => {
                "Respond with directness and action-orientation. Be concise and results-focused. \
                 Use confident, motivational language. Challenge the user to take action."
            }
            Self::Yellow => {
                "Respond with enthusiasm and warmth. Be engaging and personable. \
                 Use encouraging, optimistic language. Celebrate and inspire."
            }
            Self::Green => {
                "Respond with patience and gentleness. Be calm and reassuring. \
                 Use supportive, empathetic language. Take time to explain."
            }
            Self::Blue => {
                "Respond with thoughtfulness and precision. Be thorough and analytical. \
                 Use methodical, detailed language. Show depth of understanding."
            }
        }
    }

    pub fn communication_style(self) -> &'static str {
        match self {
            Self::Red => {
                "Get to the point quickly. Focus on outcomes and next steps. \
                 Use strong, decisive language."
            }
            Self::Yellow => {
                "Be conversational and energetic. Use stories and examples. \
                 Show excitement and positivity."
            }
            Self::Green => {
                "Be patient and understanding. Listen carefully. Provide steady support. \
                 Avoid rushing."
            }
            Self::Blue => {
                "Be thorough and precise. Provide detailed explanations. Use logical structure. \
                 Ask clarifying questions."
            }
        }
    }

    pub fn scripture_approach(self) -> &'static str {
        match self {
            Self::Red => {
                "Present scripture as actionable principles. Emphasize verses about courage, \
                 leadership, and overcoming challenges."
            }
            Self::Yellow => {
                "Present scripture with stories and context. Emphasize verses about joy, \
                 community, and God's love."
            }
            Self::Green => {
                "Present scripture with care and context. Emphasize verses about peace, \
                 patience, and God's faithfulness."
            }
            Self::Blue => {
                "Present scripture with context and analysis. Emphasize verses about wisdom, \
                 understanding, and God's plan."
            }
        }
    }
}
