use serde::Serialize;

/// Age-derived behavioral bucket.
///
/// The closed intervals partition `[18, ∞)`; anything younger collapses to
/// [`LifeStage::Explorer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LifeStage {
    Explorer,
    Builder,
    Guide,
    Legacy,
}

impl LifeStage {
    #[cfg(test)]
    pub const ALL: [Self; 4] = [Self::Explorer, Self::Builder, Self::Guide, Self::Legacy];

    pub fn classify(age: u32) -> Self {
        match age {
            30..=45 => Self::Builder,
            46..=69 => Self::Guide,
            70.. => Self::Legacy,
            _ => Self::Explorer,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Explorer => "Explorer",
            Self::Builder => "Builder",
            Self::Guide => "Guide",
            Self::Legacy => "Legacy",
        }
    }

    /// Nominal age range shown to the agent. Legacy is open-ended in
    /// classification but profiles are clamped to 120.
    pub fn ages(self) -> (u32, u32) {
        match self {
            Self::Explorer => (18, 29),
            Self::Builder => (30, 45),
            Self::Guide => (46, 69),
            Self::Legacy => (70, 120),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Explorer => "Young adults exploring faith and life",
            Self::Builder => "Adults building careers and families",
            Self::Guide => "Mature adults mentoring others",
            Self::Legacy => "Seniors leaving a lasting impact",
        }
    }

    pub fn guidance(self) -> &'static str {
        match self {
            Self::Explorer => {
                "Address their search for identity and purpose. Be relatable and authentic. \
                 Focus on questions about career, relationships, and calling."
            }
            Self::Builder => {
                "Address practical life challenges. Focus on balance, priorities, and building \
                 strong foundations. Be practical and actionable."
            }
            Self::Guide => {
                "Respect their wisdom and experience. Focus on legacy, impact, and deeper \
                 spiritual maturity. Be thoughtful and reflective."
            }
            Self::Legacy => {
                "Honor their life experience. Focus on reflection, wisdom sharing, and eternal \
                 perspective. Be respectful and gentle."
            }
        }
    }

    pub fn depth_adjustment(self) -> &'static str {
        match self {
            Self::Explorer => {
                "Use accessible language. Connect scripture to their daily life experiences."
            }
            Self::Builder => {
                "Provide practical biblical application. Connect to work, family, and life \
                 management."
            }
            Self::Guide => {
                "Engage at deeper theological level. Reference complex concepts and mature \
                 faith practices."
            }
            Self::Legacy => {
                "Engage with profound spiritual concepts. Focus on eternal perspective and wisdom."
            }
        }
    }
}
