use serde::Serialize;

/// Ten-step spiritual depth scale derived from a 0-100 percentage.
///
/// Bucket `k` holds percentages in `(10(k-1), 10k]`; the first bucket also
/// absorbs zero and anything that is not a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SpiritualTier {
    Awakening = 1,
    Exploring = 2,
    Engaging = 3,
    Growing = 4,
    Rooting = 5,
    Flourishing = 6,
    Anchoring = 7,
    Transforming = 8,
    Radiating = 9,
    Abiding = 10,
}

impl SpiritualTier {
    pub const ALL: [Self; 10] = [
        Self::Awakening,
        Self::Exploring,
        Self::Engaging,
        Self::Growing,
        Self::Rooting,
        Self::Flourishing,
        Self::Anchoring,
        Self::Transforming,
        Self::Radiating,
        Self::Abiding,
    ];

    pub fn classify(percent: f64) -> Self {
        if !percent.is_finite() || percent <= 0.0 {
            return Self::Awakening;
        }
        let bucket = (percent / 10.0).ceil().clamp(1.0, 10.0) as u8;
        Self::from_level(bucket).unwrap_or(Self::Abiding)
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(usize::from(level).checked_sub(1)?).copied()
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn stage_name(self) -> &'static str {
        match self {
            Self::Awakening => "Awakening",
            Self::Exploring => "Exploring",
            Self::Engaging => "Engaging",
            Self::Growing => "Growing",
            Self::Rooting => "Rooting",
            Self::Flourishing => "Flourishing",
            Self::Anchoring => "Anchoring",
            Self::Transforming => "Transforming",
            Self::Radiating => "Radiating",
            Self::Abiding => "Abiding",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Awakening => "Brand-new or re-starting seeker",
            Self::Exploring => "Curious, inconsistent practice",
            Self::Engaging => "Building basic habits",
            Self::Growing => "Regular practice emerging",
            Self::Rooting => "Faith becoming a real anchor",
            Self::Flourishing => "Daily rhythm, joy increasing",
            Self::Anchoring => "Deep strength, mentoring others",
            Self::Transforming => "Life is being reshaped",
            Self::Radiating => "Walking in authority & intimacy",
            Self::Abiding => "Fully surrendered, Christlike reflex",
        }
    }

    pub fn approach(self) -> &'static str {
        match self {
            Self::Awakening => {
                "Use simple, clear language. Focus on God's love and grace. Avoid theological \
                 complexity. Be patient and encouraging."
            }
            Self::Exploring => {
                "Encourage curiosity. Help build basic habits. Be supportive. Don't overwhelm."
            }
            Self::Engaging => {
                "Help establish regular practices. Be encouraging about growth. Provide clear \
                 guidance."
            }
            Self::Growing => {
                "Support their growing consistency. Celebrate progress. Provide deeper insights."
            }
            Self::Rooting => {
                "Acknowledge their deepening faith. Provide mature guidance. Encourage service."
            }
            Self::Flourishing => {
                "Engage with their daily rhythm. Provide advanced insights. Encourage mentoring."
            }
            Self::Anchoring => {
                "Respect their spiritual maturity. Provide profound insights. Focus on service."
            }
            Self::Transforming => {
                "Engage at deep level. Trust their maturity. Focus on transformation."
            }
            Self::Radiating => {
                "Engage at expert level. Reference advanced concepts. Focus on authority."
            }
            Self::Abiding => {
                "Engage at deepest level. Reference complex concepts. Trust full maturity."
            }
        }
    }

    pub fn scripture_depth(self) -> &'static str {
        match self {
            Self::Awakening => "Use foundational verses. Explain context simply.",
            Self::Exploring => "Introduce key stories and themes. Connect verses to daily life.",
            Self::Engaging => "Use clear, practical verses. Show how faith applies daily.",
            Self::Growing => "Use more context. Connect verses to spiritual growth.",
            Self::Rooting => "Use verses with theological depth. Discuss spiritual disciplines.",
            Self::Flourishing => "Use complex passages. Discuss deeper meanings.",
            Self::Anchoring => "Reference advanced theology. Explore deeper spiritual concepts.",
            Self::Transforming => "Use complex theological concepts. Discuss life transformation.",
            Self::Radiating => "Use profound theological passages. Discuss spiritual authority.",
            Self::Abiding => "Reference complex theology. Explore deepest spiritual meanings.",
        }
    }
}

pub const SURVEY_MIN_ANSWER: u8 = 1;
pub const SURVEY_MAX_ANSWER: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyScore {
    pub spiritual_score_percent: u8,
    pub spiritual_tier: u8,
    pub spiritual_stage_name: &'static str,
}

/// Score the periodic spiritual survey. Each answer is on a 1-5 scale and is
/// clamped into it; the percentage is the rounded share of the maximum score.
pub fn score_survey(answers: &[u8]) -> Option<SurveyScore> {
    if answers.is_empty() {
        return None;
    }
    let total: u32 = answers
        .iter()
        .map(|a| u32::from((*a).clamp(SURVEY_MIN_ANSWER, SURVEY_MAX_ANSWER)))
        .sum();
    let max = answers.len() as u32 * u32::from(SURVEY_MAX_ANSWER);
    let percent = (f64::from(total) / f64::from(max) * 100.0).round() as u8;
    let tier = SpiritualTier::classify(f64::from(percent));
    Some(SurveyScore {
        spiritual_score_percent: percent,
        spiritual_tier: tier.level(),
        spiritual_stage_name: tier.stage_name(),
    })
}
