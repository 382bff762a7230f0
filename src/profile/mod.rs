pub mod color;
pub mod companion;
pub mod life_stage;
pub mod spiritual;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use color::PersonalityColor;
pub use companion::{Companion, CustomPersonality, Persona};
pub use life_stage::LifeStage;
pub use spiritual::SpiritualTier;

pub const DEFAULT_SPIRITUAL_DEPTH: f64 = 10.0;
pub const DEFAULT_AGE: u8 = 30;
pub const MIN_AGE: u8 = 18;
pub const MAX_AGE: u8 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Spanish (Español)",
        }
    }
}

/// Canonical profile. Every primary field is present and in range; build one
/// with [`UserProfile::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub personality_color: PersonalityColor,
    pub spiritual_depth_percent: f64,
    pub age: u8,
    pub language: Language,
    pub is_premium: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_companion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_personality: Option<CustomPersonality>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            personality_color: PersonalityColor::default(),
            spiritual_depth_percent: DEFAULT_SPIRITUAL_DEPTH,
            age: DEFAULT_AGE,
            language: Language::default(),
            is_premium: false,
            selected_companion: None,
            custom_personality: None,
        }
    }
}

impl UserProfile {
    /// Normalize an arbitrary profile-like JSON value. Never fails: bad fields
    /// fall back to defaults and numbers are clamped. Returns `None` only for
    /// `null`, which callers treat as "no personalization".
    pub fn normalize(raw: &Value) -> Option<Self> {
        Self::normalize_on(raw, Utc::now().date_naive())
    }

    /// Same as [`normalize`](Self::normalize) with an explicit "today" used
    /// when the age has to be derived from a birth date.
    pub fn normalize_on(raw: &Value, today: NaiveDate) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        let field = |key: &str| raw.get(key).filter(|v| !v.is_null());

        let personality_color = field("personalityColor")
            .and_then(Value::as_str)
            .and_then(PersonalityColor::parse)
            .unwrap_or_default();

        let spiritual_depth_percent = number(field("spiritualDepthPercent"))
            .or_else(|| {
                number(
                    field("spiritualData").and_then(|d| d.get("spiritual_score_percent")),
                )
            })
            .unwrap_or(DEFAULT_SPIRITUAL_DEPTH)
            .clamp(0.0, 100.0);

        let age = number(field("age"))
            .or_else(|| {
                field("birthDate")
                    .and_then(Value::as_str)
                    .and_then(|s| age_from_birth_date(s, today))
            })
            .map(|a| a.floor().clamp(f64::from(MIN_AGE), f64::from(MAX_AGE)) as u8)
            .unwrap_or(DEFAULT_AGE);

        let language = field("language")
            .and_then(Value::as_str)
            .and_then(Language::parse)
            .unwrap_or_default();

        let is_premium = field("isPremium").is_some_and(|v| match v {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        });

        let selected_companion = field("selectedCompanionId")
            .or_else(|| field("selectedCompanion"))
            .and_then(Value::as_str)
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty());

        let custom_personality = field("customPersonality").and_then(|v| {
            serde_json::from_value::<CustomPersonality>(v.clone())
                .inspect_err(|e| tracing::debug!("Ignoring malformed customPersonality: {e}"))
                .ok()
        });

        Some(Self {
            personality_color,
            spiritual_depth_percent,
            age,
            language,
            is_premium,
            selected_companion,
            custom_personality,
        })
    }

    pub fn life_stage(&self) -> LifeStage {
        LifeStage::classify(u32::from(self.age))
    }

    pub fn spiritual_tier(&self) -> SpiritualTier {
        SpiritualTier::classify(self.spiritual_depth_percent)
    }
}

fn number(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Whole years between `birth` (`YYYY-MM-DD`, optionally followed by a time
/// part) and `today`.
pub fn age_from_birth_date(birth: &str, today: NaiveDate) -> Option<f64> {
    let date_part = birth.trim().get(..10)?;
    let birth = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    Some(f64::from(years))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn renormalize(p: &UserProfile) -> UserProfile {
        UserProfile::normalize_on(&serde_json::to_value(p).unwrap(), today()).unwrap()
    }

    #[test]
    fn test_null_means_no_profile() {
        assert_eq!(UserProfile::normalize_on(&Value::Null, today()), None);
    }

    #[test]
    fn test_empty_object_gets_defaults() {
        let p = UserProfile::normalize_on(&json!({}), today()).unwrap();
        assert_eq!(p, UserProfile::default());
        assert_eq!(p.personality_color, PersonalityColor::Blue);
        assert_eq!(p.spiritual_depth_percent, 10.0);
        assert_eq!(p.age, 30);
        assert_eq!(p.language, Language::En);
    }

    #[test]
    fn test_adversarial_input_is_clamped() {
        let p = UserProfile::normalize_on(
            &json!({
                "personalityColor": "chartreuse",
                "spiritualDepthPercent": 150,
                "age": -4,
                "language": "fr"
            }),
            today(),
        )
        .unwrap();
        assert_eq!(p.personality_color, PersonalityColor::Blue);
        assert_eq!(p.spiritual_depth_percent, 100.0);
        assert_eq!(p.age, 18);
        assert_eq!(p.language, Language::En);

        let p = UserProfile::normalize_on(
            &json!({ "spiritualDepthPercent": -20, "age": 1000 }),
            today(),
        )
        .unwrap();
        assert_eq!(p.spiritual_depth_percent, 0.0);
        assert_eq!(p.age, 120);
    }

    #[test]
    fn test_wrong_types_fall_back() {
        let p = UserProfile::normalize_on(
            &json!({
                "personalityColor": 7,
                "spiritualDepthPercent": "lots",
                "age": ["x"],
                "language": null,
                "isPremium": "nope",
                "customPersonality": "fancy"
            }),
            today(),
        )
        .unwrap();
        assert_eq!(p, UserProfile::default());
    }

    #[test]
    fn test_non_object_input_is_total() {
        for raw in [json!(42), json!("red"), json!([1, 2, 3]), json!(true)] {
            assert_eq!(
                UserProfile::normalize_on(&raw, today()),
                Some(UserProfile::default())
            );
        }
    }

    #[test]
    fn test_scenario_red_builder() {
        let p = UserProfile::normalize_on(
            &json!({
                "personalityColor": "RED",
                "age": 35,
                "spiritualDepthPercent": 47,
                "language": "es"
            }),
            today(),
        )
        .unwrap();
        assert_eq!(p.personality_color, PersonalityColor::Red);
        assert_eq!(p.age, 35);
        assert_eq!(p.spiritual_depth_percent, 47.0);
        assert_eq!(p.language, Language::Es);
        assert_eq!(p.life_stage(), LifeStage::Builder);
        assert_eq!(p.spiritual_tier().level(), 5);
    }

    #[test]
    fn test_zero_depth_is_kept() {
        let p = UserProfile::normalize_on(&json!({ "spiritualDepthPercent": 0 }), today())
            .unwrap();
        assert_eq!(p.spiritual_depth_percent, 0.0);
        assert_eq!(p.spiritual_tier(), SpiritualTier::Awakening);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let p = UserProfile::normalize_on(
            &json!({ "age": "52", "spiritualDepthPercent": " 81.5 " }),
            today(),
        )
        .unwrap();
        assert_eq!(p.age, 52);
        assert_eq!(p.spiritual_depth_percent, 81.5);
    }

    #[test]
    fn test_nested_survey_and_birth_date_shape() {
        let p = UserProfile::normalize_on(
            &json!({
                "isPremium": false,
                "selectedCompanion": "Caleb",
                "birthDate": "1990-07-01",
                "spiritualData": {
                    "spiritual_stage_name": "Growing",
                    "spiritual_score_percent": 62,
                    "spiritual_tier": 7
                }
            }),
            today(),
        )
        .unwrap();
        assert_eq!(p.selected_companion.as_deref(), Some("caleb"));
        assert_eq!(p.age, 34);
        assert_eq!(p.spiritual_depth_percent, 62.0);
    }

    #[test]
    fn test_birth_date_age() {
        assert_eq!(age_from_birth_date("1990-06-15", today()), Some(35.0));
        assert_eq!(age_from_birth_date("1990-06-16", today()), Some(34.0));
        assert_eq!(age_from_birth_date("1990-06-15T00:00:00Z", today()), Some(35.0));
        assert_eq!(age_from_birth_date("15/06/1990", today()), None);
        assert_eq!(age_from_birth_date("", today()), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            json!({}),
            json!({ "personalityColor": "GREEN", "age": 71.9, "spiritualDepthPercent": 33.3 }),
            json!({ "age": -1, "spiritualDepthPercent": 1e9, "language": "ES" }),
            json!({
                "isPremium": true,
                "selectedCompanionId": " Miriam ",
                "customPersonality": { "name": "Hope", "gender": "male", "personalityColor": "Red" }
            }),
            json!("garbage"),
        ];
        for raw in inputs {
            let once = UserProfile::normalize_on(&raw, today()).unwrap();
            assert_eq!(renormalize(&once), once, "not idempotent for {raw}");
        }
    }
}
