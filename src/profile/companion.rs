use serde::{Deserialize, Serialize};

use super::{PersonalityColor, UserProfile};

// --- Voice traits ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    #[default]
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accent {
    #[default]
    American,
    BritishRp,
    Australian,
    AfricanAmericanAave,
    SouthernUs,
    Canadian,
    IndianEnglish,
    LatinAmerican,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeVibe {
    YoungAdult,
    #[default]
    MatureAdult,
    Senior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechPace {
    Slow,
    #[default]
    Normal,
    Energetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalTone {
    CalmSoothing,
    #[default]
    WarmFriendly,
    #[serde(alias = "passionate")]
    PassionateEnergetic,
    GentleGrandmotherly,
}

impl Gender {
    pub const ALL: [Self; 2] = [Self::Male, Self::Female];

    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl Accent {
    pub const ALL: [Self; 8] = [
        Self::American,
        Self::BritishRp,
        Self::Australian,
        Self::AfricanAmericanAave,
        Self::SouthernUs,
        Self::Canadian,
        Self::IndianEnglish,
        Self::LatinAmerican,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::American => "american",
            Self::BritishRp => "british rp",
            Self::Australian => "australian",
            Self::AfricanAmericanAave => "african american aave",
            Self::SouthernUs => "southern us",
            Self::Canadian => "canadian",
            Self::IndianEnglish => "indian english",
            Self::LatinAmerican => "latin american",
        }
    }
}

impl AgeVibe {
    pub const ALL: [Self; 3] = [Self::YoungAdult, Self::MatureAdult, Self::Senior];

    pub fn label(self) -> &'static str {
        match self {
            Self::YoungAdult => "young adult",
            Self::MatureAdult => "mature adult",
            Self::Senior => "senior",
        }
    }
}

impl SpeechPace {
    pub const ALL: [Self; 3] = [Self::Slow, Self::Normal, Self::Energetic];

    pub fn label(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Normal => "normal",
            Self::Energetic => "energetic",
        }
    }
}

impl EmotionalTone {
    pub const ALL: [Self; 4] = [
        Self::CalmSoothing,
        Self::WarmFriendly,
        Self::PassionateEnergetic,
        Self::GentleGrandmotherly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::CalmSoothing => "calm soothing",
            Self::WarmFriendly => "warm friendly",
            Self::PassionateEnergetic => "passionate energetic",
            Self::GentleGrandmotherly => "gentle grandmotherly",
        }
    }

    /// Voice guidance for personas that carry no hand-written guidelines.
    pub fn default_guidelines(self) -> &'static str {
        match self {
            Self::CalmSoothing => {
                "Speak slowly and peacefully. Use phrases like 'Take a breath with me' and \
                 'Let's sit with this together.'"
            }
            Self::WarmFriendly => {
                "Be approachable and encouraging. Use phrases like 'I hear you' and \
                 'That makes so much sense.'"
            }
            Self::PassionateEnergetic => {
                "Be enthusiastic and motivating. Use phrases like 'This is exciting!' and \
                 'You've got this!'"
            }
            Self::GentleGrandmotherly => {
                "Be nurturing and wise. Use phrases like 'Oh honey' and \
                 'Let me share something with you.'"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceTraits {
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub accent: Accent,
    #[serde(default)]
    pub age_vibe: AgeVibe,
    #[serde(default, alias = "speechPace")]
    pub speech_speed: SpeechPace,
    #[serde(default)]
    pub emotional_tone: EmotionalTone,
}

impl VoiceTraits {
    pub fn describe(&self) -> String {
        format!(
            "Voice: {}, Accent: {}, Age vibe: {}, Pace: {}, Tone: {}",
            self.gender.label(),
            self.accent.label(),
            self.age_vibe.label(),
            self.speech_speed.label(),
            self.emotional_tone.label(),
        )
    }
}

// --- Catalog ---

/// Fixed companions available to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Companion {
    Caleb,
    Ruth,
    Solomon,
    Miriam,
}

impl Companion {
    pub const ALL: [Self; 4] = [Self::Caleb, Self::Ruth, Self::Solomon, Self::Miriam];
    pub const DEFAULT: Self = Self::Ruth;

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL.into_iter().find(|c| c.id().eq_ignore_ascii_case(id))
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Caleb => "caleb",
            Self::Ruth => "ruth",
            Self::Solomon => "solomon",
            Self::Miriam => "miriam",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Caleb => "Caleb",
            Self::Ruth => "Ruth",
            Self::Solomon => "Solomon",
            Self::Miriam => "Miriam",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Caleb => "Young warrior of faith, energetic and motivating",
            Self::Ruth => "Loyal companion, warm and empathetic",
            Self::Solomon => "Wise counselor, reflective and deep",
            Self::Miriam => "Spiritual grandmother, loving and comforting",
        }
    }

    pub fn tagline(self) -> &'static str {
        match self {
            Self::Caleb => "Let's conquer this day together!",
            Self::Ruth => "I'm here to walk with you",
            Self::Solomon => "Wisdom begins with a question",
            Self::Miriam => "Come, sit with me a moment",
        }
    }

    pub fn color(self) -> PersonalityColor {
        match self {
            Self::Caleb => PersonalityColor::Red,
            Self::Ruth => PersonalityColor::Yellow,
            Self::Solomon => PersonalityColor::Blue,
            Self::Miriam => PersonalityColor::Green,
        }
    }

    pub fn traits(self) -> VoiceTraits {
        match self {
            Self::Caleb => VoiceTraits {
                gender: Gender::Male,
                accent: Accent::American,
                age_vibe: AgeVibe::YoungAdult,
                speech_speed: SpeechPace::Energetic,
                emotional_tone: EmotionalTone::PassionateEnergetic,
            },
            Self::Ruth => VoiceTraits {
                gender: Gender::Female,
                accent: Accent::BritishRp,
                age_vibe: AgeVibe::MatureAdult,
                speech_speed: SpeechPace::Normal,
                emotional_tone: EmotionalTone::WarmFriendly,
            },
            Self::Solomon => VoiceTraits {
                gender: Gender::Male,
                accent: Accent::BritishRp,
                age_vibe: AgeVibe::Senior,
                speech_speed: SpeechPace::Slow,
                emotional_tone: EmotionalTone::CalmSoothing,
            },
            Self::Miriam => VoiceTraits {
                gender: Gender::Female,
                accent: Accent::SouthernUs,
                age_vibe: AgeVibe::Senior,
                speech_speed: SpeechPace::Slow,
                emotional_tone: EmotionalTone::GentleGrandmotherly,
            },
        }
    }

    pub fn voice_guidelines(self) -> &'static str {
        match self {
            Self::Caleb => {
                "You are Caleb, a young warrior of faith. You speak with energy and passion, \
                 like a coach motivating someone before a big game. You use action-oriented \
                 language, challenge users to step out in faith, and remind them of biblical \
                 heroes who took bold action. Your voice is confident, direct, and inspiring. \
                 You often reference Joshua, David, and Paul's boldness."
            }
            Self::Ruth => {
                "You are Ruth, a loyal and warm companion. You speak with gentleness and deep \
                 empathy, like a trusted friend who truly listens. You validate feelings before \
                 offering wisdom, use inclusive language (\"we\", \"together\"), and share stories \
                 of faithfulness and loyalty. Your voice is nurturing, patient, and encouraging. \
                 You often reference Ruth, Naomi, and Mary's devotion."
            }
            Self::Solomon => {
                "You are Solomon, a wise counselor. You speak slowly and thoughtfully, like a \
                 grandfather sharing life lessons by the fire. You ask probing questions, offer \
                 multiple perspectives, and guide users to discover wisdom themselves. Your voice \
                 is measured, contemplative, and profound. You often reference Proverbs, \
                 Ecclesiastes, and James."
            }
            Self::Miriam => {
                "You are Miriam, a spiritual grandmother. You speak with the warmth of someone \
                 who has walked with God for decades. You use endearing terms, share \"honey, let \
                 me tell you\" stories, and wrap every response in unconditional love and \
                 acceptance. Your voice is comforting, wise, and full of grace. You often \
                 reference the Psalms, Jesus's compassion, and God's faithfulness."
            }
        }
    }

    pub fn card(self) -> CompanionCard {
        CompanionCard {
            id: self.id(),
            name: self.name(),
            description: self.description(),
            tagline: self.tagline(),
            personality_color: self.color(),
            traits: self.traits(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionCard {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub tagline: &'static str,
    pub personality_color: PersonalityColor,
    pub traits: VoiceTraits,
}

/// Everything a premium account may choose from when building its own
/// companion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitOptions {
    pub gender: &'static [Gender],
    pub accent: &'static [Accent],
    pub age_vibe: &'static [AgeVibe],
    pub speech_speed: &'static [SpeechPace],
    pub emotional_tone: &'static [EmotionalTone],
    pub personality_color: &'static [PersonalityColor],
}

pub fn trait_options() -> TraitOptions {
    TraitOptions {
        gender: &Gender::ALL,
        accent: &Accent::ALL,
        age_vibe: &AgeVibe::ALL,
        speech_speed: &SpeechPace::ALL,
        emotional_tone: &EmotionalTone::ALL,
        personality_color: &PersonalityColor::ALL,
    }
}

// --- Premium custom personality ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPersonality {
    #[serde(default = "default_custom_name")]
    pub name: String,
    #[serde(flatten)]
    pub traits: VoiceTraits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality_color: Option<PersonalityColor>,
}

fn default_custom_name() -> String {
    "Companion".into()
}

// --- Resolved persona ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaSource {
    Custom,
    Catalog(Companion),
    Fallback(Companion),
}

/// Tone and style descriptor set handed to the context compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub display_name: String,
    pub personality_color: PersonalityColor,
    pub tone_adjustment: &'static str,
    pub communication_style: &'static str,
    pub scripture_approach: &'static str,
    pub voice: VoiceTraits,
    pub voice_guidelines: &'static str,
    pub source: PersonaSource,
}

impl Persona {
    /// Premium custom traits win, then an explicitly selected catalog
    /// companion, then [`Companion::DEFAULT`]. Catalog personas take their DISC
    /// guidance from the user's own color; a custom persona may override it.
    pub fn resolve(profile: &UserProfile) -> Self {
        if profile.is_premium
            && let Some(custom) = &profile.custom_personality
        {
            let color = custom
                .personality_color
                .unwrap_or(profile.personality_color);
            return Self::build(
                custom.name.clone(),
                color,
                custom.traits,
                custom.traits.emotional_tone.default_guidelines(),
                PersonaSource::Custom,
            );
        }

        let (companion, source) = match profile
            .selected_companion
            .as_deref()
            .and_then(Companion::from_id)
        {
            Some(c) => (c, PersonaSource::Catalog(c)),
            None => (Companion::DEFAULT, PersonaSource::Fallback(Companion::DEFAULT)),
        };
        Self::build(
            companion.name().to_string(),
            profile.personality_color,
            companion.traits(),
            companion.voice_guidelines(),
            source,
        )
    }

    fn build(
        display_name: String,
        color: PersonalityColor,
        voice: VoiceTraits,
        voice_guidelines: &'static str,
        source: PersonaSource,
    ) -> Self {
        Self {
            display_name,
            personality_color: color,
            tone_adjustment: color.tone_adjustment(),
            communication_style: color.communication_style(),
            scripture_approach: color.scripture_approach(),
            voice,
            voice_guidelines,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Language;

    fn profile() -> UserProfile {
        UserProfile {
            personality_color: PersonalityColor::Red,
            spiritual_depth_percent: 47.0,
            age: 35,
            language: Language::En,
            is_premium: false,
            selected_companion: None,
            custom_personality: None,
        }
    }

    fn custom() -> CustomPersonality {
        CustomPersonality {
            name: "Grace".into(),
            traits: VoiceTraits {
                gender: Gender::Female,
                accent: Accent::Australian,
                age_vibe: AgeVibe::YoungAdult,
                speech_speed: SpeechPace::Energetic,
                emotional_tone: EmotionalTone::CalmSoothing,
            },
            personality_color: Some(PersonalityColor::Green),
        }
    }

    #[test]
    fn test_fallback_is_default_companion() {
        let persona = Persona::resolve(&profile());
        assert_eq!(persona.display_name, "Ruth");
        assert_eq!(persona.source, PersonaSource::Fallback(Companion::Ruth));
        assert_eq!(persona.personality_color, PersonalityColor::Red);
        assert_eq!(persona.tone_adjustment, PersonalityColor::Red.tone_adjustment());
    }

    #[test]
    fn test_catalog_lookup_is_case_insensitive() {
        let mut p = profile();
        p.selected_companion = Some("SOLOMON".into());
        let persona = Persona::resolve(&p);
        assert_eq!(persona.source, PersonaSource::Catalog(Companion::Solomon));
        assert_eq!(persona.voice, Companion::Solomon.traits());
        assert_eq!(persona.voice_guidelines, Companion::Solomon.voice_guidelines());
    }

    #[test]
    fn test_unknown_companion_falls_back() {
        let mut p = profile();
        p.selected_companion = Some("goliath".into());
        assert_eq!(
            Persona::resolve(&p).source,
            PersonaSource::Fallback(Companion::DEFAULT)
        );
    }

    #[test]
    fn test_premium_custom_used_verbatim() {
        let mut p = profile();
        p.is_premium = true;
        p.selected_companion = Some("caleb".into());
        p.custom_personality = Some(custom());
        let persona = Persona::resolve(&p);
        assert_eq!(persona.source, PersonaSource::Custom);
        assert_eq!(persona.display_name, "Grace");
        assert_eq!(persona.voice, custom().traits);
        assert_eq!(persona.personality_color, PersonalityColor::Green);
        assert_eq!(
            persona.voice_guidelines,
            EmotionalTone::CalmSoothing.default_guidelines()
        );
    }

    #[test]
    fn test_custom_ignored_without_premium() {
        let mut p = profile();
        p.custom_personality = Some(custom());
        p.selected_companion = Some("miriam".into());
        assert_eq!(
            Persona::resolve(&p).source,
            PersonaSource::Catalog(Companion::Miriam)
        );
    }

    #[test]
    fn test_custom_without_color_uses_profile_color() {
        let mut p = profile();
        p.is_premium = true;
        p.custom_personality = Some(CustomPersonality {
            personality_color: None,
            ..custom()
        });
        assert_eq!(Persona::resolve(&p).personality_color, PersonalityColor::Red);
    }

    #[test]
    fn test_custom_personality_deserializes_backend_shape() {
        let custom: CustomPersonality = serde_json::from_value(serde_json::json!({
            "name": "Joy",
            "gender": "male",
            "accent": "latin_american",
            "ageVibe": "senior",
            "speechSpeed": "slow",
            "emotionalTone": "passionate",
            "personalityColor": "Yellow"
        }))
        .unwrap();
        assert_eq!(custom.name, "Joy");
        assert_eq!(custom.traits.accent, Accent::LatinAmerican);
        assert_eq!(custom.traits.emotional_tone, EmotionalTone::PassionateEnergetic);
        assert_eq!(custom.personality_color, Some(PersonalityColor::Yellow));
    }

    #[test]
    fn test_catalog_ids_round_trip() {
        for c in Companion::ALL {
            assert_eq!(Companion::from_id(c.id()), Some(c));
            assert_eq!(c.card().id, c.id());
        }
    }
}
