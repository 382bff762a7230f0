use std::fmt;

use crate::memory::recall::ContextBlock;
use crate::profile::{Language, LifeStage, Persona, SpiritualTier, UserProfile};

/// Instructional prefix injected ahead of the user's message.
///
/// Built from typed sections that are rendered in a fixed order, so there is
/// no template text left to substitute at runtime.
#[derive(Debug, Clone)]
pub struct PersonalityContext {
    language: LanguageDirective,
    persona: PersonaSection,
    life_stage: LifeStageSection,
    spiritual: SpiritualSection,
    closing: Closing,
}

#[derive(Debug, Clone, Copy)]
struct LanguageDirective(Language);

#[derive(Debug, Clone)]
struct PersonaSection(Persona);

#[derive(Debug, Clone, Copy)]
struct LifeStageSection(LifeStage);

#[derive(Debug, Clone, Copy)]
struct SpiritualSection {
    tier: SpiritualTier,
    percent: f64,
}

#[derive(Debug, Clone, Copy)]
struct Closing(Language);

impl PersonalityContext {
    pub fn compile(profile: &UserProfile) -> Self {
        Self::from_parts(
            Persona::resolve(profile),
            profile.life_stage(),
            profile.spiritual_tier(),
            profile.spiritual_depth_percent,
            profile.language,
        )
    }

    pub fn from_parts(
        persona: Persona,
        life_stage: LifeStage,
        tier: SpiritualTier,
        percent: f64,
        language: Language,
    ) -> Self {
        Self {
            language: LanguageDirective(language),
            persona: PersonaSection(persona),
            life_stage: LifeStageSection(life_stage),
            spiritual: SpiritualSection { tier, percent },
            closing: Closing(language),
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona.0
    }

    pub fn life_stage(&self) -> LifeStage {
        self.life_stage.0
    }

    pub fn spiritual_tier(&self) -> SpiritualTier {
        self.spiritual.tier
    }
}

impl fmt::Display for PersonalityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n\n{}\n\n{}\n\n{}\n\n{}",
            self.language, self.persona, self.life_stage, self.spiritual, self.closing
        )
    }
}

impl fmt::Display for LanguageDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.0.display_name();
        let code = self.0.code();
        writeln!(
            f,
            "[PERSONALITY CONTEXT - Adjust your response tone and style based on this, \
             but maintain all your core identity and response structure]"
        )?;
        writeln!(f)?;
        writeln!(f, "**CRITICAL LANGUAGE INSTRUCTION:**")?;
        writeln!(f, "You MUST respond in {name} ({code}).")?;
        writeln!(
            f,
            "- The user may write in any language, but you MUST always respond in {name}."
        )?;
        writeln!(f, "- This is the user's preferred language setting.")?;
        writeln!(f, "- Do not switch languages mid-conversation.")?;
        write!(
            f,
            "- If the user writes in a different language, acknowledge it but continue \
             responding in {name}."
        )
    }
}

impl fmt::Display for PersonaSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.0;
        let color = p.personality_color;
        writeln!(f, "COMPANION: {} ({})", p.display_name, p.voice.describe())?;
        writeln!(f, "PERSONALITY COLOR: {} ({})", color.name(), color.disc())?;
        writeln!(f, "{}", p.tone_adjustment)?;
        writeln!(f, "COMMUNICATION STYLE: {}", p.communication_style)?;
        writeln!(f, "SCRIPTURE APPROACH: {}", p.scripture_approach)?;
        write!(f, "VOICE & TONE: {}", p.voice_guidelines)
    }
}

impl fmt::Display for LifeStageSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = self.0;
        let (lo, hi) = stage.ages();
        writeln!(f, "USER LIFE STAGE: {} (Ages {lo}-{hi})", stage.name())?;
        writeln!(f, "{}", stage.description())?;
        writeln!(f, "- Guidance: {}", stage.guidance())?;
        write!(f, "- Depth Adjustment: {}", stage.depth_adjustment())
    }
}

impl fmt::Display for SpiritualSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tier = self.tier;
        writeln!(
            f,
            "SPIRITUAL DEPTH LEVEL: {} (Level {}, {}%)",
            tier.stage_name(),
            tier.level(),
            self.percent
        )?;
        writeln!(f, "{}", tier.description())?;
        writeln!(f, "- Approach: {}", tier.approach())?;
        write!(f, "- Scripture Depth: {}", tier.scripture_depth())
    }
}

impl fmt::Display for Closing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Now respond to the user's message below, maintaining your core identity but \
             adjusting tone, style, and depth according to the above context. ALWAYS respond \
             in {} ({})]",
            self.0.display_name(),
            self.0.code()
        )
    }
}

pub struct ContextBuilder;

impl ContextBuilder {
    /// Final prompt for one turn: personality prefix (when a profile is
    /// known), the memory block, then the user's message.
    pub fn build_prompt(
        personality: Option<&PersonalityContext>,
        memory: &ContextBlock,
        user_text: &str,
    ) -> String {
        let mut prompt = String::new();
        if let Some(personality) = personality {
            prompt.push_str(&personality.to_string());
            prompt.push_str("\n\n");
        }
        prompt.push_str(&memory.to_string());
        prompt.push_str("\n\nUser says: ");
        prompt.push_str(user_text);
        prompt
    }
}
