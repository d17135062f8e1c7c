//! Prompt construction
//!
//! Renders a character's identity, goals, traits and current relationship
//! scores together with the situation into a single instruction prompt.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

use super::{NEUTRAL_RELATIONSHIP, Personality, ResponseContext};

/// Borrowed view of everything a prompt needs from a character
pub struct PromptBuilder<'a> {
    pub name: &'a str,
    pub speaking_style: &'a str,
    pub goals: &'a [String],
    pub personality: &'a Personality,
    pub relationships: &'a IndexMap<String, i32>,
}

impl PromptBuilder<'_> {
    pub fn render(&self, situation: &str, context: Option<&ResponseContext>) -> String {
        let context_json = context
            .filter(|c| !c.is_empty())
            .and_then(|c| to_prompt_json(c).ok())
            .unwrap_or_else(|| "None".to_string());

        format!(
            "You are {name}. Respond naturally in 150-300 words.\n\
             \n\
             PERSONALITY: {style}\n\
             GOAL: {goals}\n\
             PERSONALITY_TRAITS: {traits}{relationships}\n\
             \n\
             SITUATION: {situation}\n\
             CONTEXT: {context}\n\
             \n\
             IMPORTANT: \n\
             - Keep responses concise and complete\n\
             - End sentences properly (., !, ?)\n\
             - Avoid cutting off mid-thought\n\
             - Speak naturally in character\n\
             \n\
             Respond as {name}:",
            name = self.name,
            style = self.speaking_style,
            goals = self.goals.join(", "),
            traits = self.personality.render(),
            relationships = self.relationship_line(context),
            situation = situation,
            context = context_json,
        )
    }

    /// `\nRelationships: a:5, b:7` for every other listed participant, or empty
    fn relationship_line(&self, context: Option<&ResponseContext>) -> String {
        let Some(context) = context else {
            return String::new();
        };

        let scores: Vec<String> = context
            .other_characters
            .iter()
            .filter(|other| other.as_str() != self.name)
            .map(|other| {
                let score = self.relationships.get(other).copied().unwrap_or(NEUTRAL_RELATIONSHIP);
                format!("{}:{}", other, score)
            })
            .collect();

        if scores.is_empty() {
            String::new()
        } else {
            format!("\nRelationships: {}", scores.join(", "))
        }
    }
}

/// Compact JSON with `", "` and `": "` separators
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Serialize `value` the way it is embedded in prompt text
pub(crate) fn to_prompt_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
