//! Prompt Construction
//!
//! Pure functions that build the prompts sent to the model providers. No
//! I/O and no shared state: the conversation prompt takes an explicit
//! [`ConversationContext`] owned by the caller.

use crate::constants::history::PROMPT_TURNS;
use crate::types::{ConversationContext, SceneUnderstanding, Sender};

use super::provider::{ChatMessage, ChatRole};

/// Instruction for the multimodal scene-understanding call.
pub fn scene_understanding_prompt() -> String {
    "Analyze the image provided and return a structured JSON object.\n\
     The JSON object must contain the following keys:\n\
     1. \"description\": A concise, one-sentence summary of the image.\n\
     2. \"objects\": A list of strings, naming the key objects visible in the image.\n\
     3. \"scene\": A short phrase describing the overall scene or environment \
     (e.g., \"city street at night\", \"kitchen countertop\", \"beach on a sunny day\").\n\
     4. \"mood\": A single word describing the mood or atmosphere of the image \
     (e.g., \"peaceful\", \"energetic\", \"somber\").\n\n\
     Your response MUST be only the valid JSON object, without any surrounding \
     text or markdown formatting."
        .to_string()
}

/// Instruction for the single-object identification call.
pub fn identify_object_prompt() -> String {
    "What is the single, primary object in this image? Respond with ONLY a \
     single word or short phrase, without any extra text."
        .to_string()
}

/// Instruction asking for a dictionary-style definition of one word.
pub fn word_info_prompt(word: &str) -> String {
    format!(
        "Please provide a definition and example sentence for the word '{word}'. \
         Your response MUST be a single, valid JSON object with keys: \"word\", \
         \"definition\", \"example_sentence\", \"pronunciation\", and \"part_of_speech\"."
    )
}

/// Instruction deriving role-play themes from a scene understanding.
pub fn themes_prompt(scene: &SceneUnderstanding) -> String {
    format!(
        "Based on this image analysis:\n\
         Description: {}\n\
         Objects: {}\n\
         Scene: {}\n\n\
         Generate 4 different conversation themes for language learning. Each theme must have:\n\
         - A specific role for the AI (like Chef, Nutritionist, Shopping Assistant, Cultural Guide)\n\
         - A clear scenario description\n\
         - Educational value for vocabulary learning\n\n\
         Your response MUST be a single, valid JSON array of objects. Each object \
         must contain keys: \"id\", \"title\", \"description\", \"role\", \"background\", \"scenario\".",
        scene.description,
        scene.objects.join(", "),
        scene.scene,
    )
}

/// Build the message list for a tutoring reply: role-playing system prompt,
/// then the most recent turns from the transcript, then the new message.
pub fn build_prompt_messages(context: &ConversationContext, new_message: &str) -> Vec<ChatMessage> {
    let system = format!(
        "You are a {role} in a {theme} scenario. {background}\n\
         Your goal is to help the user learn English vocabulary through natural conversation.\n\
         - Stay in character as a {role}.\n\
         - Use vocabulary appropriate for the scenario.\n\
         - Provide helpful explanations when needed.\n\
         - Keep responses conversational and engaging.\n\
         - If the user asks about vocabulary, provide clear definitions and examples.",
        role = context.role,
        theme = context.theme,
        background = context.background,
    );

    let mut messages = vec![ChatMessage::new(ChatRole::System, system)];

    let recent = context
        .history
        .iter()
        .skip(context.history.len().saturating_sub(PROMPT_TURNS));
    for turn in recent {
        let role = match turn.sender {
            Sender::User => ChatRole::User,
            Sender::Assistant => ChatRole::Assistant,
        };
        messages.push(ChatMessage::new(role, turn.message.clone()));
    }

    messages.push(ChatMessage::new(ChatRole::User, new_message.to_string()));
    messages
}
