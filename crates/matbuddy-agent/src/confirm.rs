// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confirmation of a save offer made in the previous turn.
//!
//! When the assistant's last reply offered to save something as a note and
//! the user answers with a short affirmative, the orchestrator saves the
//! user's earlier message itself instead of asking the model again.

use matbuddy_core::types::{HistoryEntry, Role};

/// History text stored in place of a voice message.
pub const VOICE_PLACEHOLDER: &str = "(voice message)";

/// Substrings of a model reply that mark a save offer.
const OFFER_TRIGGERS: &[&str] = &[
    "save it as a note",
    "save that as a note",
    "save this as a note",
    "save it to your notes",
    "save that to your notes",
    "want me to save",
    "should i save",
    "shall i save",
    "save it for you",
    "log it as a note",
    "log that as a note",
    "als notiz speichern",
    "soll ich das speichern",
    "guardarlo como nota",
    "guardar como nota",
    "enregistrer comme note",
    "salvar como nota",
];

/// Whole-message affirmatives, including multi-word ones.
const AFFIRMATIVES: &[&str] = &[
    "yes", "y", "yeah", "yea", "yep", "yup", "ya", "sure", "ok", "okay", "k", "alright",
    "please", "definitely", "absolutely", "correct", "right", "save", "yes please",
    "sure thing", "go ahead", "do it", "save it", "of course", "why not", "sounds good",
    "ja", "jep", "jawohl", "klar", "gerne", "genau", "ja bitte", "mach das",
    "da", "si", "sí", "claro", "vale", "dale", "oui", "ouais", "sim", "tak", "hai", "evet",
    "oss", "osu",
];

/// Words that carry a yes on their own inside a short reply.
///
/// Verbs and politeness words ("save", "please", "right") only count as a
/// whole message, since "not right" or "no please" are refusals.
const AFFIRMATIVE_WORDS: &[&str] = &[
    "yes", "yeah", "yea", "yep", "yup", "ya", "sure", "ok", "okay", "alright", "definitely",
    "absolutely", "ja", "jep", "jawohl", "klar", "gerne", "genau", "da", "si", "sí", "claro",
    "vale", "dale", "oui", "ouais", "sim", "tak", "evet", "oss", "osu",
];

/// Negation words, after apostrophes are stripped.
const NEGATIONS: &[&str] = &[
    "no", "not", "nope", "nah", "never", "nothing", "dont", "didnt", "doesnt", "wont", "cant",
    "isnt", "wasnt", "hasnt", "havent", "shouldnt", "couldnt", "nein", "nicht", "nichts", "nee",
    "kein", "non", "pas", "não", "nao", "nunca", "nada", "nie", "niet", "net", "hayır", "hayir",
];

/// Messages up to this many words count if any word is an affirmative.
const SHORT_REPLY_WORDS: usize = 3;

/// Returns the text a pending save offer refers to, if the last model reply
/// made one.
///
/// The candidate is the newest user message before that reply that is not a
/// voice placeholder.
pub fn detect_pending_offer(history: &[HistoryEntry]) -> Option<String> {
    let offer_at = history.iter().rposition(|e| e.role == Role::Model)?;
    if !is_offer(&history[offer_at].text) {
        return None;
    }
    history[..offer_at]
        .iter()
        .rev()
        .filter(|e| e.role == Role::User)
        .map(|e| e.text.trim())
        .find(|text| !text.is_empty() && *text != VOICE_PLACEHOLDER)
        .map(str::to_string)
}

fn is_offer(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    OFFER_TRIGGERS.iter().any(|t| lower.contains(t))
}

/// Lower-cased words with punctuation and apostrophes removed.
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word)
}

/// True for a short affirmative answer in any of the supported languages.
///
/// Any negation word makes the answer a refusal.
pub fn is_affirmative(message: &str) -> bool {
    let words = words(message);
    if words.is_empty() || words.iter().any(|w| is_negation(w)) {
        return false;
    }
    if AFFIRMATIVES.contains(&words.join(" ").as_str()) {
        return true;
    }
    words.len() <= SHORT_REPLY_WORDS && words.iter().any(|w| AFFIRMATIVE_WORDS.contains(&w.as_str()))
}

/// Substrings of a reply that acknowledge a completed save.
const SAVE_ACKS: &[&str] = &[
    "saved",
    "i'll save",
    "i will save",
    "noted",
    "logged",
    "gespeichert",
    "guardad",
    "guardé",
    "enregistré",
    "salvo",
    "salvei",
];

/// Word prefixes that name saving, checked for a negation just before them.
const SAVE_STEMS: &[&str] = &["sav", "note", "logg", "gespeichert", "guard", "enregistr", "salv"];

/// How far back from a save word a negation still applies.
const NEGATION_REACH: usize = 3;

/// True when a model reply claims the note was saved.
///
/// A reply that repeats the offer, or negates the save ("haven't saved it
/// yet"), is not an acknowledgement.
pub fn acknowledges_save(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    if !SAVE_ACKS.iter().any(|ack| lower.contains(ack)) || is_offer(reply) {
        return false;
    }
    let words = words(reply);
    let negated = words.iter().enumerate().any(|(i, word)| {
        SAVE_STEMS.iter().any(|stem| word.starts_with(stem))
            && words[i.saturating_sub(NEGATION_REACH)..i].iter().any(|w| is_negation(w))
    });
    !negated
}

/// Cuts `text` to its first `max_words` words.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extra input for a voice turn that may be answering a save offer.
pub fn voice_offer_hint(candidate: &str) -> String {
    format!(
        "(earlier you offered to save this as a note: \"{candidate}\". if the user agrees in \
         this voice message, call save_training_note with a short summary of it.)"
    )
}
