// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input and output guards for the assistant.
//!
//! [`GuardFilter::is_off_topic`] runs before any provider call or quota
//! check; [`GuardFilter::sanitize`] runs on every model-authored reply;
//! [`replace_model_links`] swaps links the model wrote for the ones the
//! tools actually returned.

use std::sync::LazyLock;

use regex::Regex;

use matbuddy_config::model::GuardConfig;

/// Substrings that mark a message as outside the assistant's scope.
pub const BANNED_KEYWORDS: &[&str] = &[
    "politic",
    "religion",
    "sex",
    "porn",
    "crypto",
    "bitcoin",
    "stock market",
    "invest",
    "gambl",
    "dating",
    "tinder",
    "hack",
    "crack",
    "pirat",
    "torrent",
    "weapon",
];

static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}",
        r"\x{1F300}-\x{1F5FF}",
        r"\x{1F680}-\x{1F6FF}",
        r"\x{1F1E0}-\x{1F1FF}",
        r"\x{1F900}-\x{1F9FF}",
        r"\x{1FA00}-\x{1FA6F}",
        r"\x{1FA70}-\x{1FAFF}",
        r"\x{2702}-\x{27B0}",
        r"\x{FE00}-\x{FE0F}",
        r"\x{200D}",
        r"\x{25A0}-\x{25FF}",
        r"\x{2600}-\x{26FF}",
        "]+",
    ))
    .expect("emoji pattern is valid")
});

static RAW_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url pattern is valid"));

static RUN_OF_BLANKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("blank pattern is valid"));

/// Appended to replies cut at the character ceiling.
pub const ELLIPSIS: &str = "...";

/// Keyword filter and reply sanitizer.
#[derive(Debug, Clone)]
pub struct GuardFilter {
    banned: Vec<String>,
    max_reply_chars: usize,
}

impl GuardFilter {
    pub fn new(config: &GuardConfig) -> Self {
        let banned = BANNED_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .chain(
                config
                    .extra_banned_keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty()),
            )
            .collect();
        Self {
            banned,
            max_reply_chars: config.max_reply_chars,
        }
    }

    /// Case-insensitive substring match against the banned keyword list.
    pub fn is_off_topic(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        match self.banned.iter().find(|kw| lower.contains(kw.as_str())) {
            Some(keyword) => {
                tracing::debug!(%keyword, "off-topic keyword matched");
                true
            }
            None => false,
        }
    }

    /// Normalizes a model reply for delivery.
    ///
    /// Dashes become commas, emoji are removed, markdown header markers are
    /// dropped (keeping the header text), and the result is cut to the
    /// configured character ceiling plus [`ELLIPSIS`].
    pub fn sanitize(&self, reply: &str) -> String {
        let text = reply
            .replace(['\u{2014}', '\u{2013}'], ",")
            .replace(" - ", ", ");
        let text = EMOJI.replace_all(&text, "");

        let text = text
            .split('\n')
            .map(|line| {
                if line.starts_with('#') {
                    line.trim_start_matches('#').trim()
                } else {
                    line
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        let text = match text.char_indices().nth(self.max_reply_chars) {
            Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
            None => text,
        };
        text.trim().to_string()
    }
}

/// Removes every raw link from `reply` and appends `urls`, one per line.
///
/// With no collected URLs the reply is returned untouched.
pub fn replace_model_links(reply: &str, urls: &[String]) -> String {
    if urls.is_empty() {
        return reply.to_string();
    }
    let stripped = RAW_URL.replace_all(reply, "");
    let collapsed = RUN_OF_BLANKS.replace_all(stripped.trim(), " ");
    let mut text = collapsed.trim().trim_end_matches(':').trim_end().to_string();
    for url in urls {
        text.push('\n');
        text.push_str(url);
    }
    text
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn guard() -> GuardFilter {
        GuardFilter::new(&GuardConfig::default())
    }

    #[test]
    fn off_topic_is_case_insensitive_substring() {
        let g = guard();
        assert!(g.is_off_topic("What do you think about POLITICS?"));
        assert!(g.is_off_topic("should I invest in bitcoin"));
        assert!(!g.is_off_topic("what's a kimura"));
        assert!(!g.is_off_topic("how do I escape side control"));
    }

    #[test]
    fn extra_keywords_are_lowercased() {
        let g = GuardFilter::new(&GuardConfig {
            extra_banned_keywords: vec!["  Lottery ".into(), "".into()],
            ..GuardConfig::default()
        });
        assert!(g.is_off_topic("lottery numbers"));
        assert!(!g.is_off_topic("armbar"));
    }

    #[test]
    fn dashes_become_commas() {
        let out = guard().sanitize("nice roll \u{2014} keep going - oss");
        assert_eq!(out, "nice roll , keep going, oss");
    }

    #[test]
    fn emoji_are_stripped() {
        let out = guard().sanitize("let's roll \u{1F94B}\u{1F525} oss \u{2764}\u{FE0F}");
        assert_eq!(out, "let's roll  oss");
    }

    #[test]
    fn header_markers_are_removed_but_text_kept() {
        let out = guard().sanitize("## Kimura\ngrip the wrist\n  # not a header");
        assert_eq!(out, "Kimura\ngrip the wrist\n  # not a header");
    }

    #[test]
    fn long_reply_is_cut_with_ellipsis() {
        let g = GuardFilter::new(&GuardConfig {
            max_reply_chars: 10,
            ..GuardConfig::default()
        });
        assert_eq!(g.sanitize("abcdefghijklmnop"), "abcdefghij...");
        assert_eq!(g.sanitize("abcdefghij"), "abcdefghij");
    }

    #[test]
    fn cut_respects_char_boundaries() {
        let g = GuardFilter::new(&GuardConfig {
            max_reply_chars: 3,
            ..GuardConfig::default()
        });
        assert_eq!(g.sanitize("ñññññ"), "ñññ...");
    }

    #[test]
    fn model_links_are_replaced_by_collected_urls() {
        let urls = vec![
            "https://youtu.be/a".to_string(),
            "https://youtu.be/b".to_string(),
        ];
        let out = replace_model_links(
            "kimura is a shoulder lock, watch here: https://example.com/fake",
            &urls,
        );
        assert_eq!(
            out,
            "kimura is a shoulder lock, watch here\nhttps://youtu.be/a\nhttps://youtu.be/b"
        );
    }

    #[test]
    fn link_replacement_keeps_line_breaks() {
        let urls = vec!["https://youtu.be/a".to_string()];
        let out = replace_model_links("line one http://x.y  \nline two", &urls);
        assert_eq!(out, "line one \nline two\nhttps://youtu.be/a");
    }

    #[test]
    fn no_collected_urls_leaves_reply_alone() {
        let reply = "see https://example.com";
        assert_eq!(replace_model_links(reply, &[]), reply);
    }

    proptest! {
        #[test]
        fn sanitized_reply_respects_ceiling(input in ".{0,3000}") {
            let out = guard().sanitize(&input);
            prop_assert!(out.chars().count() <= 2000 + ELLIPSIS.len());
            prop_assert!(!out.contains('—'));
            prop_assert!(!out.contains('–'));
            prop_assert!(!EMOJI.is_match(&out));
        }
    }
}
