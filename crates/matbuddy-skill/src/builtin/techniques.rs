// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `search_technique` and `list_techniques`.

use crate::catalog::catalog;
use crate::VIDEO_URL_MARKER;

const MAX_SEARCH_RESULTS: usize = 10;

pub fn search(query: &str) -> String {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return "No technique name provided.".to_string();
    }

    let matches = catalog().search(&query);
    if matches.is_empty() {
        return format!(
            "No technique found for '{query}'. Try a different name or use /technique to browse all.\n\
             COMMAND: /technique to browse all techniques"
        );
    }

    let mut blocks: Vec<String> = matches
        .iter()
        .take(MAX_SEARCH_RESULTS)
        .map(|t| {
            let mut block = format!("TECHNIQUE: {}\nDESCRIPTION: {}", t.name, t.description);
            if !t.video_url.is_empty() {
                block.push_str(&format!("\n{VIDEO_URL_MARKER} {}", t.video_url));
            }
            block
        })
        .collect();
    blocks.push(
        "COMMAND: /focus to set as focus technique, /toolbox to view known techniques".to_string(),
    );
    blocks.join("\n---\n")
}

pub fn list(category: Option<&str>) -> String {
    let Some(query) = category.map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty()) else {
        let lines: Vec<String> = catalog()
            .categories()
            .iter()
            .map(|c| format!("{} ({} techniques)", c.name, c.items.len()))
            .collect();
        return format!(
            "Available categories:\n{}\n\nCOMMAND: /technique to browse all techniques",
            lines.join("\n")
        );
    };

    let Some(cat) = catalog().category(&query) else {
        return format!(
            "No category '{query}' found. Available: escapes, submissions, sweeps, guardpasses, \
             takedowns, positions, ukemi, selfdefense."
        );
    };

    let mut lines = vec![format!("Category: {} ({} techniques)\n", cat.name, cat.items.len())];
    for (i, t) in cat.items.iter().enumerate() {
        let mut line = format!("{}. {}", i + 1, t.name);
        if !t.video_url.is_empty() {
            line.push_str(&format!("\n   {VIDEO_URL_MARKER} {}", t.video_url));
        }
        lines.push(line);
    }
    lines.push(
        "\nCOMMAND: /focus to set a technique as focus, /toolbox to view known techniques, \
         /technique to browse all"
            .to_string(),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_output_carries_marker_and_command() {
        let out = search("  Kimura ");
        assert!(out.starts_with("TECHNIQUE: kimura (double wristlock)\nDESCRIPTION: "));
        assert!(out.contains("\nEXACT_VIDEO_URL: https://youtu.be/tVJpb6zRXxo\n---\nCOMMAND: /focus"));
    }

    #[test]
    fn search_without_hits_suggests_browsing() {
        let out = search("zzzz");
        assert!(out.starts_with("No technique found for 'zzzz'"));
        assert!(out.ends_with("COMMAND: /technique to browse all techniques"));
        assert_eq!(search(""), "No technique name provided.");
    }

    #[test]
    fn search_is_capped_at_ten_results() {
        let out = search("a");
        assert!(out.matches("TECHNIQUE:").count() <= MAX_SEARCH_RESULTS);
    }

    #[test]
    fn listing_without_category_names_all_categories() {
        let out = list(None);
        assert!(out.starts_with("Available categories:\nescapes ("));
        assert!(out.contains("\nself-defense ("));
        assert!(!out.contains(VIDEO_URL_MARKER));
    }

    #[test]
    fn listing_a_category_numbers_items_with_links() {
        let out = list(Some("Sweeps"));
        assert!(out.starts_with("Category: sweeps ("));
        assert!(out.contains("\n1. "));
        assert!(out.contains("\n   EXACT_VIDEO_URL: https://"));
    }

    #[test]
    fn unknown_category_lists_valid_ones() {
        assert!(list(Some("yoga")).starts_with("No category 'yoga' found."));
    }
}
