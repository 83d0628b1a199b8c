// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read tools: summaries of the user's record for the model.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Local, NaiveDate};

use matbuddy_core::record::UserRecord;

use crate::builtin::notes;
use crate::call::ToolCall;

const TOOLBOX_PREVIEW: usize = 20;
const COMPLETED_GOALS_PREVIEW: usize = 5;

/// Renders a read tool against an already loaded record.
pub fn read(call: &ToolCall, record: &UserRecord, now: DateTime<Local>) -> String {
    match call {
        ToolCall::GetTrainingNotes { count } => notes::recent(record, *count),
        ToolCall::GetGoals => goals(record),
        ToolCall::GetSchedule => schedule(record),
        ToolCall::GetFocusAndToolbox => focus_and_toolbox(record),
        ToolCall::GetTrainingStats => stats(record, now.date_naive()),
        other => format!("ERROR: {} is not a read tool.", other.name()),
    }
}

fn goals(record: &UserRecord) -> String {
    let active: Vec<&str> = record
        .goals
        .iter()
        .filter(|g| g.is_active())
        .map(|g| g.text.as_str())
        .collect();
    let completed: Vec<&str> = record
        .goals
        .iter()
        .filter(|g| g.is_completed())
        .map(|g| g.text.as_str())
        .collect();

    let mut parts = Vec::new();
    if active.is_empty() {
        parts.push("No active goals.".to_string());
    } else {
        parts.push(format!("Active goals: {}", active.join(", ")));
    }
    if !completed.is_empty() {
        let start = completed.len().saturating_sub(COMPLETED_GOALS_PREVIEW);
        parts.push(format!(
            "Completed goals (recent): {}",
            completed[start..].join(", ")
        ));
    }
    parts.push("\nCOMMAND: /goals to manage goals, /goal to set a new one".to_string());
    parts.join("\n")
}

fn schedule(record: &UserRecord) -> String {
    if record.schedule.is_empty() {
        return "No training schedule set.\nCOMMAND: /schedule to set your training days and times"
            .to_string();
    }
    let entries: Vec<String> = record
        .schedule
        .iter()
        .map(|s| format!("{} at {}", s.day, s.time))
        .collect();
    format!(
        "Training schedule: {}\nCOMMAND: /schedule to change your schedule",
        entries.join(", ")
    )
}

fn focus_and_toolbox(record: &UserRecord) -> String {
    let mut parts = Vec::new();
    match &record.active_drill {
        Some(drill) if !drill.technique.is_empty() => {
            parts.push(format!("Current focus: {}", drill.technique))
        }
        _ => parts.push("No focus technique set.".to_string()),
    }
    if record.toolbox.is_empty() {
        parts.push("Toolbox is empty.".to_string());
    } else {
        let names: Vec<&str> = record
            .toolbox
            .iter()
            .take(TOOLBOX_PREVIEW)
            .map(|t| t.name.as_str())
            .collect();
        parts.push(format!(
            "Toolbox ({} techniques): {}",
            record.toolbox.len(),
            names.join(", ")
        ));
    }
    parts.push(
        "\nCOMMAND: /focus to set or change focus, /toolbox to view known techniques, \
         /technique to browse all"
            .to_string(),
    );
    parts.join("\n")
}

fn stats(record: &UserRecord, today: NaiveDate) -> String {
    let trained: Vec<&str> = record
        .training_log
        .iter()
        .filter(|e| e.trained)
        .map(|e| e.date.as_str())
        .collect();

    let week_start = (today - Duration::days(7)).format("%Y-%m-%d").to_string();
    let week_count = trained.iter().filter(|d| **d >= week_start.as_str()).count();
    let active_goals = record.goals.iter().filter(|g| g.is_active()).count();
    let done_goals = record.goals.iter().filter(|g| g.is_completed()).count();

    format!(
        "Sessions this week: {week_count}. Total trained: {} days. Streak: {} days. \
         Notes: {}. Goals: {active_goals} active, {done_goals} completed.\n\
         COMMAND: /stats for full stats, /goals to manage goals, /notes to view notes",
        trained.len(),
        streak(&trained, today),
        record.notes.len(),
    )
}

/// Consecutive trained days ending today.
fn streak(dates: &[&str], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = dates
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .collect();
    let mut current = today;
    let mut streak = 0;
    while days.contains(&current) {
        streak += 1;
        match current.pred_opt() {
            Some(prev) => current = prev,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use matbuddy_core::record::{ActiveDrill, Goal, ScheduleEntry, ToolboxEntry, TrainingLogEntry};

    use super::*;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn goal(text: &str, status: &str) -> Goal {
        Goal {
            text: text.into(),
            status: status.into(),
            ..Default::default()
        }
    }

    fn trained(date: &str) -> TrainingLogEntry {
        TrainingLogEntry {
            date: date.into(),
            trained: true,
            ..Default::default()
        }
    }

    #[test]
    fn empty_record_has_guidance_everywhere() {
        let record = UserRecord::default();
        assert_eq!(
            read(&ToolCall::GetSchedule, &record, now()),
            "No training schedule set.\nCOMMAND: /schedule to set your training days and times"
        );
        assert_eq!(
            read(&ToolCall::GetGoals, &record, now()),
            "No active goals.\n\nCOMMAND: /goals to manage goals, /goal to set a new one"
        );
        let focus = read(&ToolCall::GetFocusAndToolbox, &record, now());
        assert!(focus.starts_with("No focus technique set.\nToolbox is empty."));
    }

    #[test]
    fn goals_split_active_and_completed() {
        let mut record = UserRecord::default();
        record.goals = vec![
            goal("hit a triangle", "active"),
            goal("learn berimbolo", ""),
            goal("get blue belt", "completed"),
            goal("old goal", "archived"),
        ];
        let out = read(&ToolCall::GetGoals, &record, now());
        assert!(out.starts_with(
            "Active goals: hit a triangle, learn berimbolo\nCompleted goals (recent): get blue belt\n"
        ));
        assert!(!out.contains("old goal"));
    }

    #[test]
    fn schedule_and_focus_are_listed() {
        let mut record = UserRecord::default();
        record.schedule = vec![
            ScheduleEntry { day: "Monday".into(), time: "19:00".into(), ..Default::default() },
            ScheduleEntry { day: "Thursday".into(), time: "18:30".into(), ..Default::default() },
        ];
        record.active_drill = Some(ActiveDrill { technique: "kimura".into(), ..Default::default() });
        record.toolbox = vec![ToolboxEntry { name: "armbar".into(), ..Default::default() }];

        assert_eq!(
            read(&ToolCall::GetSchedule, &record, now()),
            "Training schedule: Monday at 19:00, Thursday at 18:30\n\
             COMMAND: /schedule to change your schedule"
        );
        let focus = read(&ToolCall::GetFocusAndToolbox, &record, now());
        assert!(focus.starts_with("Current focus: kimura\nToolbox (1 techniques): armbar\n"));
    }

    #[test]
    fn stats_count_week_and_streak() {
        let mut record = UserRecord::default();
        record.training_log = vec![
            trained("2026-10-01"),
            trained("2026-10-16"),
            trained("2026-10-17"),
            trained("2026-10-17"),
            trained("2026-10-18"),
            TrainingLogEntry { date: "2026-10-15".into(), trained: false, ..Default::default() },
        ];
        record.goals = vec![goal("a", "active"), goal("b", "completed")];

        let out = read(&ToolCall::GetTrainingStats, &record, now());
        assert!(
            out.starts_with(
                "Sessions this week: 4. Total trained: 5 days. Streak: 3 days. Notes: 0. \
                 Goals: 1 active, 1 completed.\n"
            ),
            "{out}"
        );
    }

    #[test]
    fn streak_is_zero_without_training_today() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(streak(&["2026-10-17", "2026-10-16"], today), 0);
        assert_eq!(streak(&["2026-10-18", "bogus"], today), 1);
    }

    #[test]
    fn action_calls_are_not_read_tools() {
        let out = read(
            &ToolCall::SearchTechnique { query: "kimura".into() },
            &UserRecord::default(),
            now(),
        );
        assert_eq!(out, "ERROR: search_technique is not a read tool.");
    }
}
