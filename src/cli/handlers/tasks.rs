use crate::cli::commands::*;
use crate::cli::output::*;
use crate::model::category::Category;
use crate::model::task::{Task, new_id};
use crate::ops::habit_ops;

use super::{
    HandlerResult, Session, parse_complexity, parse_date, print_json, resolve_id, today,
};

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

pub(super) fn cmd_task(args: TaskCmd, s: &mut Session, json: bool) -> HandlerResult {
    match args.action {
        TaskAction::Add(a) => task_add(a, s, json),
        TaskAction::List(a) => task_list(a, s, json),
        TaskAction::Done(a) => {
            let id = resolve_quest(s, &a.id)?;
            let done = s.rt.block_on(s.ws.toggle_task(&id))?;
            if done {
                let xp = s.ws.task(&id).map(|t| t.effective_xp()).unwrap_or_default();
                println!("{} complete (+{} XP)", id, xp);
            } else {
                println!("{} reopened", id);
            }
            Ok(())
        }
        TaskAction::Rm(a) => {
            let id = resolve_quest(s, &a.id)?;
            s.rt.block_on(s.ws.delete_task(&id))?;
            println!("deleted {}", id);
            Ok(())
        }
        TaskAction::Link(a) => {
            let source = resolve_quest(s, &a.source)?;
            let target = resolve_quest(s, &a.target)?;
            if s.rt.block_on(s.ws.connect_tasks(&source, &target))? {
                println!("linked {} -> {}", source, target);
            } else {
                println!("already linked");
            }
            Ok(())
        }
        TaskAction::Unlink(a) => {
            let source = resolve_quest(s, &a.source)?;
            let target = resolve_quest(s, &a.target)?;
            if s.rt.block_on(s.ws.disconnect_tasks(&source, &target))? {
                println!("unlinked {} -> {}", source, target);
            } else {
                println!("no such link");
            }
            Ok(())
        }
        TaskAction::Move(a) => {
            let id = resolve_quest(s, &a.id)?;
            s.rt.block_on(s.ws.move_task(&id, a.x, a.y))?;
            println!("moved {} to ({}, {})", id, a.x, a.y);
            Ok(())
        }
    }
}

fn resolve_quest(s: &Session, query: &str) -> Result<String, String> {
    resolve_id("task", query, s.ws.quests().map(|t| t.id.as_str()))
}

fn task_add(args: TaskAddArgs, s: &mut Session, json: bool) -> HandlerResult {
    let title = args.title.trim();
    if title.is_empty() {
        return Err("task title cannot be empty".into());
    }
    let category = Category::parse(&args.category);
    if category == Category::Habit {
        return Err("use `nova habit add` for habits".into());
    }

    let mut task = Task::new(new_id("task"), title.to_string(), category);
    if let Some(xp) = args.xp {
        task.xp_value = xp;
    }
    if let Some(c) = &args.complexity {
        task.complexity = parse_complexity(c)?;
    }
    if let Some(due) = &args.due {
        task.due_date = Some(habit_ops::date_key(parse_date(due)?));
    }
    task.description = args.desc.filter(|d| !d.trim().is_empty());

    let stored = s.rt.block_on(s.ws.add_task(task))?;
    if json {
        return print_json(&task_to_json(&stored));
    }
    if stored.is_local() && !s.ws.repository().remote().is_offline() {
        eprintln!("warning: remote unreachable, stored locally");
    }
    println!("{}", stored.id);
    Ok(())
}

fn task_list(args: TaskListArgs, s: &Session, json: bool) -> HandlerResult {
    let category = args.category.as_deref().map(Category::parse);
    let tasks: Vec<&Task> = s
        .ws
        .quests()
        .filter(|t| category.as_ref().is_none_or(|c| &t.category == c))
        .filter(|t| !args.done || t.completed)
        .filter(|t| !args.pending || !t.completed)
        .collect();

    if json {
        let out: Vec<TaskJson> = tasks.iter().map(|t| task_to_json(t)).collect();
        return print_json(&out);
    }
    for task in tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Habits
// ---------------------------------------------------------------------------

pub(super) fn cmd_habit(args: HabitCmd, s: &mut Session, json: bool) -> HandlerResult {
    match args.action {
        HabitAction::Add(a) => {
            let title = a.title.trim();
            if title.is_empty() {
                return Err("habit title cannot be empty".into());
            }
            let days = match &a.days {
                Some(spec) => habit_ops::parse_days(spec)?,
                None => Vec::new(),
            };
            let habit = habit_ops::new_habit(title, &days, s.ws.user_id());
            let stored = s.rt.block_on(s.ws.add_task(habit))?;
            if json {
                let week = habit_ops::week_dates(today(), 0);
                return print_json(&habit_to_json(&stored, &week));
            }
            println!("{}", stored.id);
            Ok(())
        }
        HabitAction::Mark(a) => {
            let id = resolve_id("habit", &a.id, s.ws.habits().map(|t| t.id.as_str()))?;
            let today = today();
            let date = match &a.date {
                Some(d) => parse_date(d)?,
                None => today,
            };
            let marked = s.rt.block_on(s.ws.toggle_habit_day(&id, date, today))?;
            let streak = s
                .ws
                .task(&id)
                .and_then(|t| t.habit.as_ref())
                .map(|h| h.streak_current)
                .unwrap_or_default();
            println!(
                "{} {} {} (streak {})",
                id,
                if marked { "marked" } else { "unmarked" },
                habit_ops::date_key(date),
                streak
            );
            Ok(())
        }
        HabitAction::List(a) => {
            let week = habit_ops::week_dates(today(), a.week);
            if json {
                let out: Vec<HabitJson> = s
                    .ws
                    .habits()
                    .filter_map(|t| habit_to_json(t, &week))
                    .collect();
                return print_json(&out);
            }
            println!("{}", format_week_header(&week));
            for row in s.ws.habits().filter_map(|t| format_habit_row(t, &week)) {
                println!("{}", row);
            }
            Ok(())
        }
        HabitAction::Stats => {
            let stats = HabitStatsJson {
                habits: s.ws.habits().count(),
                completion_rate: habit_ops::completion_rate(s.ws.habits(), today()),
                top_streak: habit_ops::top_streak(s.ws.habits()),
                consistency: habit_ops::consistency_by_weekday(s.ws.habits()),
            };
            if json {
                return print_json(&stats);
            }
            println!("habits:      {}", stats.habits);
            println!("completion:  {}%", stats.completion_rate);
            println!("top streak:  {}", stats.top_streak);
            for line in format_consistency(&stats.consistency) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}
