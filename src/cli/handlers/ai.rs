use chrono::{Duration, NaiveDate};

use crate::ai::{self, GeminiClient, InlineImage, tools};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::model::category::Category;
use crate::model::task::Task;
use crate::ops::habit_ops;

use super::{HandlerResult, Session, print_json, resolve_id, today};

pub(super) fn cmd_ai(args: AiCmd, s: &mut Session, json: bool) -> HandlerResult {
    match args.action {
        AiAction::Key(k) => ai_key(k, s),
        action => run_tool(action, s, json),
    }
}

fn run_tool(action: AiAction, s: &mut Session, json: bool) -> HandlerResult {
    let client = ai::connect(&s.ws.config.ai, s.ws.cache())?;
    match action {
        AiAction::Key(k) => ai_key(k, s),
        AiAction::Suggest => {
            let tasks: Vec<Task> = s.ws.quests().cloned().collect();
            let text = s.rt.block_on(tools::roadmap_suggestions(&client, &tasks));
            emit_text(&text, json)
        }
        AiAction::Plan(a) => ai_plan(a, s, &client, json),
        AiAction::Voice(a) => {
            let command = s.rt.block_on(tools::parse_voice_command(&client, &a.transcript));
            let Some(task) = command.to_task(s.ws.user_id()) else {
                return Err(format!("no quest recognised in \"{}\"", a.transcript).into());
            };
            let task = if a.commit {
                s.rt.block_on(s.ws.add_task(task))?
            } else {
                task
            };
            if json {
                return print_json(&task_to_json(&task));
            }
            let verb = if a.commit { "added" } else { "parsed" };
            println!("{}: {}", verb, format_task_line(&task));
            Ok(())
        }
        AiAction::Doctor(a) => {
            let id = resolve_id("habit", &a.id, s.ws.habits().map(|t| t.id.as_str()))?;
            let title = s.ws.task(&id).map(|t| t.title.clone()).unwrap_or_default();
            emit_text(&s.rt.block_on(tools::doctor_habit(&client, &title)), json)
        }
        AiAction::Decide(p) => emit_text(&s.rt.block_on(tools::decision_advice(&client, &p.text)), json),
        AiAction::Ritual(p) => {
            let steps = s.rt.block_on(tools::generate_ritual(&client, &p.text));
            if json {
                return print_json(&steps);
            }
            for (i, step) in steps.iter().enumerate() {
                println!("{}. {}", i + 1, step);
            }
            Ok(())
        }
        AiAction::Physique(f) => {
            let bytes = std::fs::read(&f.file).map_err(|e| format!("cannot read {}: {}", f.file, e))?;
            let image = InlineImage::from_bytes(&bytes, mime_for(&f.file));
            emit_text(&s.rt.block_on(tools::analyze_physique(&client, image)), json)
        }
        AiAction::Skill(p) => emit_text(&s.rt.block_on(tools::skill_architect(&client, &p.text)), json),
        AiAction::War(p) => emit_text(&s.rt.block_on(tools::war_room(&client, &p.text)), json),
        AiAction::Bio(p) => emit_text(&s.rt.block_on(tools::bio_hack(&client, &p.text)), json),
        AiAction::Codex(p) => emit_text(&s.rt.block_on(tools::codex_writer(&client, &p.text)), json),
        AiAction::Demon => {
            let missed = missed_on(s.ws.tasks(), today() - Duration::days(1));
            emit_text(&s.rt.block_on(tools::demon_message(&client, missed)), json)
        }
    }
}

fn ai_key(args: AiKeyArgs, s: &Session) -> HandlerResult {
    let cache = s.ws.cache();
    if args.clear {
        cache.clear_ai_key()?;
        println!("AI key cleared");
        return Ok(());
    }
    match args.key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            cache.set_ai_key(key)?;
            println!("AI key stored");
        }
        _ => {
            let state = if ai::resolve_key(cache, |k| std::env::var(k).ok()).is_some() {
                "configured"
            } else {
                "not configured"
            };
            println!("AI key {}", state);
        }
    }
    Ok(())
}

fn ai_plan(args: AiPlanArgs, s: &mut Session, client: &GeminiClient, json: bool) -> HandlerResult {
    let (mode, fallback) = if args.daily {
        (tools::PlanMode::Daily, Category::Home)
    } else {
        (tools::PlanMode::Project, Category::Roadmap)
    };
    let items = s.rt.block_on(tools::generate_plan(client, &args.goal, mode));
    if items.is_empty() {
        return Err("the model returned no plan".into());
    }

    let mut tasks = Vec::with_capacity(items.len());
    for item in &items {
        let task = item.to_task(s.ws.user_id(), fallback.clone());
        if args.commit {
            tasks.push(s.rt.block_on(s.ws.add_task(task))?);
        } else {
            tasks.push(task);
        }
    }

    if json {
        let out: Vec<TaskJson> = tasks.iter().map(task_to_json).collect();
        return print_json(&out);
    }
    for task in &tasks {
        println!("{}", format_task_line(task));
    }
    if !args.commit {
        println!("(preview only, pass --commit to add)");
    }
    Ok(())
}

fn emit_text(text: &str, json: bool) -> HandlerResult {
    if json {
        return print_json(&serde_json::json!({ "text": text }));
    }
    println!("{}", text.trim_end());
    Ok(())
}

/// Open quests due on `day` plus habits scheduled that day and left unmarked
fn missed_on(tasks: &[Task], day: NaiveDate) -> usize {
    let key = habit_ops::date_key(day);
    tasks
        .iter()
        .filter(|t| match &t.habit {
            Some(habit) => habit_ops::is_due(habit, day),
            None => !t.completed && t.due_date.as_deref() == Some(key.as_str()),
        })
        .count()
}

fn mime_for(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Weekday;

    #[test]
    fn missed_counts_due_quests_and_unmarked_habits() {
        // 2025-03-10 is a Monday
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut due = Task::new("t1".into(), "File taxes".into(), Category::Home);
        due.due_date = Some("2025-03-10".into());
        let mut done = due.clone();
        done.id = "t2".into();
        done.completed = true;
        let monday = habit_ops::new_habit("Run", &[Weekday::Mon], "u1");
        let friday = habit_ops::new_habit("Swim", &[Weekday::Fri], "u1");

        assert_eq!(missed_on(&[due, done, monday, friday], day), 2);
    }

    #[test]
    fn image_mime_follows_extension() {
        assert_eq!(mime_for("me.PNG"), "image/png");
        assert_eq!(mime_for("me.jpeg"), "image/jpeg");
    }
}
