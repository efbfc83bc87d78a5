use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::{InitArgs, RemoteAction, RemoteCmd, RemoteSetArgs};
use crate::io::workspace_io::{self, NOVA_DIR, WorkspacePaths};

use super::{HandlerResult, print_json, workspace_start};

const CONFIG_TEMPLATE: &str = r##"[user]
id = "{user}"
{email}
[remote]
# Record store for syncing across devices. Leave unset to work offline.
# Environment overrides: NOVA_SUPABASE_URL, NOVA_SUPABASE_KEY
# url = "https://<project>.supabase.co"
# anon_key = ""
poll_secs = 15

[ai]
# Key: `nova ai key <KEY>` or NOVA_GEMINI_API_KEY
# endpoint = "https://generativelanguage.googleapis.com"
# model = "gemini-2.5-flash"

[progression]
# Level 1 costs base_xp; each level after costs growth_num / growth_den more.
# base_xp = 1000
# growth_num = 3
# growth_den = 2

[canvas]
# compact = false

[ui]
# show_key_hints = false
#
# [ui.colors]
# background = "#0B0B12"
# text = "#C8C8D8"
# highlight = "#00E5FF"
# xp = "#FFD700"
"##;

fn render_config(user_id: &str, email: Option<&str>) -> String {
    let email_line = email
        .map(|e| format!("email = \"{}\"\n", e))
        .unwrap_or_default();
    CONFIG_TEMPLATE
        .replace("{user}", user_id)
        .replace("{email}", &email_line)
}

/// Validate a user id supplied on the command line
fn validate_user_id(id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err("user id cannot be empty".to_string());
    }
    if id.chars().any(|c| c.is_whitespace() || c == '"' || c == '/') {
        return Err(format!(
            "invalid user id \"{}\": no whitespace, quotes or slashes",
            id
        ));
    }
    Ok(())
}

pub fn cmd_init(args: InitArgs, dir: Option<&str>) -> HandlerResult {
    let root: PathBuf = match dir {
        Some(d) => {
            fs::create_dir_all(d)?;
            fs::canonicalize(d)?
        }
        None => std::env::current_dir()?,
    };
    let paths = WorkspacePaths::new(&root);

    if paths.config_path().exists() && !args.force {
        return Err(format!("nova workspace already exists in {}/", paths.nova_dir.display()).into());
    }

    // Note an enclosing workspace
    if let Some(parent) = root.parent()
        && let Ok(outer) = workspace_io::discover_workspace(parent)
    {
        eprintln!("Note: parent workspace found at {}/", outer.nova_dir.display());
        eprintln!("Creating new workspace in ./{}/", NOVA_DIR);
    }

    let user_id = match args.user {
        Some(id) => {
            validate_user_id(&id)?;
            id
        }
        None => uuid::Uuid::new_v4().to_string(),
    };

    fs::create_dir_all(paths.user_dir(&user_id))?;
    workspace_io::atomic_write(
        &paths.config_path(),
        render_config(&user_id, args.email.as_deref()).as_bytes(),
    )?;
    tracing::info!(root = %root.display(), user = %user_id, "workspace initialised");

    println!("Initialized nova workspace for user {}", user_id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

pub(super) fn cmd_remote(args: RemoteCmd, dir: Option<&Path>, json: bool) -> HandlerResult {
    let paths = workspace_io::discover_workspace(&workspace_start(dir)?)?;
    match args.action.unwrap_or(RemoteAction::Show) {
        RemoteAction::Show => {
            let config = workspace_io::load_config(&paths)?;
            let url = config.remote.url.filter(|u| !u.is_empty());
            let has_key = config.remote.anon_key.is_some_and(|k| !k.is_empty());
            if json {
                print_json(&serde_json::json!({
                    "url": url,
                    "has_key": has_key,
                    "poll_secs": config.remote.poll_secs,
                }))?;
            } else {
                match url {
                    Some(url) if has_key => println!("remote: {}", url),
                    Some(url) => println!("remote: {} (no key, offline)", url),
                    None => println!("remote: none (offline)"),
                }
            }
        }
        RemoteAction::Set(RemoteSetArgs { url, key }) => {
            let (_, mut doc) = workspace_io::read_config(&paths)?;
            workspace_io::set_remote(&mut doc, url.trim_end_matches('/'), key.as_deref());
            workspace_io::write_config(&paths, &doc)?;
            println!("remote set: {}", url);
        }
        RemoteAction::Clear => {
            let (_, mut doc) = workspace_io::read_config(&paths)?;
            workspace_io::clear_remote(&mut doc);
            workspace_io::write_config(&paths, &doc)?;
            println!("remote cleared");
        }
    }
    Ok(())
}
