use std::path::Path;

use crate::cli::commands::{ProfileAction, ProfileCmd, ProfileSetArgs};
use crate::model::profile::UserProfile;

use super::{HandlerResult, Session, print_json};

const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;

pub(super) fn cmd_profile(args: ProfileCmd, s: &mut Session, json: bool) -> HandlerResult {
    let repo = s.ws.repository();
    match args.action.unwrap_or(ProfileAction::Show) {
        ProfileAction::Show => {
            let profile = s.rt.block_on(repo.load_profile())?;
            if json {
                return print_json(&profile);
            }
            for line in format_profile(&profile) {
                println!("{}", line);
            }
        }
        ProfileAction::Set(ProfileSetArgs { key, value }) => {
            let mut profile = s.rt.block_on(repo.load_profile())?;
            profile.set_field(&key.to_ascii_lowercase(), value.trim())?;
            let outcome = s.rt.block_on(repo.save_profile(&profile))?;
            println!("{} set ({})", key, outcome.label());
        }
        ProfileAction::Avatar(file) => {
            let path = Path::new(&file.file);
            let bytes = std::fs::read(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            if bytes.len() > AVATAR_MAX_BYTES {
                return Err(format!("{} is larger than 5 MB", path.display()).into());
            }
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("jpg");
            let url = s.rt.block_on(repo.upload_avatar(bytes, ext))?;
            println!("{}", url);
        }
    }
    Ok(())
}

fn format_profile(p: &UserProfile) -> Vec<String> {
    let or_dash = |v: &str| if v.is_empty() { "-".to_string() } else { v.to_string() };
    vec![
        format!("id:       {}", p.id),
        format!("username: {}", or_dash(&p.username)),
        format!("email:    {}", or_dash(&p.email)),
        format!("avatar:   {}", or_dash(p.avatar_url.as_deref().unwrap_or_default())),
        format!("height:   {}", or_dash(&p.height)),
        format!("weight:   {}", or_dash(&p.weight)),
        format!("age:      {}", or_dash(&p.age)),
        format!("gender:   {}", format!("{:?}", p.gender).to_uppercase()),
        format!("dob:      {}", or_dash(&p.dob)),
        format!("bio:      {}", or_dash(&p.bio)),
        format!("posts:    {}", p.posts.len()),
    ]
}
