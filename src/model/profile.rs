use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl Gender {
    pub fn parse(s: &str) -> Option<Gender> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MALE" => Some(Gender::Male),
            "FEMALE" => Some(Gender::Female),
            "OTHER" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// A journal entry, optionally annotated by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
}

/// The user's identity record ("Identity" screen)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub height: String,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub weight: String,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub age: String,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub gender: Gender,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub dob: String,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub bio: String,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub posts: Vec<Post>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_credits: Option<u32>,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub is_premium: bool,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        UserProfile {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set a profile field by its column name
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "email" => self.email = value.to_string(),
            "username" => self.username = value.to_string(),
            "height" => self.height = value.to_string(),
            "weight" => self.weight = value.to_string(),
            "age" => self.age = value.to_string(),
            "dob" => self.dob = value.to_string(),
            "bio" => self.bio = value.to_string(),
            "gender" => {
                self.gender =
                    Gender::parse(value).ok_or_else(|| format!("invalid gender: {}", value))?
            }
            _ => return Err(format!("unknown profile field: {}", key)),
        }
        Ok(())
    }
}
