use serde::{Deserialize, Serialize};

/// Which area of life a standalone task belongs to.
///
/// The built-in areas are a closed set; anything else is a user-defined
/// category carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Home,
    Fitness,
    Mission,
    Skills,
    Business,
    Projects,
    Habit,
    Roadmap,
    Custom(String),
}

impl Category {
    pub const BUILT_IN: [Category; 8] = [
        Category::Home,
        Category::Fitness,
        Category::Mission,
        Category::Skills,
        Category::Business,
        Category::Projects,
        Category::Habit,
        Category::Roadmap,
    ];

    /// Parse a category tag; unknown tags become custom categories
    pub fn parse(s: &str) -> Category {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOME" => Category::Home,
            "FITNESS" => Category::Fitness,
            "MISSION" => Category::Mission,
            "SKILLS" => Category::Skills,
            "BUSINESS" => Category::Business,
            "PROJECTS" => Category::Projects,
            "HABIT" => Category::Habit,
            "ROADMAP" => Category::Roadmap,
            _ => Category::Custom(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Home => "HOME",
            Category::Fitness => "FITNESS",
            Category::Mission => "MISSION",
            Category::Skills => "SKILLS",
            Category::Business => "BUSINESS",
            Category::Projects => "PROJECTS",
            Category::Habit => "HABIT",
            Category::Roadmap => "ROADMAP",
            Category::Custom(label) => label,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Category::Custom(_))
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::parse(&s)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain a project belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectField {
    #[default]
    Business,
    Tech,
    Fitness,
    Skills,
    Personal,
    Art,
    Other,
}

impl ProjectField {
    pub fn parse(s: &str) -> Option<ProjectField> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUSINESS" => Some(ProjectField::Business),
            "TECH" => Some(ProjectField::Tech),
            "FITNESS" => Some(ProjectField::Fitness),
            "SKILLS" => Some(ProjectField::Skills),
            "PERSONAL" => Some(ProjectField::Personal),
            "ART" => Some(ProjectField::Art),
            "OTHER" => Some(ProjectField::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectField::Business => "BUSINESS",
            ProjectField::Tech => "TECH",
            ProjectField::Fitness => "FITNESS",
            ProjectField::Skills => "SKILLS",
            ProjectField::Personal => "PERSONAL",
            ProjectField::Art => "ART",
            ProjectField::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for ProjectField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a project's phases are meant to be worked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStyle {
    #[default]
    Structured,
    Parallel,
    Sprint,
}

impl ExecutionStyle {
    pub fn parse(s: &str) -> Option<ExecutionStyle> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STRUCTURED" => Some(ExecutionStyle::Structured),
            "PARALLEL" => Some(ExecutionStyle::Parallel),
            "SPRINT" => Some(ExecutionStyle::Sprint),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStyle::Structured => "STRUCTURED",
            ExecutionStyle::Parallel => "PARALLEL",
            ExecutionStyle::Sprint => "SPRINT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_ins_round_trip_through_strings() {
        for cat in Category::BUILT_IN {
            let s: String = cat.clone().into();
            assert_eq!(Category::from(s), cat);
        }
    }

    #[test]
    fn unknown_tags_are_custom() {
        let cat = Category::parse("Meditation");
        assert_eq!(cat, Category::Custom("Meditation".into()));
        assert_eq!(cat.as_str(), "Meditation");
        assert!(cat.is_custom());
    }

    #[test]
    fn category_parse_is_case_insensitive_for_built_ins() {
        assert_eq!(Category::parse("fitness"), Category::Fitness);
        let json = serde_json::to_string(&Category::Habit).unwrap();
        assert_eq!(json, r#""HABIT""#);
    }

    #[test]
    fn field_and_style_parse() {
        assert_eq!(ProjectField::parse("tech"), Some(ProjectField::Tech));
        assert_eq!(ProjectField::parse("nope"), None);
        assert_eq!(ExecutionStyle::parse("Sprint"), Some(ExecutionStyle::Sprint));
    }
}
