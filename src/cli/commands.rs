use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nova", about = concat!("[*] nova v", env!("CARGO_PKG_VERSION"), " - level up your life"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "workspace-dir", global = true)]
    pub workspace_dir: Option<String>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// No log output at all
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new nova workspace in the current directory
    Init(InitArgs),
    /// Configure the remote record store
    Remote(RemoteCmd),
    /// Standalone quests on the roadmap
    Task(TaskCmd),
    /// Weekly habits and streaks
    Habit(HabitCmd),
    /// Long-term missions grouping projects
    Mission(MissionCmd),
    /// Projects with phases of steps
    Project(ProjectCmd),
    /// Project phases
    Phase(PhaseCmd),
    /// Project steps (tasks inside a phase)
    Step(StepCmd),
    /// Subtasks of a project step
    Sub(SubCmd),
    /// Link two nodes of a project graph
    Link(NodeLinkArgs),
    /// Remove a link between two project nodes
    Unlink(NodeLinkArgs),
    /// Undo the last project change
    Undo,
    /// Redo the last undone project change
    Redo,
    /// Show level and XP progress
    Level,
    /// Push locally stored tasks and re-fetch from the remote
    Sync,
    /// Search quests, habits and project steps by regex
    Search(SearchArgs),
    /// Show or edit the user profile
    Profile(ProfileCmd),
    /// Model-backed assistants
    Ai(AiCmd),
}

// ---------------------------------------------------------------------------
// Init / remote
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// User id the workspace belongs to (default: a fresh id)
    #[arg(long)]
    pub user: Option<String>,
    /// Email recorded for the user
    #[arg(long)]
    pub email: Option<String>,
    /// Reinitialize even if .nova/ already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct RemoteCmd {
    #[command(subcommand)]
    pub action: Option<RemoteAction>,
}

#[derive(Subcommand)]
pub enum RemoteAction {
    /// Show the configured remote (default)
    Show,
    /// Point the workspace at a record store
    Set(RemoteSetArgs),
    /// Work offline only
    Clear,
}

#[derive(Args)]
pub struct RemoteSetArgs {
    /// Base URL of the record store
    pub url: String,
    /// Anonymous API key
    #[arg(long)]
    pub key: Option<String>,
}

// ---------------------------------------------------------------------------
// Standalone tasks
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskCmd {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a quest
    Add(TaskAddArgs),
    /// List quests
    List(TaskListArgs),
    /// Toggle a quest's completion
    Done(IdArg),
    /// Delete a quest
    Rm(IdArg),
    /// Connect two quests on the roadmap
    Link(TaskLinkArgs),
    /// Remove a roadmap connection
    Unlink(TaskLinkArgs),
    /// Place a quest on the roadmap
    Move(TaskMoveArgs),
}

#[derive(Args)]
pub struct TaskAddArgs {
    /// Quest title
    pub title: String,
    /// Category (HOME, FITNESS, MISSION, SKILLS, BUSINESS, ROADMAP or a custom label)
    #[arg(long, short, default_value = "HOME")]
    pub category: String,
    /// XP awarded on completion
    #[arg(long)]
    pub xp: Option<u32>,
    /// Difficulty rank E..S
    #[arg(long)]
    pub complexity: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    /// Longer description
    #[arg(long)]
    pub desc: Option<String>,
}

#[derive(Args)]
pub struct TaskListArgs {
    /// Only this category
    #[arg(long, short)]
    pub category: Option<String>,
    /// Only completed quests
    #[arg(long, conflicts_with = "pending")]
    pub done: bool,
    /// Only open quests
    #[arg(long)]
    pub pending: bool,
}

#[derive(Args)]
pub struct IdArg {
    /// Id or unique id prefix
    pub id: String,
}

#[derive(Args)]
pub struct TaskLinkArgs {
    /// Source quest
    pub source: String,
    /// Target quest
    pub target: String,
}

#[derive(Args)]
pub struct TaskMoveArgs {
    /// Quest to place
    pub id: String,
    /// World x coordinate
    #[arg(allow_negative_numbers = true)]
    pub x: f64,
    /// World y coordinate
    #[arg(allow_negative_numbers = true)]
    pub y: f64,
}

// ---------------------------------------------------------------------------
// Habits
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct HabitCmd {
    #[command(subcommand)]
    pub action: HabitAction,
}

#[derive(Subcommand)]
pub enum HabitAction {
    /// Add a habit
    Add(HabitAddArgs),
    /// Mark or unmark a day
    Mark(HabitMarkArgs),
    /// Show the habit week grid
    List(HabitListArgs),
    /// Completion rate, streaks and weekday consistency
    Stats,
}

#[derive(Args)]
pub struct HabitAddArgs {
    /// Habit title
    pub title: String,
    /// Scheduled days, e.g. MON,WED,FRI (default: every day)
    #[arg(long)]
    pub days: Option<String>,
}

#[derive(Args)]
pub struct HabitMarkArgs {
    /// Habit id or unique prefix
    pub id: String,
    /// Day to toggle (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct HabitListArgs {
    /// Weeks relative to this one (-1 = last week)
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub week: i64,
}

// ---------------------------------------------------------------------------
// Missions and projects
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct MissionCmd {
    #[command(subcommand)]
    pub action: MissionAction,
}

#[derive(Subcommand)]
pub enum MissionAction {
    /// Create a mission
    Add(MissionAddArgs),
    /// List missions
    List,
}

#[derive(Args)]
pub struct MissionAddArgs {
    /// The long-term vision
    pub vision: String,
    /// Field of play (repeatable: BUSINESS, TECH, FITNESS, SKILLS, PERSONAL, ART, OTHER)
    #[arg(long = "field", required = true)]
    pub fields: Vec<String>,
    /// CASUAL, STANDARD or HARDCORE
    #[arg(long, default_value = "STANDARD")]
    pub intensity: String,
    /// Ask the model for objectives and KPIs
    #[arg(long)]
    pub ai: bool,
}

#[derive(Args)]
pub struct ProjectCmd {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project
    Add(ProjectAddArgs),
    /// List projects
    List,
    /// Show a project's phases and steps
    Show(IdArg),
    /// Lay out a project graph (node positions and edge paths)
    Graph(ProjectGraphArgs),
    /// Delete a project
    Rm(IdArg),
}

#[derive(Args)]
pub struct ProjectAddArgs {
    /// Project name
    pub name: String,
    /// BUSINESS, TECH, FITNESS, SKILLS, PERSONAL, ART or OTHER
    #[arg(long, default_value = "OTHER")]
    pub field: String,
    /// STRUCTURED, PARALLEL or SPRINT
    #[arg(long, default_value = "STRUCTURED")]
    pub style: String,
    /// Mission to attach to
    #[arg(long)]
    pub mission: Option<String>,
    /// Ask the model for an execution plan
    #[arg(long)]
    pub ai: bool,
}

#[derive(Args)]
pub struct ProjectGraphArgs {
    /// Project id or unique prefix
    pub id: String,
    /// Step whose subtasks to show
    #[arg(long)]
    pub expand: Option<String>,
    /// Use the compact spacing
    #[arg(long)]
    pub compact: bool,
}

#[derive(Args)]
pub struct PhaseCmd {
    #[command(subcommand)]
    pub action: PhaseAction,
}

#[derive(Subcommand)]
pub enum PhaseAction {
    /// Append a phase
    Add(PhaseAddArgs),
    /// Rename a phase
    Rename(PhaseRenameArgs),
}

#[derive(Args)]
pub struct PhaseAddArgs {
    /// Project id or unique prefix
    pub project: String,
    /// Phase title (default: PHASE <n>)
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct PhaseRenameArgs {
    /// Project id or unique prefix
    pub project: String,
    /// Phase id or unique prefix
    pub phase: String,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct StepCmd {
    #[command(subcommand)]
    pub action: StepAction,
}

#[derive(Subcommand)]
pub enum StepAction {
    /// Add a step to a phase
    Add(StepAddArgs),
    /// Edit a step's fields
    Edit(StepEditArgs),
    /// Toggle a step's completion
    Done(ProjectNodeArgs),
    /// Delete a step
    Rm(ProjectNodeArgs),
}

#[derive(Args)]
pub struct StepAddArgs {
    /// Project id or unique prefix
    pub project: String,
    /// Phase id or unique prefix
    pub phase: String,
    /// Step title
    pub title: String,
}

#[derive(Args)]
pub struct StepEditArgs {
    /// Project id or unique prefix
    pub project: String,
    /// Step id or unique prefix
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    /// Description (empty clears)
    #[arg(long)]
    pub desc: Option<String>,
    /// Link URL (empty clears)
    #[arg(long)]
    pub link: Option<String>,
    /// Link label (empty clears)
    #[arg(long)]
    pub label: Option<String>,
    #[arg(long)]
    pub xp: Option<u32>,
    /// Difficulty rank E..S
    #[arg(long)]
    pub complexity: Option<String>,
    /// Due date (empty clears)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct ProjectNodeArgs {
    /// Project id or unique prefix
    pub project: String,
    /// Node id or unique prefix
    pub id: String,
}

#[derive(Args)]
pub struct SubCmd {
    #[command(subcommand)]
    pub action: SubAction,
}

#[derive(Subcommand)]
pub enum SubAction {
    /// Add a subtask to a step
    Add(SubAddArgs),
    /// Toggle a subtask's completion
    Done(ProjectNodeArgs),
    /// Delete a subtask
    Rm(ProjectNodeArgs),
}

#[derive(Args)]
pub struct SubAddArgs {
    /// Project id or unique prefix
    pub project: String,
    /// Step id or unique prefix
    pub step: String,
    /// Subtask title
    pub title: String,
    /// XP for this subtask
    #[arg(long)]
    pub xp: Option<u32>,
    /// Mark as a blocker
    #[arg(long)]
    pub blocker: bool,
}

#[derive(Args)]
pub struct NodeLinkArgs {
    /// Project id or unique prefix
    pub project: String,
    /// Source step or subtask
    pub source: String,
    /// Target step or subtask
    pub target: String,
}

// ---------------------------------------------------------------------------
// Search / profile
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern to search for
    pub pattern: String,
    /// Limit search to one project
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct ProfileCmd {
    #[command(subcommand)]
    pub action: Option<ProfileAction>,
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile (default)
    Show,
    /// Set a profile field (username, email, height, weight, age, gender, dob, bio)
    Set(ProfileSetArgs),
    /// Upload an avatar image
    Avatar(FileArg),
}

#[derive(Args)]
pub struct ProfileSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Args)]
pub struct FileArg {
    /// Path to an image file
    pub file: String,
}

// ---------------------------------------------------------------------------
// AI
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AiCmd {
    #[command(subcommand)]
    pub action: AiAction,
}

#[derive(Subcommand)]
pub enum AiAction {
    /// Store or clear the model API key
    Key(AiKeyArgs),
    /// Suggest next steps for the roadmap
    Suggest,
    /// Generate a plan of quests
    Plan(AiPlanArgs),
    /// Turn a spoken command into a quest
    Voice(AiVoiceArgs),
    /// Diagnose a failing habit
    Doctor(IdArg),
    /// Weigh a decision
    Decide(PromptArg),
    /// Generate ritual steps
    Ritual(PromptArg),
    /// Analyze a physique photo
    Physique(FileArg),
    /// Learning path for a skill
    Skill(PromptArg),
    /// Tactical options for a scenario
    War(PromptArg),
    /// Supplement, sleep and diet protocol
    Bio(PromptArg),
    /// Journal entry or manifesto
    Codex(PromptArg),
    /// Accountability jab for yesterday's missed quests
    Demon,
}

#[derive(Args)]
pub struct AiKeyArgs {
    /// API key (omit with --clear)
    pub key: Option<String>,
    /// Remove the stored key
    #[arg(long, conflicts_with = "key")]
    pub clear: bool,
}

#[derive(Args)]
pub struct AiPlanArgs {
    /// Goal or context to plan for
    pub goal: String,
    /// Plan today instead of a project roadmap
    #[arg(long)]
    pub daily: bool,
    /// Add the generated quests
    #[arg(long)]
    pub commit: bool,
}

#[derive(Args)]
pub struct AiVoiceArgs {
    /// Transcribed speech
    pub transcript: String,
    /// Add the quest if one was recognised
    #[arg(long)]
    pub commit: bool,
}

#[derive(Args)]
pub struct PromptArg {
    pub text: String,
}
