//! Agent turn protocol
//!
//! One command in, one outcome out: consult memory, ask the language
//! backend, parse its reply, and either speak it or run exactly one
//! tool. Destructive shell commands are never run on the first pass;
//! they park in a pending confirmation that the next turn answers.

use std::sync::Arc;

use crate::agent::llm::LlmClient;
use crate::agent::parse::{self, AgentReply};
use crate::agent::policy;
use crate::config::Config;
use crate::memory::{Journal, MemoryStore, ProjectLedger};
use crate::reflex;
use crate::tools::{self, ActionRequest, MusicPlayer, ProjectAction};
use crate::{Error, Result};

/// Spoken when the language backend cannot be reached
pub const OFFLINE_REPLY: &str = "I can't reach my language backend right now.";

/// Spoken when a backend reply cannot be understood
pub const CONFUSED_REPLY: &str = "Sorry, I couldn't understand that command.";

/// Spoken when a pending confirmation is rejected
pub const CANCELLED_REPLY: &str = "Cancelled.";

/// Spoken on the way out
const FAREWELL: &str = "Shutting down. Goodbye.";

/// Characters of a tool result echoed after a confirmed action
const RESULT_ECHO_LIMIT: usize = 100;

const VISION_SYSTEM_PROMPT: &str =
    "You are looking at a screenshot of the user's screen. Answer the question \
     about it in one or two short sentences suitable for speech.";

/// Outcome of one handled command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Plain speech; no side effect ran
    Spoken(String),
    /// An action ran; the text describes its result
    ActionExecuted(String),
    /// Orderly shutdown after the farewell is spoken
    Exit(String),
}

impl Outcome {
    /// The text to speak for this outcome
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Spoken(text) | Self::ActionExecuted(text) | Self::Exit(text) => text,
        }
    }
}

/// A deferred destructive action awaiting a yes/no answer
struct PendingConfirmation {
    action: ActionRequest,
}

/// The command-handling brain
pub struct AgentCore {
    llm: LlmClient,
    vision: LlmClient,
    memory: MemoryStore,
    journal: Journal,
    music: Arc<MusicPlayer>,
    project: Option<ProjectLedger>,
    pending: Option<PendingConfirmation>,
    assistant_name: String,
    system_prompt: String,
}

impl AgentCore {
    /// Create the agent with its collaborators
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured
    pub fn new(
        config: &Config,
        memory: MemoryStore,
        journal: Journal,
        music: Arc<MusicPlayer>,
    ) -> Result<Self> {
        let api_key = config.api_keys.openai.clone().unwrap_or_default();
        let llm = LlmClient::new(api_key.clone(), config.agent.model.clone())?;
        let vision = LlmClient::new(api_key, config.agent.vision_model.clone())?;

        Ok(Self {
            llm,
            vision,
            memory,
            journal,
            music,
            project: None,
            pending: None,
            assistant_name: config.assistant_name.clone(),
            system_prompt: build_system_prompt(&config.assistant_name),
        })
    }

    /// Handle one spoken command end to end
    ///
    /// Never fails: every branch, including backend and tool trouble,
    /// resolves to a speakable outcome.
    pub async fn handle(&mut self, command: &str) -> Outcome {
        if self.pending.is_some() {
            return self.resolve_confirmation(command).await;
        }

        let prompt = self.build_user_prompt(command);
        let reply = match self.llm.complete(&self.system_prompt, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "language backend unreachable");
                return Outcome::Spoken(OFFLINE_REPLY.to_string());
            }
        };

        self.handle_reply(command, &reply).await
    }

    /// Process a raw backend reply for `command`
    ///
    /// Split out from [`handle`](Self::handle) so reply handling can be
    /// driven without a live backend.
    pub async fn handle_reply(&mut self, command: &str, reply: &str) -> Outcome {
        let outcome = match parse::parse_reply(reply) {
            Ok(AgentReply::Speech(text)) => Outcome::Spoken(text),
            Ok(AgentReply::Action(action)) => self.plan(action).await,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable backend reply");
                Outcome::Spoken(CONFUSED_REPLY.to_string())
            }
        };

        self.record(command, outcome.text());
        outcome
    }

    /// Defer a destructive action behind a confirmation, or run it
    async fn plan(&mut self, action: ActionRequest) -> Outcome {
        let question = policy::destructive_payload(&action).map(policy::confirmation_question);
        if let Some(question) = question {
            tracing::info!("deferring destructive action behind confirmation");
            self.pending = Some(PendingConfirmation { action });
            return Outcome::Spoken(question);
        }

        if action == ActionRequest::Exit {
            tracing::info!("exit requested");
            return Outcome::Exit(FAREWELL.to_string());
        }

        match self.dispatch(action).await {
            Ok(result) => Outcome::ActionExecuted(result),
            Err(e) => failure_outcome(&e),
        }
    }

    /// Answer an outstanding confirmation; anything non-affirmative cancels
    async fn resolve_confirmation(&mut self, answer: &str) -> Outcome {
        let Some(pending) = self.pending.take() else {
            return Outcome::Spoken(CANCELLED_REPLY.to_string());
        };

        let outcome = if policy::is_affirmative(answer) {
            match self.dispatch(pending.action).await {
                Ok(result) => Outcome::ActionExecuted(format!(
                    "Done. {}",
                    truncate(&result, RESULT_ECHO_LIMIT)
                )),
                Err(e) => failure_outcome(&e),
            }
        } else {
            tracing::info!("pending action cancelled");
            Outcome::Spoken(CANCELLED_REPLY.to_string())
        };

        self.record(answer, outcome.text());
        outcome
    }

    /// Run exactly one tool for the action
    async fn dispatch(&mut self, action: ActionRequest) -> Result<String> {
        tracing::info!(action = action.name(), "dispatching action");
        self.journal.log("action", action.name());

        match action {
            ActionRequest::OpenApp { name } => tools::system::open_app(&name),
            ActionRequest::OpenUrl { url } => tools::system::open_url(&url),
            ActionRequest::WebSearch { query } => tools::system::web_search(&query),
            ActionRequest::MediaControl { action } => tools::system::media_control(action),
            ActionRequest::ReadFile { path } => tools::files::read_file(&path),
            ActionRequest::WriteFile { path, content } => tools::files::write_file(&path, &content),
            ActionRequest::ListDirectory { path } => tools::files::list_directory(&path),
            ActionRequest::RunCommand { command } => tools::shell::run_command(&command).await,
            ActionRequest::QueryTime => Ok(reflex::current_time_phrase()),
            ActionRequest::QueryClipboard => {
                let text = tools::system::query_clipboard()?;
                if text.is_empty() {
                    Ok("The clipboard is empty.".to_string())
                } else {
                    Ok(format!("Clipboard says: {}", truncate(&text, 500)))
                }
            }
            ActionRequest::TypeText { text } => tools::system::type_text(&text),
            ActionRequest::PressKey { key } => tools::system::press_key(&key),
            ActionRequest::PlayMusic { query } => self.music.play(&query),
            ActionRequest::StopMusic => Ok(self.music.stop()),
            ActionRequest::AnalyzeScreen { question } => self.analyze_screen(&question).await,
            ActionRequest::LoadProject { path } => self.load_project(&path),
            ActionRequest::UpdateProject { action, text } => self.update_project(action, &text),
            ActionRequest::Exit => Ok(FAREWELL.to_string()),
        }
    }

    async fn analyze_screen(&self, question: &str) -> Result<String> {
        let png = tools::screen::capture()?;
        let question = if question.is_empty() {
            "Describe what is on the screen right now."
        } else {
            question
        };

        self.vision
            .complete_with_image(VISION_SYSTEM_PROMPT, question, &png)
            .await
    }

    fn load_project(&mut self, path: &str) -> Result<String> {
        let dir = tools::files::expand_tilde(path);
        let ledger = ProjectLedger::load(&dir)?;

        tracing::info!(path = %ledger.path().display(), "project loaded");
        self.project = Some(ledger);
        Ok(format!("Loaded the project at {path}."))
    }

    fn update_project(&mut self, action: ProjectAction, text: &str) -> Result<String> {
        let Some(project) = &self.project else {
            return Ok("No project is loaded.".to_string());
        };

        match action {
            ProjectAction::AddTask => {
                project.add_task(text)?;
                Ok("Added the task.".to_string())
            }
            ProjectAction::CompleteTask => {
                if project.complete_task(text)? {
                    Ok("Checked it off.".to_string())
                } else {
                    Ok(format!("I couldn't find an open task matching {text}."))
                }
            }
            ProjectAction::SetBlocker => {
                project.set_blocker(text)?;
                Ok("Noted the blocker.".to_string())
            }
        }
    }

    /// Prompt assembly: recall context, journal, project context, then the
    /// command
    fn build_user_prompt(&self, command: &str) -> String {
        let mut prompt = String::new();

        let context = self.memory.recall_context(command);
        if !context.is_empty() {
            prompt.push_str(&context);
            prompt.push('\n');
        }

        // Questions about the day get today's journal as context
        let lowered = command.to_lowercase();
        if lowered.contains("today") || lowered.contains("journal") {
            let today = self.journal.today();
            if !today.is_empty() {
                prompt.push_str("Today's Journal:\n");
                prompt.push_str(&today);
                prompt.push('\n');
            }
        }

        if let Some(project) = &self.project {
            let project_context = project.context();
            if !project_context.is_empty() {
                prompt.push_str("Current Project:\n");
                prompt.push_str(&project_context);
                prompt.push('\n');
            }
        }

        prompt.push_str(command);
        prompt
    }

    /// Record the exchange to memory and the journal, best-effort
    fn record(&self, command: &str, response: &str) {
        let entry = format!(
            "User: {command} | {}: {}",
            self.assistant_name,
            truncate(response, RESULT_ECHO_LIMIT)
        );

        if let Err(e) = self.memory.remember(&entry, "interaction") {
            tracing::debug!(error = %e, "failed to record interaction");
        }
        self.journal.log("interaction", &entry);
    }
}

/// Convert a tool or backend failure into a speakable outcome
fn failure_outcome(error: &Error) -> Outcome {
    if matches!(error, Error::Backend(_)) {
        tracing::warn!(error = %error, "language backend unreachable");
        return Outcome::Spoken(OFFLINE_REPLY.to_string());
    }

    tracing::warn!(error = %error, "tool failed");
    Outcome::Spoken(format!("That didn't work: {error}"))
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        text.chars().take(limit).collect()
    } else {
        text.to_string()
    }
}

fn build_system_prompt(name: &str) -> String {
    format!(
        "You are {name}, a voice assistant controlling the user's computer. \
         Replies are spoken aloud, so answer in one or two short sentences of plain \
         prose with no markdown. When the user wants something done on the machine, \
         reply with exactly one JSON object and nothing else, choosing one tool:\n\
         {{\"tool\": \"open_app\", \"name\": \"...\"}}\n\
         {{\"tool\": \"open_url\", \"url\": \"https://...\"}}\n\
         {{\"tool\": \"web_search\", \"query\": \"...\"}}\n\
         {{\"tool\": \"media_control\", \"action\": \"play_pause\" | \"next\" | \"previous\"}}\n\
         {{\"tool\": \"read_file\", \"path\": \"...\"}}\n\
         {{\"tool\": \"write_file\", \"path\": \"...\", \"content\": \"...\"}}\n\
         {{\"tool\": \"list_directory\", \"path\": \"...\"}}\n\
         {{\"tool\": \"run_command\", \"command\": \"...\"}}\n\
         {{\"tool\": \"query_time\"}}\n\
         {{\"tool\": \"query_clipboard\"}}\n\
         {{\"tool\": \"type_text\", \"text\": \"...\"}}\n\
         {{\"tool\": \"press_key\", \"key\": \"enter\"}}\n\
         {{\"tool\": \"play_music\", \"query\": \"...\"}}\n\
         {{\"tool\": \"stop_music\"}}\n\
         {{\"tool\": \"analyze_screen\", \"question\": \"...\"}}\n\
         {{\"tool\": \"load_project\", \"path\": \"...\"}}\n\
         {{\"tool\": \"update_project\", \"action\": \"add_task\" | \"complete_task\" | \"set_blocker\", \"text\": \"...\"}}\n\
         {{\"tool\": \"exit\"}}\n\
         Prefer a tool whenever one fits; otherwise just answer."
    )
}
