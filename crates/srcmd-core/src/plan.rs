//! Typed consumers of the tag parser: action plans and generated projects.
//!
//! These give meaning to a fixed vocabulary (`plan`, `planDescription`,
//! `action`, `description`, `file`, `commandType`, `package`, `project`) on
//! top of the vocabulary-free [`TagParser`].
//!
//! Reactions to plan chunks typically run asynchronously and may finish in
//! any order, so every chunk carries its plan id and a sequence number.
//! Consumers must order by `sequence`, never by arrival.

use serde::Serialize;

use crate::error::PlanError;
use crate::tags::{Tag, TagParser, TagSink};

/// The only command a plan may ask for.
pub const NPM_INSTALL: &str = "npm install";

/// One change requested by a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanAction {
    /// Replace `filename` with `contents`.
    File {
        description: String,
        filename: String,
        contents: String,
    },
    /// Run `command` with `packages` as arguments.
    Command {
        description: String,
        command: String,
        packages: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PlanPayload {
    Description(String),
    Action(PlanAction),
}

/// A unit of plan output, emitted as soon as its tag completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanChunk {
    pub plan_id: String,
    /// Position of this chunk within its plan, starting at 0.
    pub sequence: u64,
    #[serde(flatten)]
    pub payload: PlanPayload,
}

/// A fully parsed plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: String,
    pub description: String,
    pub actions: Vec<PlanAction>,
    /// Actions that were present but could not be understood.
    #[serde(skip)]
    pub rejected: Vec<PlanError>,
}

/// Streaming plan parser.
///
/// ```rust
/// use srcmd_core::plan::{PlanParser, PlanPayload};
///
/// let mut parser = PlanParser::new("plan-1");
/// let mut chunks = parser.push("<plan><planDescription><![CDATA[Add a file]]>");
/// chunks.extend(parser.push("</planDescription></plan>"));
/// assert_eq!(chunks[0].payload, PlanPayload::Description("Add a file".into()));
/// let plan = parser.finish().unwrap();
/// assert_eq!(plan.description, "Add a file");
/// ```
pub struct PlanParser {
    parser: TagParser<PlanCollector>,
}

impl PlanParser {
    /// Create a parser whose chunks are tagged with `plan_id`.
    pub fn new(plan_id: impl Into<String>) -> Self {
        Self {
            parser: TagParser::new(PlanCollector {
                plan_id: plan_id.into(),
                next_sequence: 0,
                pending: Vec::new(),
                description: None,
                actions: Vec::new(),
                rejected: Vec::new(),
            }),
        }
    }

    /// Feed a chunk and return the plan chunks it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<PlanChunk> {
        self.parser.parse(chunk);
        std::mem::take(&mut self.parser.sink_mut().pending)
    }

    /// Actions rejected so far.
    pub fn rejected(&self) -> &[PlanError] {
        &self.parser.sink().rejected
    }

    /// End the stream and assemble the plan.
    pub fn finish(self) -> Result<Plan, PlanError> {
        let collector = self.parser.finish()?;
        Ok(Plan {
            id: collector.plan_id,
            description: collector.description.unwrap_or_default(),
            actions: collector.actions,
            rejected: collector.rejected,
        })
    }
}

/// Parse a complete plan response in one call.
pub fn parse_plan(plan_id: impl Into<String>, text: &str) -> Result<Plan, PlanError> {
    let mut parser = PlanParser::new(plan_id);
    parser.push(text);
    parser.finish()
}

struct PlanCollector {
    plan_id: String,
    next_sequence: u64,
    pending: Vec<PlanChunk>,
    description: Option<String>,
    actions: Vec<PlanAction>,
    rejected: Vec<PlanError>,
}

impl PlanCollector {
    fn emit(&mut self, payload: PlanPayload) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending.push(PlanChunk {
            plan_id: self.plan_id.clone(),
            sequence,
            payload,
        });
    }
}

impl TagSink for PlanCollector {
    fn on_tag(&mut self, tag: &Tag) {
        match tag.name.as_str() {
            "planDescription" => {
                let description = tag.content.trim().to_string();
                self.description = Some(description.clone());
                self.emit(PlanPayload::Description(description));
            }
            "action" => match action_from_tag(tag) {
                Ok(action) => {
                    self.actions.push(action.clone());
                    self.emit(PlanPayload::Action(action));
                }
                Err(error) => {
                    tracing::warn!(plan_id = %self.plan_id, %error, "skipping plan action");
                    self.rejected.push(error);
                }
            },
            _ => {}
        }
    }
}

fn action_from_tag(tag: &Tag) -> Result<PlanAction, PlanError> {
    let kind = tag.attribute("type").unwrap_or_default();
    match kind {
        "file" => {
            let file = tag.child("file").ok_or(PlanError::MissingElement {
                action: "file",
                child: "file",
            })?;
            let filename = file.attribute("filename").ok_or(PlanError::MissingFilename)?;
            Ok(PlanAction::File {
                description: description_of(tag),
                filename: filename.to_string(),
                contents: file_contents(&file.content),
            })
        }
        "command" => {
            let command = tag
                .child("commandType")
                .ok_or(PlanError::MissingElement {
                    action: "command",
                    child: "commandType",
                })?
                .content
                .trim();
            if command != NPM_INSTALL {
                return Err(PlanError::UnsupportedCommand(command.to_string()));
            }
            Ok(PlanAction::Command {
                description: description_of(tag),
                command: command.to_string(),
                packages: tag
                    .children_named("package")
                    .map(|package| package.content.trim().to_string())
                    .filter(|package| !package.is_empty())
                    .collect(),
            })
        }
        other => Err(PlanError::UnsupportedAction(other.to_string())),
    }
}

fn description_of(action: &Tag) -> String {
    action
        .child("description")
        .map(|description| description.content.trim().to_string())
        .unwrap_or_default()
}

/// CDATA bodies conventionally start on the line after the opener.
fn file_contents(content: &str) -> String {
    content.strip_prefix('\n').unwrap_or(content).to_string()
}

/// One file of a generated project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectFile {
    pub filename: String,
    pub contents: String,
}

/// A generated project: `<project id="..."><file filename="...">...</file></project>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: Option<String>,
    pub files: Vec<ProjectFile>,
}

/// Parse a complete project response.
pub fn parse_project(text: &str) -> Result<Project, PlanError> {
    let mut project: Option<Tag> = None;
    let mut parser = TagParser::new(|tag: &Tag| {
        if tag.name == "project" && project.is_none() {
            project = Some(tag.clone());
        }
    });
    parser.parse(text);
    parser.finish()?;

    let Some(project) = project else {
        return Ok(Project {
            id: None,
            files: Vec::new(),
        });
    };

    let files = project
        .children_named("file")
        .map(|file| {
            let filename = file.attribute("filename").ok_or(PlanError::MissingFilename)?;
            Ok(ProjectFile {
                filename: filename.to_string(),
                contents: file_contents(&file.content),
            })
        })
        .collect::<Result<Vec<_>, PlanError>>()?;

    Ok(Project {
        id: project.attribute("id").map(str::to_string),
        files,
    })
}
