use crate::error::ToolError;
use async_trait::async_trait;
use shared_types::{AskUserRequest, AskUserResponse, UserQuestionResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};

/// Relays ask_user questions to a human and returns their answers.
#[async_trait]
pub trait UserPrompter: Send + Sync {
    async fn ask(&self, request: AskUserRequest) -> Result<AskUserResponse, ToolError>;
}

pub async fn ask_user(
    prompter: Option<&dyn UserPrompter>,
    request: AskUserRequest,
) -> Result<AskUserResponse, ToolError> {
    request.validate().map_err(ToolError::InvalidArgument)?;

    if request.questions.is_empty() {
        return Ok(AskUserResponse {
            completed: true,
            responses: Vec::new(),
            message: "No questions to ask".to_string(),
        });
    }

    let prompter = prompter.ok_or_else(|| {
        ToolError::PermissionDenied("No user is available to answer questions".to_string())
    })?;
    prompter.ask(request).await
}

/// A batch of questions waiting for a host to answer.
#[derive(Debug)]
pub struct PendingPrompt {
    request: AskUserRequest,
    reply: oneshot::Sender<AskUserResponse>,
}

impl PendingPrompt {
    pub fn request(&self) -> &AskUserRequest {
        &self.request
    }

    /// Send the answers back. Returns false when the agent stopped waiting.
    pub fn respond(self, response: AskUserResponse) -> bool {
        self.reply.send(response).is_ok()
    }

    /// Answer every question with the given strings, in question order.
    pub fn answer(self, answers: Vec<String>) -> bool {
        let responses: Vec<UserQuestionResponse> = self
            .request
            .questions
            .iter()
            .zip(answers)
            .map(|(question, answer)| UserQuestionResponse {
                question_id: question.id.clone(),
                answer,
            })
            .collect();
        let completed = responses.len() == self.request.questions.len();
        self.respond(AskUserResponse {
            completed,
            message: format!("User answered {} questions", responses.len()),
            responses,
        })
    }
}

/// Forwards each question batch to a host over a channel and waits for the reply.
#[derive(Debug, Clone)]
pub struct ChannelPrompter {
    sender: mpsc::Sender<PendingPrompt>,
}

impl ChannelPrompter {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PendingPrompt>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl UserPrompter for ChannelPrompter {
    async fn ask(&self, request: AskUserRequest) -> Result<AskUserResponse, ToolError> {
        let (reply, answer) = oneshot::channel();
        self.sender
            .send(PendingPrompt { request, reply })
            .await
            .map_err(|_| ToolError::Other("No host is listening for user prompts".to_string()))?;

        answer
            .await
            .map_err(|_| ToolError::Other("User prompt was cancelled".to_string()))
    }
}

/// Asks on the terminal, re-prompting until each answer fits its question type.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

#[async_trait]
impl UserPrompter for StdinPrompter {
    async fn ask(&self, request: AskUserRequest) -> Result<AskUserResponse, ToolError> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut responses = Vec::with_capacity(request.questions.len());

        for question in &request.questions {
            let mut prompt = format!("\n{}\n", question.question);
            if let Some(description) = &question.description {
                prompt.push_str(&format!("  {}\n", description));
            }
            if let Some(options) = &question.options {
                for (index, option) in options.iter().enumerate() {
                    prompt.push_str(&format!("  {}. {}\n", index + 1, option));
                }
            }
            if let Some(default) = &question.default {
                prompt.push_str(&format!("  [default: {}]\n", default));
            }

            loop {
                stdout.write_all(format!("{}> ", prompt).as_bytes()).await?;
                stdout.flush().await?;
                prompt.clear();

                let Some(line) = lines.next_line().await? else {
                    return Ok(AskUserResponse {
                        completed: false,
                        message: "Input closed before all questions were answered".to_string(),
                        responses,
                    });
                };

                match question.resolve_answer(&line) {
                    Ok(answer) => {
                        responses.push(UserQuestionResponse {
                            question_id: question.id.clone(),
                            answer,
                        });
                        break;
                    }
                    Err(reason) => prompt = format!("{}\n", reason),
                }
            }
        }

        Ok(AskUserResponse {
            completed: true,
            message: format!("User answered {} questions", responses.len()),
            responses,
        })
    }
}
