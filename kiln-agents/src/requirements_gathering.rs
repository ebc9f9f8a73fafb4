use crate::profile::{AgentProfile, ProfileOverrides};
use crate::runtime::Runtime;
use crate::storage::AgentStorage;
use crate::tools::AgentTool;
use crate::Agent;
use kiln_llm::LlmClient;
use kiln_tools::{ToolExecutor, UserPrompter};
use std::sync::Arc;

pub const AGENT_NAME: &str = "requirements-gathering";
const MAX_ITERATIONS: u32 = 10;
const TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str = r#"You are a requirements gathering specialist for business process automation.
Your role is to analyze user requests and decide whether clarification is needed before implementation.

CONTEXT:
You are part of a system that helps users define their business processes and automate workflows.
Users will share access to their data sources (databases, APIs, etc.) as needed.

YOUR CAPABILITIES:
- You can ask clarifying questions using the ask_user tool
- Focus on high-level process understanding, not technical implementation details
- You can ask about data source types and names (never authentication details)
- You can request specific examples (e.g. sample emails or messages to process)
- You should understand the goal and desired outcome of the automation

WHEN TO ASK QUESTIONS:
- The user's goal is unclear or ambiguous
- Critical information about data sources is missing
- The scope of the automation needs definition
- Specific examples would help clarify requirements

WHEN NOT TO ASK QUESTIONS:
- The user has provided a clear, actionable request
- The request is not about business process automation
- You have sufficient information to proceed

If the request is clear and describes an automatable software process, respond directly
without using the ask_user tool and explain that you understand the requirements.

If the user did not describe a process that can be automated with software, respond politely
that you need more information about what they want to automate."#;

/// Clarifies an automation request by asking the user questions.
pub struct RequirementsGatheringAgent {
    profile: AgentProfile,
    runtime: Runtime,
}

impl RequirementsGatheringAgent {
    pub fn new(
        client: Arc<dyn LlmClient>,
        storage: Arc<dyn AgentStorage>,
        user_prompter: Arc<dyn UserPrompter>,
    ) -> Self {
        let tool_executor = ToolExecutor::builder().user_prompter(user_prompter).build();
        let profile = AgentProfile::new(
            AGENT_NAME,
            "Analyze user requests and determine if clarification is needed",
            SYSTEM_PROMPT,
            vec![AgentTool::AskUser],
        )
        .with_max_iterations(MAX_ITERATIONS)
        .with_temperature(TEMPERATURE);

        Self {
            profile,
            runtime: Runtime::new(client, storage, Arc::new(tool_executor)),
        }
    }

    pub fn with_overrides(mut self, overrides: ProfileOverrides) -> Self {
        self.runtime = self.runtime.with_overrides(overrides);
        self
    }
}

impl Agent for RequirementsGatheringAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::testing::{text_response, tool_response, ScriptedClient};
    use kiln_llm::ToolCall;
    use kiln_tools::ChannelPrompter;
    use shared_types::{MessageRole, ToolCallStatus};

    #[tokio::test]
    async fn test_answers_come_back_through_the_channel() {
        let (prompter, mut prompts) = ChannelPrompter::new(1);
        let host = tokio::spawn(async move {
            let prompt = prompts.recv().await.unwrap();
            assert_eq!(prompt.request().questions[0].id, "source");
            prompt.answer(vec!["The billing inbox".to_string()]);
        });

        let client = Arc::new(ScriptedClient::new(vec![
            tool_response(
                "",
                vec![ToolCall::new(
                    "call_1",
                    "ask_user",
                    serde_json::json!({"questions": [
                        {"id": "source", "question": "Where do the invoices arrive?", "type": "text"}
                    ]}),
                )],
            ),
            text_response("Invoices arrive in the billing inbox"),
        ]));
        let storage = Arc::new(InMemoryStorage::new());
        let agent =
            RequirementsGatheringAgent::new(client.clone(), storage.clone(), Arc::new(prompter));

        let result = agent.execute("Automate my invoices").await.unwrap();
        host.await.unwrap();

        assert_eq!(result, "Invoices arrive in the billing inbox");
        assert_eq!(client.requests()[0].temperature, Some(TEMPERATURE));

        let calls = storage.get_tool_calls(1).await.unwrap();
        assert_eq!(calls[0].status, ToolCallStatus::Completed);
        let messages = storage.get_messages(1).await.unwrap();
        assert_eq!(messages[2].role, MessageRole::Tool);
        assert!(messages[2].content.contains("source: The billing inbox"));
    }

    #[test]
    fn test_profile_bounds() {
        let (prompter, _prompts) = ChannelPrompter::new(1);
        let agent = RequirementsGatheringAgent::new(
            Arc::new(ScriptedClient::new(vec![])),
            Arc::new(InMemoryStorage::new()),
            Arc::new(prompter),
        );
        assert_eq!(agent.profile().max_iterations, MAX_ITERATIONS);
        assert_eq!(agent.tools(), &[AgentTool::AskUser]);
    }
}
