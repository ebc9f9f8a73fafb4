use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

/// Ask the user a list of questions to gather information or confirm actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct AskUserRequest {
    /// List of questions to ask the user
    pub questions: Vec<UserQuestion>,
}

/// Individual question to ask the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct UserQuestion {
    /// Unique identifier for this question
    pub id: String,
    /// The question text to display to the user
    pub question: String,
    /// Type of response expected
    #[serde(rename = "type", default)]
    pub response_type: QuestionType,
    /// Default value if the user doesn't provide one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Possible answers for select questions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Additional description or help text for the question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Type of question and expected response format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Free text input
    #[default]
    Text,
    /// Numeric input
    Number,
    /// Yes/no answer
    Boolean,
    /// One of the listed options
    Select,
}

/// Answers collected for an ask_user request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AskUserResponse {
    /// Whether every question received a valid answer
    pub completed: bool,
    /// The user's answer to each question
    pub responses: Vec<UserQuestionResponse>,
    /// Status message shown to the model
    pub message: String,
}

/// Individual user response to a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserQuestionResponse {
    pub question_id: String,
    pub answer: String,
}

impl AskUserRequest {
    /// Validate ids and question text before anything is shown to a human.
    /// An empty question list is valid and means no clarification is needed.
    pub fn validate(&self) -> Result<(), String> {
        let mut question_ids = HashSet::new();
        for (index, question) in self.questions.iter().enumerate() {
            if question.id.trim().is_empty() {
                return Err(format!("Question at index {} has empty ID", index));
            }

            if question.question.trim().is_empty() {
                return Err(format!(
                    "Question '{}' at index {} has empty text",
                    question.id, index
                ));
            }

            if !question_ids.insert(question.id.as_str()) {
                return Err(format!("Duplicate question ID: {}", question.id));
            }

            if question.response_type == QuestionType::Select
                && question.options.as_ref().map_or(true, |o| o.is_empty())
            {
                return Err(format!(
                    "Select question '{}' must list its options",
                    question.id
                ));
            }
        }

        Ok(())
    }
}

impl UserQuestion {
    /// Check an answer against the question type, falling back to the default when empty.
    pub fn resolve_answer(&self, raw: &str) -> Result<String, String> {
        let answer = match (raw.trim(), &self.default) {
            ("", Some(default)) => default.clone(),
            (answer, _) => answer.to_string(),
        };

        match self.response_type {
            QuestionType::Text => Ok(answer),
            QuestionType::Number => answer
                .parse::<f64>()
                .map(|_| answer.clone())
                .map_err(|_| format!("'{}' is not a number", answer)),
            QuestionType::Boolean => match answer.to_lowercase().as_str() {
                "y" | "yes" | "true" => Ok("yes".to_string()),
                "n" | "no" | "false" => Ok("no".to_string()),
                _ => Err(format!("'{}' is not yes or no", answer)),
            },
            QuestionType::Select => {
                let options = self.options.as_deref().unwrap_or_default();
                if let Ok(index) = answer.parse::<usize>() {
                    if let Some(option) = index.checked_sub(1).and_then(|i| options.get(i)) {
                        return Ok(option.clone());
                    }
                }
                options
                    .iter()
                    .find(|option| option.eq_ignore_ascii_case(&answer))
                    .cloned()
                    .ok_or_else(|| format!("'{}' is not one of the options", answer))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, response_type: QuestionType) -> UserQuestion {
        UserQuestion {
            id: id.to_string(),
            question: format!("Question {}?", id),
            response_type,
            default: None,
            options: None,
            description: None,
        }
    }

    #[test]
    fn test_request_deserializes_with_type_field() {
        let request: AskUserRequest = serde_json::from_value(serde_json::json!({
            "questions": [{"id": "goal", "question": "What is the goal?", "type": "text"}]
        }))
        .unwrap();

        assert_eq!(request.questions[0].response_type, QuestionType::Text);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_blank_ids() {
        let request = AskUserRequest {
            questions: vec![question("a", QuestionType::Text), question("a", QuestionType::Text)],
        };
        assert!(request.validate().unwrap_err().contains("Duplicate"));

        let request = AskUserRequest {
            questions: vec![question(" ", QuestionType::Text)],
        };
        assert!(request.validate().unwrap_err().contains("empty ID"));
    }

    #[test]
    fn test_select_requires_options() {
        let request = AskUserRequest {
            questions: vec![question("db", QuestionType::Select)],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_resolve_answer() {
        let mut select = question("db", QuestionType::Select);
        select.options = Some(vec!["sqlite".to_string(), "postgres".to_string()]);
        assert_eq!(select.resolve_answer("2").unwrap(), "postgres");
        assert_eq!(select.resolve_answer("SQLite").unwrap(), "sqlite");
        assert!(select.resolve_answer("mysql").is_err());

        let boolean = question("ok", QuestionType::Boolean);
        assert_eq!(boolean.resolve_answer("Y").unwrap(), "yes");

        let mut number = question("n", QuestionType::Number);
        number.default = Some("3".to_string());
        assert_eq!(number.resolve_answer("").unwrap(), "3");
        assert!(number.resolve_answer("three").is_err());
    }
}
