use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Tool advertised to the model: a name, a description and a JSON schema for its arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl Tool {
    /// Start a tool definition whose parameters are the JSON schema of `T`.
    pub fn from_type<T: JsonSchema>() -> ToolBuilder {
        ToolBuilder {
            name: None,
            description: None,
            parameters: schema_for::<T>(),
        }
    }
}

pub struct ToolBuilder {
    name: Option<String>,
    description: Option<String>,
    parameters: serde_json::Value,
}

impl ToolBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> Tool {
        Tool {
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            parameters: self.parameters,
        }
    }
}

/// Draft-07 schema with every subschema inlined, since providers reject `$ref`.
fn schema_for<T: JsonSchema>() -> serde_json::Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();

    let mut value = serde_json::to_value(root)
        .unwrap_or_else(|_| serde_json::json!({ "type": "object", "properties": {} }));
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
        object.remove("definitions");
    }
    value
}

/// How the model may use the advertised tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Zero or more tool calls
    Auto,
    /// At least one tool call
    Required,
    None,
    Specific { name: String },
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    id: String,
    name: String,
    arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &serde_json::Value {
        &self.arguments
    }

    pub fn parse_arguments<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.arguments.clone())
    }
}
