//! Prompt templates.
//!
//! Variable syntax: `{name}`. `{{` and `}}` produce literal braces.

use serde_json::{Map, Value};

use crate::{AgentflowError, Result, workflow::template::value_to_string};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Var(String),
}

/// A parsed prompt template
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    /// Original template content
    content: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse a template string and extract variables
    pub fn parse(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        let mut segments = vec![];
        let mut text = String::new();
        let mut chars = content.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => return Err(AgentflowError::Chain(format!("unclosed '{{' in template: {}", content))),
                        }
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(AgentflowError::Chain("empty variable name in template".to_string()));
                    }
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Var(name));
                }
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            content,
            segments,
        })
    }

    /// Get the original template content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Names of the variables, in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![];
        for segment in &self.segments {
            if let Segment::Var(name) = segment
                && !names.contains(&name.as_str())
            {
                names.push(name.as_str());
            }
        }
        names
    }

    /// Render the template. Every variable must be present in `values`.
    pub fn format(
        &self,
        values: &Map<String, Value>,
    ) -> Result<String> {
        let mut out = String::with_capacity(self.content.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Var(name) => {
                    let value = values.get(name).ok_or_else(|| AgentflowError::Chain(format!("missing template variable '{}'", name)))?;
                    out.push_str(&value_to_string(value));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn vars(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_format() {
        let template = PromptTemplate::parse("Write a {style} poem about {topic}. {topic}!").unwrap();
        assert_eq!(template.variables(), vec!["style", "topic"]);
        let out = template.format(&vars(json!({"style": "short", "topic": "cats"}))).unwrap();
        assert_eq!(out, "Write a short poem about cats. cats!");
    }

    #[test]
    fn test_escaped_braces() {
        let template = PromptTemplate::parse("Return {{\"answer\": \"{value}\"}}").unwrap();
        assert_eq!(template.variables(), vec!["value"]);
        assert_eq!(template.format(&vars(json!({"value": 42}))).unwrap(), "Return {\"answer\": \"42\"}");
    }

    #[test]
    fn test_missing_variable() {
        let template = PromptTemplate::parse("Hello {name}").unwrap();
        let err = template.format(&Map::new()).unwrap_err();
        assert_eq!(err, AgentflowError::Chain("missing template variable 'name'".to_string()));
    }

    #[test]
    fn test_parse_errors() {
        assert!(PromptTemplate::parse("Hello {name").is_err());
        assert!(PromptTemplate::parse("Hello { }").is_err());
    }
}
