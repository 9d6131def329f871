use std::collections::HashMap;

use flowbridge_core::{Error, Result};

/// A prompt template with named `{placeholder}` slots.
///
/// `pre_prompt` and `context` are bound at construction; the remaining
/// variables (typically `history` and `input`) are supplied per call.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    pre_prompt: String,
    context: String,
}

impl PromptTemplate {
    pub fn new(template: &str, pre_prompt: &str, context: &str) -> Self {
        Self {
            template: template.to_string(),
            pre_prompt: pre_prompt.to_string(),
            context: context.to_string(),
        }
    }

    /// Default conversation template for a model family. The instruct family
    /// wraps the system block in its chat control tokens; everything else
    /// gets a plain question/answer trailer.
    pub fn for_model_family(family: &str, pre_prompt: &str, context: &str) -> Self {
        let instruct = family == "llama2";
        let mut template = String::new();

        if instruct {
            template.push_str("<s>[INST]<<SYS>>\n");
        }
        template.push_str("{pre_prompt}\n\nContext sections:\n{context}\n");
        if instruct {
            template.push_str("<</SYS>>");
        }
        template.push_str("\n\nCurrent conversation:\n{history}");
        if instruct {
            template.push_str("\n\n {input} [/INST]");
        } else {
            template.push_str("\n\nQuestion:\n{input}\n\nanswer:\n");
        }

        Self::new(&template, pre_prompt, context)
    }

    /// Substitute every placeholder. A placeholder with no binding fails
    /// with a validation error rather than passing through half-rendered.
    pub fn format(&self, vars: &HashMap<String, String>) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after
                .find('}')
                .ok_or_else(|| Error::Validation("unclosed placeholder in template".to_string()))?;
            let name = &after[..end];

            let value = match name {
                "pre_prompt" => Some(&self.pre_prompt),
                "context" => Some(&self.context),
                _ => vars.get(name),
            };
            let value = value.ok_or_else(|| {
                Error::Validation(format!("missing template variable: {}", name))
            })?;

            out.push_str(value);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
