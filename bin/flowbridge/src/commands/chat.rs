use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use flowbridge_core::ConversationMessage;
use flowbridge_inference::{InferenceClient, LanguageModel};
use flowbridge_memory::{ConversationBuffer, PromptTemplate};
use tracing::debug;

pub async fn run(pre_prompt: &str) -> anyhow::Result<()> {
    let (config, _paths) = super::load_config()?;
    let client = InferenceClient::new(&config.inference)?;
    let mut buffer = ConversationBuffer::new(&config.memory)?;

    // The marker mode doubles as the model-family hint for the template.
    let family = config.memory.chat_markers.as_str();
    let template = PromptTemplate::for_model_family(family, pre_prompt, "");
    let window = config.memory.history_window;

    println!("flowbridge chat (Ctrl+D to exit)");
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let history = buffer.render(window)?;
        let mut vars = HashMap::new();
        vars.insert("history".to_string(), history);
        vars.insert("input".to_string(), input.to_string());
        let prompt = template.format(&vars)?;
        debug!(prompt_len = prompt.len(), "Sending prompt");

        let reply = client.generate(&prompt, &[]).await?;
        let reply = reply.trim();
        println!("{}", reply);

        buffer.append(ConversationMessage::user(input));
        buffer.append(ConversationMessage::assistant(reply));
    }

    Ok(())
}
