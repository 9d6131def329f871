use flowbridge_inference::{Embedder, InferenceClient, LanguageModel};

pub async fn run(prompt: &str, stop: &[String]) -> anyhow::Result<()> {
    let (config, _paths) = super::load_config()?;
    let client = InferenceClient::new(&config.inference)?;

    let text = client.generate(prompt, stop).await?;
    println!("{}", text);
    Ok(())
}

pub async fn run_embed(text: &str) -> anyhow::Result<()> {
    let (config, _paths) = super::load_config()?;
    let client = InferenceClient::new(&config.inference)?;

    let embedding = client.embed(text).await?;
    println!("{}", serde_json::to_string(&embedding)?);
    Ok(())
}
