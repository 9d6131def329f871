use flowbridge_core::Paths;
use flowbridge_flows::FlowStore;

pub async fn get(name: &str) -> anyhow::Result<()> {
    let (config, _paths) = super::load_config()?;

    let db_path = Paths::expand(&config.flows.db_path);
    let store = FlowStore::new(&db_path);

    let record = store.lookup(name).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
