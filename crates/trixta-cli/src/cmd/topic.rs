use crate::output::print_json;
use trixta_core::channel::ChannelNaming;

pub fn run(role: &str, namespace: &str, json: bool) -> anyhow::Result<()> {
    if role.trim().is_empty() {
        anyhow::bail!("role name must not be empty");
    }
    if namespace.is_empty() || namespace.contains(':') {
        anyhow::bail!("invalid namespace '{namespace}': must be non-empty and contain no ':'");
    }

    let topic = ChannelNaming::new(namespace).topic(role);
    if json {
        print_json(&serde_json::json!({ "role": role, "topic": topic }))?;
    } else {
        println!("{topic}");
    }
    Ok(())
}
