use std::collections::BTreeMap;

use finmcp_tools::{ToolDescriptor, ToolRegistry};

fn categorize_tool(name: &str) -> &'static str {
    if name.contains("fund") {
        "Funds"
    } else if name.contains("futures") {
        "Futures"
    } else if name.starts_with("macro_") || name.contains("economic") {
        "Macro"
    } else {
        "Stocks"
    }
}

/// List all registered tools grouped by asset class.
pub async fn list() -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let descriptors = registry.descriptors();

    println!();
    println!("🔧 Registered tools ({} total)", descriptors.len());
    println!();

    let mut categorized: BTreeMap<&str, Vec<&ToolDescriptor>> = BTreeMap::new();
    for descriptor in &descriptors {
        categorized
            .entry(categorize_tool(descriptor.name))
            .or_default()
            .push(descriptor);
    }

    for (cat, tools) in &categorized {
        println!("  📂 {} ({})", cat, tools.len());
        for tool in tools {
            let short_desc: String = tool.description.chars().take(60).collect();
            let ellipsis = if tool.description.chars().count() > 60 { "..." } else { "" };
            println!("     {:<40} {}{}", tool.name, short_desc, ellipsis);
        }
        println!();
    }

    Ok(())
}

/// Show a tool's description and argument schema.
pub async fn info(tool_name: &str) -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let Some(tool) = registry.get(tool_name) else {
        anyhow::bail!("Tool '{}' not found. Use `finmcp tools list` to see available tools.", tool_name);
    };
    let descriptor = tool.descriptor();

    println!();
    println!("🔧 {}", descriptor.name);
    println!();
    println!("  Description: {}", descriptor.description);
    println!();

    if descriptor.fields().is_empty() {
        println!("  Parameters: (none)");
    } else {
        println!("  Parameters:");
        for field in descriptor.fields() {
            let marker = if field.required { "*" } else { " " };
            let default = field
                .default
                .as_ref()
                .map(|d| format!(" (default: {})", d))
                .unwrap_or_default();
            println!(
                "    {}{:<18} {:<8} {}{}",
                marker,
                field.name,
                field.ty.json_type(),
                field.description,
                default
            );
        }
        println!();
        println!("  * = required");
    }
    println!();
    println!("  Input schema:");
    println!("{}", serde_json::to_string_pretty(&descriptor.input_schema())?);

    Ok(())
}
