//! Fields command - show the field table in use.

use clap::Args;
use console::style;

use formex_core::fields::FieldTable;
use formex_core::region::FULL_REGION;

use super::load_config;

/// Arguments for the fields command.
#[derive(Args)]
pub struct FieldsArgs {
    /// Print the table as JSON, ready to paste into a config file
    #[arg(long)]
    json: bool,

    /// Include each rule's pattern
    #[arg(long)]
    patterns: bool,
}

pub async fn run(args: FieldsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    // Compiling validates patterns, sections and regions even for --json.
    let table = config.field_table()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config.field_table_config())?);
        return Ok(());
    }

    println!(
        "{} {} fields ({})",
        style("ℹ").blue(),
        table.rules().len(),
        if config.fields.is_some() { "configured" } else { "built-in enrollment form" }
    );
    println!();
    print!("{}", format_table(&table, args.patterns));

    Ok(())
}

fn format_table(table: &FieldTable, patterns: bool) -> String {
    let width = table
        .rules()
        .iter()
        .map(|r| r.name().chars().count())
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    for rule in table.rules() {
        let pad = width - rule.name().chars().count();
        output.push_str(&format!(
            "{}{}  {:<18} {:<8} {}\n",
            rule.name(),
            " ".repeat(pad),
            rule.policy().to_string(),
            rule.region().unwrap_or(FULL_REGION),
            table.section_of(rule).unwrap_or("-"),
        ));
        if patterns {
            output.push_str(&format!("{}  {}\n", " ".repeat(width), rule.pattern()));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use formex_core::fields::{FieldRuleConfig, FieldTableConfig, MatchPolicy, SectionConfig};

    #[test]
    fn test_format_table() {
        let table = FieldTable::compile(&FieldTableConfig {
            sections: vec![SectionConfig::new("tv", r"TV")],
            rules: vec![
                FieldRuleConfig::new("이름", r"이름[:\t ]*(\S+)").policy(MatchPolicy::LastIfAmbiguous),
                FieldRuleConfig::new("tv_plan", r"요금제[:\t ]*(\S+)").section("tv"),
            ],
        })
        .unwrap();

        let output = format_table(&table, false);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("이름       last-if-ambiguous  full"));
        assert!(lines[1].ends_with("full     tv"));
    }
}
