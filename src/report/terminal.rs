use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use license_policy::compat::{CompatibilityReport, CompatibilityVerdict};
use license_policy::engine::EvaluationResult;
use license_policy::license::store::DataWarning;
use license_policy::models::{Category, License};
use license_policy::obligations::ObligationRecord;
use license_policy::policy::Action;

/// Render an evaluation result: summary box, per-license table, then the
/// merged requirements and remediation.
pub fn render_evaluation(result: &EvaluationResult) {
    let decision = &result.decision;

    println!(
        "\n {} v{}",
        "license-policy".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        " Policy: {}{}",
        result.policy_name,
        if result.using_default_policy {
            " (default)".dimmed().to_string()
        } else {
            String::new()
        }
    );
    println!(
        " Scenario: {} distribution, {}{}\n",
        result.distribution,
        result.context,
        result
            .project_type
            .as_deref()
            .map(|p| format!(", {p} project"))
            .unwrap_or_default()
    );

    let count = |action: Action| {
        decision
            .verdicts
            .values()
            .filter(|v| v.action == action)
            .count()
    };

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "DECISION".bold());
    println!(" │  {:<48} │", format!("Overall          : {}", action_label(decision.action)));
    println!(" │  {:<48} │", format!("Severity         : {}", decision.severity));
    println!(" │  {:<48} │", format!("{}  Approve       : {:>4}", "✓".green(), count(Action::Approve)));
    println!(" │  {:<48} │", format!("{}  Review        : {:>4}", "⚠".yellow(), count(Action::Review)));
    println!(" │  {:<48} │", format!("{}  Deny          : {:>4}", "✗".red(), count(Action::Deny)));
    println!(" └────────────────────────────────────────────────────┘\n");

    println!(" {}\n", decision.message);

    if !decision.verdicts.is_empty() {
        let mut table = table(&["License", "Category", "Action", "Rule", "Message"]);
        for (id, verdict) in &decision.verdicts {
            let category = decision
                .obligations
                .get(id)
                .map(|o| o.category.to_string())
                .unwrap_or_default();
            let (label, color) = action_cell(verdict.action);
            table.add_row(vec![
                Cell::new(id),
                Cell::new(category),
                Cell::new(label).fg(color).set_alignment(CellAlignment::Center),
                Cell::new(verdict.rule.as_deref().unwrap_or("-")),
                Cell::new(&verdict.message),
            ]);
        }
        println!("{}\n", table);
    }

    if !decision.remediation.is_empty() {
        println!(" {} Remediation:\n", "[DENY]".red().bold());
        for text in &decision.remediation {
            println!("   • {text}");
        }
        println!();
    }

    if !decision.requirements.is_empty() {
        println!(" {} Requirements:\n", "[APPROVE]".green().bold());
        for text in &decision.requirements {
            println!("   • {text}");
        }
        println!();
    }

    for record in decision.obligations.values() {
        if !record.obligations.is_empty() {
            println!(" {} obligations:", record.license.bold());
            for obligation in &record.obligations {
                println!("   - {obligation}");
            }
        }
    }
}

pub fn render_compatibility(report: &CompatibilityReport) {
    let verdict = match report.verdict {
        CompatibilityVerdict::Compatible => "✓ compatible".green(),
        CompatibilityVerdict::Incompatible => "✗ incompatible".red(),
        CompatibilityVerdict::ReviewRequired => "⚠ review required".yellow(),
    };
    println!(
        "\n {} + {} ({}): {}",
        report.license_a.bold(),
        report.license_b.bold(),
        report.linking,
        verdict.bold()
    );
    println!(" {}", report.reason);
    println!(
        " Contamination: {} = {}, {} = {}\n",
        report.license_a, report.contamination_a, report.license_b, report.contamination_b
    );
}

pub fn render_obligations(records: &[ObligationRecord]) {
    for record in records {
        println!(
            "\n {} - {} ({})",
            record.license.bold(),
            record.name,
            category_colored(record.category)
        );

        let mut table = table(&["Permissions", "Requirements", "Limitations"]);
        let rows = record
            .permissions
            .len()
            .max(record.requirements.len())
            .max(record.limitations.len());
        for i in 0..rows {
            let cell = |items: &[String]| Cell::new(items.get(i).map(String::as_str).unwrap_or(""));
            table.add_row(vec![
                cell(&record.permissions).fg(Color::Green),
                cell(&record.requirements).fg(Color::Yellow),
                cell(&record.limitations).fg(Color::Red),
            ]);
        }
        println!("{}", table);

        for obligation in &record.obligations {
            println!("   - {obligation}");
        }
        println!(
            "   attribution: {}  source disclosure: {}  notice: {}  contamination: {}",
            yes_no(record.attribution_required),
            yes_no(record.source_disclosure_required),
            yes_no(record.notice_required),
            record.contamination_effect
        );
    }
    println!();
}

pub fn render_license(license: &License) {
    println!("\n {} - {}", license.id.bold(), license.name);
    println!(" Category: {}", category_colored(license.category));
    println!(
        " Contamination: {}\n",
        license.compatibility.contamination_effect
    );

    let mut table = table(&["Linking", "Compatible with", "Incompatible with", "Requires review"]);
    for (mode, rules) in [
        ("static", &license.compatibility.static_linking),
        ("dynamic", &license.compatibility.dynamic_linking),
    ] {
        let join = |targets: &[license_policy::models::Target]| {
            targets
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        };
        table.add_row(vec![
            Cell::new(mode),
            Cell::new(join(&rules.compatible_with)).fg(Color::Green),
            Cell::new(join(&rules.incompatible_with)).fg(Color::Red),
            Cell::new(join(&rules.requires_review)).fg(Color::Yellow),
        ]);
    }
    println!("{}\n", table);
}

pub fn render_list<'a>(licenses: impl Iterator<Item = &'a License>) {
    let mut table = table(&["License", "Name", "Category", "Contamination"]);
    for license in licenses {
        table.add_row(vec![
            Cell::new(&license.id),
            Cell::new(&license.name),
            Cell::new(license.category.to_string()).fg(category_color(license.category)),
            Cell::new(license.compatibility.contamination_effect.to_string()),
        ]);
    }
    println!("{}", table);
}

pub fn render_warnings(warnings: &[DataWarning], total: usize) {
    if warnings.is_empty() {
        println!(" {} {} license records, no data-quality warnings", "✓".green(), total);
        return;
    }
    println!(
        " {} {} data-quality warnings across {} license records:\n",
        "⚠".yellow(),
        warnings.len(),
        total
    );
    for warning in warnings {
        println!("   • {warning}");
    }
}

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

fn action_cell(action: Action) -> (&'static str, Color) {
    match action {
        Action::Approve => ("✓ approve", Color::Green),
        Action::Review => ("⚠ review", Color::Yellow),
        Action::Deny => ("✗ deny", Color::Red),
    }
}

fn action_label(action: Action) -> ColoredString {
    match action {
        Action::Approve => "APPROVE".green().bold(),
        Action::Review => "REVIEW".yellow().bold(),
        Action::Deny => "DENY".red().bold(),
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Permissive => Color::Green,
        Category::PublicDomain => Color::Cyan,
        Category::WeakCopyleft => Color::Yellow,
        Category::StrongCopyleft => Color::Red,
        Category::Proprietary => Color::Magenta,
    }
}

fn category_colored(category: Category) -> ColoredString {
    let text = category.to_string();
    match category {
        Category::Permissive => text.green(),
        Category::PublicDomain => text.cyan(),
        Category::WeakCopyleft => text.yellow(),
        Category::StrongCopyleft => text.red(),
        Category::Proprietary => text.magenta(),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
