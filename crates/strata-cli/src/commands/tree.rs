use super::{json_pretty, load_hierarchy, Context, EXIT_SUCCESS};
use console::Style;
use serde::Serialize;
use std::path::Path;
use strata_core::Composer;

#[derive(Serialize)]
struct TreeReport<'a> {
    load_order: Vec<&'a str>,
    compose_order: Vec<&'a str>,
}

pub fn run(ctx: &Context, root: &Path) -> Result<u8, String> {
    let hierarchy = load_hierarchy(ctx, root)?;
    let composer = Composer::new(hierarchy.descriptors());
    let report = TreeReport {
        load_order: hierarchy.names(),
        compose_order: composer.precedence().map(|d| d.name.as_str()).collect(),
    };

    if ctx.json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    let root_name = hierarchy.root().name.as_str();
    let bold = Style::new().bold();
    println!("{}", bold.apply_to("load order:"));
    for (i, name) in report.load_order.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, highlight(name, root_name));
    }
    println!("{}", bold.apply_to("compose order (last wins):"));
    for (i, name) in report.compose_order.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, highlight(name, root_name));
    }
    Ok(EXIT_SUCCESS)
}

fn highlight(name: &str, root: &str) -> String {
    if name == root {
        Style::new().cyan().bold().apply_to(name).to_string()
    } else {
        name.to_owned()
    }
}
