use super::{json_pretty, load_effective, Context, EXIT_SUCCESS};
use std::path::Path;

pub fn run(ctx: &Context, root: &Path) -> Result<u8, String> {
    let descriptor = load_effective(ctx, root)?;
    if ctx.json {
        println!("{}", json_pretty(&descriptor.variables)?);
    } else {
        for (name, value) in &descriptor.variables {
            println!("{name}={value}");
        }
    }
    Ok(EXIT_SUCCESS)
}
