use super::{json_pretty, load_effective, yaml, Context, EXIT_SUCCESS};
use std::path::Path;

pub fn run(ctx: &Context, root: &Path) -> Result<u8, String> {
    let descriptor = load_effective(ctx, root)?;
    if ctx.json {
        println!("{}", json_pretty(&descriptor)?);
    } else {
        print!("{}", yaml(&descriptor)?);
    }
    Ok(EXIT_SUCCESS)
}
