use super::{json_pretty, load_effective, Context, EXIT_SUCCESS};
use std::path::Path;

pub fn run(ctx: &Context, root: &Path) -> Result<u8, String> {
    let descriptor = load_effective(ctx, root)?;
    let paths = descriptor.paths();
    if ctx.json {
        println!("{}", json_pretty(&paths)?);
    } else {
        println!("os:         {}", paths.os.display());
        println!("main:       {}", paths.main.display());
        println!("appliance:  {}", paths.appliance.display());
        println!("build:      {}", paths.build.display());
    }
    Ok(EXIT_SUCCESS)
}
