use super::{json_pretty, load_effective, Context, EXIT_SUCCESS};
use std::path::Path;
use strata_schema::compute_identity;

pub fn run(ctx: &Context, root: &Path) -> Result<u8, String> {
    let descriptor = load_effective(ctx, root)?;
    let identity = compute_identity(&descriptor);
    if ctx.json {
        println!("{}", json_pretty(&identity)?);
    } else {
        println!("name:      {}", descriptor.name);
        println!("id:        {}", identity.id);
        println!("short_id:  {}", identity.short_id);
    }
    Ok(EXIT_SUCCESS)
}
