use super::{Ctx, open};
use crate::core::{CoreError, Template};
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, template: &str, ids: &[String]) -> Result<()> {
    let template = match template {
        "-" => None,
        t => Some(Template::parse(t)?),
    };
    let minter = open(ctx)?;
    let mut failed = 0usize;
    for id in ids {
        match minter.validate_id(template.as_ref(), id) {
            Ok(()) => println!("{id}: valid"),
            Err(e) => {
                println!("{e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(CoreError::bad_input(
            "validate",
            format!("{failed} of {} identifiers failed validation", ids.len()),
        )
        .into());
    }
    Ok(())
}
