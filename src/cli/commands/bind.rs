use std::io::Read;

use super::{Ctx, open};
use crate::core::CoreError;
use crate::minter::BindHow;
use crate::Result;

pub(crate) fn handle(
    ctx: &Ctx,
    how: &str,
    id: &str,
    elem: &str,
    value: Option<String>,
) -> Result<()> {
    let how: BindHow = how.parse()?;
    let value = match value.as_deref() {
        Some("-") | None if how != BindHow::Delete => read_stdin()?,
        Some(v) => v.to_string(),
        None => String::new(),
    };
    let minter = open(ctx)?;
    let bound = minter.bind(how, id, elem, &value, true)?;
    println!("{how}: {bound} {elem}");
    Ok(())
}

pub(crate) fn handle_note(ctx: &Ctx, key: &str, value: &str) -> Result<()> {
    let minter = open(ctx)?;
    minter.note(key, value)?;
    println!("note: {key}");
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut value = String::new();
    std::io::stdin()
        .read_to_string(&mut value)
        .map_err(|e| CoreError::bad_input("value", format!("stdin read failed: {e}")))?;
    // A trailing newline is an artifact of the pipe, not the value.
    if value.ends_with('\n') {
        value.pop();
    }
    Ok(value)
}
