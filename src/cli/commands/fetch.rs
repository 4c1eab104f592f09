use super::super::render;
use super::{Ctx, open};
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, id: &str, elems: &[String], labelled: bool) -> Result<()> {
    let minter = open(ctx)?;
    let result = minter.fetch(id, elems)?;
    if labelled {
        print!("{}", render::render_fetch(&result));
    } else {
        print!("{}", render::render_get(&result));
    }
    Ok(())
}
