use super::{Ctx, open};
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, count: usize) -> Result<()> {
    let minter = open(ctx)?;
    let ids = minter.mint_multiple(count)?;
    for id in &ids {
        println!("{id}");
    }
    if ids.len() < count {
        tracing::warn!("minted {} of {count}; identifiers exhausted", ids.len());
    }
    Ok(())
}

pub(crate) fn handle_pregen(ctx: &Ctx, count: usize) -> Result<()> {
    let minter = open(ctx)?;
    let ids = minter.pregenerate(count)?;
    println!(
        "pre-generated {} identifiers ({} now pooled)",
        ids.len(),
        minter.pregen_count()?
    );
    Ok(())
}
