use super::{Ctx, open};
use crate::minter::DbInfoLevel;
use crate::store::Backend;
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, level: Option<&str>) -> Result<()> {
    let level: DbInfoLevel = match level {
        Some(l) => l.parse()?,
        None => DbInfoLevel::Brief,
    };
    let minter = open(ctx)?;
    print!("{}", minter.dbinfo(level)?);
    Ok(())
}

pub(crate) fn handle_import(ctx: &Ctx, source: &str) -> Result<()> {
    let source: Backend = source.parse()?;
    let minter = open(ctx)?;
    let count = minter.import_from(source)?;
    println!("imported {count} records from {source}");
    Ok(())
}
