use super::super::HoldCmd;
use super::{Ctx, open};
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, cmd: HoldCmd) -> Result<()> {
    let minter = open(ctx)?;
    match cmd {
        HoldCmd::Set { ids } => {
            for id in minter.hold_set(&ids)? {
                println!("hold set: {id}");
            }
        }
        HoldCmd::Release { ids } => {
            for id in minter.hold_release(&ids)? {
                println!("hold released: {id}");
            }
        }
    }
    Ok(())
}
