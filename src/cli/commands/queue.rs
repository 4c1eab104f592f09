use super::{Ctx, open};
use crate::minter::QueueWhen;
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, when: &str, ids: &[String]) -> Result<()> {
    let when: QueueWhen = when.parse()?;
    let minter = open(ctx)?;
    let done = minter.queue(when, ids)?;
    let verb = if when == QueueWhen::Delete {
        "unqueued"
    } else {
        "queued"
    };
    for id in done {
        println!("{verb}: {id}");
    }
    Ok(())
}
