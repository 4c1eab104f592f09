pub(crate) mod bind;
pub(crate) mod dbcreate;
pub(crate) mod dbinfo;
pub(crate) mod fetch;
pub(crate) mod hold;
pub(crate) mod mint;
pub(crate) mod queue;
pub(crate) mod validate;

use std::sync::Arc;

pub(crate) use super::Ctx;
use crate::minter::Minter;
use crate::store::OpenMode;
use crate::Result;

/// Open the session every non-create handler works against.
pub(crate) fn open(ctx: &Ctx) -> Result<Arc<Minter>> {
    Minter::open(&ctx.settings, OpenMode::ReadWrite)
}
