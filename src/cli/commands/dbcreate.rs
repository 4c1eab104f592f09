use super::super::{Ctx, DbcreateArgs};
use crate::minter::{CreateArgs, Minter, Term};
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, args: DbcreateArgs) -> Result<()> {
    let mut settings = ctx.settings.clone();
    if let Some(contact) = args.contact {
        settings.contact = Some(contact);
    }
    let term: Term = args.term.parse()?;
    let create = CreateArgs {
        template: args.template,
        term,
        naan: args.naan,
        naa: args.naa,
        subnaa: args.subnaa,
    };
    let (_minter, report) = Minter::create(&settings, &create)?;
    print!("{report}");
    Ok(())
}
