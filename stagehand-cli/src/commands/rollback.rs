//! `stagehand rollback`

use anyhow::Result;

use super::{print_swaps, Session};

pub fn run(session: &Session) -> Result<()> {
    let swaps = session.with_lifecycle(|lc| Ok(lc.rollback()?))?;
    print_swaps(&swaps);
    Ok(())
}
