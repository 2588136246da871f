//! Print every settings knob and its default.

use anyhow::Result;

use crate::{output::Output, settings::Knobs};

pub fn knobs(knobs: &Knobs, output: &Output) -> Result<()> {
    if output.is_json() {
        return output.emit_json(knobs.defaults());
    }

    output.info(knobs.describe());
    Ok(())
}
