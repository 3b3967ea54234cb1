//! `modegate modes` — List all modes.

use super::Context;
use super::mode::print_profile;

pub fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let modes = ctx.engine().modes();
    let default_mode = ctx.config.autonomy.default_mode;
    ctx.emit(&modes, |modes| {
        for summary in modes {
            let marker = if summary.mode == default_mode { " (default)" } else { "" };
            println!("{}{marker}", summary.mode);
            print_profile(summary);
            println!();
        }
    })
}
