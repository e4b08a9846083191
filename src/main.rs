use std::env;

use log::LevelFilter;
use simple_logger::SimpleLogger;

use catena::error::fatal;
use catena::interp::Interp;

fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .init()
        .ok();

    let mut interp = match Interp::bootstrap() {
        Ok(interp) => interp,
        Err(e) => fatal(e),
    };

    // Positional arguments are sources, processed in order; `-` is
    // standard input. No flags.
    for source in env::args().skip(1) {
        if let Err(e) = interp.run(&source) {
            fatal(e);
        }
    }
}
