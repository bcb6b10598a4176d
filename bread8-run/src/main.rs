extern crate bread8_run;

use std::error::Error;
use std::io;
use std::process;

use console::{style, Emoji};
use tracing_subscriber::EnvFilter;

use bread8_run::cli::{Images, Mode, Options, RunSettings};
use bread8_run::runner::{self, StopReason};
use bread8_sim::image;
use bread8_sim::MachineConfig;

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_listing(images: Images, opcode: u8) -> Result<(), Box<dyn Error>> {
    let microcode = image::load_microcode(&images.ctrl_lsb, &images.ctrl_msb)?;
    runner::listing(&microcode, opcode, &mut io::stdout())?;
    Ok(())
}

async fn run_machine(images: Images, config: MachineConfig, settings: RunSettings) -> Result<(), Box<dyn Error>> {
    eprintln!("{} {} `{}`", Emoji("ℹ️", "ℹ"), style("ROM:").bright().cyan(), images.rom.display());
    if let Some(period) = settings.period {
        eprintln!("{} {} {:.1} Hz", Emoji("ℹ️", "ℹ"), style("Clock:").bright().cyan(), 1.0 / period.as_secs_f64());
    }

    let summary = runner::run(images, config, settings).await?;

    // the program's last line may not end with a newline
    eprintln!();
    match summary.reason {
        StopReason::Halted => eprintln!("{} {} {}", Emoji("✔️", "✔"), style("Halted:").bright().green(), "program finished"),
        StopReason::CycleLimit => eprintln!("{} {} {}", Emoji("⚠️", "⚠"), style("Stopped:").bright().yellow(), summary.reason),
        StopReason::Interrupted => eprintln!("{} {} {}", Emoji("⚠️", "⚠"), style("Stopped:").bright().yellow(), summary.reason)
    }
    eprintln!(
        "{} {} {} cycles in {:.3} s ({:.0} Hz)",
        Emoji("ℹ️", "ℹ"),
        style("Summary:").bright().cyan(),
        summary.cycles,
        summary.elapsed.as_secs_f64(),
        summary.frequency()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let options = Options::from_command_line();
    init_logging(options.verbosity());

    let result = match options.into_mode() {
        Mode::Listing { images, opcode } => run_listing(images, opcode),
        Mode::Run { images, config, settings } => run_machine(images, config, settings).await
    };

    if let Err(e) = result {
        eprintln!("{} {} {}", Emoji("❌", "X"), style("Error:").bright().red(), e);
        process::exit(1);
    }

    return Ok(());
}
