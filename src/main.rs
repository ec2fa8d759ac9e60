use anyhow::{anyhow, Context, Result};
use clap::Parser;
use ffpro::{run_reader, stdin_is_spoken_for, AppConfig, ProgressMonitor, TerminalDisplay, FFMPEG_ENV};
use log::{debug, info};
use std::process::{Command as ProcCommand, Stdio};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Show a progress bar for your ffmpeg commands.",
    long_about = "Runs ffmpeg with the given arguments and shows a live progress bar with an ETA. \
                  Run `man ffmpeg` or `ffmpeg --help` for ffmpeg related help."
)]
struct Args {
    /// ffmpeg binary to run (default: $FFPRO_FFMPEG, then the config file, then `ffmpeg`)
    #[arg(long, value_name = "PATH")]
    ffmpeg: Option<String>,

    /// Print overwrite questions and let ffmpeg read the answer from the terminal
    #[arg(long, default_value_t = false)]
    echo_prompts: bool,

    /// Disable colors in the status line
    #[arg(long, default_value_t = false)]
    no_color: bool,

    /// Arguments passed to ffmpeg unchanged
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    ffmpeg_args: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let cfg = AppConfig::load()?;

    let ffmpeg = args
        .ffmpeg
        .clone()
        .or_else(|| std::env::var(FFMPEG_ENV).ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| cfg.ffmpeg.clone());
    let confirm =
        cfg.confirm_overwrite && !args.echo_prompts && !stdin_is_spoken_for(&args.ffmpeg_args);

    let mut renderer = cfg.renderer();
    if args.no_color {
        renderer.color = false;
    }

    debug!("running {} {:?}", ffmpeg, args.ffmpeg_args);
    let mut child = ProcCommand::new(&ffmpeg)
        .args(&args.ffmpeg_args)
        .stdin(if confirm { Stdio::piped() } else { Stdio::inherit() })
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("running {}", ffmpeg))?;

    let mut display = TerminalDisplay::new()?;
    if let Some(stdin) = child.stdin.take() {
        display = display.with_responder(stdin);
    }

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("ffmpeg stderr was not captured"))?;
    let monitor = ProgressMonitor::from_args(&args.ffmpeg_args, renderer, display);
    // Dropping the display closes ffmpeg's stdin.
    let read_result = run_reader(stderr, monitor).map(drop);
    let status = child.wait().context("waiting for ffmpeg")?;
    read_result.context("reading ffmpeg output")?;

    info!("{} exited with {}", ffmpeg, status);
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
