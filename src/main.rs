use clap::Parser;

use upkit::core::context::WorkspaceContext;
use upkit::core::error::{KitError, print_error};
use upkit::lock::ProcessLock;
use upkit::session::ReleaseSession;
use upkit::ui::prompt::TerminalPrompter;

/// Interactively prepare a versioned upgrade kit for a configured device type
#[derive(Parser)]
#[command(name = "upkit")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct UpkitCli {}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let UpkitCli {} = UpkitCli::parse();

  let workspace_root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  // Build workspace context once (loads and validates the catalog); a
  // workspace without a usable catalog fails before any workflow begins
  let ctx = match WorkspaceContext::build(&workspace_root) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  // Ctrl-C must not leave lock markers behind
  let scratch_dir = ctx.scratch_dir();
  let pid = std::process::id();
  if let Err(e) = ctrlc::set_handler(move || {
    let _ = ProcessLock::sweep(&scratch_dir, pid);
    println!("\n👋 Bye");
    std::process::exit(0);
  }) {
    handle_error(KitError::from(e));
  }

  let mut session = ReleaseSession::new(ctx, TerminalPrompter::new());
  if let Err(err) = session.run() {
    handle_error(err);
  }
}

fn handle_error(err: KitError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
