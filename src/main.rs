use worktime::cli::run;

fn main() {
    // Harmless outside Windows consoles
    let _ = enable_ansi_support::enable_ansi_support();
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("WORKTIME_LOG", "warn")).init();

    // User errors exit from inside `run`; anything reaching here is a
    // storage or I/O fault.
    if let Err(e) = run() {
        eprintln!("Internal error: {}", e);
        let mut causes = e.chain().skip(1).peekable();
        if causes.peek().is_some() {
            eprintln!("\nCaused by:");
            for (indent, cause) in causes.enumerate() {
                eprintln!("{:indent$}  {}", "", cause, indent = indent + 1);
            }
        }
        std::process::exit(2);
    }
}
