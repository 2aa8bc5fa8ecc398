use servir::{ConnectionAcceptor, EventLoop, MimeTable, ServeConfig, ServerResult, ShutdownSignal};
use std::env;
use std::process;
use std::slice;
use std::sync::Arc;

// Exit codes of the argument collaborator; 3 is the configuration-error
// code reserved for a malformed port or an unusable root directory.
const EXIT_MISSING_VALUE: i32 = 1;
const EXIT_UNKNOWN_ARGUMENT: i32 = 2;
const EXIT_BAD_CONFIG: i32 = 3;

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args: Vec<String> = env::args().skip(1).collect();
    let mut config = ServeConfig::new();

    let mut words = args.iter();
    while let Some(word) = words.next() {
        match word.as_str() {
            "help" => {
                print_help();
                return;
            }
            "version" => {
                println!("{}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "spa" => config.spa = true,
            "folder" => config.root = take_value(&mut words, "folder").into(),
            "host" => config.host = take_value(&mut words, "host"),
            "port" => {
                let value = take_value(&mut words, "port");
                config.port = match value.parse() {
                    Ok(port) => port,
                    Err(_) => {
                        eprintln!(
                            "PORT should be a number in servir port PORT, {:?} received.",
                            value
                        );
                        process::exit(EXIT_BAD_CONFIG);
                    }
                };
            }
            "config" => {
                let value = take_value(&mut words, "config");
                config = match ServeConfig::from_json_file(&value) {
                    Ok(config) => config,
                    Err(e) => {
                        eprintln!("Cannot load configuration from {}: {}", value, e);
                        process::exit(EXIT_BAD_CONFIG);
                    }
                };
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(EXIT_UNKNOWN_ARGUMENT);
            }
        }
    }

    if let Err(e) = config.canonicalize_root() {
        eprintln!("{}", e);
        process::exit(EXIT_BAD_CONFIG);
    }

    if let Err(e) = run(config) {
        log::error!("server error: {}", e);
        process::exit(1);
    }
}

fn run(config: ServeConfig) -> ServerResult<()> {
    let config = Arc::new(config);
    let mime = Arc::new(MimeTable::new());

    let shutdown = ShutdownSignal::new();
    shutdown.install_interrupt_handler()?;

    let acceptor = ConnectionAcceptor::bind(config.socket_address())?;
    log::info!(
        "Serving from {} on http://{} (CTRL-C to stop gracefully)",
        config.root.display(),
        acceptor.local_addr()?
    );

    let mut event_loop = EventLoop::new(acceptor, config, mime, shutdown)?;
    event_loop.run()
}

fn take_value(words: &mut slice::Iter<'_, String>, option: &str) -> String {
    match words.next() {
        Some(value) => value.clone(),
        None => {
            eprintln!("Missing value for {}", option);
            process::exit(EXIT_MISSING_VALUE);
        }
    }
}

fn print_help() {
    println!("USAGE");
    println!("  servir [OPTIONS]");
    println!();
    println!("EXAMPLES");
    println!("  servir folder public");
    println!("  servir folder public port 8080");
    println!("  servir folder public port 8080 host 0.0.0.0");
    println!("  servir folder public port 8080 host 0.0.0.0 spa");
    println!();
    println!("OPTIONS");
    println!("  help");
    println!("    display this message");
    println!();
    println!("  version");
    println!("    display this program's version");
    println!();
    println!("  folder FOLDER");
    println!("    serve files from the FOLDER folder (default to the current directory)");
    println!();
    println!("  port PORT");
    println!("    listen to request from the PORT port (default to 8080)");
    println!();
    println!("  host HOST");
    println!("    listen to request from the HOST host (default to 127.0.0.1)");
    println!();
    println!("  spa");
    println!("    fallback to the folder's index.html file (default to false)");
    println!();
    println!("  config FILE");
    println!("    load the whole configuration from the FILE JSON file");
}
