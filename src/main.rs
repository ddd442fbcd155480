mod cli;
mod commands;
mod env_loader;
mod error;
mod logging;
mod timetable;

fn main() {
    env_loader::load_dotenv();

    match cli::run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            match error::sync_error_code(&err) {
                Some(code) => eprintln!("error[{}]: {err:#}", code.as_str()),
                None => eprintln!("error: {err:#}"),
            }
            std::process::exit(cli::EXIT_FAILURE);
        }
    }
}
